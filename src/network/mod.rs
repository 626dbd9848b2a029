use crate::cells::{self, CellPositions};
use crate::graph::SynapseGraph;
use crate::types::{CohortLayout, ModelParams};
use crate::{raytrace, NRError, NRResult};
use ndarray::{concatenate, Array1, Axis};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::Rng;

/// A fully built model: immutable cohort positions, the effective id layout
/// and the de-cycled sparse weight matrix. Handed off to a training
/// collaborator by move.
#[derive(Debug, Clone)]
pub struct Network {
    pub positions: CellPositions,
    pub layout: CohortLayout,
    pub graph: SynapseGraph,
    /// Whether every input reached every output before loop deletion.
    pub connected: bool,
}

/// Initial synaptic weights, drawn from `Normal(0, std)`.
pub fn init_weights<R: Rng>(count: usize, std: f32, rng: &mut R) -> NRResult<Array1<f32>> {
    let normal = Normal::new(0.0f32, std)
        .map_err(|e| NRError::InvalidArgument(format!("invalid weight std {std}: {e}")))?;
    Ok(Array1::random_using(count, normal, rng))
}

/// Builds the whole model: places the cohorts, traces input∪hidden→hidden
/// connectivity, extends it with hidden→output connections, initializes
/// weights, verifies input→output reachability and deletes loop-closing
/// edges at the given traversal depth.
pub fn assemble<R: Rng>(params: &ModelParams, depth: i64, rng: &mut R) -> NRResult<Network> {
    let positions = cells::place_cells(params, rng)?;
    let layout = positions.layout();
    tracing::debug!(
        input = layout.input,
        hidden = layout.hidden,
        output = layout.output,
        glia = positions.glia_pos.nrows(),
        "cells placed"
    );

    let sender_pos = concatenate(
        Axis(0),
        &[positions.input_pos.view(), positions.hidden_pos.view()],
    )
    .expect("[N,3] concatenation");
    let sender_idx = concatenate(
        Axis(0),
        &[layout.input_ids().view(), layout.hidden_ids().view()],
    )
    .expect("1-D concatenation");

    let (rows, cols) = raytrace::raytrace_distance_limited(
        params,
        &positions.glia_pos,
        &sender_pos,
        &sender_idx,
        &positions.hidden_pos,
        &layout.hidden_ids(),
        None,
        rng,
    )?;
    let (rows, cols) = raytrace::raytrace_distance_limited(
        params,
        &positions.glia_pos,
        &positions.hidden_pos,
        &layout.hidden_ids(),
        &positions.output_pos,
        &layout.output_ids(),
        Some((rows, cols)),
        rng,
    )?;

    let values = init_weights(rows.len(), params.neuron_std, rng)?;
    let mut graph = SynapseGraph::new(values, rows, cols, layout.neuron_size())?;

    let connected = graph.check_connected(&layout.input_ids(), &layout.output_ids(), depth)?;
    if !connected {
        tracing::warn!("not every input reaches every output at depth {depth}");
    }
    graph.delete_loops(&layout.output_ids(), &layout.input_ids(), depth)?;
    tracing::debug!(edges = graph.len(), "topology assembled");

    Ok(Network {
        positions,
        layout,
        graph,
        connected,
    })
}
