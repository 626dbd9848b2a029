use crate::types::{CohortLayout, ModelParams};
use crate::{geom, NRError, NRResult};
use ndarray::{s, Array2, Axis};
use rand::Rng;
use std::f32::consts::PI;

/// Target cell density used to derive the pivot spacing of the collision pass.
pub const TARGET_DENSITY: f32 = 3500.0;
/// Safety factor applied to the blocking radius when sizing collision buckets.
pub const NEURON_RAD_FACTOR: f32 = 1.1;

/// Removes cells that overlap a neighbor, bucketing the pairwise checks over a
/// pivot grid so the distance matrix stays bucket-sized.
///
/// Buckets overlap (`cube_size > step`), so every close pair is examined by at
/// least one pivot; duplicate marks from shared boundaries are idempotent.
/// Returns the positions of the surviving cells, order preserved.
#[tracing::instrument(skip(cell_pos), name = "kernel_collision_minibatch")]
pub fn check_all_collision_minibatch(
    cell_pos: &Array2<f32>,
    sphere_rad: f32,
    neuron_rad: f32,
) -> NRResult<Array2<f32>> {
    if sphere_rad <= 0.0 || neuron_rad <= 0.0 {
        return Err(NRError::InvalidArgument(format!(
            "radii must be positive, got sphere_rad={sphere_rad}, neuron_rad={neuron_rad}"
        )));
    }
    if cell_pos.ncols() != 3 {
        return Err(NRError::InvalidArgument(format!(
            "cell positions must be [N,3], got [N,{}]",
            cell_pos.ncols()
        )));
    }
    let n = cell_pos.nrows();
    if n == 0 {
        return Ok(cell_pos.clone());
    }

    let step = (4.0 / 3.0) * PI * sphere_rad.powi(3) * TARGET_DENSITY / n as f32;
    let cube_size = 2.05 * NEURON_RAD_FACTOR * neuron_rad + step;
    let pivots = geom::generate_pivot_tensor(sphere_rad, step)?; // [S^3,3]

    let mut keep = vec![true; n];
    for pivot in pivots.rows() {
        let in_cube = geom::find_in_cube(cell_pos, pivot, cube_size);
        if in_cube.len() < 2 {
            continue;
        }
        let bucket = cell_pos.select(Axis(0), &in_cube); // [M,3]
        for local in geom::select_overlap(&bucket, neuron_rad) {
            keep[in_cube[local]] = false;
        }
    }

    let survivors: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect();
    Ok(cell_pos.select(Axis(0), &survivors))
}

/// Splits placed cells into neurons and glia: the first `floor(nratio * N)`
/// rows become neurons, the remainder glia, order preserved.
pub fn split_into_glia_neuron(nratio: f32, points: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let n = points.nrows();
    let n_neuron = (nratio * n as f32).floor() as usize;
    let neurons = points.slice(s![..n_neuron, ..]).to_owned();
    let glia = points.slice(s![n_neuron.., ..]).to_owned();
    (neurons, glia)
}

/// Per-cohort position arrays produced at model-build time. Never mutated
/// afterwards; row index is the cell's identity within its cohort.
#[derive(Debug, Clone)]
pub struct CellPositions {
    pub input_pos: Array2<f32>,
    pub hidden_pos: Array2<f32>,
    pub output_pos: Array2<f32>,
    pub glia_pos: Array2<f32>,
}

impl CellPositions {
    /// Effective id-space partition of the placed neurons.
    pub fn layout(&self) -> CohortLayout {
        CohortLayout {
            input: self.input_pos.nrows(),
            hidden: self.hidden_pos.nrows(),
            output: self.output_pos.nrows(),
        }
    }
}

/// Places all cohorts: input and output neurons on the sphere surface via one
/// shared golden-spiral lattice, hidden neurons and glia in the ball with the
/// collision pass applied before the role split.
///
/// Collision pruning can only shrink the interior cohort, so the effective
/// layout is derived from the surviving cells rather than taken from `params`.
pub fn place_cells<R: Rng>(
    params: &ModelParams,
    rng: &mut R,
) -> NRResult<CellPositions> {
    params.validate()?;

    let surface = geom::sphere_even(params.input_size + params.output_size, params.sphere_rad)?;
    let input_pos = surface.slice(s![..params.input_size, ..]).to_owned();
    let output_pos = surface.slice(s![params.input_size.., ..]).to_owned();

    let hidden_target = params.neuron_size - params.input_size - params.output_size;
    if hidden_target > 0 && params.nratio <= 0.0 {
        return Err(NRError::InvalidArgument(
            "nratio must be positive when hidden neurons are requested".to_string(),
        ));
    }
    let interior_request = if hidden_target == 0 {
        0
    } else {
        (hidden_target as f32 / params.nratio).round() as usize
    };

    let interior = geom::ball_random(interior_request, params.sphere_rad, rng)?;
    let interior = check_all_collision_minibatch(&interior, params.sphere_rad, params.neuron_rad)?;
    let (hidden_pos, glia_pos) = split_into_glia_neuron(params.nratio, &interior);

    Ok(CellPositions {
        input_pos,
        hidden_pos,
        output_pos,
        glia_pos,
    })
}
