//! Randomized locality-driven connectivity synthesis.

use crate::types::ModelParams;
use crate::{geom, sparse, NRError, NRResult};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, Axis};
use rand::Rng;

/// Bound on `#rays * occluder-batch` for the intersection kernel.
pub const RAYTRACE_LIMIT: i64 = 10_000_000;
/// Bound on accumulated mask elements between adaptive pruning passes.
pub const PRUNE_COUNT_LIMIT: i64 = 10_000_000;

/// Candidate ray segments as four parallel arrays: tiled start and end
/// positions plus the sender and receiver global ids of each segment.
#[derive(Debug, Clone)]
pub struct RayBundle {
    pub start: Array2<f32>,       // [N,3]
    pub end: Array2<f32>,         // [N,3]
    pub index_start: Array1<i64>, // [N] sender ids
    pub index_end: Array1<i64>,   // [N] receiver ids
}

impl RayBundle {
    pub fn len(&self) -> usize {
        self.index_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every ray whose `keep` flag is false, filtering all four arrays
    /// in lockstep.
    fn retain(&mut self, keep: &[bool]) {
        let idxs: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        self.start = self.start.select(Axis(0), &idxs);
        self.end = self.end.select(Axis(0), &idxs);
        self.index_start = self.index_start.select(Axis(0), &idxs);
        self.index_end = self.index_end.select(Axis(0), &idxs);
    }
}

/// Keeps the points within `rad` of `target_pos` (strict, squared distances;
/// no sorting). Positions and ids are filtered in lockstep.
pub fn filter_rays(
    rad: f32,
    target_pos: ArrayView1<f32>,
    input_pos: &Array2<f32>,
    input_idx: &Array1<i64>,
) -> (Array2<f32>, Array1<i64>) {
    let rad_sq = rad * rad;
    let mut keep = Vec::new();
    for (i, p) in input_pos.rows().into_iter().enumerate() {
        let d = &p - &target_pos;
        if d.dot(&d) < rad_sq {
            keep.push(i);
        }
    }
    (
        input_pos.select(Axis(0), &keep),
        input_idx.select(Axis(0), &keep),
    )
}

/// Enumerates candidate sender→receiver segments: every pair `(a, b)` with
/// `‖a − b‖² < con_rad²` and distinct global ids. Skipping equal ids is what
/// keeps the adjacency free of self-loops and every segment nonzero-length.
pub fn rays_from_a_to_b(
    con_rad: f32,
    pos_a: &Array2<f32>,
    pos_b: &Array2<f32>,
    idx_a: &Array1<i64>,
    idx_b: &Array1<i64>,
) -> NRResult<RayBundle> {
    if pos_a.nrows() != idx_a.len() {
        return Err(NRError::LengthMismatch {
            expected: pos_a.nrows(),
            found: idx_a.len(),
        });
    }
    if pos_b.nrows() != idx_b.len() {
        return Err(NRError::LengthMismatch {
            expected: pos_b.nrows(),
            found: idx_b.len(),
        });
    }

    let rad_sq = con_rad * con_rad;
    let mut start = Vec::new();
    let mut end = Vec::new();
    let mut index_start = Vec::new();
    let mut index_end = Vec::new();
    for (j, b) in pos_b.rows().into_iter().enumerate() {
        for (i, a) in pos_a.rows().into_iter().enumerate() {
            if idx_a[i] == idx_b[j] {
                continue;
            }
            let d = &a - &b;
            if d.dot(&d) < rad_sq {
                start.extend_from_slice(&[a[0], a[1], a[2]]);
                end.extend_from_slice(&[b[0], b[1], b[2]]);
                index_start.push(idx_a[i]);
                index_end.push(idx_b[j]);
            }
        }
    }
    let count = index_start.len();
    Ok(RayBundle {
        start: Array2::from_shape_vec((count, 3), start).expect("row-major [N,3] construction"),
        end: Array2::from_shape_vec((count, 3), end).expect("row-major [N,3] construction"),
        index_start: Array1::from_vec(index_start),
        index_end: Array1::from_vec(index_end),
    })
}

/// Batched line-sphere intersection with adaptive pruning.
///
/// Occluders are processed in batches of `batch_size` along the blocking-cell
/// axis while a per-ray hit count accumulates. Every `prune_period` batches
/// (self-tuned from `PRUNE_COUNT_LIMIT` and the mask size) rays whose count
/// already exceeds `max_allowed_hits` are dropped from the active set, which
/// shrinks later batches and caps the intermediate mask memory. A final
/// filter keeps only rays with `hits <= max_allowed_hits`.
#[tracing::instrument(skip(block_cells, block_radius, rays), name = "kernel_line_sphere_batch")]
pub fn line_sphere_intersect_batch(
    batch_size: usize,
    max_allowed_hits: i64,
    block_cells: &Array2<f32>,
    block_radius: &Array1<f32>,
    rays: &mut RayBundle,
) -> NRResult<()> {
    if batch_size == 0 {
        return Err(NRError::InvalidArgument(
            "batch_size must be nonzero".to_string(),
        ));
    }
    let num_blocks = block_cells.nrows();
    let mut hits: Vec<i64> = vec![0; rays.len()];
    let mut prune_period: Option<usize> = None;
    let mut prune_count = 0usize;

    let mut i = 0;
    while i < num_blocks {
        if rays.is_empty() {
            break;
        }
        let end = (i + batch_size).min(num_blocks);
        let mask = geom::line_sphere_intersect(
            rays.start.view(),
            rays.end.view(),
            block_cells.slice(s![i..end, ..]),
            block_radius.slice(s![i..end]),
        )?; // [M',N]

        if prune_period.is_none() {
            let numel = mask.len();
            prune_period = Some(if numel > 0 {
                PRUNE_COUNT_LIMIT as usize / numel
            } else {
                PRUNE_COUNT_LIMIT as usize
            });
        }

        for row in mask.rows() {
            for (ray, &hit) in row.iter().enumerate() {
                if hit {
                    hits[ray] += 1;
                }
            }
        }

        prune_count += 1;
        if prune_count > prune_period.unwrap_or(usize::MAX) && end < num_blocks {
            let keep: Vec<bool> = hits.iter().map(|&h| h <= max_allowed_hits).collect();
            rays.retain(&keep);
            hits = hits
                .into_iter()
                .zip(keep.iter())
                .filter_map(|(h, &k)| k.then_some(h))
                .collect();
            prune_count = 0;
            prune_period = None;
        }
        i = end;
    }

    let keep: Vec<bool> = hits.iter().map(|&h| h <= max_allowed_hits).collect();
    rays.retain(&keep);
    Ok(())
}

/// Distance-limited ray-tracing synthesis driver.
///
/// Repeatedly picks a random sender as the locality center, enumerates
/// candidate pairs inside the connection radius, rejects occluded segments
/// and folds the survivors into the growing `(WRowIdx, WColIdx)` adjacency.
/// Terminates on `ray_max_rounds` or after `max_same_counter` successive
/// rounds that fail to grow the deduplicated edge set. A prior adjacency, if
/// supplied, is merged into the result.
#[tracing::instrument(skip_all, name = "kernel_raytrace_distance_limited")]
pub fn raytrace_distance_limited<R: Rng>(
    params: &ModelParams,
    glia_pos: &Array2<f32>,
    sender_pos: &Array2<f32>,
    sender_idx: &Array1<i64>,
    hidden_pos: &Array2<f32>,
    hidden_idx: &Array1<i64>,
    prior: Option<(Array1<i64>, Array1<i64>)>,
    rng: &mut R,
) -> NRResult<(Array1<i64>, Array1<i64>)> {
    if sender_pos.nrows() == 0 || hidden_pos.nrows() == 0 {
        return Err(NRError::InvalidArgument(
            "sender and receiver cohorts must be nonempty".to_string(),
        ));
    }
    if sender_pos.nrows() != sender_idx.len() {
        return Err(NRError::LengthMismatch {
            expected: sender_pos.nrows(),
            found: sender_idx.len(),
        });
    }
    if hidden_pos.nrows() != hidden_idx.len() {
        return Err(NRError::LengthMismatch {
            expected: hidden_pos.nrows(),
            found: hidden_idx.len(),
        });
    }

    let hidden_radius = Array1::from_elem(hidden_pos.nrows(), params.neuron_rad);
    let glia_radius = Array1::from_elem(glia_pos.nrows(), params.neuron_rad);

    let mut w_row: Array1<i64> = Array1::zeros(0);
    let mut w_col: Array1<i64> = Array1::zeros(0);
    let mut prev_count = 0usize;
    let mut stagnation = 0i64;

    for round in 0..params.ray_max_rounds {
        let center = sender_pos.row(rng.gen_range(0..sender_pos.nrows()));

        let (s_pos, s_idx) = filter_rays(2.0 * params.con_rad, center, sender_pos, sender_idx);
        if s_pos.nrows() == 0 {
            continue;
        }
        let (h_pos, h_idx) = filter_rays(params.con_rad, center, hidden_pos, hidden_idx);
        if h_pos.nrows() == 0 {
            continue;
        }

        let mut rays = rays_from_a_to_b(params.con_rad, &s_pos, &h_pos, &s_idx, &h_idx)?;
        if rays.is_empty() {
            continue;
        }

        if params.ray_neuron_intersect {
            let batch = 1 + RAYTRACE_LIMIT as usize / rays.len();
            line_sphere_intersect_batch(
                batch,
                params.max_allowed_hits_neuron,
                hidden_pos,
                &hidden_radius,
                &mut rays,
            )?;
        }
        if params.ray_glia_intersect && !rays.is_empty() {
            let batch = 1 + RAYTRACE_LIMIT as usize / rays.len();
            line_sphere_intersect_batch(
                batch,
                params.max_allowed_hits_glia,
                glia_pos,
                &glia_radius,
                &mut rays,
            )?;
        }

        // Receivers are the rows (destinations), senders the columns.
        w_row = concatenate(Axis(0), &[w_row.view(), rays.index_end.view()])
            .expect("1-D concatenation");
        w_col = concatenate(Axis(0), &[w_col.view(), rays.index_start.view()])
            .expect("1-D concatenation");
        let (row, col) = sparse::dedup_and_sort(&w_row, &w_col)?;
        w_row = row;
        w_col = col;

        if w_row.len() > prev_count {
            prev_count = w_row.len();
            stagnation = 0;
        } else {
            stagnation += 1;
            if stagnation > params.max_same_counter {
                tracing::debug!(round, edges = w_row.len(), "ray-trace stagnated");
                break;
            }
        }
        tracing::debug!(round, edges = w_row.len(), "ray-trace round complete");
    }

    if let Some((p_row, p_col)) = prior {
        w_row =
            concatenate(Axis(0), &[w_row.view(), p_row.view()]).expect("1-D concatenation");
        w_col =
            concatenate(Axis(0), &[w_col.view(), p_col.view()]).expect("1-D concatenation");
        let (row, col) = sparse::dedup_and_sort(&w_row, &w_col)?;
        w_row = row;
        w_col = col;
    }

    Ok((w_row, w_col))
}
