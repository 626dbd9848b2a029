//! Traversal and de-cycling over the COO synaptic adjacency.

use crate::sparse::{self, COO_FIND_LIMIT};
use crate::{NRError, NRResult};
use ndarray::{array, concatenate, s, Array1, Axis};
use std::collections::HashMap;

/// Sparse directed weight matrix in coordinate-list form. Edges go from
/// column (source) to row (destination); the triple is kept canonical:
/// unique `(row, col)` pairs, no self-loops, ascending composite key
/// `row * neuron_size + col`.
#[derive(Debug, Clone)]
pub struct SynapseGraph {
    w_values: Array1<f32>,
    w_row_idx: Array1<i64>,
    w_col_idx: Array1<i64>,
    neuron_size: usize,
}

impl SynapseGraph {
    pub fn new(
        w_values: Array1<f32>,
        w_row_idx: Array1<i64>,
        w_col_idx: Array1<i64>,
        neuron_size: usize,
    ) -> NRResult<Self> {
        if w_row_idx.len() != w_values.len() {
            return Err(NRError::LengthMismatch {
                expected: w_values.len(),
                found: w_row_idx.len(),
            });
        }
        if w_col_idx.len() != w_values.len() {
            return Err(NRError::LengthMismatch {
                expected: w_values.len(),
                found: w_col_idx.len(),
            });
        }
        let ns = neuron_size as i64;
        let mut prev_key: Option<i64> = None;
        for (&row, &col) in w_row_idx.iter().zip(w_col_idx.iter()) {
            if row < 0 || row >= ns || col < 0 || col >= ns {
                return Err(NRError::InvalidArgument(format!(
                    "edge ({row}, {col}) outside [0, {neuron_size})"
                )));
            }
            if row == col {
                return Err(NRError::PreconditionViolated(format!(
                    "self-loop on neuron {row}"
                )));
            }
            let key = row * ns + col;
            if let Some(prev) = prev_key {
                if key <= prev {
                    return Err(NRError::PreconditionViolated(
                        "COO must be unique and sorted by composite key".to_string(),
                    ));
                }
            }
            prev_key = Some(key);
        }
        Ok(Self {
            w_values,
            w_row_idx,
            w_col_idx,
            neuron_size,
        })
    }

    pub fn len(&self) -> usize {
        self.w_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn neuron_size(&self) -> usize {
        self.neuron_size
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.w_values
    }

    pub fn row_idx(&self) -> &Array1<i64> {
        &self.w_row_idx
    }

    pub fn col_idx(&self) -> &Array1<i64> {
        &self.w_col_idx
    }

    pub fn into_parts(self) -> (Array1<f32>, Array1<i64>, Array1<i64>) {
        (self.w_values, self.w_row_idx, self.w_col_idx)
    }

    /// One-step-per-depth forward frontier walk: each step replaces the
    /// frontier with the deduplicated destinations of every edge whose source
    /// lies in it. Returns the frontier after `depth` steps, or the last
    /// nonempty frontier if the walk dies out.
    pub fn traverse_forward(
        &self,
        neuron_idx_in: &Array1<i64>,
        depth: i64,
    ) -> NRResult<Array1<i64>> {
        let mut out_idx = neuron_idx_in.clone();
        if self.w_col_idx.is_empty() {
            return Ok(out_idx);
        }
        let batch = 1 + COO_FIND_LIMIT as usize / self.w_col_idx.len();
        for _ in 0..depth {
            let valsel = sparse::coo_find_batch(&out_idx, &self.w_col_idx, batch)?;
            if valsel.is_empty() {
                break;
            }
            let selected = self.w_row_idx.select(Axis(0), &valsel);
            out_idx = sparse::find_unique(&selected, self.neuron_size)?;
            if out_idx.is_empty() {
                break;
            }
        }
        Ok(out_idx)
    }

    /// Backward counterpart of [`traverse_forward`](Self::traverse_forward):
    /// steps from destinations to sources.
    pub fn traverse_backward(
        &self,
        neuron_idx_in: &Array1<i64>,
        depth: i64,
    ) -> NRResult<Array1<i64>> {
        let mut out_idx = neuron_idx_in.clone();
        if self.w_row_idx.is_empty() {
            return Ok(out_idx);
        }
        let batch = 1 + COO_FIND_LIMIT as usize / self.w_row_idx.len();
        for _ in 0..depth {
            let valsel = sparse::coo_find_batch(&out_idx, &self.w_row_idx, batch)?;
            if valsel.is_empty() {
                break;
            }
            let selected = self.w_col_idx.select(Axis(0), &valsel);
            out_idx = sparse::find_unique(&selected, self.neuron_size)?;
            if out_idx.is_empty() {
                break;
            }
        }
        Ok(out_idx)
    }

    /// True iff every input id reaches every output id within `depth` forward
    /// steps. Each input is walked separately.
    pub fn check_connected(
        &self,
        in_idx: &Array1<i64>,
        out_idx: &Array1<i64>,
        depth: i64,
    ) -> NRResult<bool> {
        let out_num = out_idx.len();
        if out_num == 0 {
            return Err(NRError::InvalidArgument(
                "output set must be nonempty".to_string(),
            ));
        }
        let batch = 1 + COO_FIND_LIMIT as usize / out_num;
        for &input in in_idx.iter() {
            let frontier = self.traverse_forward(&array![input], depth)?;
            let detect = sparse::coo_find_batch(out_idx, &frontier, batch)?;
            if detect.len() < out_num {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Removes edges that, within `depth` steps, let a `last_idx` node path
    /// back to a `first_idx` node.
    ///
    /// Walks backward from `last_idx` one step per depth level while
    /// maintaining a filter set of anchors and visited nodes. A predecessor
    /// already in the filter set closes a loop: the edge from it into the
    /// current node is recorded for deletion and the predecessor is dropped
    /// from the frontier. At the final depth step the `first_idx` anchors are
    /// released from the filter set; they hold the lowest ids, so they occupy
    /// the head of the ascending filter array.
    ///
    /// The surviving edges are rebuilt in ascending composite-key order, so
    /// the triple stays canonical.
    pub fn delete_loops(
        &mut self,
        last_idx: &Array1<i64>,
        first_idx: &Array1<i64>,
        depth: i64,
    ) -> NRResult<()> {
        let ns = self.neuron_size as i64;
        let mut cur_idx = last_idx.clone();
        let mut filter_idx = concatenate(Axis(0), &[first_idx.view(), last_idx.view()])
            .expect("1-D concatenation");

        let mut del_rows: Vec<i64> = Vec::new();
        let mut del_cols: Vec<i64> = Vec::new();

        for j in 0..depth {
            if j == depth - 1 {
                filter_idx = filter_idx.slice(s![first_idx.len()..]).to_owned();
            }

            let mut next_idx: Array1<i64> = Array1::zeros(0);
            for &u in cur_idx.iter() {
                let mut preds = self.traverse_backward(&array![u], 1)?;
                if preds.is_empty() {
                    continue;
                }
                let batch = 1 + COO_FIND_LIMIT as usize / preds.len();
                let detect = sparse::coo_find_batch(&filter_idx, &preds, batch)?;
                if !detect.is_empty() {
                    let mut keep = vec![true; preds.len()];
                    for &pos in &detect {
                        del_rows.push(u);
                        del_cols.push(preds[pos]);
                        keep[pos] = false;
                    }
                    let kept: Vec<i64> = preds
                        .iter()
                        .zip(keep.iter())
                        .filter_map(|(&p, &k)| k.then_some(p))
                        .collect();
                    if kept.is_empty() {
                        continue;
                    }
                    preds = Array1::from_vec(kept);
                }
                next_idx = concatenate(Axis(0), &[next_idx.view(), preds.view()])
                    .expect("1-D concatenation");
                next_idx = sparse::find_unique(&next_idx, self.neuron_size)?;
            }

            cur_idx = next_idx.clone();
            filter_idx = concatenate(Axis(0), &[next_idx.view(), filter_idx.view()])
                .expect("1-D concatenation");
            filter_idx = sparse::find_unique(&filter_idx, self.neuron_size)?;
        }

        let mut join: HashMap<i64, (f32, i64, i64)> = HashMap::with_capacity(self.len());
        for k in 0..self.len() {
            let key = self.w_row_idx[k] * ns + self.w_col_idx[k];
            join.insert(key, (self.w_values[k], self.w_row_idx[k], self.w_col_idx[k]));
        }
        for (row, col) in del_rows.iter().zip(del_cols.iter()) {
            join.remove(&(row * ns + col));
        }

        let mut keys: Vec<i64> = join.keys().copied().collect();
        keys.sort_unstable();

        let mut values = Vec::with_capacity(keys.len());
        let mut rows = Vec::with_capacity(keys.len());
        let mut cols = Vec::with_capacity(keys.len());
        for key in keys {
            let (v, r, c) = join[&key];
            values.push(v);
            rows.push(r);
            cols.push(c);
        }
        self.w_values = Array1::from_vec(values);
        self.w_row_idx = Array1::from_vec(rows);
        self.w_col_idx = Array1::from_vec(cols);
        Ok(())
    }
}
