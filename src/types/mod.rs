use crate::{NRError, NRResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stagnation window: successive unproductive ray-trace rounds tolerated
/// before synthesis terminates early.
pub const MAX_SAME_COUNTER: i64 = 5;

/// Model configuration record. Plain data, passed by reference into each
/// operation; there is no process-wide singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Requested total neuron count (input + hidden + output).
    pub neuron_size: usize,
    pub input_size: usize,
    pub output_size: usize,
    /// Containing-ball radius.
    pub sphere_rad: f32,
    /// Uniform blocking radius of any cell.
    pub neuron_rad: f32,
    /// Maximum Euclidean connection distance between ray endpoints.
    pub con_rad: f32,
    /// Neuron fraction of the interior cells; the remainder become glia.
    pub nratio: f32,
    /// Standard deviation for initial synaptic weights.
    pub neuron_std: f32,
    /// Hard cap on locality iterations of the ray-trace loop.
    pub ray_max_rounds: i64,
    /// Whether hidden neurons occlude rays in addition to glia.
    pub ray_neuron_intersect: bool,
    /// Whether glia occlude rays.
    pub ray_glia_intersect: bool,
    pub max_allowed_hits_neuron: i64,
    pub max_allowed_hits_glia: i64,
    pub max_same_counter: i64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            neuron_size: 1000,
            input_size: 100,
            output_size: 10,
            sphere_rad: 1.0,
            neuron_rad: 0.01,
            con_rad: 0.3,
            nratio: 0.5,
            neuron_std: 0.1,
            ray_max_rounds: 1000,
            ray_neuron_intersect: true,
            ray_glia_intersect: true,
            max_allowed_hits_neuron: 2,
            max_allowed_hits_glia: 0,
            max_same_counter: MAX_SAME_COUNTER,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> NRResult<()> {
        if self.sphere_rad <= 0.0 || self.neuron_rad <= 0.0 || self.con_rad <= 0.0 {
            return Err(NRError::InvalidArgument(format!(
                "radii must be positive: sphere_rad={}, neuron_rad={}, con_rad={}",
                self.sphere_rad, self.neuron_rad, self.con_rad
            )));
        }
        if self.input_size == 0 || self.output_size == 0 {
            return Err(NRError::InvalidArgument(
                "input_size and output_size must be nonzero".to_string(),
            ));
        }
        if self.input_size + self.output_size > self.neuron_size {
            return Err(NRError::InvalidArgument(format!(
                "cohorts exceed neuron_size: {} + {} > {}",
                self.input_size, self.output_size, self.neuron_size
            )));
        }
        if !(0.0..=1.0).contains(&self.nratio) {
            return Err(NRError::InvalidArgument(format!(
                "nratio must be in [0, 1], got {}",
                self.nratio
            )));
        }
        if self.max_allowed_hits_neuron < 0 || self.max_allowed_hits_glia < 0 {
            return Err(NRError::InvalidArgument(
                "occlusion thresholds must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> NRResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> NRResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Partition of the global neuron id space into contiguous cohorts.
///
/// Input ids come first, then hidden, then output; glia carry no ids. The
/// global id of a cell equals its local row plus the cohort's base offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortLayout {
    pub input: usize,
    pub hidden: usize,
    pub output: usize,
}

impl CohortLayout {
    pub fn neuron_size(&self) -> usize {
        self.input + self.hidden + self.output
    }

    pub fn input_ids(&self) -> Array1<i64> {
        Array1::from_iter(0..self.input as i64)
    }

    pub fn hidden_ids(&self) -> Array1<i64> {
        let base = self.input as i64;
        Array1::from_iter(base..base + self.hidden as i64)
    }

    pub fn output_ids(&self) -> Array1<i64> {
        let base = (self.input + self.hidden) as i64;
        Array1::from_iter(base..base + self.output as i64)
    }
}
