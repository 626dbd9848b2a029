use ndarray::{concatenate, array, Array2, Axis};
use neuroray::cells;
use neuroray::types::ModelParams;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// 27 grid cells spaced 1.0 apart plus one extra point wedged between the
/// corners of the unit cube. The extra point overlaps all 8 corners at
/// radius 0.9 (distance 0.866), so 9 cells collide and 19 survive.
fn grid_with_intruder() -> Array2<f32> {
    let mut data = Vec::new();
    for x in [-1.0f32, 0.0, 1.0] {
        for y in [-1.0f32, 0.0, 1.0] {
            for z in [-1.0f32, 0.0, 1.0] {
                data.extend_from_slice(&[x, y, z]);
            }
        }
    }
    let grid = Array2::from_shape_vec((27, 3), data).unwrap();
    let extra = array![[0.5f32, 0.5, 0.5]];
    concatenate(Axis(0), &[grid.view(), extra.view()]).unwrap()
}

#[test]
fn test_collision_minibatch_removes_overlapping_cells() {
    let positions = grid_with_intruder();
    let survivors = cells::check_all_collision_minibatch(&positions, 1.0, 0.9).unwrap();
    assert_eq!(survivors.nrows(), 19);
    // the intruder itself must be gone
    for p in survivors.rows() {
        assert!(!(p[0] == 0.5 && p[1] == 0.5 && p[2] == 0.5));
    }
}

#[test]
fn test_collision_minibatch_is_idempotent() {
    let positions = grid_with_intruder();
    let once = cells::check_all_collision_minibatch(&positions, 1.0, 0.9).unwrap();
    let twice = cells::check_all_collision_minibatch(&once, 1.0, 0.9).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_collision_minibatch_rejects_bad_radii() {
    let positions = grid_with_intruder();
    assert!(cells::check_all_collision_minibatch(&positions, -1.0, 0.9).is_err());
    assert!(cells::check_all_collision_minibatch(&positions, 1.0, 0.0).is_err());
}

#[test]
fn test_split_nine_cells() {
    let points = Array2::from_shape_vec((9, 3), (0..27).map(|v| v as f32).collect()).unwrap();
    let (neurons, glia) = cells::split_into_glia_neuron(0.5, &points);
    assert_eq!(neurons.nrows(), 4);
    assert_eq!(glia.nrows(), 5);
    // order preserved: the first neuron row is the first input row
    assert_eq!(neurons.row(0), points.row(0));
    assert_eq!(glia.row(0), points.row(4));
}

#[test]
fn test_place_cells_cohorts() {
    let params = ModelParams {
        neuron_size: 40,
        input_size: 8,
        output_size: 2,
        sphere_rad: 1.0,
        neuron_rad: 0.01,
        nratio: 0.5,
        ..ModelParams::default()
    };
    let mut rng = StdRng::seed_from_u64(11);
    let positions = cells::place_cells(&params, &mut rng).unwrap();
    let layout = positions.layout();

    assert_eq!(layout.input, 8);
    assert_eq!(layout.output, 2);
    // the interior request is hidden_target / nratio = 60; pruning only shrinks
    assert!(layout.hidden + positions.glia_pos.nrows() <= 60);

    // surface cohorts sit on the sphere, interior cohorts inside it
    for p in positions.input_pos.rows().into_iter().chain(positions.output_pos.rows()) {
        let norm = p.dot(&p).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
    for p in positions.hidden_pos.rows().into_iter().chain(positions.glia_pos.rows()) {
        assert!(p.dot(&p).sqrt() <= 1.0);
    }

    // id blocks are contiguous and input ids come first
    assert_eq!(layout.input_ids()[0], 0);
    assert_eq!(layout.hidden_ids()[0], 8);
    assert_eq!(
        layout.output_ids()[layout.output - 1],
        layout.neuron_size() as i64 - 1
    );
}
