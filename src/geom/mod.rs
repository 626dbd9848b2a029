use crate::{NRError, NRResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::Rng;
use std::f32::consts::PI;

/// Points evenly distributed on the surface of a sphere of radius
/// `sphere_radius`, via the golden-spiral lattice. Deterministic given `nums`.
pub fn sphere_even(nums: usize, sphere_radius: f32) -> NRResult<Array2<f32>> {
    if sphere_radius <= 0.0 {
        return Err(NRError::InvalidArgument(format!(
            "sphere_radius must be positive, got {sphere_radius}"
        )));
    }
    let golden_angle = PI * (3.0 - 5.0f32.sqrt());
    let n = nums as f32;
    let mut data = Vec::with_capacity(nums * 3);
    for i in 0..nums {
        let fi = i as f32;
        let phi = (1.0 - 2.0 * fi / n).acos();
        let theta = golden_angle * fi;
        data.push(sphere_radius * phi.sin() * theta.cos());
        data.push(sphere_radius * phi.sin() * theta.sin());
        data.push(sphere_radius * phi.cos());
    }
    Ok(Array2::from_shape_vec((nums, 3), data).expect("row-major [N,3] construction"))
}

/// Points sampled in the open ball of radius `sphere_radius`: cube-root radial
/// draw, then spherical-to-Cartesian. Consumes the injected RNG stream.
pub fn ball_random<R: Rng>(nums: usize, sphere_radius: f32, rng: &mut R) -> NRResult<Array2<f32>> {
    if sphere_radius <= 0.0 {
        return Err(NRError::InvalidArgument(format!(
            "sphere_radius must be positive, got {sphere_radius}"
        )));
    }
    let u = Array1::random_using(nums, Uniform::new(0.0f32, 1.0), rng); // [N]
    let v = Array1::random_using(nums, Uniform::new(0.0f32, 1.0), rng); // [N]
    let w = Array1::random_using(nums, Uniform::new(0.0f32, 1.0), rng); // [N]
    let mut data = Vec::with_capacity(nums * 3);
    for i in 0..nums {
        let r = u[i].powf(1.0 / 3.0) * sphere_radius;
        let theta = 2.0 * PI * v[i];
        let phi = PI * w[i];
        data.push(r * phi.sin() * theta.cos());
        data.push(r * phi.sin() * theta.sin());
        data.push(r * phi.cos());
    }
    Ok(Array2::from_shape_vec((nums, 3), data).expect("row-major [N,3] construction"))
}

/// Indices of points inside the half-open axis-aligned cube
/// `pivot <= p < pivot + length` per component.
///
/// The lower face includes and the upper face excludes, so an overlapping
/// pivot grid covers the domain exactly once per axis.
pub fn find_in_cube(points: &Array2<f32>, pivot: ArrayView1<f32>, length: f32) -> Vec<usize> {
    points
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, p)| {
            (0..3).all(|k| {
                let d = p[k] - pivot[k];
                d >= 0.0 && d < length
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Indices of points that lie within `radius` of at least one other point.
pub fn select_overlap(points: &Array2<f32>, radius: f32) -> Vec<usize> {
    let n = points.nrows();
    let rad_sq = radius * radius;
    let mut out = Vec::new();
    for i in 0..n {
        let pi = points.row(i);
        let hit = (0..n).any(|j| {
            if j == i {
                return false;
            }
            let d = &pi - &points.row(j);
            d.dot(&d) < rad_sq
        });
        if hit {
            out.push(i);
        }
    }
    out
}

/// Grid of pivot positions covering `[-sphere_rad, sphere_rad]^3` with the
/// given spacing, flattened to `[S^3, 3]`.
pub fn generate_pivot_tensor(sphere_rad: f32, step: f32) -> NRResult<Array2<f32>> {
    if sphere_rad <= 0.0 || step <= 0.0 {
        return Err(NRError::InvalidArgument(format!(
            "sphere_rad and step must be positive, got {sphere_rad} and {step}"
        )));
    }
    // 1e-5 keeps the upper boundary inclusive under float rounding.
    let mut axis = Vec::new();
    let mut i = 0u32;
    loop {
        let v = -sphere_rad + (i as f32) * step;
        if v >= sphere_rad + 1e-5 {
            break;
        }
        axis.push(v);
        i += 1;
    }
    let s = axis.len();
    let mut data = Vec::with_capacity(s * s * s * 3);
    for &x in &axis {
        for &y in &axis {
            for &z in &axis {
                data.push(x);
                data.push(y);
                data.push(z);
            }
        }
    }
    Ok(Array2::from_shape_vec((s * s * s, 3), data).expect("row-major [S^3,3] construction"))
}

/// Line-segment / sphere intersection mask.
///
/// For segments `[line_start_i, line_end_i]` and blocking spheres centered at
/// `block_cells_j` with radii `block_radius_j`, projects each center onto the
/// segment, clamps the parameter to `[0, 1]` and tests the closest-point
/// distance. Returns `[M, N]` where `true` marks an intersection.
///
/// Coincident start/end pairs are a precondition violation (the projection
/// would divide by zero).
pub fn line_sphere_intersect(
    line_start: ArrayView2<f32>,
    line_end: ArrayView2<f32>,
    block_cells: ArrayView2<f32>,
    block_radius: ArrayView1<f32>,
) -> NRResult<Array2<bool>> {
    let n = line_start.nrows();
    let m = block_cells.nrows();
    if line_end.nrows() != n {
        return Err(NRError::LengthMismatch {
            expected: n,
            found: line_end.nrows(),
        });
    }
    if block_radius.len() != m {
        return Err(NRError::LengthMismatch {
            expected: m,
            found: block_radius.len(),
        });
    }

    let dir = &line_end - &line_start; // [N,3]
    let dir_sq: Array1<f32> = dir.rows().into_iter().map(|d| d.dot(&d)).collect(); // [N]
    if dir_sq.iter().any(|&d| d == 0.0) {
        return Err(NRError::PreconditionViolated(
            "line_sphere_intersect requires distinct segment endpoints".to_string(),
        ));
    }

    let mut mask = Array2::from_elem((m, n), false);
    let kernel = |mut out: ndarray::ArrayViewMut1<bool>, cell: ArrayView1<f32>, &rad: &f32| {
        let rad_sq = rad * rad;
        for i in 0..n {
            let sx = line_start[[i, 0]];
            let sy = line_start[[i, 1]];
            let sz = line_start[[i, 2]];
            let dx = dir[[i, 0]];
            let dy = dir[[i, 1]];
            let dz = dir[[i, 2]];
            let dot = (cell[0] - sx) * dx + (cell[1] - sy) * dy + (cell[2] - sz) * dz;
            let t = (dot / dir_sq[i]).clamp(0.0, 1.0);
            let cx = sx + t * dx - cell[0];
            let cy = sy + t * dy - cell[1];
            let cz = sz + t * dz - cell[2];
            out[i] = cx * cx + cy * cy + cz * cz <= rad_sq;
        }
    };
    let zip = Zip::from(mask.rows_mut())
        .and(block_cells.rows())
        .and(block_radius);
    #[cfg(feature = "rayon")]
    zip.par_for_each(kernel);
    #[cfg(not(feature = "rayon"))]
    zip.for_each(kernel);
    Ok(mask)
}
