//
// Converting between conventional and fast sinograms
//
// A conventional sinogram samples (r, theta) on a regular grid, while
// the fast transform's lines have quantised slopes j / (n - 1) and
// integer offsets. Each conversion works out, for every target cell,
// the continuous coordinates of the same line in the source layout
// and samples it bilinearly. Samples falling outside the source grid
// read as zero.
//
// The two layouts also disagree about path length: a fast line sum
// adds one pixel per column however steep the line, so it runs
// cos(theta) short of the true integral.
//

use log::debug;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::error::{check_size, ShapeError};
use crate::fast_radon::Radon;
use crate::interp::{bilinear_weights, Grid};
use crate::tomo_scan::Sinogram;

// Lines reach at most this far from the centre of an n x n image.
fn max_radius(n: usize) -> f64 {
    (n - 1) as f64 / 2f64.sqrt()
}

/// Resample a conventional sinogram onto the fast transform's grid,
/// ready for `fast_radon::back_scan` or `reconstruct`. The image size
/// `n` defaults to half the number of rays.
pub fn radon_from_sinogram(sinogram: &Sinogram, n: Option<usize>) -> Result<Radon, ShapeError> {
    let n = n.unwrap_or(sinogram.rays >> 1);
    check_size(n)?;
    debug!(
        "resampling {}x{} sinogram to fast layout of size {}",
        sinogram.rays, sinogram.angles, n
    );

    let ray_grid = Grid::linspace(-max_radius(n), max_radius(n), sinogram.rays);
    let angle_grid = sinogram.angle_grid();
    let channels = sinogram.channels;

    let mut radon = Radon::new(n, channels);
    for j in 0..n {
        let theta = (j as f64).atan2((n - 1) as f64);
        let cos = theta.cos();
        let thetas = [theta, FRAC_PI_2 - theta, FRAC_PI_2 + theta, PI - theta];
        // Offset of the line's centre from the image centre.
        let centre = (j + n - 1) as f64 / 2.0;

        for i in 0..2 * n {
            let r = (i as f64 - centre) * cos;
            for (q, angle) in thetas.iter().enumerate() {
                for (ri, ai, wt) in bilinear_weights(&ray_grid, &angle_grid, r, *angle) {
                    for c in 0..channels {
                        radon[(i, j, q, c)] += wt * cos * sinogram[(ri, ai, c)];
                    }
                }
            }
        }
    }

    // Flat lines of the last quadrant sit at theta = pi, just past the
    // end of the angle grid. They are the flat lines of the first
    // quadrant run backwards.
    for (i, c) in itertools::iproduct!(0..2 * n, 0..channels) {
        radon[(i, 0, 3, c)] = radon[(2 * n - 1 - i, 0, 0, c)];
    }

    Ok(radon)
}

/// Resample a fast sinogram onto a conventional (rays, angles) grid.
/// Defaults to 2n rays and 4n angles.
pub fn sinogram_from_radon(
    radon: &Radon,
    rays: Option<usize>,
    angles: Option<usize>,
) -> Result<Sinogram, ShapeError> {
    let n = radon.size;
    check_size(n)?;
    let rays = rays.unwrap_or(2 * n);
    let angles = angles.unwrap_or(4 * n);
    debug!(
        "resampling fast layout of size {} to {}x{} sinogram",
        n, rays, angles
    );

    let offset_grid = Grid::indices(2 * n);
    let slope_grid = Grid::indices(n);
    let radii = Grid::linspace(-max_radius(n), max_radius(n), rays).values();
    let channels = radon.channels;

    let mut sinogram = Sinogram::new(rays, angles, channels);
    let angle_grid = sinogram.angle_grid();
    let bounds = [0.0, FRAC_PI_4, FRAC_PI_2, 3.0 * FRAC_PI_4, PI];

    for angle_num in 0..angles {
        let theta = angle_grid.value(angle_num);
        let quadrant = match (0..4).find(|&k| theta >= bounds[k] && theta < bounds[k + 1]) {
            Some(k) => k,
            None => continue,
        };

        // Angle measured within the quadrant, from its flat lines.
        let base = FRAC_PI_2 * ((quadrant + 1) >> 1) as f64;
        let local = if quadrant & 1 == 0 {
            theta - base
        } else {
            base - theta
        };
        let scale = 1.0 / local.cos();
        let slope = (n - 1) as f64 * local.tan();

        for (ray_num, r) in radii.iter().enumerate() {
            let offset = r * scale + (slope + (n - 1) as f64) / 2.0;
            for (ii, jj, wt) in bilinear_weights(&offset_grid, &slope_grid, offset, slope) {
                for c in 0..channels {
                    sinogram[(ray_num, angle_num, c)] += wt * scale * radon[(ii, jj, quadrant, c)];
                }
            }
        }
    }

    Ok(sinogram)
}
