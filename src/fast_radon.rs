//
// Fast discrete Radon transform
//
// Computes the sums along all dyadically-quantised lines through a
// square, power-of-two image in O(n^2 log n), following Brady's
// divide-and-conquer scheme. The 180 degrees of directions are split
// into four 45 degree quadrants. Each quadrant is handled by reorienting
// the image so that its lines become shallow, falling lines across the
// columns, and then running the shared line summer in line_sum.rs.
//
// Quadrant q of the result holds, at (i, j), the sum along the line
// that starts i rows down in the first column of the reoriented image
// and finishes j rows higher in the last. Rows are padded out to 2n so
// that lines entering from below the image are kept.
//

use log::{debug, warn};
use rand::Rng;
use std::ops::{Index, IndexMut};

use crate::error::{check_size, ShapeError};
use crate::line_sum::{Columns, Direction};
use crate::ramp_filter::filter_radon;
use crate::tomo_image::Image;

////////////////////////////////////////////////////////////////////////
// Orientations
//

/// How the image is reoriented before running the line summer for
/// each quadrant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// 0 to 45 degrees: lines cross the columns.
    Identity,
    /// 45 to 90 degrees: lines cross the rows.
    Transpose,
    /// 90 to 135 degrees: lines cross the rows, right to left.
    TransposeReversed,
    /// 135 to 180 degrees: lines cross the columns, bottom to top.
    RowsReversed,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Identity,
        Orientation::Transpose,
        Orientation::TransposeReversed,
        Orientation::RowsReversed,
    ];

    // Maps cell (row, col) of the reoriented n x n image to the
    // (row, col) of the original image it was taken from.
    pub fn source(self, row: usize, col: usize, n: usize) -> (usize, usize) {
        match self {
            Orientation::Identity => (row, col),
            Orientation::Transpose => (col, row),
            Orientation::TransposeReversed => (n - 1 - col, row),
            Orientation::RowsReversed => (n - 1 - row, col),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// Four-quadrant sinogram
//

/// Output of the fast transform. Logically a (2n, n, 4, channels)
/// array indexed by (offset i, slope j, quadrant, channel).
#[derive(Clone, Debug, PartialEq)]
pub struct Radon {
    pub size: usize,
    pub channels: usize,
    pub quadrants: [Columns; 4],
}

impl Index<(usize, usize, usize, usize)> for Radon {
    type Output = f64;
    fn index(&self, (i, j, q, c): (usize, usize, usize, usize)) -> &f64 {
        let quad = &self.quadrants[q];
        &quad.data[(j * quad.rows + i) * quad.channels + c]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for Radon {
    fn index_mut(&mut self, (i, j, q, c): (usize, usize, usize, usize)) -> &mut f64 {
        self.quadrants[q].at_mut(i, j, c)
    }
}

impl Radon {
    pub fn new(size: usize, channels: usize) -> Radon {
        let quad = Columns::new(2 * size, size, channels);
        Radon {
            size,
            channels,
            quadrants: [quad.clone(), quad.clone(), quad.clone(), quad],
        }
    }

    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (2 * self.size, self.size, 4, self.channels)
    }

    pub fn dot(&self, other: &Radon) -> f64 {
        self.quadrants
            .iter()
            .zip(other.quadrants.iter())
            .map(|(a, b)| a.dot(b))
            .sum()
    }

    // Add uniform noise, scaled relative to the largest value. Only the
    // magnitude of 'fraction' matters.
    pub fn add_noise<R: Rng>(&self, rng: &mut R, fraction: f64) -> Radon {
        let max = self
            .quadrants
            .iter()
            .flat_map(|q| q.data.iter())
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        let amplitude = max * fraction.abs();
        let mut res = self.clone();
        for quad in res.quadrants.iter_mut() {
            for v in quad.data.iter_mut() {
                *v += rng.gen_range(-amplitude..=amplitude);
            }
        }
        res
    }

    // self += scale * other
    fn add_scaled(&mut self, scale: f64, other: &Radon) {
        for (a, b) in self.quadrants.iter_mut().zip(other.quadrants.iter()) {
            for (x, y) in a.data.iter_mut().zip(b.data.iter()) {
                *x += scale * y;
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// Forward transform
//

/// Fast discrete Radon transform of a square, power-of-two image.
pub fn scan(image: &Image) -> Result<Radon, ShapeError> {
    let n = image.square_size()?;
    let channels = image.channels;
    debug!("fast scan of {}x{} image, {} channel(s)", n, n, channels);

    let mut radon = Radon::new(n, channels);
    for (quad, orientation) in radon.quadrants.iter_mut().zip(Orientation::ALL.iter()) {
        for (row, col) in itertools::iproduct!(0..n, 0..n) {
            let (src_row, src_col) = orientation.source(row, col, n);
            for c in 0..channels {
                *quad.at_mut(row, col, c) = image[(src_col, src_row, c)];
            }
        }
        quad.sum_lines(Direction::Falling);
    }

    Ok(radon)
}

// Add the top n rows of each quadrant back into image space, undoing
// each quadrant's reorientation.
fn gather(quadrants: &[Columns; 4], n: usize, channels: usize) -> Image {
    let mut image = Image::new(n, n, channels);
    for (quad, orientation) in quadrants.iter().zip(Orientation::ALL.iter()) {
        for (row, col) in itertools::iproduct!(0..n, 0..n) {
            let (dst_row, dst_col) = orientation.source(row, col, n);
            for c in 0..channels {
                image[(dst_col, dst_row, c)] += quad.at(row, col, c);
            }
        }
    }
    image
}

// Transpose of scan: each line sum is smeared back over exactly the
// pixels that contributed to it.
pub fn scan_adjoint(radon: &Radon) -> Image {
    let mut quadrants = radon.quadrants.clone();
    for quad in quadrants.iter_mut() {
        quad.spread_lines();
    }
    gather(&quadrants, radon.size, radon.channels)
}

////////////////////////////////////////////////////////////////////////
// Back-projection
//

/// One-pass back-projection of a (usually filtered) fast sinogram.
/// Each pixel collects the sums of the lines through it in all four
/// quadrants, normalised by 4(n - 1).
pub fn back_scan(radon: &Radon) -> Result<Image, ShapeError> {
    let n = radon.size;
    check_size(n)?;
    debug!("fast back-projection to {}x{} image", n, n);

    let mut quadrants = radon.quadrants.clone();
    for (q, quad) in quadrants.iter_mut().enumerate() {
        if q % 2 == 1 {
            // Flat and diagonal rays of the odd quadrants duplicate rays
            // of the even ones, so don't count them twice.
            for v in quad.column_mut(0).iter_mut() {
                *v = 0.0;
            }
            for v in quad.column_mut(n - 1).iter_mut() {
                *v = 0.0;
            }
        }
        quad.sum_lines(Direction::Rising);
    }

    Ok(gather(&quadrants, n, radon.channels).scale_values(0.25 / (n - 1) as f64))
}

/// Filtered back-projection: ramp filter then back_scan.
pub fn reconstruct(radon: &Radon) -> Result<Image, ShapeError> {
    check_size(radon.size)?;
    back_scan(&filter_radon(radon))
}

////////////////////////////////////////////////////////////////////////
// Exact inverse
//
// The fast transform is injective, so any sinogram it produced can be
// inverted exactly. We solve scan(x) = b in the least-squares sense with
// conjugate gradients on the normal equations (CGLS), using scan and
// its adjoint. Each iteration costs two fast transforms.
//

#[derive(Clone, Debug)]
pub struct InverseOptions {
    /// Stop once |A^T r| <= tolerance * |A^T b|.
    pub tolerance: f64,
    /// Iteration cap. Defaults to 8n + 64.
    pub max_iterations: Option<usize>,
}

impl Default for InverseOptions {
    fn default() -> Self {
        InverseOptions {
            tolerance: 1e-14,
            max_iterations: None,
        }
    }
}

fn image_dot(a: &Image, b: &Image) -> f64 {
    a.data.iter().zip(b.data.iter()).map(|(x, y)| x * y).sum()
}

// a += scale * b
fn image_add_scaled(a: &mut Image, scale: f64, b: &Image) {
    for (x, y) in a.data.iter_mut().zip(b.data.iter()) {
        *x += scale * y;
    }
}

/// Exact inverse of `scan`, with default options.
pub fn inverse(radon: &Radon) -> Result<Image, ShapeError> {
    inverse_with(radon, &InverseOptions::default())
}

pub fn inverse_with(radon: &Radon, options: &InverseOptions) -> Result<Image, ShapeError> {
    let n = radon.size;
    check_size(n)?;
    let max_iterations = options.max_iterations.unwrap_or(8 * n + 64);

    let mut x = Image::new(n, n, radon.channels);
    let mut residual = radon.clone();
    let mut grad = scan_adjoint(&residual);
    let mut direction = grad.clone();
    let mut gamma = image_dot(&grad, &grad);
    let initial_gamma = gamma;
    let threshold = gamma * options.tolerance * options.tolerance;

    if gamma == 0.0 {
        return Ok(x);
    }

    for iteration in 1..=max_iterations {
        let projected = scan(&direction)?;
        let projected_sq = projected.dot(&projected);
        if projected_sq == 0.0 {
            debug!("exact inverse: search direction vanished after {} iterations", iteration);
            return Ok(x);
        }

        let alpha = gamma / projected_sq;
        image_add_scaled(&mut x, alpha, &direction);
        residual.add_scaled(-alpha, &projected);
        grad = scan_adjoint(&residual);

        let new_gamma = image_dot(&grad, &grad);
        if new_gamma <= threshold {
            debug!("exact inverse: converged in {} iterations", iteration);
            return Ok(x);
        }

        let beta = new_gamma / gamma;
        for (d, g) in direction.data.iter_mut().zip(grad.data.iter()) {
            *d = g + beta * *d;
        }
        gamma = new_gamma;
    }

    warn!(
        "exact inverse: stopped after {} iterations, relative residual {:e}",
        max_iterations,
        (gamma / initial_gamma).sqrt()
    );
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_pcg::Pcg64;

    fn random_image(rng: &mut Pcg64, n: usize, channels: usize) -> Image {
        let mut image = Image::new(n, n, channels);
        for v in image.data.iter_mut() {
            *v = rng.gen_range(0.0..1.0);
        }
        image
    }

    fn checkerboard(n: usize, cell: usize) -> Image {
        Image::from_fn(n, n, |x, y| ((x / cell + y / cell) % 2) as f64)
    }

    #[test]
    fn test_orientation_sources_are_permutations() {
        let n = 4;
        for orientation in Orientation::ALL.iter() {
            let mut seen = vec![false; n * n];
            for (r, c) in itertools::iproduct!(0..n, 0..n) {
                let (sr, sc) = orientation.source(r, c, n);
                assert!(!seen[sr * n + sc]);
                seen[sr * n + sc] = true;
            }
        }
    }

    #[test]
    fn test_shape() {
        let image = Image::new(8, 8, 3);
        let radon = scan(&image).unwrap();
        assert_eq!(radon.shape(), (16, 8, 4, 3));
        for quad in radon.quadrants.iter() {
            assert_eq!(quad.data.len(), 16 * 8 * 3);
        }

        let back = back_scan(&radon).unwrap();
        assert_eq!((back.width, back.height, back.channels), (8, 8, 3));
        let inv = inverse(&radon).unwrap();
        assert_eq!((inv.width, inv.height, inv.channels), (8, 8, 3));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(
            scan(&Image::new(8, 4, 1)),
            Err(ShapeError::NotSquare { width: 8, height: 4 })
        );
        assert_eq!(
            scan(&Image::new(6, 6, 1)),
            Err(ShapeError::NotPowerOfTwo { size: 6 })
        );
        assert_eq!(scan(&Image::new(1, 1, 1)), Err(ShapeError::TooSmall { size: 1 }));
    }

    #[test]
    fn test_back_projection_rejects_bad_sizes() {
        // n = 1 would normalise by 4(n - 1) = 0.
        let mut tiny = Radon::new(1, 1);
        tiny[(0, 0, 0, 0)] = 1.0;
        assert_eq!(back_scan(&tiny), Err(ShapeError::TooSmall { size: 1 }));
        assert_eq!(reconstruct(&tiny), Err(ShapeError::TooSmall { size: 1 }));
        assert_eq!(inverse(&tiny), Err(ShapeError::TooSmall { size: 1 }));

        let empty = Radon::new(0, 1);
        assert_eq!(back_scan(&empty), Err(ShapeError::TooSmall { size: 0 }));
        assert_eq!(reconstruct(&empty), Err(ShapeError::TooSmall { size: 0 }));

        assert_eq!(
            back_scan(&Radon::new(6, 1)),
            Err(ShapeError::NotPowerOfTwo { size: 6 })
        );
    }

    #[test]
    fn test_negative_noise_fraction() {
        let radon = scan(&checkerboard(4, 1)).unwrap();
        let mut rng = Pcg64::seed_from_u64(16);
        let noisy = radon.add_noise(&mut rng, -0.1);
        let mut rng = Pcg64::seed_from_u64(16);
        assert_eq!(noisy, radon.add_noise(&mut rng, 0.1));
    }

    #[test]
    fn test_flat_lines_are_row_and_column_sums() {
        let mut rng = Pcg64::seed_from_u64(10);
        let n = 8;
        let image = random_image(&mut rng, n, 1);
        let radon = scan(&image).unwrap();

        for k in 0..n {
            let row_sum: f64 = (0..n).map(|x| image[(x, k, 0)]).sum();
            let col_sum: f64 = (0..n).map(|y| image[(k, y, 0)]).sum();
            assert!((radon[(k, 0, 0, 0)] - row_sum).abs() < 1e-12);
            assert!((radon[(k, 0, 1, 0)] - col_sum).abs() < 1e-12);
            assert!((radon[(n - 1 - k, 0, 3, 0)] - row_sum).abs() < 1e-12);
        }
        // Nothing below the image on flat lines.
        for k in n..2 * n {
            assert_eq!(radon[(k, 0, 0, 0)], 0.0);
        }
    }

    #[test]
    fn test_every_slope_sees_all_mass() {
        // Each slope's family of lines tiles the image exactly once.
        let mut rng = Pcg64::seed_from_u64(11);
        let n = 16;
        let image = random_image(&mut rng, n, 1);
        let total: f64 = image.data.iter().sum();
        let radon = scan(&image).unwrap();

        for (q, j) in itertools::iproduct!(0..4, 0..n) {
            let sum: f64 = (0..2 * n).map(|i| radon[(i, j, q, 0)]).sum();
            assert!((sum - total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mirror_symmetry() {
        // Flipping the image top-to-bottom swaps it with the reoriented
        // copies used by quadrants 2 and 3, so a symmetric image must
        // give identical quadrants.
        let n = 8;
        let image = Image::from_fn(n, n, |x, y| {
            let yy = y.min(n - 1 - y);
            ((x * 7 + yy * 3) % 5) as f64
        });
        let radon = scan(&image).unwrap();
        assert_eq!(radon.quadrants[3], radon.quadrants[0]);
        assert_eq!(radon.quadrants[2], radon.quadrants[1]);
        assert!(radon.quadrants[1] != radon.quadrants[0]);
    }

    #[test]
    fn test_scan_adjoint() {
        let mut rng = Pcg64::seed_from_u64(12);
        let n = 8;
        let image = random_image(&mut rng, n, 2);
        let mut radon = Radon::new(n, 2);
        for quad in radon.quadrants.iter_mut() {
            for v in quad.data.iter_mut() {
                *v = rng.gen_range(-1.0..1.0);
            }
        }

        let lhs = scan(&image).unwrap().dot(&radon);
        let rhs = image_dot(&image, &scan_adjoint(&radon));
        assert!((lhs - rhs).abs() < 1e-9 * lhs.abs().max(1.0));
    }

    #[test]
    fn test_exact_inverse_round_trip() {
        let mut rng = Pcg64::seed_from_u64(13);
        for &n in &[2, 4, 8, 16] {
            let image = random_image(&mut rng, n, 1);
            let restored = inverse(&scan(&image).unwrap()).unwrap();
            let err = image.max_abs_diff(&restored);
            assert!(err < 1e-9, "n = {}: error {}", n, err);
        }
    }

    #[test]
    fn test_exact_inverse_colour() {
        let mut rng = Pcg64::seed_from_u64(14);
        let image = random_image(&mut rng, 8, 3).scale_values(255.0);
        let restored = inverse(&scan(&image).unwrap()).unwrap();
        assert!(image.max_abs_diff(&restored) < 1e-7);
    }

    #[test]
    fn test_exact_inverse_of_zero() {
        let radon = Radon::new(4, 1);
        let restored = inverse(&radon).unwrap();
        assert!(restored.data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_noisy_inverse_stays_close() {
        let mut rng = Pcg64::seed_from_u64(15);
        let image = checkerboard(8, 2);
        let noisy = scan(&image).unwrap().add_noise(&mut rng, 0.01);
        let restored = inverse(&noisy).unwrap();
        assert!(image.correlation(&restored) > 0.95);
    }

    #[test]
    fn test_back_scan_two_by_two() {
        // With n = 2 the odd quadrants are zeroed entirely, and each
        // pixel comes out as 3a/4 + total/4.
        let image = Image::from_fn(2, 2, |x, y| (1 + x + 2 * y) as f64);
        let total: f64 = image.data.iter().sum();
        let back = back_scan(&scan(&image).unwrap()).unwrap();
        assert!((back[(0, 0, 0)] - 3.25).abs() < 1e-12);
        for (x, y) in itertools::iproduct!(0..2, 0..2) {
            let expected = 0.75 * image[(x, y, 0)] + total / 4.0;
            assert!((back[(x, y, 0)] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reconstruct_checkerboard() {
        let image = checkerboard(4, 1);
        let recon = reconstruct(&scan(&image).unwrap()).unwrap();
        assert!(image.correlation(&recon) > 0.8);

        let image = checkerboard(16, 4);
        let recon = reconstruct(&scan(&image).unwrap()).unwrap();
        assert!(image.correlation(&recon) > 0.9);
    }
}
