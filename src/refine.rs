//
// Expansion and contraction
//
// The fast transform only knows n slopes per quadrant, which shows up
// as streaky artefacts. Following Brady (section 3.4), run the
// transform on an image expanded e times along its rows, where slopes
// are e times finer, and then contract the result back down to the
// n x n layout, picking the fine slope nearest each coarse one.
//

use log::debug;

use crate::error::{check_size, ShapeError};
use crate::fast_radon::{back_scan, scan, Radon};
use crate::ramp_filter::filter_radon;
use crate::tomo_image::Image;

fn check_expansion(factor: usize) -> Result<(), ShapeError> {
    if !factor.is_power_of_two() {
        return Err(ShapeError::ExpansionNotPowerOfTwo { factor });
    }
    Ok(())
}

// For each of the n coarse slopes, the nearest of the m fine ones.
fn contracted_slopes(n: usize, m: usize) -> Vec<usize> {
    (0..n)
        .map(|j| ((m - 1) * 2 * j + n - 1) / (2 * (n - 1)))
        .collect()
}

/// Fast transform at e times the row resolution, contracted back to
/// the usual (2n, n, 4) layout.
pub fn scan_expanded(image: &Image, factor: usize) -> Result<Radon, ShapeError> {
    let n = image.square_size()?;
    check_expansion(factor)?;
    let m = n * factor;
    debug!("expanded scan: {}x{} image at {}x", n, n, factor);

    // Each source row is repeated e times, and columns are spread out
    // with e - 1 empty columns between them.
    let mut expanded = Image::new(m, m, image.channels);
    for (y, x) in itertools::iproduct!(0..m, 0..n) {
        for c in 0..image.channels {
            expanded[(x * factor, y, c)] = image[(x, y / factor, c)];
        }
    }
    let fine = scan(&expanded)?;

    let slopes = contracted_slopes(n, m);
    let mut radon = Radon::new(n, image.channels);
    for (q, i) in itertools::iproduct!(0..4, 0..2 * n) {
        for (j, &fine_j) in slopes.iter().enumerate() {
            for c in 0..image.channels {
                radon[(i, j, q, c)] = fine[(i * factor, fine_j, q, c)];
            }
        }
    }

    Ok(radon)
}

/// Back-projection matching `scan_expanded`.
pub fn back_scan_expanded(radon: &Radon, factor: usize) -> Result<Image, ShapeError> {
    let n = radon.size;
    check_size(n)?;
    check_expansion(factor)?;
    let m = n * factor;
    let channels = radon.channels;
    debug!("expanded back-projection: size {} at {}x", n, factor);

    let mut fine = Radon::new(m, channels);
    for (q, i) in itertools::iproduct!(0..4, 0..2 * m) {
        for j in 0..n {
            for c in 0..channels {
                fine[(i, j * factor, q, c)] = radon[(i / factor, j, q, c)];
            }
        }
    }
    let expanded = back_scan(&fine)?;

    let slopes = contracted_slopes(n, m);
    let mut image = Image::new(n, n, channels);
    for y in 0..n {
        for (x, &fine_x) in slopes.iter().enumerate() {
            for c in 0..channels {
                image[(x, y, c)] = expanded[(fine_x, y * factor, c)];
            }
        }
    }

    Ok(image)
}

pub fn reconstruct_expanded(radon: &Radon, factor: usize) -> Result<Image, ShapeError> {
    back_scan_expanded(&filter_radon(radon), factor)
}
