//
// Ramp filter
//
// Filtered back-projection needs each projection convolved with a
// ramp (|frequency|) kernel before it is smeared back over the image.
// We do it in the frequency domain, one radial column at a time.
//

use rustfft::{num_complex::Complex64, FftPlanner};

use crate::fast_radon::Radon;
use crate::line_sum::Columns;
use crate::tomo_scan::Sinogram;

// Weight for FFT bin k of a length-len transform: pi * |f|, where f
// is the signed frequency in cycles per sample.
fn ramp_weight(k: usize, len: usize) -> f64 {
    let folded = k.min(len - k);
    std::f64::consts::PI * folded as f64 / len as f64
}

// Filter every column of a column-major (rows, cols, channels) buffer
// along its rows.
fn filter_columns(data: &mut [f64], rows: usize, channels: usize) {
    if rows == 0 || data.is_empty() {
        return;
    }
    const ZERO: Complex64 = Complex64::new(0.0, 0.0);

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(rows);
    let inverse = planner.plan_fft_inverse(rows);
    let mut scratch = vec![ZERO; forward.get_inplace_scratch_len().max(inverse.get_inplace_scratch_len())];

    let weights = (0..rows)
        .map(|k| ramp_weight(k, rows) / rows as f64)
        .collect::<Vec<_>>();
    let mut buffer = vec![ZERO; rows];

    for column in data.chunks_mut(rows * channels) {
        for c in 0..channels {
            for (r, z) in buffer.iter_mut().enumerate() {
                *z = Complex64::new(column[r * channels + c], 0.0);
            }
            forward.process_with_scratch(&mut buffer, &mut scratch);
            for (z, w) in buffer.iter_mut().zip(weights.iter()) {
                *z *= *w;
            }
            inverse.process_with_scratch(&mut buffer, &mut scratch);
            // The weights are even in frequency, so the imaginary part
            // is just round-off.
            for (r, z) in buffer.iter().enumerate() {
                column[r * channels + c] = z.re;
            }
        }
    }
}

pub fn filter_quadrant(quad: &Columns) -> Columns {
    let mut res = quad.clone();
    filter_columns(&mut res.data, res.rows, res.channels);
    res
}

/// Ramp-filter a fast sinogram along its offset axis.
pub fn filter_radon(radon: &Radon) -> Radon {
    let mut res = radon.clone();
    for quad in res.quadrants.iter_mut() {
        filter_columns(&mut quad.data, quad.rows, quad.channels);
    }
    res
}

/// Ramp-filter a conventional sinogram along its ray axis.
pub fn filter_sinogram(sinogram: &Sinogram) -> Sinogram {
    let mut res = sinogram.clone();
    filter_columns(&mut res.data, res.rays, res.channels);
    res
}
