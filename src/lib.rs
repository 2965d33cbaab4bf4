//
// Fast discrete Radon transform, its exact inverse, and filtered
// back-projection.
//
// References:
//   M. L. Brady, "A Fast Discrete Approximation Algorithm for the
//     Radon Transform", SIAM Journal on Computing 27 (1998) 107
//   W. H. Press, "Discrete Radon Transform has an Exact, Fast Inverse
//     and Generalizes to Operations Other than Sums Along Lines",
//     PNAS 103 (2006) 19249
//

pub mod error;
pub mod tomo_image;
pub mod line_sum;
pub mod fast_radon;
pub mod ramp_filter;
pub mod stitch;
pub mod interp;
pub mod tomo_scan;
pub mod bridge;
pub mod refine;

pub use error::ShapeError;
pub use fast_radon::{back_scan, inverse, inverse_with, reconstruct, scan, InverseOptions, Orientation, Radon};
pub use tomo_image::Image;
pub use tomo_scan::Sinogram;
