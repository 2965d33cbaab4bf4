//
// Shape errors
//
// The fast transform only works on square, power-of-two images, so
// most operations validate their input up front and fail before doing
// any work.
//

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("image must be square, got {width}x{height}")]
    NotSquare { width: usize, height: usize },

    #[error("image size must be a power of two, got {size}")]
    NotPowerOfTwo { size: usize },

    #[error("image size must be at least 2, got {size}")]
    TooSmall { size: usize },

    #[error("expansion factor must be a power of two, got {factor}")]
    ExpansionNotPowerOfTwo { factor: usize },

    #[error("sinogram needs at least 2 rays and 1 angle, got {rays}x{angles}")]
    SinogramTooSmall { rays: usize, angles: usize },
}

// Check a side length is usable by the fast transform.
pub fn check_size(size: usize) -> Result<(), ShapeError> {
    if size < 2 {
        return Err(ShapeError::TooSmall { size });
    }
    if !size.is_power_of_two() {
        return Err(ShapeError::NotPowerOfTwo { size });
    }
    Ok(())
}
