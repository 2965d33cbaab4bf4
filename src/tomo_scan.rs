///
// Conventional scans
//
// The straightforward way of scanning an image: pick evenly spaced
// angles over 180 degrees, fire evenly spaced parallel rays at each,
// and integrate along each ray by sampling the image. Slow, but it
// makes no assumptions about the image size, so it's the reference
// the fast transform gets compared against and converted from.
//

use log::debug;
use rand::Rng;
use std::ops::{Index, IndexMut};

use crate::error::ShapeError;
use crate::interp::{bilinear_weights, Grid};
use crate::ramp_filter::filter_sinogram;
use crate::tomo_image::Image;

////////////////////////////////////////////////////////////////////////
// Sinogram storage
//

// The outer layer is angles and the inner layer is parallel rays, so
// each projection is contiguous. Element (ray, angle, channel) is at
// (angle * rays + ray) * channels + channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Sinogram {
    pub rays: usize,
    pub angles: usize,
    pub channels: usize,
    pub data: Vec<f64>,
}

impl Index<(usize, usize, usize)> for Sinogram {
    type Output = f64;
    fn index(&self, (ray, angle, c): (usize, usize, usize)) -> &f64 {
        &self.data[(angle * self.rays + ray) * self.channels + c]
    }
}

impl IndexMut<(usize, usize, usize)> for Sinogram {
    fn index_mut(&mut self, (ray, angle, c): (usize, usize, usize)) -> &mut f64 {
        &mut self.data[(angle * self.rays + ray) * self.channels + c]
    }
}

impl Sinogram {
    pub fn new(rays: usize, angles: usize, channels: usize) -> Sinogram {
        Sinogram {
            rays,
            angles,
            channels,
            data: vec![0.0; rays * angles * channels],
        }
    }

    // Angles sampled over [0, pi).
    pub fn angle_grid(&self) -> Grid {
        Grid::half_open(0.0, std::f64::consts::PI, self.angles)
    }

    // Add uniform noise, scaled relative to the largest value. Only the
    // magnitude of 'fraction' matters.
    pub fn add_noise<R: Rng>(&self, rng: &mut R, fraction: f64) -> Sinogram {
        let max = self.data.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let amplitude = max * fraction.abs();
        let mut res = self.clone();
        for v in res.data.iter_mut() {
            *v += rng.gen_range(-amplitude..=amplitude);
        }
        res
    }

    // Rays run down the image and angles across it, matching the
    // stitched fast sinogram.
    pub fn to_image(&self) -> Image {
        let mut image = Image::new(self.angles, self.rays, self.channels);
        for (ray, angle, c) in itertools::iproduct!(0..self.rays, 0..self.angles, 0..self.channels) {
            image[(angle, ray, c)] = self[(ray, angle, c)];
        }
        image
    }
}

// Smallest power of two strictly greater than x.
fn power_of_two_above(x: usize) -> usize {
    1 << (usize::BITS - x.leading_zeros())
}

// Pixel-centre coordinates of the image, centred on the origin, and
// the radius of the circle through the corners.
fn image_geometry(height: usize, width: usize) -> (Grid, Grid, f64) {
    let half_h = (height as f64 - 1.0) / 2.0;
    let half_w = (width as f64 - 1.0) / 2.0;
    (
        Grid::linspace(-half_h, half_h, height),
        Grid::linspace(-half_w, half_w, width),
        half_h.hypot(half_w),
    )
}

////////////////////////////////////////////////////////////////////////
// Naive transforms
//

// Sample the image along every ray. 'rays' is the number of parallel
// rays per angle, which is also the number of integration points
// along each ray, and defaults to the first power of two above the
// image height. 'angles' defaults to twice that.
pub fn scan(image: &Image, rays: Option<usize>, angles: Option<usize>) -> Result<Sinogram, ShapeError> {
    let rays = rays.unwrap_or_else(|| power_of_two_above(image.height));
    let angles = angles.unwrap_or(rays * 2);
    if rays < 2 || angles < 1 {
        return Err(ShapeError::SinogramTooSmall { rays, angles });
    }
    debug!(
        "naive scan of {}x{} image with {} rays at {} angles",
        image.width, image.height, rays, angles
    );

    let (row_grid, col_grid, radius) = image_geometry(image.height, image.width);
    let offsets = Grid::linspace(-radius, radius, rays).values();

    let mut sinogram = Sinogram::new(rays, angles, image.channels);
    let angle_grid = sinogram.angle_grid();
    for angle_num in 0..angles {
        let angle = angle_grid.value(angle_num);
        let (cos, sin) = (angle.cos(), angle.sin());
        for (ray_num, r) in offsets.iter().enumerate() {
            for s in offsets.iter() {
                let row = r * cos - s * sin;
                let col = r * sin + s * cos;
                for (ri, ci, wt) in bilinear_weights(&row_grid, &col_grid, row, col) {
                    for c in 0..image.channels {
                        sinogram[(ray_num, angle_num, c)] += wt * image[(ci, ri, c)];
                    }
                }
            }
        }
    }

    Ok(sinogram)
}

// Smear each (filtered) projection back across a height x width image
// and average over the angles. Both default to half the ray count.
pub fn back_scan(sinogram: &Sinogram, height: Option<usize>, width: Option<usize>) -> Image {
    let height = height.unwrap_or(sinogram.rays / 2);
    let width = width.unwrap_or(height);
    debug!("naive back-projection to {}x{} image", width, height);

    let (row_grid, col_grid, radius) = image_geometry(height, width);
    let offsets = Grid::linspace(-radius, radius, sinogram.rays);
    let angle_grid = sinogram.angle_grid();

    let mut image = Image::new(width, height, sinogram.channels);
    for angle_num in 0..sinogram.angles {
        let angle = angle_grid.value(angle_num);
        let (cos, sin) = (angle.cos(), angle.sin());
        for (row, col) in itertools::iproduct!(0..height, 0..width) {
            let r = row_grid.value(row) * cos + col_grid.value(col) * sin;
            if let Some(weights) = offsets.linear_weights(r) {
                for (ray_num, wt) in weights.iter() {
                    for c in 0..sinogram.channels {
                        image[(col, row, c)] += wt * sinogram[(*ray_num, angle_num, c)];
                    }
                }
            }
        }
    }

    image.scale_values(1.0 / sinogram.angles as f64)
}

pub fn reconstruct(sinogram: &Sinogram, height: Option<usize>, width: Option<usize>) -> Image {
    back_scan(&filter_sinogram(sinogram), height, width)
}
