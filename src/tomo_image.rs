///
// Image management
//
// Load and save into a vector of floats, plus basic image manipulation.
//
// Pixels are stored row-major, with the channels of a pixel adjacent,
// so element (x, y, c) lives at ((y * width) + x) * channels + c.
//

use anyhow::{bail, Context, Result};
use image::{GrayImage, Pixel, RgbImage};
use std::ops::{Index, IndexMut};
use std::path::Path;

use crate::error::{check_size, ShapeError};

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<f64>,
}

impl Index<(usize, usize, usize)> for Image {
    type Output = f64;
    fn index(&self, (x, y, c): (usize, usize, usize)) -> &f64 {
        &self.data[(y * self.width + x) * self.channels + c]
    }
}

impl IndexMut<(usize, usize, usize)> for Image {
    fn index_mut(&mut self, (x, y, c): (usize, usize, usize)) -> &mut f64 {
        &mut self.data[(y * self.width + x) * self.channels + c]
    }
}

impl Image {
    pub fn new(width: usize, height: usize, channels: usize) -> Image {
        Image {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    // Build a single-channel image by evaluating f(x, y) at every pixel.
    pub fn from_fn<F: Fn(usize, usize) -> f64>(width: usize, height: usize, f: F) -> Image {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Image {
            width,
            height,
            channels: 1,
            data,
        }
    }

    pub fn load(path: &Path) -> Result<Image> {
        let orig_img = image::open(path).with_context(|| format!("reading {}", path.display()))?;
        let grey_img = orig_img.into_luma8();

        Ok(Image {
            width: grey_img.width() as usize,
            height: grey_img.height() as usize,
            channels: 1,
            data: grey_img.pixels().map(|p| p.channels()[0] as f64).collect(),
        })
    }

    // Like load, but keeps the red, green and blue channels separate.
    pub fn load_rgb(path: &Path) -> Result<Image> {
        let orig_img = image::open(path).with_context(|| format!("reading {}", path.display()))?;
        let rgb_img = orig_img.into_rgb8();

        Ok(Image {
            width: rgb_img.width() as usize,
            height: rgb_img.height() as usize,
            channels: 3,
            data: rgb_img
                .pixels()
                .flat_map(|p| p.channels().iter().map(|c| *c as f64).collect::<Vec<_>>())
                .collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data_as_u8: Vec<u8> = self
            .data
            .iter()
            .map(|x| x.max(0.0).min(255.0) as u8)
            .collect();
        let (w, h) = (self.width as u32, self.height as u32);
        let saved = match self.channels {
            1 => GrayImage::from_vec(w, h, data_as_u8)
                .context("building grey image")?
                .save(path),
            3 => RgbImage::from_vec(w, h, data_as_u8)
                .context("building colour image")?
                .save(path),
            n => bail!("cannot save an image with {} channels", n),
        };
        saved.with_context(|| format!("writing {}", path.display()))
    }

    // The fast transform needs a square image with a power-of-two
    // side. Returns that side.
    pub fn square_size(&self) -> Result<usize, ShapeError> {
        if self.width != self.height {
            return Err(ShapeError::NotSquare {
                width: self.width,
                height: self.height,
            });
        }
        check_size(self.width)?;
        Ok(self.width)
    }

    pub fn scale_values(&self, scale: f64) -> Image {
        self.map(|y| y * scale)
    }

    pub fn offset_values(&self, offset: f64) -> Image {
        self.map(|y| y + offset)
    }

    // Stretch the values linearly so they span 0..255, for saving
    // things like sinograms that aren't in pixel units.
    pub fn stretch_to_u8_range(&self) -> Image {
        let lo = self.data.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !(hi > lo) {
            return self.map(|_| 0.0);
        }
        self.map(|y| (y - lo) * 255.0 / (hi - lo))
    }

    fn map<F: Fn(f64) -> f64>(&self, f: F) -> Image {
        Image {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: self.data.iter().map(|y| f(*y)).collect(),
        }
    }

    pub fn diff(&self, other: &Image) -> Image {
        assert_eq!(self.data.len(), other.data.len());
        Image {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a - b)
                .collect(),
        }
    }

    pub fn rms_diff(&self, other: &Image) -> f64 {
        let diff = self.diff(other);
        let sum_sq: f64 = diff.data.iter().map(|d| d * d).sum();
        (sum_sq / diff.data.len() as f64).sqrt()
    }

    pub fn max_abs_diff(&self, other: &Image) -> f64 {
        self.diff(other)
            .data
            .iter()
            .fold(0.0, |acc, d| acc.max(d.abs()))
    }

    // Pearson correlation over all pixels and channels. Filtered
    // back-projection loses the DC level, so this is a fairer measure
    // of reconstruction quality than a straight difference.
    pub fn correlation(&self, other: &Image) -> f64 {
        assert_eq!(self.data.len(), other.data.len());
        let len = self.data.len() as f64;
        let mean_a = self.data.iter().sum::<f64>() / len;
        let mean_b = other.data.iter().sum::<f64>() / len;

        let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            let (da, db) = (a - mean_a, b - mean_b);
            cov += da * db;
            var_a += da * da;
            var_b += db * db;
        }
        cov / (var_a * var_b).sqrt()
    }
}
