//
// Interpolation on regular grids
//
// Converting between sinogram layouts, and the naive transforms, all
// come down to sampling an array at fractional coordinates. Like the
// scan weights, interpolation is expressed as a small list of
// (index, weight) pairs, so one lookup serves every channel. Samples
// outside the grid get no weights at all, i.e. read as zero.
//

/// Evenly spaced sample positions, start and end inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub len: usize,
}

impl Grid {
    pub fn linspace(start: f64, end: f64, len: usize) -> Grid {
        let step = if len > 1 {
            (end - start) / (len - 1) as f64
        } else {
            0.0
        };
        Grid {
            start,
            end,
            step,
            len,
        }
    }

    // len samples covering [start, end), end itself excluded, as for
    // angles where end wraps round to start.
    pub fn half_open(start: f64, end: f64, len: usize) -> Grid {
        let step = (end - start) / len as f64;
        Grid {
            start,
            end: start + step * len.saturating_sub(1) as f64,
            step,
            len,
        }
    }

    // 0, 1, ..., len - 1.
    pub fn indices(len: usize) -> Grid {
        Grid {
            start: 0.0,
            end: len.saturating_sub(1) as f64,
            step: 1.0,
            len,
        }
    }

    pub fn value(&self, idx: usize) -> f64 {
        if idx + 1 == self.len {
            self.end
        } else {
            self.start + self.step * idx as f64
        }
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len).map(|idx| self.value(idx)).collect()
    }

    // Linear interpolation weights for position v, or None if v lies
    // outside [start, end].
    pub fn linear_weights(&self, v: f64) -> Option<[(usize, f64); 2]> {
        if self.len == 0 || !(v >= self.start && v <= self.end) {
            return None;
        }
        if self.len == 1 {
            return Some([(0, 1.0), (0, 0.0)]);
        }

        let t = (v - self.start) / self.step;
        let idx = (t.floor().max(0.0) as usize).min(self.len - 2);
        let fract = (t - idx as f64).max(0.0).min(1.0);
        Some([(idx, 1.0 - fract), (idx + 1, fract)])
    }
}

/// Bilinear weights for sampling a (rows, cols) array at fractional
/// position (r, c). Returns (row, col, weight) triples; empty if the
/// point is outside either grid.
pub fn bilinear_weights(rows: &Grid, cols: &Grid, r: f64, c: f64) -> Vec<(usize, usize, f64)> {
    match (rows.linear_weights(r), cols.linear_weights(c)) {
        (Some(rw), Some(cw)) => {
            let mut weights = Vec::with_capacity(4);
            for &(ri, rwt) in rw.iter() {
                for &(ci, cwt) in cw.iter() {
                    if rwt * cwt != 0.0 {
                        weights.push((ri, ci, rwt * cwt));
                    }
                }
            }
            weights
        }
        _ => Vec::new(),
    }
}
