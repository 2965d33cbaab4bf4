//
// Recursive line summation
//
// The heart of the fast transform. Given a block of columns, sum the
// values along every "digital line" that starts at row i in the first
// column and ends j rows away in the last column, for all i and for
// all j less than the number of columns. Lines are not rasterised
// directly: a line across w columns is defined as the concatenation of
// a line across the left w/2 columns with one across the right w/2
// columns, which lets the sums be built like an FFT butterfly in
// O(rows * w * log w).
//
// Buffers are column-major: column c occupies the contiguous run
// buf[c * stride..(c + 1) * stride], with stride = rows * channels,
// and within a column element (row, channel) is at row * channels +
// channel. Keeping columns contiguous means each half of a recursion
// is just a sub-slice, so the two halves never alias.
//

/// Which way the summed lines travel, as the column index increases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// From row i in the first column to row i - j in the last. Rows
    /// pushed off the top are dropped. Used by the forward transform.
    Falling,
    /// From row i in the first column to row i + j in the last. Rows
    /// running off the bottom are dropped. Used by back-projection.
    Rising,
}

/// Column-major working buffer of `rows * cols * channels` values.
#[derive(Clone, Debug, PartialEq)]
pub struct Columns {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
    pub data: Vec<f64>,
}

impl Columns {
    pub fn new(rows: usize, cols: usize, channels: usize) -> Columns {
        Columns {
            rows,
            cols,
            channels,
            data: vec![0.0; rows * cols * channels],
        }
    }

    pub fn stride(&self) -> usize {
        self.rows * self.channels
    }

    pub fn at(&self, row: usize, col: usize, channel: usize) -> f64 {
        self.data[(col * self.rows + row) * self.channels + channel]
    }

    pub fn at_mut(&mut self, row: usize, col: usize, channel: usize) -> &mut f64 {
        &mut self.data[(col * self.rows + row) * self.channels + channel]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut [f64] {
        let stride = self.stride();
        &mut self.data[col * stride..(col + 1) * stride]
    }

    /// Replace every column by its line sums in the given direction.
    /// The number of columns must be a power of two.
    pub fn sum_lines(&mut self, direction: Direction) {
        assert!(self.cols.is_power_of_two());
        let stride = self.stride();
        let mut scratch = vec![0.0; self.data.len()];
        sum_lines(&mut self.data, &mut scratch, stride, self.channels, direction);
    }

    /// Transpose (adjoint) of `sum_lines(Direction::Falling)`: scatter
    /// every line sum back onto the cells the line passes through.
    pub fn spread_lines(&mut self) {
        assert!(self.cols.is_power_of_two());
        let stride = self.stride();
        let mut scratch = vec![0.0; self.data.len()];
        spread_lines(&mut self.data, &mut scratch, stride, self.channels);
    }

    pub fn dot(&self, other: &Columns) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

// dst += src moved `shift` rows, with rows falling outside dropped.
fn add_shifted(dst: &mut [f64], src: &[f64], shift: usize, channels: usize, direction: Direction) {
    let offset = shift * channels;
    if offset >= dst.len() {
        return;
    }
    let len = dst.len() - offset;
    let (dst, src) = match direction {
        Direction::Falling => (&mut dst[offset..], &src[..len]),
        Direction::Rising => (&mut dst[..len], &src[offset..]),
    };
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d += s;
    }
}

// Output column j joins the left half's line j/2 to the right half's
// line j/2, the latter starting (j + 1)/2 rows further along.
fn sum_lines(buf: &mut [f64], scratch: &mut [f64], stride: usize, channels: usize, direction: Direction) {
    let w = buf.len() / stride;
    if w <= 1 {
        return;
    }

    let half = buf.len() / 2;
    {
        let (left, right) = buf.split_at_mut(half);
        let (left_scratch, right_scratch) = scratch.split_at_mut(half);
        sum_lines(left, left_scratch, stride, channels, direction);
        sum_lines(right, right_scratch, stride, channels, direction);
    }

    let (left, right) = buf.split_at(half);
    for j in 0..w {
        let src = (j >> 1) * stride;
        let out = &mut scratch[j * stride..(j + 1) * stride];
        out.copy_from_slice(&left[src..src + stride]);
        add_shifted(out, &right[src..src + stride], (j + 1) >> 1, channels, direction);
    }
    buf.copy_from_slice(scratch);
}

// Mirror image of sum_lines: undo the merge step first, then recurse.
fn spread_lines(buf: &mut [f64], scratch: &mut [f64], stride: usize, channels: usize) {
    let w = buf.len() / stride;
    if w <= 1 {
        return;
    }

    let half = buf.len() / 2;
    for v in scratch.iter_mut() {
        *v = 0.0;
    }
    {
        let (left, right) = scratch.split_at_mut(half);
        for j in 0..w {
            let dst = (j >> 1) * stride;
            let line = &buf[j * stride..(j + 1) * stride];
            for (d, s) in left[dst..dst + stride].iter_mut().zip(line.iter()) {
                *d += s;
            }
            add_shifted(
                &mut right[dst..dst + stride],
                line,
                (j + 1) >> 1,
                channels,
                Direction::Rising,
            );
        }
    }
    buf.copy_from_slice(scratch);

    let (left, right) = buf.split_at_mut(half);
    let (left_scratch, right_scratch) = scratch.split_at_mut(half);
    spread_lines(left, left_scratch, stride, channels);
    spread_lines(right, right_scratch, stride, channels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_pcg::Pcg64;

    fn from_rows(rows: &[&[f64]]) -> Columns {
        let mut cols = Columns::new(rows.len(), rows[0].len(), 1);
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                *cols.at_mut(r, c, 0) = *v;
            }
        }
        cols
    }

    fn random_columns(rng: &mut Pcg64, rows: usize, cols: usize, channels: usize) -> Columns {
        let mut res = Columns::new(rows, cols, channels);
        for v in res.data.iter_mut() {
            *v = rng.gen_range(-1.0..1.0);
        }
        res
    }

    #[test]
    fn test_single_column_unchanged() {
        let mut cols = from_rows(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
        let orig = cols.clone();
        cols.sum_lines(Direction::Falling);
        assert_eq!(cols, orig);
        cols.sum_lines(Direction::Rising);
        assert_eq!(cols, orig);
    }

    #[test]
    fn test_two_columns() {
        let a = [[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut cols = from_rows(&[&a[0], &a[1], &a[2], &a[3]]);
        cols.sum_lines(Direction::Falling);
        for i in 0..4 {
            // Flat line, then a line dropping one row.
            assert_eq!(cols.at(i, 0, 0), a[i][0] + a[i][1]);
            let prev = if i > 0 { a[i - 1][1] } else { 0.0 };
            assert_eq!(cols.at(i, 1, 0), a[i][0] + prev);
        }
    }

    #[test]
    fn test_four_columns_diagonal() {
        // A single lit cell on the anti-diagonal path from (3, 0) to (0, 3)
        // should only appear in the steepest line starting at row 3.
        let mut cols = Columns::new(8, 4, 1);
        for k in 0..4 {
            *cols.at_mut(3 - k, k, 0) = 1.0;
        }
        cols.sum_lines(Direction::Falling);
        assert_eq!(cols.at(3, 3, 0), 4.0);
        // The flat line through row 3 only hits the first cell.
        assert_eq!(cols.at(3, 0, 0), 1.0);
    }

    #[test]
    fn test_flat_lines_are_row_sums() {
        let mut rng = Pcg64::seed_from_u64(1);
        let orig = random_columns(&mut rng, 16, 8, 1);
        let mut cols = orig.clone();
        cols.sum_lines(Direction::Falling);
        for r in 0..16 {
            let expected: f64 = (0..8).map(|c| orig.at(r, c, 0)).sum();
            assert!((cols.at(r, 0, 0) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rising_mirrors_falling() {
        // Summing rising lines is the same as summing falling lines on
        // the row-reversed input.
        let mut rng = Pcg64::seed_from_u64(2);
        let orig = random_columns(&mut rng, 16, 8, 2);

        let mut rising = orig.clone();
        rising.sum_lines(Direction::Rising);

        let mut flipped = Columns::new(16, 8, 2);
        for (r, c, ch) in itertools::iproduct!(0..16, 0..8, 0..2) {
            *flipped.at_mut(15 - r, c, ch) = orig.at(r, c, ch);
        }
        flipped.sum_lines(Direction::Falling);

        for (r, c, ch) in itertools::iproduct!(0..16, 0..8, 0..2) {
            assert!((rising.at(r, c, ch) - flipped.at(15 - r, c, ch)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_channels_independent() {
        let mut rng = Pcg64::seed_from_u64(3);
        let orig = random_columns(&mut rng, 8, 4, 3);
        let mut joint = orig.clone();
        joint.sum_lines(Direction::Falling);

        for ch in 0..3 {
            let mut single = Columns::new(8, 4, 1);
            for (r, c) in itertools::iproduct!(0..8, 0..4) {
                *single.at_mut(r, c, 0) = orig.at(r, c, ch);
            }
            single.sum_lines(Direction::Falling);
            for (r, c) in itertools::iproduct!(0..8, 0..4) {
                assert_eq!(single.at(r, c, 0), joint.at(r, c, ch));
            }
        }
    }

    #[test]
    fn test_spread_is_adjoint() {
        let mut rng = Pcg64::seed_from_u64(4);
        for &(rows, cols) in &[(2, 1), (4, 2), (16, 8), (32, 16)] {
            let a = random_columns(&mut rng, rows, cols, 2);
            let g = random_columns(&mut rng, rows, cols, 2);

            let mut sa = a.clone();
            sa.sum_lines(Direction::Falling);
            let mut sg = g.clone();
            sg.spread_lines();

            let lhs = sa.dot(&g);
            let rhs = a.dot(&sg);
            assert!((lhs - rhs).abs() < 1e-9 * lhs.abs().max(1.0));
        }
    }
}
