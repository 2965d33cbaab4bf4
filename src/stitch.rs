//
// Stitching the four quadrants together
//
// For display, lay the quadrants side by side so the angle runs from 0
// to 180 degrees left to right. Quadrants 1 and 3 run backwards in
// angle, so their columns are mirrored, and each column is shifted
// down so that the line through the image centre sits on the same row
// everywhere:
//
//   /|\   /|\
//  / | \ / | \
// |  |  |  |  |
// |  |  |  |  |
// | / \ | / \ |
// |/   \|/   \|
// 0 45 90 135 180
//

use crate::fast_radon::Radon;
use crate::tomo_image::Image;

/// Stitch a fast sinogram of size n into a single 4n wide, 2n high
/// image. Cells not covered by any quadrant are left at zero.
pub fn stitch(radon: &Radon) -> Image {
    let n = radon.size;
    let (n2, n4) = (2 * n, 4 * n);
    let mut image = Image::new(n4, n2, radon.channels);

    for j in 0..n {
        let shift = (n - j) >> 1;
        let targets = [j, n2 - 1 - j, n2 + j, n4 - 1 - j];
        for (q, &x) in targets.iter().enumerate() {
            for i in 0..n2 - shift {
                for c in 0..radon.channels {
                    image[(x, i + shift, c)] = radon[(i, j, q, c)];
                }
            }
        }
    }

    image
}
