//! Window range mapping for backward passes
//!
//! Convolution and pooling both slide a `k × k` window with stride `s`
//! over the input. Their backward passes need the inverse map: given an
//! input coordinate, which output positions could have read it? The
//! closed form is, per axis with output length `n`:
//!
//! `min = clamp(ceil((c - k + 1) / s), 0, n-1)`
//! `max = clamp(floor(c / s), 0, n-1)`
//!
//! Both layers share this single implementation; a divergence between two
//! copies of the formula would be a silent correctness bug in one of them.

use crate::tensor::Shape;

/// Inclusive output-coordinate ranges covering one input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRange {
    pub min_x: usize,
    pub min_y: usize,
    pub min_z: usize,
    pub max_x: usize,
    pub max_y: usize,
    pub max_z: usize,
}

#[inline]
fn axis_min(c: usize, kernel_size: usize, stride: usize, len: usize) -> usize {
    let low = c as i64 - kernel_size as i64 + 1;
    if low <= 0 {
        0
    } else {
        ((low as usize + stride - 1) / stride).min(len - 1)
    }
}

#[inline]
fn axis_max(c: usize, stride: usize, len: usize) -> usize {
    (c / stride).min(len - 1)
}

/// Map input position `(x, y)` to the inclusive range of output positions
/// whose window could have covered it.
///
/// `depth` is the number of output depth slices the caller iterates (the
/// kernel count for convolution, ignored by depth-wise pooling), and
/// `out_shape` provides the spatial output lengths for clamping.
pub fn map_to_output(
    x: usize,
    y: usize,
    kernel_size: usize,
    stride: usize,
    depth: usize,
    out_shape: Shape,
) -> OutputRange {
    OutputRange {
        min_x: axis_min(x, kernel_size, stride, out_shape.x),
        min_y: axis_min(y, kernel_size, stride, out_shape.y),
        min_z: 0,
        max_x: axis_max(x, stride, out_shape.x),
        max_y: axis_max(y, stride, out_shape.y),
        max_z: depth - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_origin() {
        // Input position 0 can only ever be read by output position 0.
        let r = map_to_output(0, 0, 4, 2, 3, Shape::d3(5, 5, 3));
        assert_eq!((r.min_x, r.max_x), (0, 0));
        assert_eq!((r.min_y, r.max_y), (0, 0));
        assert_eq!((r.min_z, r.max_z), (0, 2));
    }

    #[test]
    fn test_last_input_reaches_last_output() {
        // 17-wide input, stride 4 -> ceil(17/4) = 5 outputs.
        let out = Shape::d3(5, 5, 1);
        let r = map_to_output(16, 16, 5, 4, 1, out);
        assert_eq!(r.max_x, 4);
        assert_eq!(r.max_y, 4);
    }

    #[test]
    fn test_overlapping_windows() {
        // kernel 3, stride 1, 4 outputs: position 2 is visible from
        // outputs 0..=2.
        let r = map_to_output(2, 2, 3, 1, 1, Shape::d3(4, 4, 1));
        assert_eq!((r.min_x, r.max_x), (0, 2));
        assert_eq!((r.min_y, r.max_y), (0, 2));
    }

    #[test]
    fn test_non_overlapping_windows() {
        // kernel == stride: each input position belongs to exactly one
        // window.
        for c in 0..8 {
            let r = map_to_output(c, 0, 2, 2, 1, Shape::d3(4, 4, 1));
            assert_eq!(r.min_x, c / 2);
            assert_eq!(r.max_x, c / 2);
        }
    }

    #[test]
    fn test_clamped_to_output_extent() {
        // Far-right input positions clamp to the final output index.
        let r = map_to_output(9, 0, 2, 2, 1, Shape::d3(5, 5, 1));
        assert_eq!(r.max_x, 4);
        assert!(r.min_x <= r.max_x);
    }
}
