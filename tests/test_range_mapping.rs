//! Integration tests for the shared window range mapping
//!
//! Checks the inverse map against a brute-force enumeration of which
//! windows actually cover each input position.

use rust_convnet::range::map_to_output;
use rust_convnet::tensor::Shape;

fn covering_outputs(c: usize, kernel_size: usize, stride: usize, out_len: usize) -> Vec<usize> {
    (0..out_len)
        .filter(|&o| {
            let start = o * stride;
            c >= start && c < start + kernel_size
        })
        .collect()
}

#[test]
fn test_matches_brute_force_enumeration() {
    for &(input_len, kernel_size, stride) in
        &[(8usize, 2usize, 2usize), (9, 3, 2), (17, 5, 4), (7, 3, 1), (10, 4, 3)]
    {
        let out_len = input_len.div_ceil(stride);
        let out_shape = Shape::d3(out_len, out_len, 1);
        for c in 0..input_len {
            let covering = covering_outputs(c, kernel_size, stride, out_len);
            let range = map_to_output(c, 0, kernel_size, stride, 1, out_shape);
            assert!(
                !covering.is_empty(),
                "k >= s must leave no uncovered position (len {input_len}, k {kernel_size}, s {stride}, c {c})"
            );
            assert_eq!(
                range.min_x,
                *covering.first().unwrap(),
                "min for len {input_len}, k {kernel_size}, s {stride}, c {c}"
            );
            assert_eq!(
                range.max_x,
                *covering.last().unwrap(),
                "max for len {input_len}, k {kernel_size}, s {stride}, c {c}"
            );
        }
    }
}

#[test]
fn test_first_input_position_maps_to_first_output() {
    let r = map_to_output(0, 0, 3, 2, 4, Shape::d3(6, 6, 4));
    assert_eq!(r.min_x, 0);
    assert_eq!(r.max_x, 0);
    assert_eq!(r.min_z, 0);
    assert_eq!(r.max_z, 3);
}

#[test]
fn test_last_input_position_maps_to_last_output() {
    // 11-wide input, stride 2 -> 6 outputs; the last input position is
    // covered only by the final window.
    let r = map_to_output(10, 10, 3, 2, 1, Shape::d3(6, 6, 1));
    assert_eq!(r.max_x, 5);
    assert_eq!(r.max_y, 5);
    assert!(r.min_x <= r.max_x);
}

#[test]
fn test_axes_are_independent() {
    let r = map_to_output(0, 5, 3, 1, 1, Shape::d3(6, 6, 1));
    assert_eq!((r.min_x, r.max_x), (0, 0));
    assert_eq!((r.min_y, r.max_y), (3, 5));
}
