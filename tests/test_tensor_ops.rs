//! Integration tests for tensor arithmetic and region operations

use approx::assert_relative_eq;
use rust_convnet::error::CnnError;
use rust_convnet::tensor::{Shape, Tensor};
use rust_convnet::utils::SimpleRng;

#[test]
fn test_add_and_sub_are_elementwise() {
    let mut a: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    let mut b: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    for (i, (x, y)) in a.data_mut().iter_mut().zip(b.data_mut().iter_mut()).enumerate() {
        *x = i as f64;
        *y = 10.0 * i as f64;
    }
    let sum = a.add(&b).unwrap();
    let diff = sum.sub(&a).unwrap();
    for (i, &v) in sum.data().iter().enumerate() {
        assert_relative_eq!(v, 11.0 * i as f64);
    }
    assert_eq!(diff, b);
}

#[test]
fn test_add_rejects_shape_mismatch() {
    let a: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    let b: Tensor<f64> = Tensor::new(Shape::d3(2, 3, 1)).unwrap();
    assert!(matches!(a.add(&b), Err(CnnError::ShapeMismatch { .. })));
    assert!(matches!(a.sub(&b), Err(CnnError::ShapeMismatch { .. })));
}

#[test]
fn test_matmul_known_product() {
    // [1 2; 3 4] * [5 6; 7 8] = [19 22; 43 50] in row-major reading,
    // expressed through the (x, y) indexing convention.
    let mut lhs: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    lhs.set(0, 0, 0, 0, 1.0);
    lhs.set(0, 1, 0, 0, 2.0);
    lhs.set(1, 0, 0, 0, 3.0);
    lhs.set(1, 1, 0, 0, 4.0);
    let mut rhs: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    rhs.set(0, 0, 0, 0, 5.0);
    rhs.set(0, 1, 0, 0, 6.0);
    rhs.set(1, 0, 0, 0, 7.0);
    rhs.set(1, 1, 0, 0, 8.0);

    let out = lhs.matmul(&rhs).unwrap();
    assert_eq!(out.shape(), Shape::d3(2, 2, 1));
    assert_relative_eq!(out.get(0, 0, 0, 0), 1.0 * 5.0 + 2.0 * 7.0);
    assert_relative_eq!(out.get(0, 1, 0, 0), 1.0 * 6.0 + 2.0 * 8.0);
    assert_relative_eq!(out.get(1, 0, 0, 0), 3.0 * 5.0 + 4.0 * 7.0);
    assert_relative_eq!(out.get(1, 1, 0, 0), 3.0 * 6.0 + 4.0 * 8.0);
}

#[test]
fn test_matmul_rejects_incompatible_inner_dimension() {
    let lhs: Tensor<f64> = Tensor::new(Shape::d3(2, 3, 1)).unwrap();
    let rhs: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    assert!(lhs.matmul(&rhs).is_err());
}

#[test]
fn test_argmax_and_extrema() {
    let mut t: Tensor<f64> = Tensor::new(Shape::d3(3, 3, 1)).unwrap();
    t.set(2, 1, 0, 0, 7.5);
    t.set(0, 2, 0, 0, -3.0);
    let at_max = t.argmax();
    assert_eq!((at_max.x, at_max.y), (2, 1));
    let at_min = t.argmin();
    assert_eq!((at_min.x, at_min.y), (0, 2));
    assert_relative_eq!(t.max(), 7.5);
    assert_relative_eq!(t.min(), -3.0);
}

#[test]
fn test_copy_region_and_paste_round_trip() {
    let mut rng = SimpleRng::new(42);
    let mut original: Tensor<f64> = Tensor::new(Shape::new(6, 6, 2, 1)).unwrap();
    original.randomize(&mut rng, 1.0);

    let origin = Shape::new(1, 2, 0, 0);
    let size = Shape::d3(3, 3, 2);
    let region = original.copy_region(origin, size).unwrap();
    assert_eq!(region.shape(), size);
    assert_relative_eq!(region.get(0, 0, 0, 0), original.get(1, 2, 0, 0));

    let mut target: Tensor<f64> = Tensor::new(original.shape()).unwrap();
    target.paste(origin, &region).unwrap();
    assert_relative_eq!(target.get(1, 2, 1, 0), original.get(1, 2, 1, 0));
    assert_relative_eq!(target.get(0, 0, 0, 0), 0.0);
}

#[test]
fn test_copy_region_out_of_bounds_rejected() {
    let t: Tensor<f64> = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
    let result = t.copy_region(Shape::new(3, 3, 0, 0), Shape::d3(2, 2, 1));
    assert!(matches!(result, Err(CnnError::Bounds { .. })));
}

#[test]
fn test_batch_slices_are_independent() {
    let mut t: Tensor<f64> = Tensor::new(Shape::new(2, 2, 1, 3)).unwrap();
    t.batch_slice_mut(1).fill(5.0);
    assert!(t.batch_slice(0).iter().all(|&v| v == 0.0));
    assert!(t.batch_slice(1).iter().all(|&v| v == 5.0));
    assert!(t.batch_slice(2).iter().all(|&v| v == 0.0));
    assert_relative_eq!(t.get(0, 0, 0, 1), 5.0);
}
