//! Integration tests for the tensor binary codec against real files

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use rust_convnet::error::CnnError;
use rust_convnet::tensor::{Shape, Tensor, TENSOR_FORMAT_VERSION};
use rust_convnet::utils::SimpleRng;

#[test]
fn test_file_round_trip() {
    let mut rng = SimpleRng::new(42);
    let mut tensor: Tensor<f64> = Tensor::new(Shape::new(5, 4, 3, 2)).unwrap();
    tensor.randomize(&mut rng, 10.0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tensor.bin");
    {
        let mut file = File::create(&path).unwrap();
        tensor.write(&mut file).unwrap();
    }
    let mut file = File::open(&path).unwrap();
    let restored: Tensor<f64> = Tensor::read(&mut file).unwrap();
    assert_eq!(restored, tensor);
}

#[test]
fn test_version_is_first_field() {
    let tensor: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    let mut buffer = Vec::new();
    tensor.write(&mut buffer).unwrap();
    let version = i32::from_le_bytes(buffer[0..4].try_into().unwrap());
    assert_eq!(version, TENSOR_FORMAT_VERSION);
    // 5 header i32s then 4 f64 elements.
    assert_eq!(buffer.len(), 5 * 4 + 4 * 8);
}

#[test]
fn test_unknown_version_rejected() {
    let tensor: Tensor<f64> = Tensor::new(Shape::d3(2, 2, 1)).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tensor.bin");
    {
        let mut file = File::create(&path).unwrap();
        tensor.write(&mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&7i32.to_le_bytes()).unwrap();
    }
    let mut file = File::open(&path).unwrap();
    let result: Result<Tensor<f64>, _> = Tensor::read(&mut file);
    assert!(matches!(
        result,
        Err(CnnError::Version {
            expected: TENSOR_FORMAT_VERSION,
            found: 7
        })
    ));
}

#[test]
fn test_truncated_file_is_io_error() {
    let mut rng = SimpleRng::new(42);
    let mut tensor: Tensor<f64> = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
    tensor.randomize(&mut rng, 1.0);

    let mut buffer = Vec::new();
    tensor.write(&mut buffer).unwrap();
    buffer.truncate(buffer.len() - 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.bin");
    std::fs::write(&path, &buffer).unwrap();
    let mut file = File::open(&path).unwrap();
    let result: Result<Tensor<f64>, _> = Tensor::read(&mut file);
    assert!(matches!(result, Err(CnnError::Io(_))));
}

#[test]
fn test_bool_tensor_round_trip() {
    let mut tensor: Tensor<bool> = Tensor::new(Shape::d3(3, 3, 1)).unwrap();
    tensor.set(0, 0, 0, 0, true);
    tensor.set(2, 2, 0, 0, true);

    let mut buffer = Vec::new();
    tensor.write(&mut buffer).unwrap();
    let restored: Tensor<bool> = Tensor::read(&mut std::io::Cursor::new(buffer)).unwrap();
    assert_eq!(restored, tensor);
}
