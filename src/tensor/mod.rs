//! Flat-backed multi-dimensional tensor container
//!
//! This module provides the [`Shape`] descriptor and the [`Tensor`] type
//! that every layer in the engine computes over. A tensor owns one
//! contiguous buffer of `x * y * z * b` elements addressed with x-fastest
//! strided indexing, and supports elementwise arithmetic, sub-region
//! copy/paste, reductions, a depth-1 matrix product, and a versioned
//! binary codec.

mod element;

pub use element::{TensorElement, EPSILON};

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CnnError, CnnResult};
use crate::utils::SimpleRng;

/// Size of a tensor along its four axes: width `x`, height `y`, depth `z`,
/// and batch `b`.
///
/// The same type doubles as a coordinate when addressing elements or
/// sub-regions, mirroring how sizes and points are interchangeable in
/// index arithmetic.
///
/// # Example
///
/// ```
/// use rust_convnet::tensor::Shape;
///
/// let s = Shape::new(28, 28, 1, 4);
/// assert_eq!(s.element_count(), 28 * 28 * 4);
/// assert_eq!(s.to_string(), "(28, 28, 1, 4)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shape {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub b: usize,
}

impl Shape {
    /// Create a shape (or coordinate) from its four components.
    pub fn new(x: usize, y: usize, z: usize, b: usize) -> Self {
        Self { x, y, z, b }
    }

    /// Shorthand for a single-batch shape `(x, y, z, 1)`.
    pub fn d3(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z, b: 1 }
    }

    /// Total number of elements a tensor of this shape holds.
    pub fn element_count(&self) -> usize {
        self.x * self.y * self.z * self.b
    }

    /// Number of elements in one batch slice.
    pub fn batch_stride(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.b)
    }
}

/// On-disk format version written in front of every serialized tensor.
pub const TENSOR_FORMAT_VERSION: i32 = 1;

/// A fixed-shape tensor backed by one contiguous buffer.
///
/// The linear index of `(x, y, z, b)` is
/// `b*(x_len*y_len*z_len) + z*(x_len*y_len) + y*x_len + x`, so `x` is the
/// fastest-moving axis. Equality between tensors is per-element with the
/// crate-wide [`EPSILON`] tolerance for floats, not bitwise.
///
/// # Example
///
/// ```
/// use rust_convnet::tensor::{Shape, Tensor};
///
/// let mut t: Tensor<f64> = Tensor::new(Shape::d3(3, 3, 1)).unwrap();
/// t.set(1, 2, 0, 0, 5.0);
/// assert_eq!(t.get(1, 2, 0, 0), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct Tensor<T: TensorElement> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: TensorElement> Tensor<T> {
    /// Allocate a zero-filled tensor of the given shape.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if any dimension is zero.
    pub fn new(shape: Shape) -> CnnResult<Self> {
        if shape.x == 0 || shape.y == 0 || shape.z == 0 || shape.b == 0 {
            return Err(CnnError::Configuration(format!(
                "tensor dimensions must be positive, got {shape}"
            )));
        }
        Ok(Self {
            shape,
            data: vec![T::default(); shape.element_count()],
        })
    }

    /// The shape this tensor was allocated with.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.data.len()
    }

    /// Bytes occupied by the element buffer.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    #[inline]
    fn linear_index(&self, x: usize, y: usize, z: usize, b: usize) -> usize {
        debug_assert!(
            x < self.shape.x && y < self.shape.y && z < self.shape.z && b < self.shape.b,
            "tensor read at ({x}, {y}, {z}, {b}) out of bounds {}",
            self.shape
        );
        b * self.shape.batch_stride() + z * (self.shape.x * self.shape.y) + y * self.shape.x + x
    }

    /// Read the element at `(x, y, z, b)`.
    ///
    /// Bounds are checked with `debug_assert!`; optimized builds index the
    /// buffer directly.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize, b: usize) -> T {
        self.data[self.linear_index(x, y, z, b)]
    }

    /// Mutable reference to the element at `(x, y, z, b)`.
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize, b: usize) -> &mut T {
        let idx = self.linear_index(x, y, z, b);
        &mut self.data[idx]
    }

    /// Overwrite the element at `(x, y, z, b)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, b: usize, value: T) {
        let idx = self.linear_index(x, y, z, b);
        self.data[idx] = value;
    }

    /// The whole buffer in canonical linear order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable view of the whole buffer.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// One batch element's linear window of `x*y*z` values.
    pub fn batch_slice(&self, b: usize) -> &[T] {
        let stride = self.shape.batch_stride();
        &self.data[b * stride..(b + 1) * stride]
    }

    /// Mutable variant of [`Tensor::batch_slice`].
    pub fn batch_slice_mut(&mut self, b: usize) -> &mut [T] {
        let stride = self.shape.batch_stride();
        &mut self.data[b * stride..(b + 1) * stride]
    }

    fn region_fits(&self, origin: Shape, size: Shape) -> bool {
        origin.x + size.x <= self.shape.x
            && origin.y + size.y <= self.shape.y
            && origin.z + size.z <= self.shape.z
            && origin.b + size.b <= self.shape.b
    }

    /// Copy a sub-region of `size` starting at `origin` into a new tensor.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Bounds`] if the region does not fit.
    pub fn copy_region(&self, origin: Shape, size: Shape) -> CnnResult<Tensor<T>> {
        if !self.region_fits(origin, size) {
            return Err(CnnError::Bounds {
                origin,
                size,
                bounds: self.shape,
            });
        }
        let mut out = Tensor::new(size)?;
        for b in 0..size.b {
            for z in 0..size.z {
                for y in 0..size.y {
                    for x in 0..size.x {
                        let v = self.get(origin.x + x, origin.y + y, origin.z + z, origin.b + b);
                        out.set(x, y, z, b, v);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Paste `other` into this tensor with its origin at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Bounds`] if `other` does not fit at that offset.
    pub fn paste(&mut self, origin: Shape, other: &Tensor<T>) -> CnnResult<()> {
        let size = other.shape;
        if !self.region_fits(origin, size) {
            return Err(CnnError::Bounds {
                origin,
                size,
                bounds: self.shape,
            });
        }
        for b in 0..size.b {
            for z in 0..size.z {
                for y in 0..size.y {
                    for x in 0..size.x {
                        self.set(
                            origin.x + x,
                            origin.y + y,
                            origin.z + z,
                            origin.b + b,
                            other.get(x, y, z, b),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize this tensor: a version tag, the four shape fields as
    /// little-endian `i32`, then every element in canonical linear order.
    pub fn write<W: Write>(&self, out: &mut W) -> CnnResult<()> {
        out.write_i32::<LittleEndian>(TENSOR_FORMAT_VERSION)?;
        out.write_i32::<LittleEndian>(self.shape.x as i32)?;
        out.write_i32::<LittleEndian>(self.shape.y as i32)?;
        out.write_i32::<LittleEndian>(self.shape.z as i32)?;
        out.write_i32::<LittleEndian>(self.shape.b as i32)?;
        for value in &self.data {
            value.write_to(out)?;
        }
        Ok(())
    }

    /// Deserialize a tensor written by [`Tensor::write`].
    ///
    /// # Errors
    ///
    /// [`CnnError::Version`] if the stored version differs from
    /// [`TENSOR_FORMAT_VERSION`]; [`CnnError::Configuration`] if the
    /// stored shape is not positive; [`CnnError::Io`] on short reads.
    pub fn read<R: Read>(input: &mut R) -> CnnResult<Self> {
        let version = input.read_i32::<LittleEndian>()?;
        if version != TENSOR_FORMAT_VERSION {
            return Err(CnnError::Version {
                expected: TENSOR_FORMAT_VERSION,
                found: version,
            });
        }
        let x = input.read_i32::<LittleEndian>()?;
        let y = input.read_i32::<LittleEndian>()?;
        let z = input.read_i32::<LittleEndian>()?;
        let b = input.read_i32::<LittleEndian>()?;
        if x <= 0 || y <= 0 || z <= 0 || b <= 0 {
            return Err(CnnError::Configuration(format!(
                "serialized tensor has non-positive shape ({x}, {y}, {z}, {b})"
            )));
        }
        let mut tensor = Tensor::new(Shape::new(x as usize, y as usize, z as usize, b as usize))?;
        for value in tensor.data.iter_mut() {
            *value = T::read_from(input)?;
        }
        Ok(tensor)
    }
}

impl<T: TensorElement> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.approx_eq(b))
    }
}

impl Tensor<f64> {
    /// Elementwise sum.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if the shapes differ.
    pub fn add(&self, other: &Tensor<f64>) -> CnnResult<Tensor<f64>> {
        if self.shape != other.shape {
            return Err(CnnError::ShapeMismatch {
                op: "add",
                lhs: self.shape,
                rhs: other.shape,
            });
        }
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(out)
    }

    /// Elementwise difference.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if the shapes differ.
    pub fn sub(&self, other: &Tensor<f64>) -> CnnResult<Tensor<f64>> {
        if self.shape != other.shape {
            return Err(CnnError::ShapeMismatch {
                op: "sub",
                lhs: self.shape,
                rhs: other.shape,
            });
        }
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(other.data.iter()) {
            *a -= b;
        }
        Ok(out)
    }

    /// 2-D matrix product. Both operands must have depth 1 and batch 1,
    /// and `self.shape.y` must equal `rhs.shape.x`. The result has shape
    /// `(self.x, rhs.y, 1, 1)` with
    /// `out(x, y) = sum_i self(x, i) * rhs(i, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] on any violated requirement.
    pub fn matmul(&self, rhs: &Tensor<f64>) -> CnnResult<Tensor<f64>> {
        if self.shape.z != 1 || rhs.shape.z != 1 || self.shape.b != 1 || rhs.shape.b != 1 {
            return Err(CnnError::ShapeMismatch {
                op: "matmul (operands must be depth-1, batch-1)",
                lhs: self.shape,
                rhs: rhs.shape,
            });
        }
        if self.shape.y != rhs.shape.x {
            return Err(CnnError::ShapeMismatch {
                op: "matmul",
                lhs: self.shape,
                rhs: rhs.shape,
            });
        }
        let mut out = Tensor::new(Shape::d3(self.shape.x, rhs.shape.y, 1))?;
        for x in 0..out.shape.x {
            for y in 0..out.shape.y {
                let mut sum = 0.0;
                for i in 0..self.shape.y {
                    sum += self.get(x, i, 0, 0) * rhs.get(i, y, 0, 0);
                }
                out.set(x, y, 0, 0, sum);
            }
        }
        Ok(out)
    }

    /// Coordinate of the largest element. Strictly-greater comparison, so
    /// the first occurrence in linear order wins ties.
    pub fn argmax(&self) -> Shape {
        let mut best = f64::NEG_INFINITY;
        let mut loc = Shape::default();
        self.scan(|coord, v| {
            if v > best {
                best = v;
                loc = coord;
            }
        });
        loc
    }

    /// Coordinate of the smallest element. Strictly-less comparison, so
    /// the first occurrence in linear order wins ties.
    pub fn argmin(&self) -> Shape {
        let mut best = f64::INFINITY;
        let mut loc = Shape::default();
        self.scan(|coord, v| {
            if v < best {
                best = v;
                loc = coord;
            }
        });
        loc
    }

    /// Largest element value.
    pub fn max(&self) -> f64 {
        let l = self.argmax();
        self.get(l.x, l.y, l.z, l.b)
    }

    /// Smallest element value.
    pub fn min(&self) -> f64 {
        let l = self.argmin();
        self.get(l.x, l.y, l.z, l.b)
    }

    /// Fill with uniform samples in `[0, scale)` drawn from `rng`.
    pub fn randomize(&mut self, rng: &mut SimpleRng, scale: f64) {
        for value in self.data.iter_mut() {
            *value = rng.next_f64() * scale;
        }
    }

    fn scan<F: FnMut(Shape, f64)>(&self, mut visit: F) {
        // Canonical linear order: b, z, y outer; x fastest.
        for b in 0..self.shape.b {
            for z in 0..self.shape.z {
                for y in 0..self.shape.y {
                    for x in 0..self.shape.x {
                        visit(Shape::new(x, y, z, b), self.get(x, y, z, b));
                    }
                }
            }
        }
    }
}
