//! Scalar element trait for tensors
//!
//! Tensors hold one of a small set of scalar types: `f64` activations and
//! weights, `bool` hit-masks, and the optimizer's `Gradient` record. This
//! trait gives each of them a default value, a tolerance-aware equality
//! rule, and a little-endian codec so every tensor serializes through one
//! code path instead of relying on in-memory struct layout.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Tolerance used for approximate float equality across the crate.
pub const EPSILON: f64 = 1e-8;

/// A scalar that can live inside a [`Tensor`](crate::tensor::Tensor).
pub trait TensorElement: Copy + Default {
    /// Tolerance-aware equality. Exact for non-float scalars.
    fn approx_eq(&self, other: &Self) -> bool;

    /// Serialize this element in little-endian byte order.
    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()>;

    /// Deserialize one element written by [`TensorElement::write_to`].
    fn read_from<R: Read>(input: &mut R) -> std::io::Result<Self>;
}

impl TensorElement for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < EPSILON
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_f64::<LittleEndian>(*self)
    }

    fn read_from<R: Read>(input: &mut R) -> std::io::Result<Self> {
        input.read_f64::<LittleEndian>()
    }
}

impl TensorElement for bool {
    fn approx_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_u8(u8::from(*self))
    }

    fn read_from<R: Read>(input: &mut R) -> std::io::Result<Self> {
        Ok(input.read_u8()? != 0)
    }
}
