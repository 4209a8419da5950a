//! Training dataset container and its binary serialization
//!
//! A [`Dataset`] is an ordered collection of (data, label) tensor pairs
//! with uniform shapes, plus the plumbing a training loop needs: seeded
//! shuffling, batching, and a versioned little-endian file format.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CnnError, CnnResult};
use crate::tensor::{Shape, Tensor};
use crate::utils::SimpleRng;

/// Version tag written at the head of every serialized dataset.
pub const DATASET_FORMAT_VERSION: i32 = 1;

/// One (data, label) pair.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub data: Tensor<f64>,
    pub label: Tensor<f64>,
}

/// An ordered collection of training examples with uniform shapes.
///
/// The first example added fixes the data and label shapes; every later
/// addition must match.
///
/// # Example
///
/// ```
/// use rust_convnet::dataset::{Dataset, TrainingExample};
/// use rust_convnet::tensor::{Shape, Tensor};
///
/// let mut dataset = Dataset::new();
/// dataset.add(TrainingExample {
///     data: Tensor::new(Shape::d3(4, 4, 1)).unwrap(),
///     label: Tensor::new(Shape::d3(2, 1, 1)).unwrap(),
/// }).unwrap();
/// assert_eq!(dataset.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    examples: Vec<TrainingExample>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the dataset holds no examples.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Iterate over the examples in order.
    pub fn iter(&self) -> std::slice::Iter<'_, TrainingExample> {
        self.examples.iter()
    }

    /// Shape of the data tensors, if any example exists.
    pub fn data_shape(&self) -> Option<Shape> {
        self.examples.first().map(|e| e.data.shape())
    }

    /// Shape of the label tensors, if any example exists.
    pub fn label_shape(&self) -> Option<Shape> {
        self.examples.first().map(|e| e.label.shape())
    }

    /// Append an example.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if the example's data or
    /// label shape differs from the shapes fixed by the first example.
    pub fn add(&mut self, example: TrainingExample) -> CnnResult<()> {
        if let Some(first) = self.examples.first() {
            if example.data.shape() != first.data.shape() {
                return Err(CnnError::ShapeMismatch {
                    op: "dataset add",
                    lhs: first.data.shape(),
                    rhs: example.data.shape(),
                });
            }
            if example.label.shape() != first.label.shape() {
                return Err(CnnError::ShapeMismatch {
                    op: "dataset add",
                    lhs: first.label.shape(),
                    rhs: example.label.shape(),
                });
            }
        }
        self.examples.push(example);
        Ok(())
    }

    /// Reorder the examples with a Fisher-Yates pass driven by `rng`.
    pub fn shuffle(&mut self, rng: &mut SimpleRng) {
        let mut order: Vec<usize> = (0..self.examples.len()).collect();
        rng.shuffle_usize(&mut order);
        let mut shuffled = Vec::with_capacity(self.examples.len());
        for idx in order {
            shuffled.push(self.examples[idx].clone());
        }
        self.examples = shuffled;
    }

    /// Total bytes held by all example tensors.
    pub fn memory_size(&self) -> usize {
        self.examples
            .iter()
            .map(|e| e.data.memory_size() + e.label.memory_size())
            .sum()
    }

    /// Group consecutive examples into batched tensor pairs of
    /// `batch_size` elements each. A trailing partial group is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if `batch_size` is zero or
    /// the stored examples are themselves batched (batch dimension
    /// other than 1).
    pub fn batched(&self, batch_size: usize) -> CnnResult<Vec<(Tensor<f64>, Tensor<f64>)>> {
        if batch_size == 0 {
            return Err(CnnError::Configuration(
                "batch size must be positive".to_string(),
            ));
        }
        let (data_shape, label_shape) = match (self.data_shape(), self.label_shape()) {
            (Some(d), Some(l)) => (d, l),
            _ => return Ok(Vec::new()),
        };
        if data_shape.b != 1 || label_shape.b != 1 {
            return Err(CnnError::Configuration(format!(
                "batching needs single-example tensors, got data {data_shape} and label {label_shape}"
            )));
        }

        let mut batches = Vec::with_capacity(self.examples.len() / batch_size);
        for group in self.examples.chunks_exact(batch_size) {
            let mut data = Tensor::new(Shape::new(
                data_shape.x,
                data_shape.y,
                data_shape.z,
                batch_size,
            ))?;
            let mut label = Tensor::new(Shape::new(
                label_shape.x,
                label_shape.y,
                label_shape.z,
                batch_size,
            ))?;
            for (b, example) in group.iter().enumerate() {
                data.batch_slice_mut(b).copy_from_slice(example.data.data());
                label
                    .batch_slice_mut(b)
                    .copy_from_slice(example.label.data());
            }
            batches.push((data, label));
        }
        Ok(batches)
    }

    /// Serialize the dataset: a version tag, the example count, then
    /// each example's data and label tensors in order.
    pub fn write<W: Write>(&self, out: &mut W) -> CnnResult<()> {
        out.write_i32::<LittleEndian>(DATASET_FORMAT_VERSION)?;
        out.write_u64::<LittleEndian>(self.examples.len() as u64)?;
        for example in &self.examples {
            example.data.write(out)?;
            example.label.write(out)?;
        }
        Ok(())
    }

    /// Deserialize a dataset written by [`Dataset::write`], reading at
    /// most `max_count` examples when a cap is given.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Version`] for an unknown format version and
    /// [`CnnError::Io`] for truncated input.
    pub fn read<R: Read>(input: &mut R, max_count: Option<usize>) -> CnnResult<Self> {
        let version = input.read_i32::<LittleEndian>()?;
        if version != DATASET_FORMAT_VERSION {
            return Err(CnnError::Version {
                expected: DATASET_FORMAT_VERSION,
                found: version,
            });
        }
        let stored = input.read_u64::<LittleEndian>()? as usize;
        let count = max_count.map_or(stored, |cap| stored.min(cap));

        let mut dataset = Self::new();
        for _ in 0..count {
            let data = Tensor::read(input)?;
            let label = Tensor::read(input)?;
            dataset.add(TrainingExample { data, label })?;
        }
        Ok(dataset)
    }
}
