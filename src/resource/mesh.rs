//! Draw records that share one [`DynamicUniformBuffer`].
//!
//! A [`MeshTable`] is created once at setup. Each [`MeshObject`] remembers which part of the index buffer it draws
//! and at which dynamic offset its uniform record lives. Offsets are always multiples of the arena stride.

use anyhow::Result;
use ash::vk;

use crate::{DynamicUniformBuffer, Driver, Error};

/// Part of a shared index/vertex buffer drawn by one object.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DrawRange {
    /// Number of indices to draw.
    pub index_count: u32,
    /// First index in the index buffer.
    pub first_index: u32,
    /// Value added to every index before fetching vertices.
    pub vertex_offset: i32,
}

/// A logical draw and the dynamic offset of its uniform record.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MeshObject {
    /// Byte offset of this object's record in the dynamic uniform buffer.
    pub dynamic_offset: u32,
    /// Number of indices to draw.
    pub index_count: u32,
    /// First index in the index buffer.
    pub first_index: u32,
    /// Value added to every index before fetching vertices.
    pub vertex_offset: i32,
}

impl MeshObject {
    /// The range of the index buffer this object draws.
    pub fn range(&self) -> DrawRange {
        DrawRange {
            index_count: self.index_count,
            first_index: self.first_index,
            vertex_offset: self.vertex_offset,
        }
    }
}

/// Fixed set of draws multiplexed through one dynamic uniform buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTable {
    objects: Vec<MeshObject>,
    stride: vk::DeviceSize,
}

fn offsets(ranges: impl Iterator<Item = DrawRange>, stride: vk::DeviceSize) -> Result<Vec<MeshObject>> {
    ranges
        .enumerate()
        .map(|(i, range)| {
            let offset = (i as vk::DeviceSize)
                .checked_mul(stride)
                .and_then(|offset| u32::try_from(offset).ok())
                .ok_or(Error::Uncategorized("dynamic offset exceeds u32"))?;
            Ok(MeshObject {
                dynamic_offset: offset,
                index_count: range.index_count,
                first_index: range.first_index,
                vertex_offset: range.vertex_offset,
            })
        })
        .collect()
}

impl MeshTable {
    /// Lay out one record per draw range, `stride` bytes apart.
    pub fn new(ranges: &[DrawRange], stride: vk::DeviceSize) -> Result<Self> {
        Ok(Self {
            objects: offsets(ranges.iter().copied(), stride)?,
            stride,
        })
    }

    /// Lay out one record per draw range using the stride of `buffer`.
    /// # Errors
    /// * [`Error::IndexOutOfRange`] if there are more draws than records in the buffer.
    pub fn from_buffer<D: Driver>(buffer: &DynamicUniformBuffer<D>, ranges: &[DrawRange]) -> Result<Self> {
        if ranges.len() > buffer.len() {
            return Err(Error::IndexOutOfRange {
                index: ranges.len() - 1,
                count: buffer.len(),
            }
            .into());
        }
        Self::new(ranges, buffer.stride())
    }

    /// Recompute every dynamic offset for a new stride, keeping the draw ranges.
    pub fn rebase(&mut self, stride: vk::DeviceSize) -> Result<()> {
        self.objects = offsets(self.objects.iter().map(MeshObject::range), stride)?;
        self.stride = stride;
        Ok(())
    }

    /// Stride the offsets were computed with.
    pub fn stride(&self) -> vk::DeviceSize {
        self.stride
    }

    /// Get a single object.
    pub fn get(&self, index: usize) -> Option<&MeshObject> {
        self.objects.get(index)
    }

    /// Iterate over all objects in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &MeshObject> {
        self.objects.iter()
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the table holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
