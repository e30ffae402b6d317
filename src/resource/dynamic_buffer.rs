//! Arena of equally sized uniform records addressed through dynamic offsets.
//!
//! Instead of one uniform buffer per object, a single host-visible buffer holds one record per draw. Every record
//! starts at a multiple of the device's `minUniformBufferOffsetAlignment`, so the record for draw `i` can be bound
//! with a `UNIFORM_BUFFER_DYNAMIC` descriptor and the dynamic offset returned by [`DynamicUniformBuffer::offset`].
//!
//! # Example
//! ```ignore
//! use deimos::prelude::*;
//!
//! #[repr(C)]
//! #[derive(Copy, Clone, Pod, Zeroable)]
//! struct ObjectData {
//!     model: [[f32; 4]; 4],
//! }
//!
//! let mut arena = DynamicUniformBuffer::new(device.clone(), std::mem::size_of::<ObjectData>() as u64, 3)?;
//! arena.write(1, &ObjectData { model: IDENTITY })?;
//! let offset = arena.offset(1)?;
//! ```

use anyhow::Result;
use ash::vk;
use bytemuck::Pod;

use crate::util::align::align_up;
use crate::{Buffer, Driver, Error};

/// Compute the stride between records of `element_size` bytes for a device that requires dynamic offsets to be
/// multiples of `min_alignment`.
/// # Errors
/// * [`Error::InvalidAlignment`] if `min_alignment` is not a non-zero power of two.
/// # Example
/// ```
/// use deimos::dynamic_alignment;
/// assert_eq!(dynamic_alignment(64, 256).unwrap(), 256);
/// assert_eq!(dynamic_alignment(300, 256).unwrap(), 512);
/// ```
pub fn dynamic_alignment(element_size: vk::DeviceSize, min_alignment: vk::DeviceSize) -> Result<vk::DeviceSize> {
    align_up(element_size, min_alignment)
}

/// A host-visible uniform buffer split into `len` records of a fixed, device-aligned stride.
#[derive(Debug)]
pub struct DynamicUniformBuffer<D: Driver> {
    buffer: Buffer<D>,
    element_size: vk::DeviceSize,
    stride: vk::DeviceSize,
    count: usize,
}

impl<D: Driver> DynamicUniformBuffer<D> {
    /// Allocate an arena of `count` records of `element_size` bytes, aligned to the device limit.
    /// # Errors
    /// * [`Error::ZeroSized`] if `element_size` is zero, since every record would share offset zero.
    /// * [`Error::InvalidAlignment`] if the device reports an alignment that is not a power of two.
    /// * Fails if the buffer cannot be allocated in host-visible memory.
    pub fn new(driver: D, element_size: vk::DeviceSize, count: usize) -> Result<Self> {
        if element_size == 0 {
            return Err(Error::ZeroSized("dynamic uniform record").into());
        }
        let min_alignment = driver.limits().min_uniform_buffer_offset_alignment;
        let stride = dynamic_alignment(element_size, min_alignment)?;
        let size = stride
            .checked_mul(count as vk::DeviceSize)
            .ok_or(Error::Uncategorized("dynamic uniform buffer size overflows"))?;
        let buffer = Buffer::new(
            driver,
            size.max(stride),
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            crate::MemoryType::CpuToGpu,
        )?;
        if !buffer.is_mapped() {
            return Err(Error::UnmappableBuffer.into());
        }
        Ok(Self {
            buffer,
            element_size,
            stride,
            count,
        })
    }

    /// Distance in bytes between two consecutive records.
    pub fn stride(&self) -> vk::DeviceSize {
        self.stride
    }

    /// Size of a single record, without padding.
    pub fn element_size(&self) -> vk::DeviceSize {
        self.element_size
    }

    /// Number of records in the arena.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the arena holds no records.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Dynamic offset of record `index`, to pass to `vkCmdBindDescriptorSets`.
    /// # Errors
    /// * [`Error::IndexOutOfRange`] if `index >= len()`.
    pub fn offset(&self, index: usize) -> Result<u32> {
        let offset = self.byte_offset(index)?;
        Ok(u32::try_from(offset).map_err(|_| Error::Uncategorized("dynamic offset exceeds u32"))?)
    }

    fn byte_offset(&self, index: usize) -> Result<vk::DeviceSize> {
        if index >= self.count {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.count,
            }
            .into());
        }
        Ok(index as vk::DeviceSize * self.stride)
    }

    fn record_bytes<T: Pod>(&mut self, index: usize) -> Result<&mut [u8]> {
        let size = std::mem::size_of::<T>();
        if size as vk::DeviceSize > self.stride {
            return Err(Error::ElementTooLarge {
                size,
                stride: self.stride,
            }
            .into());
        }
        let start = self.byte_offset(index)? as usize;
        let count = self.count;
        let bytes = self.buffer.mapped_bytes_mut()?;
        bytes.get_mut(start..start + size).ok_or_else(|| {
            Error::IndexOutOfRange {
                index,
                count,
            }
            .into()
        })
    }

    /// Get a typed mutable view of record `index`.
    /// # Errors
    /// * [`Error::IndexOutOfRange`] if `index >= len()`.
    /// * [`Error::ElementTooLarge`] if `T` does not fit in one stride.
    pub fn element_mut<T: Pod>(&mut self, index: usize) -> Result<&mut T> {
        let bytes = self.record_bytes::<T>(index)?;
        bytemuck::try_from_bytes_mut(bytes).map_err(|_| Error::Uncategorized("record is misaligned for this type").into())
    }

    /// Copy `value` into record `index`.
    /// # Errors
    /// Same as [`DynamicUniformBuffer::element_mut`].
    pub fn write<T: Pod>(&mut self, index: usize, value: &T) -> Result<()> {
        let bytes = self.record_bytes::<T>(index)?;
        bytes.copy_from_slice(bytemuck::bytes_of(value));
        Ok(())
    }

    /// Descriptor info covering a single record, for a `UNIFORM_BUFFER_DYNAMIC` binding.
    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer.handle(),
            offset: 0,
            range: self.element_size,
        }
    }

    /// Get the underlying buffer.
    pub fn buffer(&self) -> &Buffer<D> {
        &self.buffer
    }

    /// Get the raw `VkBuffer` handle.
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }
}
