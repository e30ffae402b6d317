//! Wrappers for `VkBuffer` objects.
//!
//! Buffers allocated from [`MemoryType::CpuToGpu`] memory are mapped once at creation and stay mapped for their
//! whole lifetime. Their contents can be written through [`Buffer::mapped_slice`] or [`Buffer::write`], which only
//! succeed if the buffer was allocated from a mappable heap (one that has the `HOST_VISIBLE` bit set).
//!
//! # Example
//!
//! ```ignore
//! use deimos::prelude::*;
//!
//! // Allocate a 16 byte uniform buffer in host-visible memory.
//! let mut buf = Buffer::new(device.clone(), 16u64, vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryType::CpuToGpu)?;
//! // Obtain a slice of floats and write some arbitrary data.
//! let slice = buf.mapped_slice::<f32>()?;
//! slice.copy_from_slice(&[1.0, 0.0, 1.0, 1.0]);
//! ```

use std::ffi::c_void;
use std::ptr::NonNull;

use anyhow::Result;
use ash::vk;
use bytemuck::Pod;

use crate::{Allocation, Allocator, Driver, Error, MemoryType};

/// Wrapper around a [`VkBuffer`](vk::Buffer) together with the memory bound to it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Buffer<D: Driver> {
    #[derivative(Debug = "ignore")]
    driver: D,
    #[derivative(Debug = "ignore")]
    #[allow(dead_code)]
    memory: <D::Allocator as Allocator>::Allocation,
    pointer: Option<NonNull<c_void>>,
    handle: vk::Buffer,
    size: vk::DeviceSize,
}

// SAFETY: The unsafe part of this is the mapped pointer, but this is a pointer to GPU memory
// so its value is not dropped when sending this to a different thread.
unsafe impl<D: Driver> Send for Buffer<D> {}
unsafe impl<D: Driver> Sync for Buffer<D> {}

impl<D: Driver> Buffer<D> {
    /// Allocate a new buffer with a specific size, at a specific memory location.
    /// All usage flags must be given.
    /// # Errors
    /// * [`Error::ZeroSized`] if `size` is zero.
    pub fn new(driver: D, size: impl Into<vk::DeviceSize>, usage: vk::BufferUsageFlags, location: MemoryType) -> Result<Self> {
        let size = size.into();
        if size == 0 {
            return Err(Error::ZeroSized("buffer").into());
        }
        let handle = driver.create_buffer(size, usage).map_err(Error::from)?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkBuffer {handle:p} (size = {size} bytes)");

        let requirements = driver.buffer_memory_requirements(handle);
        let memory = match driver.allocator().allocate("buffer", &requirements, location) {
            Ok(memory) => memory,
            Err(err) => {
                driver.destroy_buffer(handle);
                return Err(err);
            }
        };
        // SAFETY: The allocation outlives the buffer, both are dropped together.
        if let Err(err) = driver.bind_buffer_memory(handle, unsafe { memory.memory() }, memory.offset()) {
            driver.destroy_buffer(handle);
            return Err(Error::from(err).into());
        }

        Ok(Self {
            pointer: memory.mapped_ptr(),
            driver,
            memory,
            handle,
            size,
        })
    }

    /// Allocate a new uniform buffer in host-visible, host-coherent memory.
    pub fn new_uniform(driver: D, size: impl Into<vk::DeviceSize>) -> Result<Self> {
        Self::new(driver, size, vk::BufferUsageFlags::UNIFORM_BUFFER, MemoryType::CpuToGpu)
    }

    /// True if this buffer has a mapped pointer and thus can directly be written to.
    pub fn is_mapped(&self) -> bool {
        self.pointer.is_some()
    }

    /// Obtain the mapped memory of this buffer as bytes.
    /// # Errors
    /// Fails if this buffer is not mappable (not `HOST_VISIBLE`).
    pub fn mapped_bytes_mut(&mut self) -> Result<&mut [u8]> {
        let pointer = self.pointer.ok_or(Error::UnmappableBuffer)?;
        let len = usize::try_from(self.size).map_err(|_| Error::UnmappableBuffer)?;
        // SAFETY: The pointer maps at least `size` bytes for as long as the allocation lives, and the
        // mutable borrow of `self` prevents aliasing through this wrapper.
        Ok(unsafe { std::slice::from_raw_parts_mut(pointer.cast::<u8>().as_ptr(), len) })
    }

    /// Obtain a typed slice to the mapped memory of this buffer. Trailing bytes that do not fill a whole `T`
    /// are not part of the slice.
    /// # Errors
    /// Fails if this buffer is not mappable, or if the mapping is not aligned for `T`.
    pub fn mapped_slice<T: Pod>(&mut self) -> Result<&mut [T]> {
        let bytes = self.mapped_bytes_mut()?;
        let whole = bytes.len() - bytes.len() % std::mem::size_of::<T>().max(1);
        bytemuck::try_cast_slice_mut(&mut bytes[..whole]).map_err(|_| Error::Uncategorized("mapped memory is misaligned").into())
    }

    /// Copy `value` into the mapped memory at byte `offset`.
    /// # Errors
    /// Fails if this buffer is not mappable, or if the value does not fit.
    pub fn write<T: Pod>(&mut self, offset: vk::DeviceSize, value: &T) -> Result<()> {
        let src = bytemuck::bytes_of(value);
        let size = self.size;
        let bytes = self.mapped_bytes_mut()?;
        let start = usize::try_from(offset).map_err(|_| Error::UnmappableBuffer)?;
        let dst = start
            .checked_add(src.len())
            .and_then(|end| bytes.get_mut(start..end))
            .ok_or(Error::ElementTooLarge {
                size: src.len(),
                stride: size.saturating_sub(offset),
            })?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Obtain a handle to the raw vulkan buffer object.
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    /// Get the size of this buffer
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl<D: Driver> Drop for Buffer<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkBuffer {:p}", self.handle);
        self.driver.destroy_buffer(self.handle);
    }
}
