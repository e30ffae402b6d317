//! Command pools and primary command buffers.
//!
//! A [`CommandPool`] is created per queue type and owns every buffer allocated from it. A [`CommandBuffer`]
//! is re-recorded every frame: [`CommandBuffer::begin`] implicitly resets it, so it must not be pending on the GPU.
//! The frame ring guarantees this by waiting on the slot fence before recording.

use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::core::queue::QueueType;
use crate::{Driver, Error};

#[derive(Debug)]
struct PoolInner<D: Driver> {
    driver: D,
    handle: vk::CommandPool,
    queue: QueueType,
}

/// Wrapper around a [`VkCommandPool`](vk::CommandPool). Cheap to clone, the pool is destroyed once the last clone
/// and every command buffer allocated from it are dropped.
#[derive(Debug, Clone)]
pub struct CommandPool<D: Driver> {
    inner: Arc<PoolInner<D>>,
}

/// A primary command buffer allocated from a [`CommandPool`].
#[derive(Debug)]
pub struct CommandBuffer<D: Driver> {
    pool: CommandPool<D>,
    handle: vk::CommandBuffer,
}

impl<D: Driver> CommandPool<D> {
    /// Create a command pool for the given queue type.
    pub fn new(driver: D, queue: QueueType) -> Result<Self> {
        let handle = driver.create_command_pool(queue)?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkCommandPool {handle:p} for {queue:?}");
        Ok(Self {
            inner: Arc::new(PoolInner {
                driver,
                handle,
                queue,
            }),
        })
    }

    /// Allocate `count` primary command buffers.
    pub fn allocate(&self, count: u32) -> Result<Vec<CommandBuffer<D>>> {
        let handles = self
            .inner
            .driver
            .allocate_command_buffers(self.inner.handle, count)
            .map_err(Error::from)?;
        Ok(handles
            .into_iter()
            .map(|handle| CommandBuffer {
                pool: self.clone(),
                handle,
            })
            .collect())
    }

    /// Queue type the command buffers of this pool are submitted to.
    pub fn queue(&self) -> QueueType {
        self.inner.queue
    }

    /// Get the raw `VkCommandPool` handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.inner.handle
    }
}

impl<D: Driver> CommandBuffer<D> {
    /// Start recording. The command buffer is only submitted once before being recorded again.
    pub fn begin(&self) -> Result<()> {
        self.pool
            .inner
            .driver
            .begin_command_buffer(self.handle, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .map_err(Error::from)?;
        Ok(())
    }

    /// Finish recording.
    pub fn end(&self) -> Result<()> {
        self.pool
            .inner
            .driver
            .end_command_buffer(self.handle)
            .map_err(Error::from)?;
        Ok(())
    }

    /// Discard everything recorded so far. Used when recording a frame fails halfway, since a buffer left in the
    /// recording state cannot be begun again.
    pub fn reset(&self) -> Result<()> {
        self.pool
            .inner
            .driver
            .reset_command_buffer(self.handle)
            .map_err(Error::from)?;
        Ok(())
    }

    /// Queue type this command buffer must be submitted to.
    pub fn queue(&self) -> QueueType {
        self.pool.queue()
    }

    /// Get the raw `VkCommandBuffer` handle, for recording commands.
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}

impl<D: Driver> Drop for CommandBuffer<D> {
    fn drop(&mut self) {
        self.pool
            .inner
            .driver
            .free_command_buffers(self.pool.inner.handle, std::slice::from_ref(&self.handle));
    }
}

impl<D: Driver> Drop for PoolInner<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkCommandPool {:p}", self.handle);
        self.driver.destroy_command_pool(self.handle);
    }
}
