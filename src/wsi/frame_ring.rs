//! Fixed ring of per-frame resources.
//!
//! A [`FrameRing`] holds `N` [`FrameSlot`]s, where `N` is [`AppSettings::frames_in_flight`]. While the GPU still
//! executes the work submitted from one slot, the CPU records into the next. A slot may only be reused after its
//! fence has been waited on, which bounds the outstanding GPU work to `N` frames.
//!
//! Slots are addressed by the ring index. This index has nothing to do with the index of the swapchain image a
//! frame renders to.

use std::time::Duration;

use anyhow::Result;
use ash::vk;

use crate::command_buffer::{CommandBuffer, CommandPool};
use crate::core::queue::QueueType;
use crate::sync::fence::WaitResult;
use crate::{AppSettings, Buffer, Driver, DynamicUniformBuffer, Error, Fence, Semaphore};

/// Resources owned by a single frame in flight.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FrameSlot<D: Driver> {
    command_buffer: CommandBuffer<D>,
    compute_command_buffer: Option<CommandBuffer<D>>,
    /// Signaled when all GPU work submitted from this slot has completed.
    fence: Fence<D>,
    /// Signaled when the acquired swapchain image may be rendered to.
    image_available: Semaphore<D>,
    /// Signaled when rendering is done, presentation waits on it.
    rendering_finished: Semaphore<D>,
    #[derivative(Debug = "ignore")]
    uniform: Option<Buffer<D>>,
    #[derivative(Debug = "ignore")]
    dynamic_uniform: Option<DynamicUniformBuffer<D>>,
}

impl<D: Driver> FrameSlot<D> {
    fn new(driver: &D, settings: &AppSettings, command_buffer: CommandBuffer<D>, compute_command_buffer: Option<CommandBuffer<D>>) -> Result<Self> {
        let uniform = settings
            .uniform_buffer_size
            .map(|size| Buffer::new_uniform(driver.clone(), size))
            .transpose()?;
        let dynamic_uniform = settings
            .dynamic_uniform
            .map(|layout| DynamicUniformBuffer::new(driver.clone(), layout.element_size, layout.count))
            .transpose()?;
        Ok(Self {
            command_buffer,
            compute_command_buffer,
            // Created signaled so the very first wait on this slot returns immediately.
            fence: Fence::new(driver.clone(), true).map_err(Error::from)?,
            image_available: Semaphore::new(driver.clone()).map_err(Error::from)?,
            rendering_finished: Semaphore::new(driver.clone()).map_err(Error::from)?,
            uniform,
            dynamic_uniform,
        })
    }

    /// Graphics command buffer, re-recorded every time this slot is used.
    pub fn command_buffer(&self) -> &CommandBuffer<D> {
        &self.command_buffer
    }

    /// Compute command buffer, present if compute interop is enabled.
    pub fn compute_command_buffer(&self) -> Option<&CommandBuffer<D>> {
        self.compute_command_buffer.as_ref()
    }

    /// The slot fence.
    pub fn fence(&self) -> &Fence<D> {
        &self.fence
    }

    /// Semaphore signaled by acquire.
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    /// Semaphore signaled by the graphics submission and waited on by present.
    pub fn rendering_finished(&self) -> vk::Semaphore {
        self.rendering_finished.handle()
    }

    /// Host-visible uniform buffer of this slot.
    pub fn uniform_buffer(&self) -> Option<&Buffer<D>> {
        self.uniform.as_ref()
    }

    /// Mutable access to the host-visible uniform buffer of this slot.
    pub fn uniform_buffer_mut(&mut self) -> Option<&mut Buffer<D>> {
        self.uniform.as_mut()
    }

    /// Dynamic uniform buffer of this slot.
    pub fn dynamic_uniform(&self) -> Option<&DynamicUniformBuffer<D>> {
        self.dynamic_uniform.as_ref()
    }

    /// Mutable access to the dynamic uniform buffer of this slot.
    pub fn dynamic_uniform_mut(&mut self) -> Option<&mut DynamicUniformBuffer<D>> {
        self.dynamic_uniform.as_mut()
    }
}

/// Ring of `N` frame slots.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FrameRing<D: Driver> {
    slots: Vec<FrameSlot<D>>,
    graphics_pool: CommandPool<D>,
    compute_pool: Option<CommandPool<D>>,
    #[derivative(Debug = "ignore")]
    teardown_timeout: Duration,
}

fn allocate_command_buffers<D: Driver>(pool: &CommandPool<D>, count: usize) -> Result<Vec<CommandBuffer<D>>> {
    let count = u32::try_from(count).map_err(|_| Error::InvalidRingSize(count))?;
    pool.allocate(count)
}

impl<D: Driver> FrameRing<D> {
    /// Create every slot. Uniform buffers, dynamic uniform buffers and compute command buffers are only created when
    /// enabled in `settings`.
    /// # Errors
    /// * [`Error::InvalidRingSize`] if `settings.frames_in_flight` is zero.
    pub fn new(driver: D, settings: &AppSettings) -> Result<Self> {
        let count = settings.frames_in_flight;
        if count == 0 {
            return Err(Error::InvalidRingSize(count).into());
        }
        let graphics_pool = CommandPool::new(driver.clone(), QueueType::Graphics)?;
        let compute_pool = match settings.compute {
            Some(_) => Some(CommandPool::new(driver.clone(), QueueType::Compute)?),
            None => None,
        };
        let graphics = allocate_command_buffers(&graphics_pool, count)?;
        let compute = match &compute_pool {
            Some(pool) => allocate_command_buffers(pool, count)?.into_iter().map(Some).collect(),
            None => (0..count).map(|_| None).collect::<Vec<_>>(),
        };
        let slots = graphics
            .into_iter()
            .zip(compute)
            .map(|(cmd, compute)| FrameSlot::new(&driver, settings, cmd, compute))
            .collect::<Result<Vec<_>>>()?;
        #[cfg(feature = "log-objects")]
        trace!("Created frame ring with {count} slots");
        Ok(Self {
            slots,
            graphics_pool,
            compute_pool,
            teardown_timeout: settings.fence_timeout,
        })
    }

    /// Number of slots in the ring.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false, a ring has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get the slot for a ring index. The index is reduced modulo the ring size, so this never fails.
    pub fn acquire_slot(&self, ring_index: usize) -> &FrameSlot<D> {
        &self.slots[ring_index % self.slots.len()]
    }

    /// Get mutable access to the slot for a ring index.
    pub fn acquire_slot_mut(&mut self, ring_index: usize) -> &mut FrameSlot<D> {
        let len = self.slots.len();
        &mut self.slots[ring_index % len]
    }

    /// Block until the GPU finished the work previously submitted from this slot, or until `timeout` expires.
    pub fn wait_idle_slot(&self, ring_index: usize, timeout: Duration) -> Result<WaitResult> {
        self.acquire_slot(ring_index).fence.wait_timeout(timeout)
    }

    /// Reset the slot fence so it can be signaled by the next submission.
    pub fn reset_slot(&self, ring_index: usize) -> Result<()> {
        self.acquire_slot(ring_index).fence.reset()
    }

    /// Free and reallocate the command buffers of every slot. No slot may have pending work.
    pub fn recreate_command_buffers(&mut self) -> Result<()> {
        let count = self.slots.len();
        let graphics = allocate_command_buffers(&self.graphics_pool, count)?;
        let compute = match &self.compute_pool {
            Some(pool) => Some(allocate_command_buffers(pool, count)?),
            None => None,
        };
        for (slot, cmd) in self.slots.iter_mut().zip(graphics) {
            slot.command_buffer = cmd;
        }
        if let Some(compute) = compute {
            for (slot, cmd) in self.slots.iter_mut().zip(compute) {
                slot.compute_command_buffer = Some(cmd);
            }
        }
        Ok(())
    }

    /// Total number of command buffers owned by the ring.
    pub fn command_buffer_count(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| 1 + usize::from(slot.compute_command_buffer.is_some()))
            .sum()
    }
}

impl<D: Driver> Drop for FrameRing<D> {
    fn drop(&mut self) {
        for (index, slot) in self.slots.iter().enumerate() {
            match slot.fence.wait_timeout(self.teardown_timeout) {
                Ok(WaitResult::Ok) => {}
                Ok(result) => warn!("Frame slot {index} was not idle at teardown: {result:?}"),
                Err(err) => warn!("Failed to wait for frame slot {index} at teardown: {err}"),
            }
        }
    }
}
