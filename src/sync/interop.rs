//! Semaphore chain that hands data from a compute pass to a graphics pass every frame.
//!
//! Frame `k` uses ring slot `i = k mod N`. Its compute submission waits until the graphics submission of the
//! previous frame (slot `(i + N - 1) mod N`) is done with the shared data, and signals `compute_complete[i]`.
//! The graphics submission of the same frame waits on `compute_complete[i]` and signals `graphics_complete[i]`.
//! Every binary semaphore is therefore signaled exactly once before it is waited on exactly once.
//!
//! Frame 0 waits on `graphics_complete[N - 1]`, which nothing has signaled yet. That single semaphore is
//! signaled at creation with an empty graphics submission.

use anyhow::Result;
use ash::vk;

use crate::core::queue::QueueType;
use crate::sync::submit::Submission;
use crate::{ComputeSettings, Driver, Error, Semaphore};

/// Per-slot semaphores linking compute and graphics submissions.
#[derive(Debug)]
pub struct ComputeInterop<D: Driver> {
    compute_complete: Vec<Semaphore<D>>,
    graphics_complete: Vec<Semaphore<D>>,
    graphics_wait_stage: vk::PipelineStageFlags,
}

impl<D: Driver> ComputeInterop<D> {
    /// Create the semaphore pairs for a ring of `ring_size` slots and pre-signal the one frame 0 waits on.
    /// # Errors
    /// * [`Error::InvalidRingSize`] if `ring_size` is zero.
    /// * Fails if creating a semaphore or the pre-signal submission fails.
    pub fn new(driver: D, ring_size: usize, settings: ComputeSettings) -> Result<Self> {
        if ring_size == 0 {
            return Err(Error::InvalidRingSize(ring_size).into());
        }
        let compute_complete = (0..ring_size)
            .map(|_| Semaphore::new(driver.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        let graphics_complete = (0..ring_size)
            .map(|_| Semaphore::new(driver.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)?;

        let last = &graphics_complete[ring_size - 1];
        driver.queue_submit(QueueType::Graphics, &Submission::new().signal(last.handle()), vk::Fence::null())?;

        Ok(Self {
            compute_complete,
            graphics_complete,
            graphics_wait_stage: settings.graphics_wait_stage,
        })
    }

    /// Number of ring slots served.
    pub fn len(&self) -> usize {
        self.compute_complete.len()
    }

    /// Always false, a compute interop has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.compute_complete.is_empty()
    }

    /// Semaphore signaled by the compute submission of `slot`.
    pub fn compute_complete(&self, slot: usize) -> vk::Semaphore {
        self.compute_complete[slot % self.len()].handle()
    }

    /// Semaphore signaled by the graphics submission of `slot`.
    pub fn graphics_complete(&self, slot: usize) -> vk::Semaphore {
        self.graphics_complete[slot % self.len()].handle()
    }

    /// Stage at which graphics work waits for the compute result.
    pub fn graphics_wait_stage(&self) -> vk::PipelineStageFlags {
        self.graphics_wait_stage
    }

    /// Build the compute submission for `slot`.
    pub fn compute_submission(&self, slot: usize, cmd: vk::CommandBuffer) -> Submission {
        let n = self.len();
        let previous = (slot % n + n - 1) % n;
        Submission::new()
            .wait(self.graphics_complete(previous), vk::PipelineStageFlags::COMPUTE_SHADER)
            .command_buffer(cmd)
            .signal(self.compute_complete(slot))
    }

    /// Add the compute wait and the graphics-complete signal of `slot` to a graphics submission.
    pub fn chain_graphics(&self, slot: usize, submission: Submission) -> Submission {
        submission
            .wait(self.compute_complete(slot), self.graphics_wait_stage)
            .signal(self.graphics_complete(slot))
    }
}
