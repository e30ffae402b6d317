//! Contains all the logic responsible for managing presentation and frame synchronization.
//!
//! Every frame should be contained in a call to [`FrameManager::new_frame`], which takes in a closure that records
//! the frame's commands. The closure receives an [`InFlightContext`] with everything relevant to the current frame:
//! the ring slot and its command buffers, the index of the acquired swapchain image and the per-frame uniform buffers.
//!
//! A frame runs through these steps, always on ring slot `frame_index`:
//! 1. Wait on the slot fence, bounded by [`AppSettings::fence_timeout`] and retried
//!    [`AppSettings::fence_wait_attempts`] times.
//! 2. Reset the slot fence.
//! 3. Acquire a swapchain image, signaling the slot's `image_available` semaphore.
//! 4. Record the slot's command buffers through the user closure.
//! 5. Submit. With compute interop enabled, the compute command buffer is submitted first.
//! 6. Present, waiting on the slot's `rendering_finished` semaphore.
//! 7. Advance `frame_index` to the next slot.
//!
//! # Example usage
//!
//! ```ignore
//! use deimos::prelude::*;
//!
//! let swapchain = Swapchain::new(device.clone(), surface, &settings)?;
//! let mut frame = FrameManager::new(device.clone(), swapchain, &settings)?;
//!
//! event_loop.run(move |event, _, control_flow| {
//!     if let Event::RedrawRequested(_) = event {
//!         let outcome = frame.new_frame(&window, |ifc| {
//!             let cmd = ifc.command_buffer();
//!             // Record commands rendering into ifc.image_index here.
//!             Ok(())
//!         });
//!     }
//! });
//! ```

use std::time::Duration;

use anyhow::Result;
use ash::vk;

use crate::core::queue::QueueType;
use crate::sync::interop::ComputeInterop;
use crate::sync::submit::Submission;
use crate::wsi::frame_ring::{FrameRing, FrameSlot};
use crate::{AppSettings, Buffer, Driver, DynamicUniformBuffer, Error, SwapchainInterface, WindowSize};

/// What happened to a frame passed to [`FrameManager::new_frame`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and presented.
    Presented,
    /// The swapchain was recreated with this size after the recording closure ran, or instead of running it.
    /// Either presenting reported an out of date swapchain, or acquire was still out of date after recreation, in
    /// which case nothing was submitted and the ring index was not advanced.
    Resized(vk::Extent2D),
    /// Nothing was submitted and the ring index was not advanced, because the window is minimized.
    Skipped,
}

/// Struct that stores the context of the frame being recorded.
/// It is passed to the callback given to [`FrameManager::new_frame()`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct InFlightContext<'f, D: Driver, S> {
    /// Index of the ring slot this frame uses.
    pub frame_index: usize,
    /// Index of the acquired swapchain image. Unrelated to `frame_index`.
    pub image_index: u32,
    /// Number of frames presented before this one.
    pub frame_number: u64,
    /// Set if the swapchain was recreated with this size while acquiring the image. Anything that depends on the
    /// old swapchain images must be rebuilt before recording.
    pub resized: Option<vk::Extent2D>,
    frames_in_flight: usize,
    slot: &'f mut FrameSlot<D>,
    #[derivative(Debug = "ignore")]
    swapchain: &'f S,
    #[derivative(Debug = "ignore")]
    driver: &'f D,
}

impl<'f, D: Driver, S> InFlightContext<'f, D, S> {
    /// Graphics command buffer of this frame, already in the recording state.
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.slot.command_buffer().handle()
    }

    /// Compute command buffer of this frame, already in the recording state.
    /// # Errors
    /// * [`Error::NoComputeInterop`] if compute interop is not enabled.
    pub fn compute_command_buffer(&self) -> Result<vk::CommandBuffer> {
        self.slot
            .compute_command_buffer()
            .map(|cmd| cmd.handle())
            .ok_or_else(|| Error::NoComputeInterop.into())
    }

    /// Host-visible uniform buffer of this frame's slot.
    /// # Errors
    /// * [`Error::MissingFrameResource`] if no uniform buffer was configured.
    pub fn uniform_buffer(&mut self) -> Result<&mut Buffer<D>> {
        self.slot
            .uniform_buffer_mut()
            .ok_or_else(|| Error::MissingFrameResource("uniform buffer").into())
    }

    /// Dynamic uniform buffer of this frame's slot.
    /// # Errors
    /// * [`Error::MissingFrameResource`] if no dynamic uniform buffer was configured.
    pub fn dynamic_uniform(&mut self) -> Result<&mut DynamicUniformBuffer<D>> {
        self.slot
            .dynamic_uniform_mut()
            .ok_or_else(|| Error::MissingFrameResource("dynamic uniform buffer").into())
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// The swapchain the acquired image belongs to.
    pub fn swapchain(&self) -> &S {
        self.swapchain
    }

    /// The driver, for recording commands.
    pub fn driver(&self) -> &D {
        self.driver
    }
}

/// Responsible for presentation, frame-frame synchronization and per-frame resources.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FrameManager<D: Driver, S: SwapchainInterface> {
    #[derivative(Debug = "ignore")]
    driver: D,
    ring: FrameRing<D>,
    interop: Option<ComputeInterop<D>>,
    #[derivative(Debug = "ignore")]
    swapchain: S,
    frame_index: usize,
    frame_number: u64,
    fence_timeout: Duration,
    fence_wait_attempts: u32,
    acquire_timeout: Duration,
}

impl<D: Driver, S: SwapchainInterface> FrameManager<D, S> {
    /// Initialize frame manager with per-frame data.
    /// # Errors
    /// * [`Error::InvalidRingSize`] if `settings.frames_in_flight` is zero.
    /// * Fails if creating any per-frame resource fails.
    pub fn new(driver: D, swapchain: S, settings: &AppSettings) -> Result<Self> {
        if settings.frames_in_flight == 0 {
            return Err(Error::InvalidRingSize(0).into());
        }
        let ring = FrameRing::new(driver.clone(), settings)?;
        let interop = settings
            .compute
            .map(|compute| ComputeInterop::new(driver.clone(), ring.len(), compute))
            .transpose()?;
        Ok(Self {
            driver,
            ring,
            interop,
            swapchain,
            frame_index: 0,
            frame_number: 0,
            fence_timeout: settings.fence_timeout,
            fence_wait_attempts: settings.fence_wait_attempts,
            acquire_timeout: settings.acquire_timeout,
        })
    }

    /// Run one frame. `f` records the commands for the frame into the command buffers of the current ring slot.
    /// # Errors
    /// * [`Error::Timeout`] if the slot fence did not signal in time, or no image could be acquired in time.
    /// * [`Error::DeviceLost`] if the device was lost.
    /// * Any error returned from `f`. The frame is abandoned and the ring index is not advanced.
    pub fn new_frame<F>(&mut self, window: &dyn WindowSize, f: F) -> Result<FrameOutcome>
    where
        F: FnOnce(&mut InFlightContext<D, S>) -> Result<()>, {
        if window.is_zero_sized() {
            debug!("Skipping frame, window has no drawable area");
            return Ok(FrameOutcome::Skipped);
        }

        let index = self.frame_index;
        self.ring
            .acquire_slot(index)
            .fence()
            .wait(self.fence_timeout, self.fence_wait_attempts)?;
        self.ring.reset_slot(index)?;

        let mut resized = None;
        let image_index = match self.acquire_image(index, window, &mut resized) {
            Ok(Some(image_index)) => image_index,
            Ok(None) => {
                self.abandon_frame(index, false, false)?;
                debug!("Skipping frame, swapchain is still out of date after recreation");
                return Ok(FrameOutcome::Resized(self.swapchain.extent()));
            }
            Err(err) => return Err(self.abandon_with(index, false, false, err)),
        };

        if let Err(err) = self.record(index, image_index, resized, f) {
            return Err(self.abandon_with(index, true, false, err));
        }

        let compute_submitted = match self.submit_compute(index) {
            Ok(submitted) => submitted,
            Err(err) => return Err(self.abandon_with(index, true, false, err)),
        };
        if let Err(err) = self.submit_graphics(index) {
            return Err(self.abandon_with(index, true, compute_submitted, err));
        }

        // The slot fence is armed, so the slot may be reused even if presenting fails.
        self.frame_index = (index + 1) % self.ring.len();
        self.frame_number += 1;

        let rendering_finished = self.ring.acquire_slot(index).rendering_finished();
        match self.swapchain.present(rendering_finished, image_index) {
            Ok(suboptimal) => {
                if suboptimal {
                    debug!("Swapchain is suboptimal after present");
                }
                Ok(FrameOutcome::Presented)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.resize(window.extent())?;
                Ok(FrameOutcome::Resized(self.swapchain.extent()))
            }
            Err(err) => Err(Error::from(err).into()),
        }
    }

    /// Acquire the next image. Returns `None` if the swapchain is still out of date after one recreation.
    /// `resized` is set to the new extent if the swapchain was recreated.
    fn acquire_image(&mut self, index: usize, window: &dyn WindowSize, resized: &mut Option<vk::Extent2D>) -> Result<Option<u32>> {
        let image_available = self.ring.acquire_slot(index).image_available();
        loop {
            match self.swapchain.acquire_next_image(image_available, self.acquire_timeout) {
                Ok((image_index, suboptimal)) => {
                    if suboptimal {
                        debug!("Swapchain is suboptimal after acquire");
                    }
                    return Ok(Some(image_index));
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) if resized.is_none() => {
                    self.resize(window.extent())?;
                    *resized = Some(self.swapchain.extent());
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Ok(None),
                Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                    return Err(Error::Timeout {
                        waited: self.acquire_timeout,
                        attempts: 1,
                    }
                    .into())
                }
                Err(err) => return Err(Error::from(err).into()),
            }
        }
    }

    fn record<F>(&mut self, index: usize, image_index: u32, resized: Option<vk::Extent2D>, f: F) -> Result<()>
    where
        F: FnOnce(&mut InFlightContext<D, S>) -> Result<()>, {
        let result = self.record_commands(index, image_index, resized, f);
        if result.is_err() {
            let slot = self.ring.acquire_slot(index);
            let compute = slot.compute_command_buffer();
            for cmd in std::iter::once(slot.command_buffer()).chain(compute) {
                if let Err(err) = cmd.reset() {
                    warn!("Failed to reset command buffer of frame slot {index}: {err}");
                }
            }
        }
        result
    }

    fn record_commands<F>(&mut self, index: usize, image_index: u32, resized: Option<vk::Extent2D>, f: F) -> Result<()>
    where
        F: FnOnce(&mut InFlightContext<D, S>) -> Result<()>, {
        let frames_in_flight = self.ring.len();
        let slot = self.ring.acquire_slot_mut(index);
        slot.command_buffer().begin()?;
        if let Some(cmd) = slot.compute_command_buffer() {
            cmd.begin()?;
        }
        let mut ifc = InFlightContext {
            frame_index: index,
            image_index,
            frame_number: self.frame_number,
            resized,
            frames_in_flight,
            slot,
            swapchain: &self.swapchain,
            driver: &self.driver,
        };
        f(&mut ifc)?;
        let slot = ifc.slot;
        if let Some(cmd) = slot.compute_command_buffer() {
            cmd.end()?;
        }
        slot.command_buffer().end()
    }

    fn submit_compute(&self, index: usize) -> Result<bool> {
        let Some(interop) = &self.interop else {
            return Ok(false);
        };
        let cmd = self
            .ring
            .acquire_slot(index)
            .compute_command_buffer()
            .ok_or(Error::NoComputeInterop)?;
        self.driver
            .queue_submit(QueueType::Compute, &interop.compute_submission(index, cmd.handle()), vk::Fence::null())?;
        Ok(true)
    }

    fn submit_graphics(&self, index: usize) -> Result<()> {
        let slot = self.ring.acquire_slot(index);
        let mut submission = Submission::new()
            .wait(slot.image_available(), vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .command_buffer(slot.command_buffer().handle())
            .signal(slot.rendering_finished());
        if let Some(interop) = &self.interop {
            submission = interop.chain_graphics(index, submission);
        }
        self.driver
            .queue_submit(QueueType::Graphics, &submission, slot.fence().handle())
    }

    /// Re-arm the fence of a slot whose frame will not be submitted, so the next wait on it does not block forever.
    /// Semaphores that were already signaled for this frame are consumed, and the compute chain is restored so the
    /// retried frame can wait on the same semaphore again.
    fn abandon_frame(&self, index: usize, image_acquired: bool, compute_submitted: bool) -> Result<()> {
        let slot = self.ring.acquire_slot(index);
        let mut submission = Submission::new();
        if image_acquired {
            submission = submission.wait(slot.image_available(), vk::PipelineStageFlags::ALL_COMMANDS);
        }
        if let (true, Some(interop)) = (compute_submitted, &self.interop) {
            let previous = (index + self.ring.len() - 1) % self.ring.len();
            submission = submission
                .wait(interop.compute_complete(index), vk::PipelineStageFlags::ALL_COMMANDS)
                .signal(interop.graphics_complete(previous));
        }
        self.driver
            .queue_submit(QueueType::Graphics, &submission, slot.fence().handle())
    }

    fn abandon_with(&self, index: usize, image_acquired: bool, compute_submitted: bool, err: anyhow::Error) -> anyhow::Error {
        if let Err(rearm) = self.abandon_frame(index, image_acquired, compute_submitted) {
            warn!("Failed to re-arm frame slot {index} after an error: {rearm}");
        }
        err
    }

    /// Recreate the swapchain and every per-frame resource that depends on it. A zero-sized extent is ignored,
    /// since no swapchain can be created for it.
    pub fn resize(&mut self, extent: vk::Extent2D) -> Result<()> {
        if extent.width == 0 || extent.height == 0 {
            debug!("Ignoring resize to zero-sized extent");
            return Ok(());
        }
        self.driver.wait_idle().map_err(Error::from)?;
        self.swapchain.recreate(extent)?;
        self.ring.recreate_command_buffers()?;
        let extent = self.swapchain.extent();
        info!("Resized swapchain to {}x{}", extent.width, extent.height);
        Ok(())
    }

    /// Block until the device is idle.
    pub fn wait_idle(&self) -> Result<()> {
        self.driver.wait_idle().map_err(Error::from)?;
        Ok(())
    }

    /// Ring index of the next frame.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Number of frames submitted so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.ring.len()
    }

    /// The ring of per-frame resources.
    pub fn ring(&self) -> &FrameRing<D> {
        &self.ring
    }

    /// Mutable access to the ring, for example to write uniform buffers of a slot outside of a frame.
    pub fn ring_mut(&mut self) -> &mut FrameRing<D> {
        &mut self.ring
    }

    /// The compute interop semaphores, if enabled.
    pub fn interop(&self) -> Option<&ComputeInterop<D>> {
        self.interop.as_ref()
    }

    /// The swapchain.
    pub fn swapchain(&self) -> &S {
        &self.swapchain
    }

    /// The driver frames are submitted through.
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: Driver, S: SwapchainInterface> Drop for FrameManager<D, S> {
    fn drop(&mut self) {
        if let Err(err) = self.driver.wait_idle() {
            warn!("Failed to wait for device idle at teardown: {err}");
        }
    }
}
