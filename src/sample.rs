//! Interface between tutorial samples and the frame driver.
//!
//! Every sample implements [`Sample`]. A [`SampleRunner`] owns the [`FrameManager`] and the sample, measures frame
//! times, and calls into the sample at the right moments:
//! - once at startup, [`Sample::init`] constructs the sample,
//! - every frame, [`Sample::update`] and then [`Sample::render`] are called while the frame is being recorded,
//! - after the swapchain was recreated, [`Sample::resize`] is called. A recreation while acquiring the image is
//!   reported before [`Sample::render`] records against the new swapchain,
//! - at shutdown, the device is idle before [`Sample::destroy`] is called.

use std::time::{Duration, Instant};

use anyhow::Result;
use ash::vk;

use crate::{AppSettings, Driver, Error, FrameManager, FrameOutcome, InFlightContext, SwapchainInterface, WindowSize};

/// Everything a sample may need outside of a frame.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SampleContext<'a, D: Driver, S> {
    /// Driver to create pipelines and resources with.
    pub driver: &'a D,
    /// Settings the runner was created with.
    pub settings: &'a AppSettings,
    /// The swapchain frames are presented to.
    #[derivative(Debug = "ignore")]
    pub swapchain: &'a S,
    /// Number of frames in flight.
    pub frames_in_flight: usize,
}

/// A single tutorial sample.
pub trait Sample<D: Driver, S: SwapchainInterface> {
    /// Create the sample and every resource it owns, such as pipelines and vertex buffers.
    fn init(ctx: &SampleContext<D, S>) -> Result<Self>
    where
        Self: Sized;

    /// Advance the simulation by `delta`, the time since the previous frame.
    fn update(&mut self, _delta: Duration) -> Result<()> {
        Ok(())
    }

    /// Record this frame's commands.
    fn render(&mut self, ifc: &mut InFlightContext<D, S>) -> Result<()>;

    /// Recreate resources that depend on the swapchain size.
    fn resize(&mut self, _ctx: &SampleContext<D, S>, _extent: vk::Extent2D) -> Result<()> {
        Ok(())
    }

    /// Release resources. The device is idle when this is called.
    fn destroy(&mut self, _ctx: &SampleContext<D, S>) {}
}

/// Drives a [`Sample`] through its lifecycle.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SampleRunner<D: Driver, S: SwapchainInterface, T: Sample<D, S>> {
    #[derivative(Debug = "ignore")]
    sample: Option<T>,
    frame: FrameManager<D, S>,
    settings: AppSettings,
    #[derivative(Debug = "ignore")]
    last_frame: Option<Instant>,
}

fn context<'a, D: Driver, S: SwapchainInterface>(frame: &'a FrameManager<D, S>, settings: &'a AppSettings) -> SampleContext<'a, D, S> {
    SampleContext {
        driver: frame.driver(),
        settings,
        swapchain: frame.swapchain(),
        frames_in_flight: frame.frames_in_flight(),
    }
}

impl<D: Driver, S: SwapchainInterface, T: Sample<D, S>> SampleRunner<D, S, T> {
    /// Create the frame manager and initialize the sample.
    pub fn new(driver: D, swapchain: S, settings: &AppSettings) -> Result<Self> {
        let frame = FrameManager::new(driver, swapchain, settings)?;
        let sample = T::init(&context(&frame, settings))?;
        info!("Initialized sample {} v{}.{}.{}", settings.name, settings.version.0, settings.version.1, settings.version.2);
        Ok(Self {
            sample: Some(sample),
            frame,
            settings: settings.clone(),
            last_frame: None,
        })
    }

    /// Run a single frame.
    pub fn frame(&mut self, window: &dyn WindowSize) -> Result<FrameOutcome> {
        let sample = self
            .sample
            .as_mut()
            .ok_or(Error::Uncategorized("sample was already destroyed"))?;
        let now = Instant::now();
        let delta = self
            .last_frame
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_frame = Some(now);

        let settings = &self.settings;
        let outcome = self.frame.new_frame(window, |ifc| {
            if let Some(extent) = ifc.resized {
                let ctx = SampleContext {
                    driver: ifc.driver(),
                    settings,
                    swapchain: ifc.swapchain(),
                    frames_in_flight: ifc.frames_in_flight(),
                };
                sample.resize(&ctx, extent)?;
            }
            sample.update(delta)?;
            sample.render(ifc)
        })?;
        if let FrameOutcome::Resized(extent) = outcome {
            sample.resize(&context(&self.frame, &self.settings), extent)?;
        }
        Ok(outcome)
    }

    /// Resize the swapchain, for example after a window resize event, and notify the sample.
    pub fn resize(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.frame.resize(extent)?;
        if let Some(sample) = self.sample.as_mut() {
            let extent = self.frame.swapchain().extent();
            sample.resize(&context(&self.frame, &self.settings), extent)?;
        }
        Ok(())
    }

    /// Wait for the device to be idle and destroy the sample.
    pub fn shutdown(mut self) -> Result<()> {
        self.frame.wait_idle()?;
        self.destroy_sample();
        Ok(())
    }

    fn destroy_sample(&mut self) {
        if let Some(mut sample) = self.sample.take() {
            sample.destroy(&context(&self.frame, &self.settings));
        }
    }

    /// The sample, unless it was destroyed.
    pub fn sample(&self) -> Option<&T> {
        self.sample.as_ref()
    }

    /// The frame manager.
    pub fn frame_manager(&self) -> &FrameManager<D, S> {
        &self.frame
    }
}

impl<D: Driver, S: SwapchainInterface, T: Sample<D, S>> Drop for SampleRunner<D, S, T> {
    fn drop(&mut self) {
        if self.sample.is_some() {
            if let Err(err) = self.frame.wait_idle() {
                warn!("Failed to wait for device idle before destroying sample: {err}");
            }
            self.destroy_sample();
        }
    }
}
