//! Wrapper around fences, used for CPU-GPU sync.
//!
//! Waits are always bounded. [`Fence::wait_timeout`] reports an expired timeout or a lost device through
//! [`WaitResult`] instead of blocking forever, so the caller decides whether to retry.

use std::time::Duration;

use anyhow::Result;
use ash::vk;

use crate::{Driver, Error};

/// Outcome of a bounded fence wait.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaitResult {
    /// The fence was signaled before the timeout expired.
    Ok,
    /// The timeout expired while the fence was still unsignaled.
    TimedOut,
    /// The device was lost while waiting.
    DeviceLost,
}

impl WaitResult {
    /// Whether the fence is known to be signaled.
    pub fn is_ok(&self) -> bool {
        matches!(self, WaitResult::Ok)
    }
}

/// Wrapper around a [`VkFence`](vk::Fence) object. Fences are used for CPU-GPU sync.
#[derive(Debug)]
pub struct Fence<D: Driver> {
    driver: D,
    handle: vk::Fence,
}

pub(crate) fn duration_to_ns(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

impl<D: Driver> Fence<D> {
    /// Create a new fence, possibly in the signaled status.
    pub fn new(driver: D, signaled: bool) -> Result<Self, vk::Result> {
        let handle = driver.create_fence(signaled)?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkFence {handle:p}");
        Ok(Fence {
            driver,
            handle,
        })
    }

    /// Waits for the fence to be signaled, for at most `timeout`.
    /// # Errors
    /// * Fails on any Vulkan error other than `TIMEOUT` and `ERROR_DEVICE_LOST`, which are reported as a [`WaitResult`].
    pub fn wait_timeout(&self, timeout: Duration) -> Result<WaitResult> {
        match self.driver.wait_for_fence(self.handle, duration_to_ns(timeout)) {
            Ok(()) => Ok(WaitResult::Ok),
            Err(vk::Result::TIMEOUT) => Ok(WaitResult::TimedOut),
            Err(vk::Result::ERROR_DEVICE_LOST) => Ok(WaitResult::DeviceLost),
            Err(err) => Err(Error::from(err).into()),
        }
    }

    /// Waits for the fence to be signaled, retrying up to `attempts` times with `timeout` each.
    /// # Errors
    /// * [`Error::Timeout`] if every attempt expired.
    /// * [`Error::DeviceLost`] if the device was lost while waiting.
    pub fn wait(&self, timeout: Duration, attempts: u32) -> Result<()> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.wait_timeout(timeout)? {
                WaitResult::Ok => return Ok(()),
                WaitResult::DeviceLost => return Err(Error::DeviceLost.into()),
                WaitResult::TimedOut => {
                    warn!("Fence wait timed out after {timeout:?} (attempt {attempt}/{attempts})");
                }
            }
        }
        Err(Error::Timeout {
            waited: timeout,
            attempts,
        }
        .into())
    }

    /// Resets a fence to the unsignaled status.
    pub fn reset(&self) -> Result<()> {
        self.driver.reset_fence(self.handle).map_err(Error::from)?;
        Ok(())
    }

    /// Query the fence status without blocking.
    pub fn is_signaled(&self) -> Result<bool> {
        Ok(self.driver.fence_status(self.handle).map_err(Error::from)?)
    }

    /// Get the raw `VkFence` handle.
    pub fn handle(&self) -> vk::Fence {
        self.handle
    }
}

impl<D: Driver> Drop for Fence<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkFence {:p}", self.handle);
        self.driver.destroy_fence(self.handle);
    }
}
