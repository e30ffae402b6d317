use ash::vk;

use crate::Driver;

/// Wrapper around a [`VkSemaphore`](vk::Semaphore) object. Semaphores are used for GPU-GPU sync.
#[derive(Debug)]
pub struct Semaphore<D: Driver> {
    driver: D,
    handle: vk::Semaphore,
}

impl<D: Driver> Semaphore<D> {
    /// Create a new `VkSemaphore` object.
    pub fn new(driver: D) -> Result<Self, vk::Result> {
        let handle = driver.create_semaphore()?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkSemaphore {handle:p}");
        Ok(Semaphore {
            driver,
            handle,
        })
    }

    /// Get the raw `VkSemaphore` handle.
    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl<D: Driver> Drop for Semaphore<D> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkSemaphore {:p}", self.handle);
        self.driver.destroy_semaphore(self.handle);
    }
}
