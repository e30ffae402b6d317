//! The sync module provides utilities dealing with Vulkan synchronization.
//!
//! - The [`fence`] module provides a wrapper around `VkFence` objects, used for CPU-GPU sync. Waits on them are bounded.
//! - The [`semaphore`] module provides a simple wrapper around `VkSemaphore` objects, used for GPU-GPU sync.
//! - [`submit`] describes a single queue submission.
//! - [`interop`] chains compute and graphics submissions of consecutive frames together.

pub mod fence;
pub mod interop;
pub mod semaphore;
pub mod submit;
