//! Exposes the deimos error type

use std::sync::PoisonError;
use std::time::Duration;

use ash;
use gpu_allocator::AllocationError;
use thiserror::Error;

use crate::core::queue::QueueType;

/// Error type that deimos can return.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// Vulkan allocation error.
    #[error("Vulkan allocation error: `{0}`")]
    AllocationError(AllocationError),
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// A bounded wait on the GPU expired. Callers may retry the frame or treat this as fatal.
    #[error("Timed out after waiting {attempts} time(s) for {waited:?} each")]
    Timeout {
        /// Timeout used for every attempt.
        waited: Duration,
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// The logical device was lost. Every object created from it must be recreated.
    #[error("Device lost")]
    DeviceLost,
    /// No supported surface formats found.
    #[error("No supported surface formats found.")]
    NoSurfaceFormat,
    /// None of the requested depth-stencil formats can be used as an attachment.
    #[error("No supported depth-stencil format found.")]
    NoDepthFormat,
    /// No queue was found for the requested type.
    #[error("No queue found for `{0:?}`. Did you forget to pass it to the device?")]
    NoCapableQueue(QueueType),
    /// Mappable buffer expected
    #[error("Requested mappable buffer, but buffer does not have a memory map")]
    UnmappableBuffer,
    /// Alignment reported by the device or requested by the caller is not a power of two.
    #[error("Alignment `{0}` is not a non-zero power of two")]
    InvalidAlignment(u64),
    /// Tried to access an element outside of an arena or ring.
    #[error("Index {index} out of range for {count} elements")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of elements available.
        count: usize,
    },
    /// Typed view is larger than the element slot it was requested from.
    #[error("Element of {size} bytes does not fit in a stride of {stride} bytes")]
    ElementTooLarge {
        /// Size of the requested type.
        size: usize,
        /// Stride of the arena.
        stride: u64,
    },
    /// Buffers and arena records must be at least one byte large.
    #[error("Zero-sized {0} requested")]
    ZeroSized(&'static str),
    /// A frame ring needs at least one slot.
    #[error("Invalid number of frames in flight: {0}")]
    InvalidRingSize(usize),
    /// A per-frame resource was requested that was not configured in the [`AppSettings`](crate::AppSettings).
    #[error("Frame resource `{0}` was not configured")]
    MissingFrameResource(&'static str),
    /// Compute interop was requested on a frame manager created without it.
    #[error("Compute interop is not enabled for this frame manager")]
    NoComputeInterop,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        match value {
            ash::vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
            other => Error::VkError(other),
        }
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        Error::AllocationError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
