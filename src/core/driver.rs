//! The [`Driver`] trait is the seam between the frame protocol and the Vulkan entry points it calls.
//!
//! Everything the frame ring, the frame manager and the compute interop need from a logical device goes
//! through this trait. The Vulkan-backed implementation is [`Device`](crate::Device), which forwards every call
//! to `ash`. Any other implementation (for example a recording mock used to verify submission order) only has to
//! hand out unique handles and honour fence and semaphore semantics.
//!
//! All handles passed into a driver must have been created by the same driver. Functions returning
//! [`VkResult`] report the raw Vulkan result, so callers can distinguish `TIMEOUT` and `ERROR_DEVICE_LOST` from
//! other failures.

use std::fmt::Debug;

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;

use crate::core::queue::QueueType;
use crate::sync::submit::Submission;
use crate::Allocator;

/// Abstraction over the logical device calls used by deimos. Implementors must be cheap to clone, since every
/// RAII wrapper keeps its own copy to destroy its handle on drop.
pub trait Driver: Clone + Debug + Send + Sync + 'static {
    /// The allocator used for buffer and image memory.
    type Allocator: Allocator;

    /// Get a handle to the memory allocator of this device.
    fn allocator(&self) -> Self::Allocator;

    /// Limits of the physical device, such as `minUniformBufferOffsetAlignment`.
    fn limits(&self) -> vk::PhysicalDeviceLimits;

    /// Create a fence, optionally in the signaled state.
    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;
    /// Destroy a fence. The fence must not be in use by a pending submission.
    fn destroy_fence(&self, fence: vk::Fence);
    /// Wait until the fence is signaled or `timeout` nanoseconds expire, in which case `Err(vk::Result::TIMEOUT)` is returned.
    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()>;
    /// Reset a fence to the unsignaled state.
    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;
    /// Query whether a fence is signaled without blocking.
    fn fence_status(&self, fence: vk::Fence) -> VkResult<bool>;

    /// Create a binary semaphore.
    fn create_semaphore(&self) -> VkResult<vk::Semaphore>;
    /// Destroy a semaphore.
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Create a command pool for the given queue. Command buffers allocated from it can be reset individually.
    fn create_command_pool(&self, queue: QueueType) -> Result<vk::CommandPool>;
    /// Destroy a command pool and every command buffer allocated from it.
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    /// Allocate `count` primary command buffers.
    fn allocate_command_buffers(&self, pool: vk::CommandPool, count: u32) -> VkResult<Vec<vk::CommandBuffer>>;
    /// Return command buffers to their pool.
    fn free_command_buffers(&self, pool: vk::CommandPool, command_buffers: &[vk::CommandBuffer]);
    /// Begin recording. This implicitly resets the command buffer.
    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, flags: vk::CommandBufferUsageFlags) -> VkResult<()>;
    /// Finish recording.
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    /// Return a command buffer in the recording or executable state to the initial state. It must not be pending.
    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;

    /// Submit work to a queue, signaling `fence` (which may be null) when it completes.
    fn queue_submit(&self, queue: QueueType, submission: &Submission, fence: vk::Fence) -> Result<()>;

    /// Create a buffer without memory bound to it.
    fn create_buffer(&self, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> VkResult<vk::Buffer>;
    /// Memory requirements of a buffer.
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;
    /// Bind memory to a buffer.
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> VkResult<()>;
    /// Destroy a buffer. Its memory is freed separately by the allocator.
    fn destroy_buffer(&self, buffer: vk::Buffer);

    /// Block until all queues on the device are idle.
    fn wait_idle(&self) -> VkResult<()>;
}
