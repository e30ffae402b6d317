//! Vulkan-backed implementation of the [`Driver`](crate::Driver) trait.

use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::slice;
use std::sync::Arc;

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;

use crate::core::queue::{select_queue, Queue, QueueInfo, QueueType};
use crate::sync::submit::Submission;
use crate::{DefaultAllocator, Driver, Error};

#[derive(Derivative)]
#[derivative(Debug)]
struct DeviceInner {
    #[derivative(Debug = "ignore")]
    instance: ash::Instance,
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    queues: Vec<Queue>,
    // Dropped manually before the device is destroyed, so all memory blocks are released first.
    #[derivative(Debug = "ignore")]
    allocator: ManuallyDrop<DefaultAllocator>,
}

/// Wrapper around a `VkDevice`. Internal state is wrapped in an `Arc<DeviceInner>`, so this is safe
/// to clone. The device takes ownership of the `ash::Device` it is created from and destroys it once the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Wrap a logical device created by the application. `queues` lists every queue that was requested at device
    /// creation. Instance and device creation itself is left to the caller.
    /// # Errors
    /// * Fails if creating the memory allocator fails.
    pub fn new(instance: &ash::Instance, physical_device: vk::PhysicalDevice, handle: ash::Device, queues: &[QueueInfo]) -> Result<Self> {
        // SAFETY: The caller passed in a valid physical device belonging to this instance.
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let queues = queues
            .iter()
            .map(|info| {
                // SAFETY: The caller guarantees this queue was requested when creating the device.
                let queue = unsafe { handle.get_device_queue(info.family_index, info.queue_index) };
                Queue::new(queue, *info)
            })
            .collect::<Vec<_>>();
        let allocator = DefaultAllocator::new(instance, &handle, physical_device)?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkDevice {:p}", handle.handle());
        Ok(Device {
            inner: Arc::new(DeviceInner {
                instance: instance.clone(),
                handle,
                physical_device,
                properties,
                queues,
                allocator: ManuallyDrop::new(allocator),
            }),
        })
    }

    /// Find the queue serving the given type. Compute and transfer work falls back to the graphics queue when no
    /// dedicated queue exists, since graphics queues always support both.
    pub fn queue(&self, queue_type: QueueType) -> Result<&Queue> {
        let index = select_queue(self.inner.queues.iter().map(Queue::info), queue_type)?;
        self.inner
            .queues
            .get(index)
            .ok_or_else(|| Error::NoCapableQueue(queue_type).into())
    }

    /// Pick the first format from `candidates` that can be used as an optimal-tiling depth-stencil attachment.
    pub fn find_depth_format(&self, candidates: &[vk::Format]) -> Result<vk::Format> {
        candidates
            .iter()
            .copied()
            .find(|format| {
                // SAFETY: Physical device handle is valid for the lifetime of the device.
                let props = unsafe {
                    self.inner
                        .instance
                        .get_physical_device_format_properties(self.inner.physical_device, *format)
                };
                props
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| Error::NoDepthFormat.into())
    }

    /// Get the physical device properties.
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.inner.properties
    }

    /// Get the physical device this device was created from.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.inner.physical_device
    }

    /// Get unsafe access to the underlying `ash::Device`, for recording commands.
    /// # Safety
    /// Destroying the device or objects owned by deimos through this handle leaves the system in an undefined state.
    pub unsafe fn handle(&self) -> ash::Device {
        self.inner.handle.clone()
    }

    /// Get the instance this device was created from.
    pub fn instance(&self) -> &ash::Instance {
        &self.inner.instance
    }

    fn queue_family(&self, queue_type: QueueType) -> Result<u32> {
        Ok(self.queue(queue_type)?.info().family_index)
    }
}

impl Deref for Device {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.inner.handle
    }
}

impl Driver for Device {
    type Allocator = DefaultAllocator;

    fn allocator(&self) -> DefaultAllocator {
        DefaultAllocator::clone(&self.inner.allocator)
    }

    fn limits(&self) -> vk::PhysicalDeviceLimits {
        self.inner.properties.limits
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let info = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            },
        };
        unsafe { self.inner.handle.create_fence(&info, None) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.inner.handle.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> VkResult<()> {
        unsafe { self.inner.handle.wait_for_fences(slice::from_ref(&fence), true, timeout) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        unsafe { self.inner.handle.reset_fences(slice::from_ref(&fence)) }
    }

    fn fence_status(&self, fence: vk::Fence) -> VkResult<bool> {
        unsafe { self.inner.handle.get_fence_status(fence) }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo {
            s_type: vk::StructureType::SEMAPHORE_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: Default::default(),
        };
        unsafe { self.inner.handle.create_semaphore(&info, None) }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.inner.handle.destroy_semaphore(semaphore, None) }
    }

    fn create_command_pool(&self, queue: QueueType) -> Result<vk::CommandPool> {
        let info = vk::CommandPoolCreateInfo {
            s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            queue_family_index: self.queue_family(queue)?,
        };
        Ok(unsafe { self.inner.handle.create_command_pool(&info, None)? })
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.inner.handle.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffers(&self, pool: vk::CommandPool, count: u32) -> VkResult<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            p_next: std::ptr::null(),
            command_pool: pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: count,
        };
        unsafe { self.inner.handle.allocate_command_buffers(&info) }
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, command_buffers: &[vk::CommandBuffer]) {
        unsafe { self.inner.handle.free_command_buffers(pool, command_buffers) }
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, flags: vk::CommandBufferUsageFlags) -> VkResult<()> {
        let info = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            p_next: std::ptr::null(),
            flags,
            p_inheritance_info: std::ptr::null(),
        };
        unsafe { self.inner.handle.begin_command_buffer(cmd, &info) }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.inner.handle.end_command_buffer(cmd) }
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe {
            self.inner
                .handle
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
        }
    }

    fn queue_submit(&self, queue: QueueType, submission: &Submission, fence: vk::Fence) -> Result<()> {
        let info = vk::SubmitInfo::builder()
            .wait_semaphores(&submission.wait_semaphores)
            .wait_dst_stage_mask(&submission.wait_stages)
            .command_buffers(&submission.command_buffers)
            .signal_semaphores(&submission.signal_semaphores)
            .build();
        let queue = self.queue(queue)?;
        let handle = queue.lock()?;
        unsafe { self.inner.handle.queue_submit(*handle, slice::from_ref(&info), fence) }.map_err(Error::from)?;
        Ok(())
    }

    fn create_buffer(&self, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> VkResult<vk::Buffer> {
        let info = vk::BufferCreateInfo {
            s_type: vk::StructureType::BUFFER_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: vk::BufferCreateFlags::empty(),
            size,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            queue_family_index_count: 0,
            p_queue_family_indices: std::ptr::null(),
        };
        unsafe { self.inner.handle.create_buffer(&info, None) }
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        unsafe { self.inner.handle.get_buffer_memory_requirements(buffer) }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> VkResult<()> {
        unsafe { self.inner.handle.bind_buffer_memory(buffer, memory, offset) }
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.inner.handle.destroy_buffer(buffer, None) }
    }

    fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.inner.handle.device_wait_idle() }
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        // Release every memory block before the device goes away.
        // SAFETY: The allocator is never used again after this point.
        unsafe { ManuallyDrop::drop(&mut self.allocator) };
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkDevice {:p}", self.handle.handle());
        unsafe {
            self.handle.destroy_device(None);
        }
    }
}
