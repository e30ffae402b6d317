//! Queue capabilities and the physical queues owned by a [`Device`](crate::Device).

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use ash::vk;

use crate::Error;

/// Abstraction over vulkan queue capabilities. Note that in raw Vulkan, there is no 'Graphics queue'. Deimos will expose one, but behind the scenes the exposed
/// e.g. graphics queue and compute queue could point to the same hardware queue.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Hash)]
pub enum QueueType {
    #[default]
    Graphics = vk::QueueFlags::GRAPHICS.as_raw() as isize,
    Compute = vk::QueueFlags::COMPUTE.as_raw() as isize,
    Transfer = vk::QueueFlags::TRANSFER.as_raw() as isize,
}

/// Describes a queue that was created together with the logical device.
#[derive(Default, Debug, Copy, Clone)]
pub struct QueueInfo {
    /// Functionality that this queue provides.
    pub queue_type: QueueType,
    /// The queue family index.
    pub family_index: u32,
    /// Index of the queue inside its family.
    pub queue_index: u32,
    /// Whether this queue is capable of presenting to a surface.
    pub can_present: bool,
}

/// Position of the queue that work of `queue_type` is submitted to. Falls back to the graphics queue, which can run
/// compute and transfer work as well.
/// # Errors
/// * [`Error::NoCapableQueue`] if neither a matching queue nor a graphics queue exists.
pub fn select_queue<'q, I>(queues: I, queue_type: QueueType) -> Result<usize>
where
    I: IntoIterator<Item = &'q QueueInfo> + Clone, {
    let find = |ty: QueueType| queues.clone().into_iter().position(|info| info.queue_type == ty);
    find(queue_type)
        .or_else(|| find(QueueType::Graphics))
        .ok_or_else(|| Error::NoCapableQueue(queue_type).into())
}

/// Physical `VkQueue` object. Access is externally synchronized through a mutex, since `vkQueueSubmit` and
/// `vkQueuePresentKHR` require it.
#[derive(Debug)]
pub struct Queue {
    handle: Mutex<vk::Queue>,
    info: QueueInfo,
}

impl Queue {
    pub(crate) fn new(handle: vk::Queue, info: QueueInfo) -> Self {
        Self {
            handle: Mutex::new(handle),
            info,
        }
    }

    /// Lock the queue for a submission or present.
    pub(crate) fn lock(&self) -> Result<MutexGuard<vk::Queue>> {
        Ok(self.handle.lock().map_err(|_| Error::PoisonError)?)
    }

    /// Information about this queue, such as its family index.
    pub fn info(&self) -> &QueueInfo {
        &self.info
    }
}
