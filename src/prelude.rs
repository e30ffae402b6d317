pub use ash::vk;
pub use bytemuck::{Pod, Zeroable};

pub use crate::core::app_info::*;
pub use crate::core::device::Device;
pub use crate::core::driver::Driver;
pub use crate::core::error::Error;
pub use crate::core::queue::{select_queue, Queue, QueueInfo, QueueType};

pub use crate::sync::fence::*;
pub use crate::sync::interop::ComputeInterop;
pub use crate::sync::semaphore::*;
pub use crate::sync::submit::Submission;

pub use crate::command_buffer::{CommandBuffer, CommandPool};

pub use crate::allocator::default_allocator;
pub use crate::allocator::default_allocator::DefaultAllocator;
pub use crate::allocator::memory_type::MemoryType;
pub use crate::allocator::traits::*;

pub use crate::resource::buffer::Buffer;
pub use crate::resource::dynamic_buffer::{dynamic_alignment, DynamicUniformBuffer};
pub use crate::resource::image::{Image, ImageView};
pub use crate::resource::mesh::{DrawRange, MeshObject, MeshTable};

pub use crate::wsi::frame::{FrameManager, FrameOutcome, InFlightContext};
pub use crate::wsi::frame_ring::{FrameRing, FrameSlot};
pub use crate::wsi::surface::Surface;
pub use crate::wsi::swapchain::{Swapchain, SwapchainInterface};
pub use crate::wsi::window::{Window, WindowSize};

pub use crate::sample::{Sample, SampleContext, SampleRunner};
