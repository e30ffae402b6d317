//! Frame pacing and per-frame resource management for Vulkan samples.
//!
//! Deimos implements the loop every Vulkan sample needs once it renders more than a single frame: a ring of
//! per-frame resources, the fence and semaphore handshake between CPU recording and GPU execution, uniform buffers
//! that are rewritten every frame, and the semaphore chain that hands data from a compute pass to a graphics pass.
//!
//! To get started, the easiest way is to simply
//! ```
//! // Import types under a namespace.
//! use deimos::prelude as dm;
//!
//! // Or, if you dont care about using the types under a namespace
//! use deimos::prelude::*;
//! ```
//!
//! # Example
//!
//! Deimos does not create the Vulkan instance or device. Once the application has created them, together with
//! a window, it hands them to deimos. The settings are built once and passed by reference wherever they are needed.
//! ```ignore
//! use deimos::prelude::*;
//!
//! let settings = AppBuilder::new()
//!     .name("01e frames in flight")
//!     .frames_in_flight(2)
//!     .uniform_buffer(std::mem::size_of::<CameraData>() as u64)
//!     .build();
//!
//! let device = Device::new(&instance, physical_device, logical_device, &[QueueInfo {
//!     queue_type: QueueType::Graphics,
//!     family_index: 0,
//!     queue_index: 0,
//!     can_present: true,
//! }])?;
//! let surface = Surface::new(&entry, &instance, &window)?;
//! let swapchain = Swapchain::new(device.clone(), surface, &settings)?;
//! let mut runner = SampleRunner::<_, _, MySample>::new(device.clone(), swapchain, &settings)?;
//! loop {
//!     runner.frame(&window)?;
//! }
//! ```
//! For further example code, check out the following modules
//! - [`wsi`] for managing your main loop and frame rendering logic.
//! - [`sync`] for fences, semaphores and the compute to graphics hand-off.
//! - [`sample`] for the sample interface and runner.
//! - [`allocator`] For various allocators and related utilities.
//! - [`buffer`] and [`dynamic_buffer`] for host-visible uniform data.
//! - [`image`] for managing [`VkImage`](vk::Image) and [`VkImageView`](vk::ImageView) objects.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub use crate::resource::{buffer, dynamic_buffer, image, mesh};

pub mod allocator;
pub mod command_buffer;
pub mod core;
pub mod resource;
pub mod sample;
pub mod sync;
pub mod util;
pub mod wsi;

static_assertions::assert_impl_all!(Device: Driver, Send, Sync);
static_assertions::assert_impl_all!(DefaultAllocator: Allocator, Send, Sync);
static_assertions::assert_impl_all!(AppSettings: Send, Sync, Clone);
