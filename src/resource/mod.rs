//! Exposes common Vulkan resources such as buffers and images.
//!
//! - [`buffer`] wraps host-visible and device-local buffers.
//! - [`dynamic_buffer`] provides an arena of device-aligned uniform records bound through dynamic offsets.
//! - [`mesh`] describes draws sharing one dynamic uniform buffer.
//! - [`image`] wraps swapchain images and depth-stencil targets.

pub mod buffer;
pub mod dynamic_buffer;
pub mod image;
pub mod mesh;
