//! The wsi module provides utilities for interacting with the window and rendering frames.
//!
//! - [`frame`] drives a frame from fence wait to present.
//! - [`frame_ring`] owns the per-frame resources.
//! - [`swapchain`], [`surface`] and [`window`] wrap the presentation engine.

pub mod frame;
pub mod frame_ring;
pub mod surface;
pub mod swapchain;
pub mod window;
