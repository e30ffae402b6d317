//! The allocator module exposes the memory allocation seam used by buffers and images.
//!
//! # Allocator traits
//! These are defined in [`traits`], and can be implemented to supply a custom allocator type. The
//! [`Driver`](crate::Driver) trait names the allocator a backend uses.
//! # Default allocator
//! A default allocator based on the `gpu_allocator` crate is implemented in [`default_allocator`]. It backs the
//! Vulkan [`Device`](crate::Device).

pub mod traits;
pub mod default_allocator;
pub mod memory_type;
