//! Exposes all structs needed to store configuration parameters.
//!
//! A single [`AppSettings`] object replaces any process-wide state. It is built once with an [`AppBuilder`]
//! and then passed by reference to everything that needs it, most notably the [`FrameManager`](crate::FrameManager)
//! and the [`SampleRunner`](crate::SampleRunner).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use deimos::prelude::*;
//!
//! let settings = AppBuilder::new()
//!     .name("02f compute particles")
//!     .frames_in_flight(2)
//!     .fence_timeout(Duration::from_millis(500))
//!     .uniform_buffer(256u32)
//!     .compute(ComputeSettings::particles())
//!     .build();
//! assert_eq!(settings.frames_in_flight, 2);
//! ```

use std::time::Duration;

use ash::vk;

/// The default number of frames in flight. A frame in-flight is a frame that is rendering on the GPU or scheduled to do so.
/// With two frames in flight, we can prepare a frame on the CPU while one frame is rendering on the GPU.
/// This gives a good amount of parallelization while avoiding input lag.
pub const MAX_FRAME_LAG: usize = 2;

/// Layout of the per-frame dynamic uniform buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DynamicUniformSettings {
    /// Size in bytes of a single record, before alignment padding.
    pub element_size: vk::DeviceSize,
    /// Number of records in the buffer, usually the number of draw calls.
    pub count: usize,
}

/// Settings for samples that hand data from a compute pass to a graphics pass every frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ComputeSettings {
    /// Pipeline stage of the graphics submission that waits on the compute result.
    pub graphics_wait_stage: vk::PipelineStageFlags,
}

impl ComputeSettings {
    /// Compute output is consumed as vertex input, like a particle system.
    pub fn particles() -> Self {
        Self {
            graphics_wait_stage: vk::PipelineStageFlags::VERTEX_INPUT,
        }
    }

    /// Compute output is sampled in the fragment shader, like an image filter.
    pub fn image() -> Self {
        Self {
            graphics_wait_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        }
    }
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self::particles()
    }
}

/// Application settings used to configure the frame driver and its resources.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Application name.
    pub name: String,
    /// Application version, as (major, minor, patch).
    pub version: (u32, u32, u32),
    /// Size of the frame ring. At most this many frames are recorded but not yet finished on the GPU.
    pub frames_in_flight: usize,
    /// Timeout for a single wait on a frame fence.
    pub fence_timeout: Duration,
    /// How many times a fence wait is retried before reporting [`Error::Timeout`](crate::Error::Timeout).
    pub fence_wait_attempts: u32,
    /// Timeout for acquiring a swapchain image.
    pub acquire_timeout: Duration,
    /// Preferred surface format. If it is not available, a default is chosen.
    pub surface_format: Option<vk::SurfaceFormatKHR>,
    /// Preferred present mode. `FIFO` is used when this is unavailable.
    pub present_mode: Option<vk::PresentModeKHR>,
    /// Depth-stencil format candidates, in order of preference. Leave empty to skip creating a depth-stencil target.
    pub depth_formats: Vec<vk::Format>,
    /// Initial size of the render area, used when the surface does not dictate one.
    pub extent: vk::Extent2D,
    /// Size of the host-visible uniform buffer every frame slot owns.
    pub uniform_buffer_size: Option<vk::DeviceSize>,
    /// Layout of the dynamic uniform buffer every frame slot owns.
    pub dynamic_uniform: Option<DynamicUniformSettings>,
    /// Enables the compute to graphics hand-off.
    pub compute: Option<ComputeSettings>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: String::from("deimos sample"),
            version: (1, 0, 0),
            frames_in_flight: MAX_FRAME_LAG,
            fence_timeout: Duration::from_secs(1),
            fence_wait_attempts: 3,
            acquire_timeout: Duration::from_secs(1),
            surface_format: None,
            present_mode: None,
            depth_formats: vec![
                vk::Format::D32_SFLOAT_S8_UINT,
                vk::Format::D24_UNORM_S8_UINT,
                vk::Format::D16_UNORM_S8_UINT,
            ],
            extent: vk::Extent2D {
                width: 1280,
                height: 720,
            },
            uniform_buffer_size: None,
            dynamic_uniform: None,
            compute: None,
        }
    }
}

impl AppSettings {
    /// Create a new app builder.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }
}

/// Used to facilitate creating an [`AppSettings`] correctly.
#[derive(Debug, Default)]
pub struct AppBuilder {
    inner: AppSettings,
}

impl AppBuilder {
    /// Create a new app builder with default settings.
    pub fn new() -> Self {
        AppBuilder {
            inner: AppSettings::default(),
        }
    }

    /// Set the application name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Set the application version.
    pub fn version(mut self, ver: impl Into<(u32, u32, u32)>) -> Self {
        self.inner.version = ver.into();
        self
    }

    /// Set the size of the frame ring.
    pub fn frames_in_flight(mut self, count: usize) -> Self {
        self.inner.frames_in_flight = count;
        self
    }

    /// Set the timeout of a single fence wait.
    pub fn fence_timeout(mut self, timeout: Duration) -> Self {
        self.inner.fence_timeout = timeout;
        self
    }

    /// Set how often a fence wait is attempted before giving up.
    pub fn fence_wait_attempts(mut self, attempts: u32) -> Self {
        self.inner.fence_wait_attempts = attempts.max(1);
        self
    }

    /// Set the swapchain acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.inner.acquire_timeout = timeout;
        self
    }

    /// Set the preferred surface format.
    pub fn surface_format(mut self, format: vk::SurfaceFormatKHR) -> Self {
        self.inner.surface_format = Some(format);
        self
    }

    /// Set the preferred present mode.
    pub fn present_mode(mut self, mode: vk::PresentModeKHR) -> Self {
        self.inner.present_mode = Some(mode);
        self
    }

    /// Set the depth-stencil format candidates.
    pub fn depth_formats(mut self, formats: impl Into<Vec<vk::Format>>) -> Self {
        self.inner.depth_formats = formats.into();
        self
    }

    /// Set the initial render area size.
    pub fn extent(mut self, width: u32, height: u32) -> Self {
        self.inner.extent = vk::Extent2D {
            width,
            height,
        };
        self
    }

    /// Give every frame slot a host-visible uniform buffer of `size` bytes.
    pub fn uniform_buffer(mut self, size: impl Into<vk::DeviceSize>) -> Self {
        self.inner.uniform_buffer_size = Some(size.into());
        self
    }

    /// Give every frame slot a dynamic uniform buffer with `count` records of `element_size` bytes.
    pub fn dynamic_uniform_buffer(mut self, element_size: impl Into<vk::DeviceSize>, count: usize) -> Self {
        self.inner.dynamic_uniform = Some(DynamicUniformSettings {
            element_size: element_size.into(),
            count,
        });
        self
    }

    /// Enable the compute to graphics hand-off.
    pub fn compute(mut self, settings: ComputeSettings) -> Self {
        self.inner.compute = Some(settings);
        self
    }

    /// Build the resulting application settings.
    pub fn build(self) -> AppSettings {
        self.inner
    }
}
