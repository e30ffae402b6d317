//! The swapchain and the render targets that are recreated together with it.
//!
//! [`SwapchainInterface`] is what the [`FrameManager`](crate::FrameManager) needs from a presentation engine. The
//! Vulkan implementation is [`Swapchain`], which owns its [`Surface`], the presentable images with their views and
//! a depth-stencil target of the same size.

use std::time::Duration;

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;

use crate::core::queue::QueueType;
use crate::image::{depth_aspect, Image, ImageView};
use crate::sync::fence::duration_to_ns;
use crate::{AppSettings, Device, Driver, Error, Surface};

/// Presentation engine used by the frame manager.
///
/// Acquire and present report raw Vulkan results: `Ok((_, true))` and `Ok(true)` mean the swapchain is suboptimal,
/// `Err(vk::Result::ERROR_OUT_OF_DATE_KHR)` means it must be recreated before it can be used again.
pub trait SwapchainInterface {
    /// Acquire the next image, signaling `signal` once it may be rendered to. Returns the image index and whether
    /// the swapchain is suboptimal.
    fn acquire_next_image(&mut self, signal: vk::Semaphore, timeout: Duration) -> VkResult<(u32, bool)>;
    /// Queue image `image_index` for presentation after `wait` is signaled. Returns whether the swapchain is suboptimal.
    fn present(&mut self, wait: vk::Semaphore, image_index: u32) -> VkResult<bool>;
    /// Recreate the swapchain and every target that depends on its size. No image may be in use.
    fn recreate(&mut self, extent: vk::Extent2D) -> Result<()>;
    /// Number of presentable images. This is unrelated to the number of frames in flight.
    fn image_count(&self) -> usize;
    /// Current size of the presentable images.
    fn extent(&self) -> vk::Extent2D;
    /// Format of the presentable images.
    fn format(&self) -> vk::SurfaceFormatKHR;
    /// Format of the depth-stencil target, if there is one.
    fn depth_format(&self) -> Option<vk::Format>;
}

#[derive(Debug)]
struct SwapchainImage {
    // Declared first so the view is destroyed before the image it refers to.
    view: ImageView,
    #[allow(dead_code)]
    image: Image,
}

#[derive(Debug)]
struct DepthStencil {
    view: ImageView,
    #[allow(dead_code)]
    image: Image,
}

/// A swapchain is an abstraction of a presentation system. It handles buffering, VSync, and acquiring images
/// to render and present frames to.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Swapchain {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::SwapchainKHR,
    images: Vec<SwapchainImage>,
    depth: Option<DepthStencil>,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    depth_formats: Vec<vk::Format>,
    /// Vulkan extension functions operating on the swapchain.
    #[derivative(Debug = "ignore")]
    functions: ash::extensions::khr::Swapchain,
    // Dropped last, the swapchain must be destroyed before its surface.
    surface: Surface,
}

impl Swapchain {
    /// Create a new swapchain for `surface`. `settings.extent` is used when the surface does not dictate a size.
    /// # Errors
    /// * [`Error::NoCapableQueue`] if the device has no graphics queue to present on.
    pub fn new(device: Device, mut surface: Surface, settings: &AppSettings) -> Result<Self> {
        device.queue(QueueType::Graphics)?;
        surface.query_details(device.physical_device())?;
        let format = surface.choose_format(settings.surface_format)?;
        let present_mode = surface.choose_present_mode(settings.present_mode);
        let functions = ash::extensions::khr::Swapchain::new(device.instance(), &device);
        let mut swapchain = Swapchain {
            device,
            handle: vk::SwapchainKHR::null(),
            images: vec![],
            depth: None,
            format,
            present_mode,
            extent: settings.extent,
            depth_formats: settings.depth_formats.clone(),
            functions,
            surface,
        };
        swapchain.create(settings.extent)?;
        Ok(swapchain)
    }

    fn choose_extent(&self, requested: vk::Extent2D) -> vk::Extent2D {
        let caps = self.surface.capabilities();
        if caps.current_extent.width != u32::MAX {
            return caps.current_extent;
        }
        vk::Extent2D {
            width: requested
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: requested
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }

    fn create(&mut self, requested: vk::Extent2D) -> Result<()> {
        self.surface.refresh_capabilities(self.device.physical_device())?;
        let extent = self.choose_extent(requested);
        let caps = *self.surface.capabilities();

        let image_count = {
            let mut count = caps.min_image_count + 1;
            // If a maximum is set, clamp to it
            if caps.max_image_count != 0 {
                count = count.min(caps.max_image_count);
            }
            count
        };

        let old = self.handle;
        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.surface.handle())
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(extent)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .present_mode(self.present_mode)
            .min_image_count(image_count)
            .clipped(true)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .old_swapchain(old)
            .build();
        let handle = unsafe { self.functions.create_swapchain(&info, None).map_err(Error::from)? };

        // Views of the old images must go before the old swapchain does.
        self.images.clear();
        self.depth = None;
        if old != vk::SwapchainKHR::null() {
            unsafe { self.functions.destroy_swapchain(old, None) };
        }
        self.handle = handle;
        self.extent = extent;

        self.images = unsafe { self.functions.get_swapchain_images(handle).map_err(Error::from)? }
            .into_iter()
            .map(|handle| -> Result<SwapchainImage> {
                // Memory is managed by the swapchain, not our application.
                let image = Image::new_managed(self.device.clone(), handle, self.format.format, extent);
                let view = image.view(vk::ImageAspectFlags::COLOR)?;
                Ok(SwapchainImage {
                    view,
                    image,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !self.depth_formats.is_empty() {
            let format = self.device.find_depth_format(&self.depth_formats)?;
            let image = Image::new_depth_stencil(self.device.clone(), format, extent)?;
            let view = image.view(depth_aspect(format))?;
            self.depth = Some(DepthStencil {
                view,
                image,
            });
        }

        info!(
            "Created swapchain with {} images of {}x{} ({:?}, {:?})",
            self.images.len(),
            extent.width,
            extent.height,
            self.format.format,
            self.present_mode
        );
        Ok(())
    }

    /// View of presentable image `index`, as returned from acquire.
    pub fn image_view(&self, index: u32) -> Option<&ImageView> {
        self.images.get(index as usize).map(|image| &image.view)
    }

    /// View of the depth-stencil target.
    pub fn depth_view(&self) -> Option<&ImageView> {
        self.depth.as_ref().map(|depth| &depth.view)
    }

    /// The present mode in use. `FIFO` unless another supported mode was requested.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Get the underlying vulkan handle.
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }
}

impl SwapchainInterface for Swapchain {
    fn acquire_next_image(&mut self, signal: vk::Semaphore, timeout: Duration) -> VkResult<(u32, bool)> {
        unsafe {
            self.functions
                .acquire_next_image(self.handle, duration_to_ns(timeout), signal, vk::Fence::null())
        }
    }

    fn present(&mut self, wait: vk::Semaphore, image_index: u32) -> VkResult<bool> {
        let swapchains = [self.handle];
        let waits = [wait];
        let indices = [image_index];
        let info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&waits)
            .swapchains(&swapchains)
            .image_indices(&indices)
            .build();
        let queue = match self.device.queue(QueueType::Graphics) {
            Ok(queue) => queue,
            Err(err) => {
                error!("Cannot present: {err}");
                return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
            }
        };
        let handle = match queue.lock() {
            Ok(handle) => handle,
            Err(err) => {
                error!("Cannot present: {err}");
                return Err(vk::Result::ERROR_UNKNOWN);
            }
        };
        unsafe { self.functions.queue_present(*handle, &info) }
    }

    fn recreate(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.device.wait_idle().map_err(Error::from)?;
        self.create(extent)
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    fn depth_format(&self) -> Option<vk::Format> {
        self.depth.as_ref().map(|depth| depth.view.format())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // We need to manually clear this list of images *before* deleting the swapchain,
        // otherwise, the imageview handles become invalid.
        self.images.clear();
        self.depth = None;
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkSwapchainKHR {:p}", self.handle);
        unsafe {
            self.functions.destroy_swapchain(self.handle, None);
        }
    }
}
