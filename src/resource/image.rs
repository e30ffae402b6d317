//! Provides utilities to manage [`VkImage`](vk::Image) and [`VkImageView`](vk::ImageView) objects.
//!
//! Only the 2D render targets a swapchain needs are covered: presentable colour images, which are owned by the
//! swapchain, and the depth-stencil image every sample renders with, which owns its memory.

use anyhow::Result;
use ash::vk;

use crate::allocator::default_allocator::Allocation as DefaultAllocation;
use crate::{Allocation, Allocator, Device, Driver, Error, MemoryType};

/// Abstraction over a 2D [`VkImage`](vk::Image). Couples the image together with its memory allocation.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Image {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Image,
    /// If this is None, the image is not owned by us (for example a swapchain image) and is not destroyed.
    #[derivative(Debug = "ignore")]
    memory: Option<DefaultAllocation>,
    format: vk::Format,
    extent: vk::Extent2D,
}

/// Abstraction over a [`VkImageView`](vk::ImageView) covering a whole 2D image.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ImageView {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::ImageView,
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
}

/// Aspect flags for a depth or depth-stencil format.
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}

impl Image {
    /// Create a depth-stencil attachment in device-local memory.
    pub fn new_depth_stencil(device: Device, format: vk::Format, extent: vk::Extent2D) -> Result<Self> {
        let info = vk::ImageCreateInfo {
            s_type: vk::StructureType::IMAGE_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: Default::default(),
            image_type: vk::ImageType::TYPE_2D,
            format,
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            queue_family_index_count: 0,
            p_queue_family_indices: std::ptr::null(),
            initial_layout: vk::ImageLayout::UNDEFINED,
        };
        let handle = unsafe { device.create_image(&info, None).map_err(Error::from)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImage {handle:p}");

        let requirements = unsafe { device.get_image_memory_requirements(handle) };
        let memory = match device.allocator().allocate("depth_stencil", &requirements, MemoryType::GpuOnly) {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_image(handle, None) };
                return Err(err);
            }
        };
        if let Err(err) = unsafe { device.bind_image_memory(handle, memory.memory(), memory.offset()) } {
            unsafe { device.destroy_image(handle, None) };
            return Err(Error::from(err).into());
        }

        Ok(Self {
            device,
            handle,
            memory: Some(memory),
            format,
            extent,
        })
    }

    /// Wrap an image owned by someone else, such as the swapchain.
    pub(crate) fn new_managed(device: Device, handle: vk::Image, format: vk::Format, extent: vk::Extent2D) -> Self {
        Self {
            device,
            handle,
            memory: None,
            format,
            extent,
        }
    }

    /// Construct an [`ImageView`] that views the whole image.
    pub fn view(&self, aspect: vk::ImageAspectFlags) -> Result<ImageView> {
        let info = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: Default::default(),
            image: self.handle,
            view_type: vk::ImageViewType::TYPE_2D,
            format: self.format,
            components: vk::ComponentMapping::default(),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
        };
        let handle = unsafe { self.device.create_image_view(&info, None).map_err(Error::from)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImageView {handle:p}");
        Ok(ImageView {
            device: self.device.clone(),
            handle,
            image: self.handle,
            format: self.format,
            aspect,
        })
    }

    /// Whether this image resource is owned by the application or an external manager (such as the swapchain).
    pub fn is_owned(&self) -> bool {
        self.memory.is_some()
    }

    /// Get the raw `VkImage` handle.
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    /// Get the image format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Get the image size
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if self.is_owned() {
            #[cfg(feature = "log-objects")]
            trace!("Destroying VkImage {:p}", self.handle);
            unsafe {
                self.device.destroy_image(self.handle, None);
            }
        }
    }
}

impl ImageView {
    /// Get the raw `VkImageView` handle.
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }

    /// Get the image this view was created from.
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Get the format of this view
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Get the aspect this view covers
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImageView {:p}", self.handle);
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
    }
}
