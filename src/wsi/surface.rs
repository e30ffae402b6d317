//! Wrappers around a `VkSurfaceKHR`

use std::ops::Deref;

use anyhow::Result;
use ash::vk;

use crate::{Error, Window};

/// Contains all information about a [`VkSurfaceKHR`](vk::SurfaceKHR)
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Surface {
    /// Handle to the [`VkSurfaceKHR`](vk::SurfaceKHR)
    handle: vk::SurfaceKHR,
    /// [`VkSurfaceCapabilitiesKHR`](vk::SurfaceCapabilitiesKHR) structure storing information about surface capabilities.
    capabilities: vk::SurfaceCapabilitiesKHR,
    /// List of [`VkSurfaceFormatKHR`](vk::SurfaceFormatKHR) with all formats this surface supports.
    formats: Vec<vk::SurfaceFormatKHR>,
    /// List of [`VkPresentModeKHR`](vk::PresentModeKHR) with all present modes this surface supports.
    present_modes: Vec<vk::PresentModeKHR>,
    /// Vulkan extension functions for surface handling.
    #[derivative(Debug = "ignore")]
    functions: ash::extensions::khr::Surface,
}

impl Surface {
    /// Create a new surface.
    pub fn new(entry: &ash::Entry, instance: &ash::Instance, window: &dyn Window) -> Result<Self> {
        let functions = ash::extensions::khr::Surface::new(entry, instance);
        let handle = unsafe {
            ash_window::create_surface(entry, instance, window.raw_display_handle(), window.raw_window_handle(), None)
                .map_err(Error::from)?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkSurfaceKHR {handle:p}");
        Ok(Surface {
            handle,
            functions,
            capabilities: Default::default(),
            formats: vec![],
            present_modes: vec![],
        })
    }

    /// Query support for features, capabilities and formats for this surface.
    /// Because surface support varies per physical device, this function requires one to be selected.
    pub fn query_details(&mut self, physical_device: vk::PhysicalDevice) -> Result<()> {
        unsafe {
            self.capabilities = self
                .get_physical_device_surface_capabilities(physical_device, self.handle)
                .map_err(Error::from)?;
            self.formats = self
                .get_physical_device_surface_formats(physical_device, self.handle)
                .map_err(Error::from)?;
            self.present_modes = self
                .get_physical_device_surface_present_modes(physical_device, self.handle)
                .map_err(Error::from)?;
        }
        Ok(())
    }

    /// Re-query only the capabilities, whose current extent changes whenever the window is resized.
    pub fn refresh_capabilities(&mut self, physical_device: vk::PhysicalDevice) -> Result<&vk::SurfaceCapabilitiesKHR> {
        self.capabilities = unsafe {
            self.get_physical_device_surface_capabilities(physical_device, self.handle)
                .map_err(Error::from)?
        };
        Ok(&self.capabilities)
    }

    /// Pick the preferred surface format if it is supported, then `B8G8R8A8_SRGB` with an sRGB colour space, then the
    /// first supported format.
    pub fn choose_format(&self, preferred: Option<vk::SurfaceFormatKHR>) -> Result<vk::SurfaceFormatKHR> {
        let fallback = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        preferred
            .into_iter()
            .chain(std::iter::once(fallback))
            .find(|wanted| {
                self.formats
                    .iter()
                    .any(|f| f.format == wanted.format && f.color_space == wanted.color_space)
            })
            .or_else(|| self.formats.first().copied())
            .ok_or_else(|| Error::NoSurfaceFormat.into())
    }

    /// Pick the preferred present mode if it is supported, `FIFO` otherwise. `FIFO` support is guaranteed.
    pub fn choose_present_mode(&self, preferred: Option<vk::PresentModeKHR>) -> vk::PresentModeKHR {
        preferred
            .filter(|mode| self.present_modes.contains(mode))
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }

    /// Get the underlying `VkSurfaceKHR` object.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Get the surface capabilities.
    pub fn capabilities(&self) -> &vk::SurfaceCapabilitiesKHR {
        &self.capabilities
    }

    /// Get the available surface formats.
    pub fn formats(&self) -> &[vk::SurfaceFormatKHR] {
        self.formats.as_slice()
    }

    /// Get the available surface present modes.
    pub fn present_modes(&self) -> &[vk::PresentModeKHR] {
        self.present_modes.as_slice()
    }
}

impl Deref for Surface {
    type Target = ash::extensions::khr::Surface;

    /// Get access to the `VK_KHR_surface` extension functions.
    fn deref(&self) -> &Self::Target {
        &self.functions
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkSurfaceKHR {:p}", self.handle);
        unsafe {
            self.functions.destroy_surface(self.handle, None);
        }
    }
}
