use std::time::Duration;

use anyhow::Result;
use ash::vk;
use deimos::prelude::*;

#[test]
pub fn defaults() -> Result<()> {
    let settings = AppSettings::default();
    assert_eq!(settings.frames_in_flight, MAX_FRAME_LAG);
    assert_eq!(settings.frames_in_flight, 2);
    assert_eq!(settings.fence_timeout, Duration::from_secs(1));
    assert_eq!(settings.fence_wait_attempts, 3);
    assert_eq!(settings.acquire_timeout, Duration::from_secs(1));
    assert_eq!(settings.surface_format, None);
    assert_eq!(settings.present_mode, None);
    assert_eq!(settings.depth_formats.first(), Some(&vk::Format::D32_SFLOAT_S8_UINT));
    assert_eq!(
        settings.extent,
        vk::Extent2D {
            width: 1280,
            height: 720
        }
    );
    assert!(settings.uniform_buffer_size.is_none());
    assert!(settings.dynamic_uniform.is_none());
    assert!(settings.compute.is_none());
    Ok(())
}

#[test]
pub fn builder_sets_every_field() -> Result<()> {
    let format = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    let settings = AppSettings::builder()
        .name("02g compute image")
        .version((0u32, 2u32, 7u32))
        .frames_in_flight(3)
        .fence_timeout(Duration::from_millis(250))
        .fence_wait_attempts(5)
        .acquire_timeout(Duration::from_millis(100))
        .surface_format(format)
        .present_mode(vk::PresentModeKHR::MAILBOX)
        .depth_formats(vec![vk::Format::D24_UNORM_S8_UINT])
        .extent(1920, 1080)
        .uniform_buffer(128u64)
        .dynamic_uniform_buffer(80u64, 16)
        .compute(ComputeSettings::image())
        .build();

    assert_eq!(settings.name, "02g compute image");
    assert_eq!(settings.version, (0, 2, 7));
    assert_eq!(settings.frames_in_flight, 3);
    assert_eq!(settings.fence_timeout, Duration::from_millis(250));
    assert_eq!(settings.fence_wait_attempts, 5);
    assert_eq!(settings.acquire_timeout, Duration::from_millis(100));
    assert_eq!(settings.surface_format, Some(format));
    assert_eq!(settings.present_mode, Some(vk::PresentModeKHR::MAILBOX));
    assert_eq!(settings.depth_formats, vec![vk::Format::D24_UNORM_S8_UINT]);
    assert_eq!(settings.extent.width, 1920);
    assert_eq!(settings.uniform_buffer_size, Some(128));
    assert_eq!(
        settings.dynamic_uniform,
        Some(DynamicUniformSettings {
            element_size: 80,
            count: 16
        })
    );
    assert_eq!(settings.compute.map(|c| c.graphics_wait_stage), Some(vk::PipelineStageFlags::FRAGMENT_SHADER));
    Ok(())
}

#[test]
pub fn at_least_one_fence_wait() -> Result<()> {
    let settings = AppBuilder::new().fence_wait_attempts(0).build();
    assert_eq!(settings.fence_wait_attempts, 1);
    Ok(())
}

#[test]
pub fn compute_presets() -> Result<()> {
    assert_eq!(ComputeSettings::default(), ComputeSettings::particles());
    assert_eq!(ComputeSettings::particles().graphics_wait_stage, vk::PipelineStageFlags::VERTEX_INPUT);
    assert_eq!(ComputeSettings::image().graphics_wait_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    Ok(())
}

#[test]
pub fn submission_builder() -> Result<()> {
    let semaphore = vk::Semaphore::null();
    let submission = Submission::new()
        .wait(semaphore, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .signal(semaphore);
    assert_eq!(submission.wait_semaphores.len(), submission.wait_stages.len());
    assert!(submission.is_empty(), "A submission without command buffers is empty");
    let submission = submission.command_buffer(vk::CommandBuffer::null());
    assert!(!submission.is_empty());
    assert_eq!(submission.signal_semaphores, vec![semaphore]);
    Ok(())
}
