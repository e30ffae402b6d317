use std::cell::RefCell;
use std::time::Duration;

use anyhow::Result;
use ash::vk;
use deimos::prelude::*;

use crate::framework::{window, MockDriver, MockSwapchain};

mod framework;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn event(name: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(name.into()));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| events.take())
}

#[derive(Debug)]
struct Triangle {
    frames: usize,
}

impl Sample<MockDriver, MockSwapchain> for Triangle {
    fn init(ctx: &SampleContext<MockDriver, MockSwapchain>) -> Result<Self> {
        event(format!("init {}", ctx.frames_in_flight));
        Ok(Self {
            frames: 0,
        })
    }

    fn update(&mut self, _delta: Duration) -> Result<()> {
        event("update");
        Ok(())
    }

    fn render(&mut self, ifc: &mut InFlightContext<MockDriver, MockSwapchain>) -> Result<()> {
        event(format!("render {}", ifc.frame_index));
        self.frames += 1;
        Ok(())
    }

    fn resize(&mut self, _ctx: &SampleContext<MockDriver, MockSwapchain>, extent: vk::Extent2D) -> Result<()> {
        event(format!("resize {}x{}", extent.width, extent.height));
        Ok(())
    }

    fn destroy(&mut self, _ctx: &SampleContext<MockDriver, MockSwapchain>) {
        event("destroy");
    }
}

#[derive(Debug)]
struct Minimal;

impl Sample<MockDriver, MockSwapchain> for Minimal {
    fn init(_ctx: &SampleContext<MockDriver, MockSwapchain>) -> Result<Self> {
        Ok(Minimal)
    }

    fn render(&mut self, _ifc: &mut InFlightContext<MockDriver, MockSwapchain>) -> Result<()> {
        event("render");
        Ok(())
    }
}

fn runner<T: Sample<MockDriver, MockSwapchain>>(driver: &MockDriver) -> Result<SampleRunner<MockDriver, MockSwapchain, T>> {
    let settings = framework::settings().name("01a triangle").frames_in_flight(2).build();
    SampleRunner::new(driver.clone(), MockSwapchain::new(driver, 3), &settings)
}

#[test]
pub fn lifecycle_order() -> Result<()> {
    framework::init_logging();
    take_events();
    let driver = MockDriver::new();
    let mut runner = runner::<Triangle>(&driver)?;

    runner.frame(&window(1280, 720))?;
    runner.frame(&window(1280, 720))?;
    runner.resize(window(640, 480))?;
    runner.frame(&window(640, 480))?;
    assert_eq!(runner.sample().map(|s| s.frames), Some(3));
    runner.shutdown()?;

    assert_eq!(
        take_events(),
        vec!["init 2", "update", "render 0", "update", "render 1", "resize 640x480", "update", "render 0", "destroy"]
    );
    assert_eq!(driver.state().live_objects(), 0);
    Ok(())
}

#[test]
pub fn out_of_date_present_notifies_sample() -> Result<()> {
    take_events();
    let driver = MockDriver::new();
    let mut runner = runner::<Triangle>(&driver)?;
    runner
        .frame_manager()
        .swapchain()
        .state()
        .present_results
        .push_back(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));

    assert_eq!(runner.frame(&window(800, 600))?, FrameOutcome::Resized(window(800, 600)));
    drop(runner);
    assert_eq!(take_events(), vec!["init 2", "update", "render 0", "resize 800x600", "destroy"]);
    Ok(())
}

#[test]
pub fn minimized_window_does_not_render() -> Result<()> {
    take_events();
    let driver = MockDriver::new();
    let mut runner = runner::<Triangle>(&driver)?;
    assert_eq!(runner.frame(&window(0, 0))?, FrameOutcome::Skipped);
    assert_eq!(runner.frame_manager().frame_number(), 0);
    runner.shutdown()?;
    assert_eq!(take_events(), vec!["init 2", "destroy"]);
    Ok(())
}

#[test]
pub fn default_hooks_are_optional() -> Result<()> {
    take_events();
    let driver = MockDriver::new();
    let mut runner = runner::<Minimal>(&driver)?;
    runner.frame(&window(1280, 720))?;
    runner.resize(window(1920, 1080))?;
    runner.frame(&window(1920, 1080))?;
    runner.shutdown()?;
    assert_eq!(take_events(), vec!["render", "render"]);
    Ok(())
}

#[test]
pub fn out_of_date_acquire_notifies_sample_before_render() -> Result<()> {
    take_events();
    let driver = MockDriver::new();
    let mut runner = runner::<Triangle>(&driver)?;
    runner
        .frame_manager()
        .swapchain()
        .state()
        .acquire_results
        .push_back(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));

    assert_eq!(runner.frame(&window(800, 600))?, FrameOutcome::Presented);
    assert_eq!(runner.frame_manager().swapchain().state().recreated, vec![window(800, 600)]);
    runner.frame(&window(800, 600))?;
    runner.shutdown()?;
    assert_eq!(
        take_events(),
        vec!["init 2", "resize 800x600", "update", "render 0", "update", "render 1", "destroy"]
    );
    Ok(())
}

#[test]
pub fn skipped_frame_after_recreation_notifies_sample() -> Result<()> {
    take_events();
    let driver = MockDriver::new();
    let mut runner = runner::<Triangle>(&driver)?;
    runner.frame_manager().swapchain().state().acquire_results.extend([
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR),
    ]);

    assert_eq!(runner.frame(&window(800, 600))?, FrameOutcome::Resized(window(800, 600)));
    assert_eq!(runner.frame_manager().frame_number(), 0);
    runner.shutdown()?;
    assert_eq!(take_events(), vec!["init 2", "resize 800x600", "destroy"]);
    assert!(driver.state().violations.is_empty());
    Ok(())
}
