#![allow(dead_code)]

use std::alloc::Layout;
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use deimos::{Allocation, Allocator, Driver, MemoryType, QueueType, Submission, SwapchainInterface};

/// Installs a logger once per test binary.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Settings suitable for tests, waits on the mock never block so timeouts can be tiny.
pub fn settings() -> deimos::AppBuilder {
    deimos::AppBuilder::new()
        .name("deimos test framework")
        .version((0u32, 0u32, 1u32))
        .fence_timeout(Duration::from_millis(1))
        .acquire_timeout(Duration::from_millis(1))
}

/// A call made into the mock driver or mock swapchain, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    WaitFence(vk::Fence),
    ResetFence(vk::Fence),
    Acquire {
        semaphore: vk::Semaphore,
        image_index: Option<u32>,
    },
    Begin(vk::CommandBuffer),
    End(vk::CommandBuffer),
    Reset(vk::CommandBuffer),
    Submit {
        id: usize,
        queue: QueueType,
    },
    Present {
        semaphore: vk::Semaphore,
        image_index: u32,
    },
    Recreate(vk::Extent2D),
    WaitIdle,
}

/// Who signaled a semaphore.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signaler {
    Submission(usize),
    Acquire,
}

/// One queue submission as seen by the mock GPU.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub id: usize,
    pub queue: QueueType,
    pub waits: Vec<(vk::Semaphore, vk::PipelineStageFlags)>,
    pub signals: Vec<vk::Semaphore>,
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub fence: vk::Fence,
    /// Who signaled each wait semaphore, in the same order as `waits`.
    pub dependencies: Vec<Option<Signaler>>,
    pub started: Option<u64>,
    pub finished: Option<u64>,
}

#[derive(Debug, Default)]
struct FenceState {
    signaled: bool,
    pending: Option<usize>,
}

/// Complete state of the mock GPU.
#[derive(Debug, Default)]
pub struct GpuState {
    next_handle: u64,
    pub calls: Vec<Call>,
    pub submissions: Vec<SubmissionRecord>,
    pub violations: Vec<String>,
    fences: HashMap<vk::Fence, FenceState>,
    semaphores: HashMap<vk::Semaphore, VecDeque<Signaler>>,
    pools: HashMap<vk::CommandPool, QueueType>,
    command_buffers: HashMap<vk::CommandBuffer, vk::CommandPool>,
    /// Command buffers between begin and end.
    pub recording: HashSet<vk::CommandBuffer>,
    buffers: HashMap<vk::Buffer, vk::DeviceSize>,
    pub live_allocations: usize,
    pub max_outstanding: usize,
    clock: u64,
    pub min_alignment: u64,
    /// Every wait returns `ERROR_DEVICE_LOST`.
    pub device_lost: bool,
    /// Submitted work never finishes, so fence waits time out.
    pub hang: bool,
    /// Errors returned by the next submissions to a queue, instead of accepting them.
    pub submit_failures: VecDeque<(QueueType, vk::Result)>,
}

impl GpuState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn violation(&mut self, message: String) {
        log::error!("protocol violation: {message}");
        self.violations.push(message);
    }

    fn is_pending(&self, cmd: vk::CommandBuffer) -> bool {
        self.submissions
            .iter()
            .any(|s| s.finished.is_none() && s.command_buffers.contains(&cmd))
    }

    fn outstanding(&self) -> usize {
        self.submissions
            .iter()
            .filter(|s| s.finished.is_none() && s.fence != vk::Fence::null())
            .count()
    }

    /// Execute every submission up to and including `id`, in submission order.
    fn complete_until(&mut self, id: usize) {
        for index in 0..self.submissions.len() {
            if self.submissions[index].id > id {
                break;
            }
            if self.submissions[index].finished.is_some() {
                continue;
            }
            self.clock += 1;
            let started = self.clock;
            self.clock += 1;
            let finished = self.clock;
            let record = &mut self.submissions[index];
            record.started = Some(started);
            record.finished = Some(finished);
            let fence = record.fence;
            if let Some(state) = self.fences.get_mut(&fence) {
                state.signaled = true;
                state.pending = None;
            }
        }
    }

    fn complete_all(&mut self) {
        if let Some(last) = self.submissions.last().map(|s| s.id) {
            self.complete_until(last);
        }
    }

    fn signal(&mut self, semaphore: vk::Semaphore, by: Signaler) {
        match self.semaphores.get_mut(&semaphore) {
            Some(signals) => {
                signals.push_back(by);
                if signals.len() > 1 {
                    self.violation(format!("binary semaphore {semaphore:?} signaled twice without a wait"));
                }
            }
            None => self.violation(format!("signal of unknown semaphore {semaphore:?}")),
        }
    }

    fn consume(&mut self, semaphore: vk::Semaphore) -> Option<Signaler> {
        let signaler = self
            .semaphores
            .get_mut(&semaphore)
            .and_then(|signals| signals.pop_front());
        if signaler.is_none() {
            self.violation(format!("wait on semaphore {semaphore:?} that has no pending signal"));
        }
        signaler
    }

    pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| f(call)).count()
    }

    pub fn submission(&self, id: usize) -> &SubmissionRecord {
        &self.submissions[id]
    }

    /// Number of Vulkan objects and allocations that are still alive.
    pub fn live_objects(&self) -> usize {
        self.fences.len()
            + self.semaphores.len()
            + self.pools.len()
            + self.command_buffers.len()
            + self.buffers.len()
            + self.live_allocations
    }

    pub fn live_command_buffers(&self) -> usize {
        self.command_buffers.len()
    }

    pub fn fence_is_signaled(&self, fence: vk::Fence) -> bool {
        self.fences.get(&fence).map(|f| f.signaled).unwrap_or(false)
    }
}

/// Driver that records every call and models fences and binary semaphores, with submissions executing in order.
/// Work only finishes when something waits for it.
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<GpuState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::with_alignment(256)
    }

    pub fn with_alignment(min_alignment: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(GpuState {
                min_alignment,
                ..Default::default()
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<GpuState> {
        self.state.lock().unwrap()
    }
}

impl Driver for MockDriver {
    type Allocator = MockAllocator;

    fn allocator(&self) -> MockAllocator {
        MockAllocator {
            state: self.state.clone(),
        }
    }

    fn limits(&self) -> vk::PhysicalDeviceLimits {
        vk::PhysicalDeviceLimits {
            min_uniform_buffer_offset_alignment: self.state().min_alignment,
            ..Default::default()
        }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let mut state = self.state();
        let fence = vk::Fence::from_raw(state.handle());
        state.fences.insert(
            fence,
            FenceState {
                signaled,
                pending: None,
            },
        );
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut state = self.state();
        let removed = state.fences.remove(&fence);
        if let Some(FenceState {
            pending: Some(id),
            ..
        }) = removed
        {
            state.violation(format!("fence {fence:?} destroyed while submission {id} is pending"));
        }
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout: u64) -> VkResult<()> {
        let mut state = self.state();
        state.calls.push(Call::WaitFence(fence));
        if state.device_lost {
            return Err(vk::Result::ERROR_DEVICE_LOST);
        }
        let Some((signaled, pending)) = state.fences.get(&fence).map(|f| (f.signaled, f.pending)) else {
            state.violation(format!("wait on unknown fence {fence:?}"));
            return Err(vk::Result::ERROR_UNKNOWN);
        };
        match (signaled, pending) {
            (true, _) => Ok(()),
            (false, Some(id)) if !state.hang => {
                state.complete_until(id);
                Ok(())
            }
            _ => Err(vk::Result::TIMEOUT),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        let mut state = self.state();
        state.calls.push(Call::ResetFence(fence));
        let pending = state.fences.get(&fence).and_then(|f| f.pending);
        if let Some(id) = pending {
            state.violation(format!("fence {fence:?} reset while submission {id} is pending"));
        }
        if let Some(f) = state.fences.get_mut(&fence) {
            f.signaled = false;
        }
        Ok(())
    }

    fn fence_status(&self, fence: vk::Fence) -> VkResult<bool> {
        Ok(self.state().fence_is_signaled(fence))
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let mut state = self.state();
        let semaphore = vk::Semaphore::from_raw(state.handle());
        state.semaphores.insert(semaphore, VecDeque::new());
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.state().semaphores.remove(&semaphore);
    }

    fn create_command_pool(&self, queue: QueueType) -> Result<vk::CommandPool> {
        let mut state = self.state();
        let pool = vk::CommandPool::from_raw(state.handle());
        state.pools.insert(pool, queue);
        Ok(pool)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut state = self.state();
        state.pools.remove(&pool);
        state.command_buffers.retain(|_, owner| *owner != pool);
    }

    fn allocate_command_buffers(&self, pool: vk::CommandPool, count: u32) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut state = self.state();
        Ok((0..count)
            .map(|_| {
                let cmd = vk::CommandBuffer::from_raw(state.handle());
                state.command_buffers.insert(cmd, pool);
                cmd
            })
            .collect())
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, command_buffers: &[vk::CommandBuffer]) {
        let mut state = self.state();
        for cmd in command_buffers {
            if state.is_pending(*cmd) {
                state.violation(format!("command buffer {cmd:?} freed while pending"));
            }
            state.command_buffers.remove(cmd);
            state.recording.remove(cmd);
        }
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer, _flags: vk::CommandBufferUsageFlags) -> VkResult<()> {
        let mut state = self.state();
        state.calls.push(Call::Begin(cmd));
        if !state.command_buffers.contains_key(&cmd) {
            state.violation(format!("begin on freed command buffer {cmd:?}"));
        }
        if state.is_pending(cmd) {
            state.violation(format!("command buffer {cmd:?} re-recorded while pending"));
        }
        if !state.recording.insert(cmd) {
            state.violation(format!("begin on command buffer {cmd:?} while it is still recording"));
        }
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let mut state = self.state();
        state.calls.push(Call::End(cmd));
        if !state.recording.remove(&cmd) {
            state.violation(format!("end on command buffer {cmd:?} that is not recording"));
        }
        Ok(())
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        let mut state = self.state();
        state.calls.push(Call::Reset(cmd));
        if state.is_pending(cmd) {
            state.violation(format!("command buffer {cmd:?} reset while pending"));
        }
        state.recording.remove(&cmd);
        Ok(())
    }

    fn queue_submit(&self, queue: QueueType, submission: &Submission, fence: vk::Fence) -> Result<()> {
        let mut state = self.state();
        if let Some((failing, err)) = state.submit_failures.front().copied() {
            if failing == queue {
                state.submit_failures.pop_front();
                return Err(deimos::Error::from(err).into());
            }
        }
        let id = state.submissions.len();
        for cmd in &submission.command_buffers {
            if state.recording.contains(cmd) {
                state.violation(format!("submission {id} uses command buffer {cmd:?} that is still recording"));
            }
        }
        state.calls.push(Call::Submit {
            id,
            queue,
        });
        if fence != vk::Fence::null() {
            let (signaled, pending) = state
                .fences
                .get(&fence)
                .map(|f| (f.signaled, f.pending))
                .unwrap_or_default();
            if signaled || pending.is_some() {
                state.violation(format!("submission {id} uses fence {fence:?} that is not reset"));
            }
            if let Some(f) = state.fences.get_mut(&fence) {
                f.pending = Some(id);
            }
        }
        let dependencies = submission
            .wait_semaphores
            .iter()
            .map(|semaphore| state.consume(*semaphore))
            .collect::<Vec<_>>();
        for semaphore in &submission.signal_semaphores {
            state.signal(*semaphore, Signaler::Submission(id));
        }
        state.submissions.push(SubmissionRecord {
            id,
            queue,
            waits: submission
                .wait_semaphores
                .iter()
                .copied()
                .zip(submission.wait_stages.iter().copied())
                .collect(),
            signals: submission.signal_semaphores.clone(),
            command_buffers: submission.command_buffers.clone(),
            fence,
            dependencies,
            started: None,
            finished: None,
        });
        let outstanding = state.outstanding();
        state.max_outstanding = state.max_outstanding.max(outstanding);
        Ok(())
    }

    fn create_buffer(&self, size: vk::DeviceSize, _usage: vk::BufferUsageFlags) -> VkResult<vk::Buffer> {
        let mut state = self.state();
        let buffer = vk::Buffer::from_raw(state.handle());
        state.buffers.insert(buffer, size);
        Ok(buffer)
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        vk::MemoryRequirements {
            size: self.state().buffers.get(&buffer).copied().unwrap_or_default(),
            alignment: 256,
            memory_type_bits: !0,
        }
    }

    fn bind_buffer_memory(&self, _buffer: vk::Buffer, _memory: vk::DeviceMemory, _offset: vk::DeviceSize) -> VkResult<()> {
        Ok(())
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.state().buffers.remove(&buffer);
    }

    fn wait_idle(&self) -> VkResult<()> {
        let mut state = self.state();
        state.calls.push(Call::WaitIdle);
        if state.device_lost {
            return Err(vk::Result::ERROR_DEVICE_LOST);
        }
        if !state.hang {
            state.complete_all();
        }
        Ok(())
    }
}

/// Allocator handing out zeroed host memory.
#[derive(Debug, Clone)]
pub struct MockAllocator {
    state: Arc<Mutex<GpuState>>,
}

#[derive(Debug)]
pub struct MockAllocation {
    state: Arc<Mutex<GpuState>>,
    ptr: NonNull<u8>,
    layout: Layout,
    memory: vk::DeviceMemory,
    mapped: bool,
}

unsafe impl Send for MockAllocation {}
unsafe impl Sync for MockAllocation {}

impl Allocator for MockAllocator {
    type Allocation = MockAllocation;

    fn allocate(&mut self, _name: &'static str, requirements: &vk::MemoryRequirements, ty: MemoryType) -> Result<MockAllocation> {
        let size = (requirements.size as usize).max(1);
        let layout = Layout::from_size_align(size, 256)?;
        let ptr = NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) }).ok_or_else(|| anyhow::anyhow!("out of host memory"))?;
        let mut state = self.state.lock().unwrap();
        state.live_allocations += 1;
        let memory = vk::DeviceMemory::from_raw(state.handle());
        Ok(MockAllocation {
            state: self.state.clone(),
            ptr,
            layout,
            memory,
            mapped: ty.is_host_visible(),
        })
    }

    fn free(&mut self, allocation: MockAllocation) -> Result<()> {
        drop(allocation);
        Ok(())
    }
}

impl Allocation for MockAllocation {
    unsafe fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    fn offset(&self) -> vk::DeviceSize {
        0
    }

    fn mapped_ptr(&self) -> Option<NonNull<c_void>> {
        self.mapped.then(|| self.ptr.cast::<c_void>())
    }
}

impl Drop for MockAllocation {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        self.state.lock().unwrap().live_allocations -= 1;
    }
}

/// Scripted state of the mock swapchain.
#[derive(Debug)]
pub struct SwapchainState {
    pub image_count: usize,
    pub extent: vk::Extent2D,
    pub format: vk::SurfaceFormatKHR,
    pub depth_format: Option<vk::Format>,
    /// Image indices returned by acquire. When empty, images are handed out round robin.
    pub image_script: VecDeque<u32>,
    /// Results of the next acquires. `Ok(true)` means suboptimal. When empty, acquires succeed.
    pub acquire_results: VecDeque<VkResult<bool>>,
    /// Results of the next presents. When empty, presents succeed.
    pub present_results: VecDeque<VkResult<bool>>,
    pub recreated: Vec<vk::Extent2D>,
    next_image: u32,
}

/// Swapchain that hands out scripted image indices and results.
#[derive(Debug)]
pub struct MockSwapchain {
    driver: MockDriver,
    state: Mutex<SwapchainState>,
}

impl MockSwapchain {
    pub fn new(driver: &MockDriver, image_count: usize) -> Self {
        Self {
            driver: driver.clone(),
            state: Mutex::new(SwapchainState {
                image_count,
                extent: vk::Extent2D {
                    width: 1280,
                    height: 720,
                },
                format: vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                depth_format: Some(vk::Format::D32_SFLOAT_S8_UINT),
                image_script: VecDeque::new(),
                acquire_results: VecDeque::new(),
                present_results: VecDeque::new(),
                recreated: vec![],
                next_image: 0,
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<SwapchainState> {
        self.state.lock().unwrap()
    }
}

impl SwapchainInterface for MockSwapchain {
    fn acquire_next_image(&mut self, signal: vk::Semaphore, _timeout: Duration) -> VkResult<(u32, bool)> {
        let result = {
            let mut sc = self.state();
            match sc.acquire_results.pop_front().unwrap_or(Ok(false)) {
                Ok(suboptimal) => {
                    let index = match sc.image_script.pop_front() {
                        Some(index) => index,
                        None => {
                            let index = sc.next_image;
                            sc.next_image = (sc.next_image + 1) % sc.image_count as u32;
                            index
                        }
                    };
                    Ok((index, suboptimal))
                }
                Err(err) => Err(err),
            }
        };
        let mut gpu = self.driver.state();
        gpu.calls.push(Call::Acquire {
            semaphore: signal,
            image_index: result.as_ref().ok().map(|(index, _)| *index),
        });
        if result.is_ok() {
            gpu.signal(signal, Signaler::Acquire);
        }
        result
    }

    fn present(&mut self, wait: vk::Semaphore, image_index: u32) -> VkResult<bool> {
        {
            let mut gpu = self.driver.state();
            gpu.calls.push(Call::Present {
                semaphore: wait,
                image_index,
            });
            // The wait happens even when the swapchain turns out to be out of date.
            gpu.consume(wait);
        }
        self.state().present_results.pop_front().unwrap_or(Ok(false))
    }

    fn recreate(&mut self, extent: vk::Extent2D) -> Result<()> {
        self.driver.state().calls.push(Call::Recreate(extent));
        let mut sc = self.state();
        sc.extent = extent;
        sc.next_image = 0;
        sc.recreated.push(extent);
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.state().image_count
    }

    fn extent(&self) -> vk::Extent2D {
        self.state().extent
    }

    fn format(&self) -> vk::SurfaceFormatKHR {
        self.state().format
    }

    fn depth_format(&self) -> Option<vk::Format> {
        self.state().depth_format
    }
}

/// Size of a window, as the frame manager sees it. A zero width or height is a minimized window.
pub fn window(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D {
        width,
        height,
    }
}
