//! Description of a single queue submission, independent of the driver that executes it.

use ash::vk;

/// One batch of command buffers submitted to a queue, together with the semaphores it waits on and signals.
///
/// # Example
/// ```
/// use deimos::prelude::*;
/// use deimos::sync::submit::Submission;
///
/// let image_available = vk::Semaphore::null();
/// let rendering_finished = vk::Semaphore::null();
/// let cmd = vk::CommandBuffer::null();
/// let submission = Submission::new()
///     .wait(image_available, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
///     .command_buffer(cmd)
///     .signal(rendering_finished);
/// assert_eq!(submission.wait_semaphores.len(), submission.wait_stages.len());
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Semaphores to wait on before the matching stage in `wait_stages` may execute.
    pub wait_semaphores: Vec<vk::Semaphore>,
    /// Stage mask for each wait semaphore.
    pub wait_stages: Vec<vk::PipelineStageFlags>,
    /// Command buffers to execute, in order.
    pub command_buffers: Vec<vk::CommandBuffer>,
    /// Semaphores signaled once all command buffers completed.
    pub signal_semaphores: Vec<vk::Semaphore>,
}

impl Submission {
    /// Create an empty submission. Submitting it as-is only signals its fence, which is useful to re-arm fences
    /// and pre-signal semaphores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait on a semaphore at the given stage.
    pub fn wait(mut self, semaphore: vk::Semaphore, stage: vk::PipelineStageFlags) -> Self {
        self.wait_semaphores.push(semaphore);
        self.wait_stages.push(stage);
        self
    }

    /// Add a command buffer.
    pub fn command_buffer(mut self, cmd: vk::CommandBuffer) -> Self {
        self.command_buffers.push(cmd);
        self
    }

    /// Signal a semaphore once this submission completes.
    pub fn signal(mut self, semaphore: vk::Semaphore) -> Self {
        self.signal_semaphores.push(semaphore);
        self
    }

    /// Whether this submission carries no command buffers.
    pub fn is_empty(&self) -> bool {
        self.command_buffers.is_empty()
    }
}
