//! Where an allocation lives, from the point of view of the CPU.

/// Requested location of an allocation. Per-frame uniform data always uses [`MemoryType::CpuToGpu`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MemoryType {
    /// Device-local memory the CPU cannot access. Depth-stencil targets live here.
    GpuOnly,
    /// `HOST_VISIBLE | HOST_COHERENT` memory that stays mapped, for uniform buffers rewritten every frame.
    /// Writes become visible to the device without an explicit flush.
    CpuToGpu,
    /// Mapped memory for reading results back on the CPU.
    GpuToCpu,
}

impl MemoryType {
    /// Whether allocations of this type are persistently mapped.
    pub fn is_host_visible(self) -> bool {
        !matches!(self, MemoryType::GpuOnly)
    }
}

impl From<MemoryType> for gpu_allocator::MemoryLocation {
    fn from(value: MemoryType) -> Self {
        match value {
            MemoryType::GpuOnly => Self::GpuOnly,
            MemoryType::CpuToGpu => Self::CpuToGpu,
            MemoryType::GpuToCpu => Self::GpuToCpu,
        }
    }
}
