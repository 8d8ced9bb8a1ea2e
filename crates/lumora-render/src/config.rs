//! Renderer configuration.

use crate::color::Color;

/// Sizing of a [`VertexBatch`](crate::batch::VertexBatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Initial CPU staging size, in vertices.
    pub initial_vertex_capacity: u32,
    /// Initial CPU staging size, in indices.
    pub initial_index_capacity: u32,
    /// Hard cap for either CPU array. Requests beyond it are dropped.
    pub max_cpu_elements: u32,
    /// Vertices per GPU buffer and per batch segment.
    pub gpu_vertex_capacity: u32,
    /// Indices per GPU buffer and per batch segment.
    pub gpu_index_capacity: u32,
}

impl BatchConfig {
    pub const DEFAULT_INITIAL_VERTICES: u32 = 4096;
    pub const DEFAULT_INITIAL_INDICES: u32 = 32768;
    pub const DEFAULT_MAX_CPU_ELEMENTS: u32 = 4_194_304;
    pub const DEFAULT_GPU_VERTICES: u32 = 65535;
    pub const DEFAULT_GPU_INDICES: u32 = Self::DEFAULT_GPU_VERTICES * 4;

    /// Small GPU buffers, handy for exercising segment splits.
    pub fn with_gpu_capacity(mut self, vertices: u32, indices: u32) -> Self {
        self.gpu_vertex_capacity = vertices;
        self.gpu_index_capacity = indices;
        self
    }

    pub fn with_cpu_capacity(mut self, vertices: u32, indices: u32, max: u32) -> Self {
        self.initial_vertex_capacity = vertices;
        self.initial_index_capacity = indices;
        self.max_cpu_elements = max;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_vertex_capacity: Self::DEFAULT_INITIAL_VERTICES,
            initial_index_capacity: Self::DEFAULT_INITIAL_INDICES,
            max_cpu_elements: Self::DEFAULT_MAX_CPU_ELEMENTS,
            gpu_vertex_capacity: Self::DEFAULT_GPU_VERTICES,
            gpu_index_capacity: Self::DEFAULT_GPU_INDICES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer2DConfig {
    pub batch: BatchConfig,
    /// Clear color for the first scene pass of each frame. `None` loads.
    pub clear_color: Option<Color>,
}

#[derive(Debug, Clone)]
pub struct Renderer3DConfig {
    /// Batch used for `add_line3d`. Indices are 32-bit.
    pub line_batch: BatchConfig,
    pub clear_color: Option<Color>,
    /// Depth value the scene pass clears to. `None` loads.
    pub clear_depth: Option<f32>,
}

impl Default for Renderer3DConfig {
    fn default() -> Self {
        Self {
            line_batch: BatchConfig::default(),
            clear_color: None,
            clear_depth: Some(1.0),
        }
    }
}
