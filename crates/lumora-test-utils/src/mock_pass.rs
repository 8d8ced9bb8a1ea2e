//! Recording implementation of [`PassEncoder`].

use std::ops::Range;

use crate::gpu_types::{GpuBindGroup, GpuBuffer, GpuRenderPipeline};
use crate::pass_encoder::{PassEncoder, PassTarget};

/// A pass operation captured by [`MockPassEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum PassCall {
    BeginPass {
        color_id: Option<usize>,
        depth_id: Option<usize>,
        clear: bool,
    },
    EndPass,
    SetViewport {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    SetScissorRect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    SetPipeline {
        pipeline_id: Option<usize>,
    },
    SetBindGroup {
        index: u32,
        bind_group_id: Option<usize>,
    },
    SetVertexBuffer {
        slot: u32,
        buffer_id: Option<usize>,
        offset: u64,
    },
    SetIndexBuffer {
        buffer_id: Option<usize>,
        format: wgpu::IndexFormat,
        offset: u64,
    },
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

/// Records every pass operation instead of encoding it.
///
/// Operations issued while no pass is open are dropped, mirroring the real
/// encoder.
#[derive(Debug, Default)]
pub struct MockPassEncoder {
    calls: Vec<PassCall>,
    open: bool,
}

impl MockPassEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[PassCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// `(indices, base_vertex)` of every indexed draw, in order.
    pub fn draw_indexed_calls(&self) -> Vec<(Range<u32>, i32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                PassCall::DrawIndexed {
                    indices,
                    base_vertex,
                    ..
                } => Some((indices.clone(), *base_vertex)),
                _ => None,
            })
            .collect()
    }

    pub fn count_draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, PassCall::Draw { .. } | PassCall::DrawIndexed { .. }))
            .count()
    }

    pub fn count_passes(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, PassCall::BeginPass { .. }))
            .count()
    }

    pub fn count_pipeline_binds(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, PassCall::SetPipeline { .. }))
            .count()
    }

    fn record(&mut self, call: PassCall) {
        if self.open {
            self.calls.push(call);
        }
    }
}

impl PassEncoder for MockPassEncoder {
    fn begin_pass(&mut self, target: &PassTarget<'_>) {
        self.end_pass();
        self.open = true;
        self.calls.push(PassCall::BeginPass {
            color_id: target.color.mock_id(),
            depth_id: target.depth.and_then(|view| view.mock_id()),
            clear: target.clear_color.is_some(),
        });
    }

    fn end_pass(&mut self) {
        if self.open {
            self.calls.push(PassCall::EndPass);
            self.open = false;
        }
    }

    fn is_pass_open(&self) -> bool {
        self.open
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, _min_depth: f32, _max_depth: f32) {
        self.record(PassCall::SetViewport {
            x,
            y,
            width,
            height,
        });
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.record(PassCall::SetScissorRect {
            x,
            y,
            width,
            height,
        });
    }

    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        self.record(PassCall::SetPipeline {
            pipeline_id: pipeline.mock_id(),
        });
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup, _offsets: &[u32]) {
        self.record(PassCall::SetBindGroup {
            index,
            bind_group_id: bind_group.mock_id(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64) {
        self.record(PassCall::SetVertexBuffer {
            slot,
            buffer_id: buffer.mock_id(),
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat, offset: u64) {
        self.record(PassCall::SetIndexBuffer {
            buffer_id: buffer.mock_id(),
            format,
            offset,
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.record(PassCall::Draw {
            vertices,
            instances,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.record(PassCall::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }
}
