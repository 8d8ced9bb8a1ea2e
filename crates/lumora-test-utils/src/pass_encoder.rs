//! Render pass recording seam.

use std::ops::Range;

use crate::gpu_types::{GpuBindGroup, GpuBuffer, GpuRenderPipeline, GpuTextureView};

/// Attachments and load behaviour for one render pass.
#[derive(Clone, Copy, Debug)]
pub struct PassTarget<'a> {
    pub color: &'a GpuTextureView,
    pub depth: Option<&'a GpuTextureView>,
    /// `Some` clears the color attachment, `None` loads it.
    pub clear_color: Option<wgpu::Color>,
    /// Depth clear value; `None` loads the depth attachment.
    pub clear_depth: Option<f32>,
    pub label: Option<&'a str>,
}

impl<'a> PassTarget<'a> {
    /// A color-only pass that keeps the existing contents.
    pub fn color(view: &'a GpuTextureView) -> Self {
        Self {
            color: view,
            depth: None,
            clear_color: None,
            clear_depth: None,
            label: None,
        }
    }

    pub fn with_depth(mut self, view: &'a GpuTextureView) -> Self {
        self.depth = Some(view);
        self
    }

    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = Some(color);
        self
    }

    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = Some(depth);
        self
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }
}

/// Records render pass commands.
///
/// At most one pass is open at a time. `begin_pass` while a pass is open ends
/// the previous one first; `end_pass` without an open pass is a no-op.
/// State setters and draws issued outside a pass are ignored.
pub trait PassEncoder {
    fn begin_pass(&mut self, target: &PassTarget<'_>);

    fn end_pass(&mut self);

    fn is_pass_open(&self) -> bool;

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32);

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32);

    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline);

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup, offsets: &[u32]);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64);

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat, offset: u64);

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}
