//! [`PassEncoder`] backed by a `wgpu::CommandEncoder`.

use std::ops::Range;

use lumora_test_utils::{GpuBindGroup, GpuBuffer, GpuRenderPipeline, PassEncoder, PassTarget};

/// Records passes into one command encoder.
///
/// The open pass has its lifetime detached from the encoder so both can live
/// in the same struct; it must be ended before [`finish`](Self::finish).
pub struct WgpuPassEncoder {
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
    pass_count: u32,
}

impl WgpuPassEncoder {
    pub fn new(encoder: wgpu::CommandEncoder) -> Self {
        Self {
            encoder,
            pass: None,
            pass_count: 0,
        }
    }

    /// Number of passes begun so far.
    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    /// Direct access for work outside a pass, e.g. copies.
    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        self.end_pass();
        &mut self.encoder
    }

    pub fn finish(mut self) -> wgpu::CommandBuffer {
        self.end_pass();
        self.encoder.finish()
    }
}

impl PassEncoder for WgpuPassEncoder {
    fn begin_pass(&mut self, target: &PassTarget<'_>) {
        self.end_pass();

        let color_ops = wgpu::Operations {
            load: match target.clear_color {
                Some(color) => wgpu::LoadOp::Clear(color),
                None => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        };
        let color_attachments = [Some(wgpu::RenderPassColorAttachment {
            view: target.color.as_wgpu(),
            depth_slice: None,
            resolve_target: None,
            ops: color_ops,
        })];
        let depth_stencil_attachment =
            target
                .depth
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view: view.as_wgpu(),
                    depth_ops: Some(wgpu::Operations {
                        load: match target.clear_depth {
                            Some(depth) => wgpu::LoadOp::Clear(depth),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let descriptor = wgpu::RenderPassDescriptor {
            label: target.label,
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            occlusion_query_set: None,
            timestamp_writes: None,
        };

        self.pass = Some(self.encoder.begin_render_pass(&descriptor).forget_lifetime());
        self.pass_count += 1;
    }

    fn end_pass(&mut self) {
        self.pass = None;
    }

    fn is_pass_open(&self) -> bool {
        self.pass.is_some()
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_viewport(x, y, width, height, min_depth, max_depth);
        }
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_scissor_rect(x, y, width, height);
        }
    }

    fn set_pipeline(&mut self, pipeline: &GpuRenderPipeline) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_pipeline(pipeline.as_wgpu());
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &GpuBindGroup, offsets: &[u32]) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_bind_group(index, bind_group.as_wgpu(), offsets);
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_vertex_buffer(slot, buffer.as_wgpu().slice(offset..));
        }
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, format: wgpu::IndexFormat, offset: u64) {
        if let Some(pass) = self.pass.as_mut() {
            pass.set_index_buffer(buffer.as_wgpu().slice(offset..), format);
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        if let Some(pass) = self.pass.as_mut() {
            pass.draw(vertices, instances);
        }
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        if let Some(pass) = self.pass.as_mut() {
            pass.draw_indexed(indices, base_vertex, instances);
        }
    }
}
