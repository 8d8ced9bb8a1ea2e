//! Headless Frame
//!
//! Wires the long-lived pieces together the way an application would:
//! - `lumora_core::init` sets up logging and profiling
//! - the graphics context and a `Renderer2D` live in a `ServiceRegistry`
//! - one frame is recorded, replayed into an offscreen texture and submitted
//!
//! No shaders are compiled here, so every draw is reported as skipped. The
//! point is the frame flow, not the pixels.
//!
//! Run with:
//!   cargo run -p lumora-render --example headless_frame

use std::sync::Arc;

use glam::{UVec2, Vec2};
use lumora_core::{Config, ProfilingMode, ServiceRegistry};
use lumora_render::{
    Color, ConstantBufferId, FrameContext, GraphicsContext, PassEncoder, PipelineKey, PixelShaderId, RectF,
    RenderTargetInfo, Renderer2D, Renderer2DConfig, SamplerState, ShaderService, ShaderStage, StandardShaders2D,
    StandardShaders3D, TextureId, TextureService, VertexShaderId,
};
use lumora_test_utils::{GpuRenderPipeline, GpuTextureView};

struct NoShaders;

impl ShaderService for NoShaders {
    fn standard_2d(&self) -> StandardShaders2D {
        StandardShaders2D {
            sprite_vs: VertexShaderId(0),
            shape_ps: PixelShaderId(0),
            texture_ps: PixelShaderId(1),
            square_dot_ps: PixelShaderId(2),
            round_dot_ps: PixelShaderId(3),
        }
    }

    fn standard_3d(&self) -> StandardShaders3D {
        StandardShaders3D {
            mesh_vs: VertexShaderId(1),
            mesh_ps: PixelShaderId(4),
            line_vs: VertexShaderId(2),
            line_ps: PixelShaderId(5),
        }
    }

    fn pipeline(&mut self, _key: &PipelineKey) -> Option<GpuRenderPipeline> {
        None
    }

    fn bind_constants(&mut self, _pass: &mut dyn PassEncoder, _stage: ShaderStage, _slot: u32, _data: &[u8]) {}

    fn bind_constant_buffer(
        &mut self,
        _pass: &mut dyn PassEncoder,
        _stage: ShaderStage,
        _slot: u32,
        _buffer: ConstantBufferId,
        _data: &[u8],
    ) {
    }
}

struct NoTextures;

impl TextureService for NoTextures {
    fn render_target_view(&self, _id: TextureId) -> Option<RenderTargetInfo> {
        None
    }

    fn bind_texture(&mut self, _pass: &mut dyn PassEncoder, _stage: ShaderStage, _slot: u32, _texture: TextureId) {}

    fn bind_sampler(&mut self, _pass: &mut dyn PassEncoder, _stage: ShaderStage, _slot: u32, _state: &SamplerState) {}
}

fn offscreen_target(ctx: &GraphicsContext, size: UVec2) -> RenderTargetInfo {
    let format = wgpu::TextureFormat::Rgba8UnormSrgb;
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Scene"),
        size: wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    RenderTargetInfo::new(GpuTextureView::from_wgpu(view), size, format)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    lumora_core::init(&Config::default().with_profiling(ProfilingMode::On));

    let graphics = GraphicsContext::new_owned_sync()?;
    let mut shaders = NoShaders;
    let mut textures = NoTextures;

    // Registration order is dependency order; teardown runs the other way.
    let mut registry = ServiceRegistry::new();
    registry.register(graphics.clone())?;
    registry.register(Renderer2D::new(
        graphics.as_ref(),
        &shaders,
        Renderer2DConfig {
            clear_color: Some(Color::BLACK),
            ..Default::default()
        },
    ))?;

    let ctx = registry.require::<Arc<GraphicsContext>>()?.clone();
    let scene = offscreen_target(&ctx, UVec2::new(320, 240));

    let Some(renderer) = registry.get_mut::<Renderer2D>() else {
        return Ok(());
    };
    renderer.begin_frame();
    renderer.add_rect(RectF::new(16.0, 16.0, 128.0, 64.0), Color::RED);
    renderer.add_circle(Vec2::new(240.0, 120.0), 40.0, Color::WHITE);

    let mut encoder = ctx.create_pass_encoder(Some("Headless Frame"));
    renderer.flush(&mut FrameContext {
        device: ctx.as_ref(),
        pass: &mut encoder,
        scene: &scene,
        shaders: &mut shaders,
        textures: &mut textures,
    })?;
    ctx.submit(encoder);

    let stats = renderer.stats();
    tracing::info!(
        "Frame replayed: {} passes, {} draws, {} skipped",
        stats.render_passes,
        stats.draw_calls,
        stats.skipped_draws
    );

    registry.shutdown();
    Ok(())
}
