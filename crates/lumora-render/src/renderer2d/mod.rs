//! Immediate-style 2D drawing API over the deferred command stream.
//!
//! Every `add_*` call tessellates into the active [`VertexBatch2D`] and
//! records state plus an accumulated draw. Nothing reaches the GPU until
//! [`Renderer2D::flush`], which replays the frame once.
//!
//! # Example
//!
//! ```rust,no_run
//! use lumora_render::{Color, RectF, Renderer2D, FrameContext};
//! # fn frame(renderer: &mut Renderer2D, ctx: &mut FrameContext<'_>) {
//! renderer.begin_frame();
//! renderer.add_rect(RectF::new(10.0, 10.0, 100.0, 50.0), Color::RED);
//! renderer.add_circle(glam::Vec2::new(200.0, 100.0), 32.0, Color::WHITE);
//! renderer.flush(ctx).expect("replay failed");
//! # }
//! ```

mod replay;

pub use replay::{PsConstants2D, VsConstants2D, pack_transform};

use glam::{Affine2, Vec2, Vec4};
use lumora_core::profiling::profile_function;
use lumora_test_utils::RenderContext;

use crate::batch::{BufferRequest, BufferWriter, VertexBatch2D};
use crate::blend::BlendMode;
use crate::builder::{self, LineStyle, RectF};
use crate::color::Color;
use crate::command::CommandManager2D;
use crate::config::Renderer2DConfig;
use crate::error::RenderError;
use crate::resource::{
    ConstantBuffer, PixelShader, RenderTexture, Texture, TextureId, VertexShader,
};
use crate::services::{FrameContext, ShaderService, StandardShaders2D};
use crate::state::{MAX_SAMPLER_COUNT, RasterizerState, Rect, SamplerState, ShaderStage};
use crate::vertex::Vertex2D;

/// Counters for the last replayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats2D {
    pub draw_calls: u32,
    pub triangle_count: u32,
    pub render_passes: u32,
    /// Draws dropped because no pipeline was available.
    pub skipped_draws: u32,
}

/// Which built-in pixel shader a shape uses when no custom one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapePs {
    Shape,
    Texture,
    SquareDot,
    RoundDot,
}

/// Hands out batch regions and reports new segments to the command manager.
struct BatchRequest<'a> {
    batch: &'a mut VertexBatch2D,
    commands: &'a mut CommandManager2D,
}

impl BufferRequest<Vertex2D, u16> for BatchRequest<'_> {
    fn request(&mut self, vertex_count: u32, index_count: u32) -> Option<BufferWriter<'_, Vertex2D, u16>> {
        self.batch
            .request_buffer(vertex_count, index_count, self.commands)
    }
}

pub struct Renderer2D {
    config: Renderer2DConfig,
    commands: CommandManager2D,
    batches: [VertexBatch2D; 2],
    standard: StandardShaders2D,
    custom_vs: Option<VertexShader>,
    custom_ps: Option<PixelShader>,
    draw_count: u64,
    stats: RenderStats2D,
}

impl Renderer2D {
    pub fn new(ctx: &dyn RenderContext, shaders: &dyn ShaderService, config: Renderer2DConfig) -> Self {
        let batches = [
            VertexBatch2D::new(ctx, config.batch, "Renderer2D Batch 0"),
            VertexBatch2D::new(ctx, config.batch, "Renderer2D Batch 1"),
        ];
        tracing::info!(
            "Created 2D renderer ({} vertices / {} indices per GPU buffer)",
            config.batch.gpu_vertex_capacity,
            config.batch.gpu_index_capacity
        );

        Self {
            standard: shaders.standard_2d(),
            commands: CommandManager2D::new(),
            batches,
            custom_vs: None,
            custom_ps: None,
            draw_count: 0,
            stats: RenderStats2D::default(),
            config,
        }
    }

    /// Start a new frame's statistics.
    pub fn begin_frame(&mut self) {
        self.stats = RenderStats2D::default();
    }

    pub fn stats(&self) -> RenderStats2D {
        self.stats
    }

    /// Number of frames flushed so far.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub fn command_manager(&self) -> &CommandManager2D {
        &self.commands
    }

    /// The batch the current frame records into.
    pub fn active_batch(&self) -> &VertexBatch2D {
        &self.batches[(self.draw_count % 2) as usize]
    }

    pub fn config(&self) -> &Renderer2DConfig {
        &self.config
    }

    /// Replay everything recorded since the last flush.
    ///
    /// The batch, command list and custom shaders are reset whether or not
    /// replay succeeds.
    pub fn flush(&mut self, frame: &mut FrameContext<'_>) -> Result<(), RenderError> {
        profile_function!();

        self.commands.flush();
        let batch = &mut self.batches[(self.draw_count % 2) as usize];
        let result = replay::replay(&self.commands, batch, frame, &self.config, &mut self.stats);

        frame.pass.end_pass();
        batch.reset();
        self.commands.reset();
        self.custom_vs = None;
        self.custom_ps = None;
        self.draw_count += 1;
        lumora_core::profiling::new_frame();

        result
    }

    fn request(&mut self) -> BatchRequest<'_> {
        BatchRequest {
            batch: &mut self.batches[(self.draw_count % 2) as usize],
            commands: &mut self.commands,
        }
    }

    fn push_shaders(&mut self, ps: ShapePs) {
        match &self.custom_vs {
            Some(vs) => self.commands.push_custom_vs(vs),
            None => self.commands.push_standard_vs(self.standard.sprite_vs),
        }
        match &self.custom_ps {
            Some(shader) => self.commands.push_custom_ps(shader),
            None => {
                let id = match ps {
                    ShapePs::Shape => self.standard.shape_ps,
                    ShapePs::Texture => self.standard.texture_ps,
                    ShapePs::SquareDot => self.standard.square_dot_ps,
                    ShapePs::RoundDot => self.standard.round_dot_ps,
                };
                self.commands.push_standard_ps(id);
            }
        }
    }

    fn commit_shape(&mut self, index_count: u32, ps: ShapePs) {
        if index_count == 0 {
            return;
        }
        self.push_shaders(ps);
        self.commands.push_draw(index_count);
    }

    fn commit_textured(&mut self, index_count: u32, texture: &Texture) {
        if index_count == 0 {
            return;
        }
        self.push_shaders(ShapePs::Texture);
        self.commands.push_ps_texture(0, Some(texture));
        self.commands.push_draw(index_count);
    }

    pub fn add_line(
        &mut self,
        style: LineStyle,
        begin: Vec2,
        end: Vec2,
        thickness: f32,
        colors: [Color; 2],
    ) {
        let scale = self.commands.current_max_scaling();
        let count = builder::build_line(&mut self.request(), style, begin, end, thickness, colors, scale);
        let ps = if style.has_square_dot() {
            ShapePs::SquareDot
        } else if style.has_round_dot() {
            ShapePs::RoundDot
        } else {
            ShapePs::Shape
        };
        self.commit_shape(count, ps);
    }

    pub fn add_triangle(&mut self, points: [Vec2; 3], colors: [Color; 3]) {
        let count = builder::build_triangle(&mut self.request(), points, colors);
        self.commit_shape(count, ShapePs::Shape);
    }

    pub fn add_rect(&mut self, rect: RectF, color: Color) {
        self.add_rect_colors(rect, [color; 4]);
    }

    /// Corner colors run top-left, top-right, bottom-right, bottom-left.
    pub fn add_rect_colors(&mut self, rect: RectF, colors: [Color; 4]) {
        let count = builder::build_rect(&mut self.request(), rect, colors);
        self.commit_shape(count, ShapePs::Shape);
    }

    pub fn add_rect_frame(&mut self, rect: RectF, thickness: f32, inner: Color, outer: Color) {
        let count = builder::build_rect_frame(&mut self.request(), rect, thickness, inner, outer);
        self.commit_shape(count, ShapePs::Shape);
    }

    pub fn add_circle(&mut self, center: Vec2, r: f32, color: Color) {
        self.add_circle_gradient(center, r, color, color);
    }

    pub fn add_circle_gradient(&mut self, center: Vec2, r: f32, inner: Color, outer: Color) {
        let scale = self.commands.current_max_scaling();
        let count = builder::build_circle(&mut self.request(), center, r, inner, outer, scale);
        self.commit_shape(count, ShapePs::Shape);
    }

    pub fn add_circle_frame(&mut self, center: Vec2, r_inner: f32, thickness: f32, inner: Color, outer: Color) {
        let scale = self.commands.current_max_scaling();
        let count =
            builder::build_circle_frame(&mut self.request(), center, r_inner, thickness, inner, outer, scale);
        self.commit_shape(count, ShapePs::Shape);
    }

    pub fn add_quad(&mut self, points: [Vec2; 4], colors: [Color; 4]) {
        let count = builder::build_quad(&mut self.request(), points, colors);
        self.commit_shape(count, ShapePs::Shape);
    }

    /// `triangles` index into `vertices`; `offset` is added to every vertex.
    pub fn add_polygon(&mut self, vertices: &[Vec2], triangles: &[[u16; 3]], offset: Vec2, color: Color) {
        let count = builder::build_polygon(&mut self.request(), vertices, triangles, offset, color);
        self.commit_shape(count, ShapePs::Shape);
    }

    pub fn add_textured_region(&mut self, texture: &Texture, rect: RectF, uv: RectF, color: Color) {
        let count = builder::build_textured_region(&mut self.request(), rect, uv, color);
        self.commit_textured(count, texture);
    }

    pub fn add_textured_quad(&mut self, texture: &Texture, points: [Vec2; 4], uv: RectF, color: Color) {
        let count = builder::build_textured_quad(&mut self.request(), points, uv, color);
        self.commit_textured(count, texture);
    }

    /// Draw `count` vertices with no vertex buffer. Positions come from the
    /// custom vertex shader.
    pub fn add_null_vertices(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        if let Some(vs) = &self.custom_vs {
            self.commands.push_custom_vs(vs);
        }
        match &self.custom_ps {
            Some(ps) => self.commands.push_custom_ps(ps),
            None => self.commands.push_standard_ps(self.standard.shape_ps),
        }
        self.commands.push_null_vertices(count);
    }

    pub fn color_mul(&self) -> Color {
        *self.commands.color_mul().current()
    }

    pub fn set_color_mul(&mut self, color: Color) {
        self.commands.push_color_mul(color);
    }

    pub fn color_add(&self) -> Color {
        *self.commands.color_add().current()
    }

    pub fn set_color_add(&mut self, color: Color) {
        self.commands.push_color_add(color);
    }

    pub fn blend_state(&self) -> BlendMode {
        *self.commands.blend_states().current()
    }

    pub fn set_blend_state(&mut self, state: BlendMode) {
        self.commands.push_blend_state(state);
    }

    pub fn rasterizer_state(&self) -> RasterizerState {
        *self.commands.rasterizer_states().current()
    }

    pub fn set_rasterizer_state(&mut self, state: RasterizerState) {
        self.commands.push_rasterizer_state(state);
    }

    pub fn vs_sampler_state(&self, slot: usize) -> Option<SamplerState> {
        (slot < MAX_SAMPLER_COUNT).then(|| *self.commands.vs_sampler_states(slot).current())
    }

    /// Slots past [`MAX_SAMPLER_COUNT`] are ignored.
    pub fn set_vs_sampler_state(&mut self, slot: usize, state: SamplerState) {
        if slot < MAX_SAMPLER_COUNT {
            self.commands.push_vs_sampler_state(slot, state);
        }
    }

    pub fn ps_sampler_state(&self, slot: usize) -> Option<SamplerState> {
        (slot < MAX_SAMPLER_COUNT).then(|| *self.commands.ps_sampler_states(slot).current())
    }

    pub fn set_ps_sampler_state(&mut self, slot: usize, state: SamplerState) {
        if slot < MAX_SAMPLER_COUNT {
            self.commands.push_ps_sampler_state(slot, state);
        }
    }

    pub fn scissor_rect(&self) -> Rect {
        *self.commands.scissor_rects().current()
    }

    /// Takes effect only while the rasterizer state enables scissoring.
    pub fn set_scissor_rect(&mut self, rect: Rect) {
        self.commands.push_scissor_rect(rect);
    }

    pub fn viewport(&self) -> Option<Rect> {
        *self.commands.viewports().current()
    }

    /// `None` covers the whole render target.
    pub fn set_viewport(&mut self, viewport: Option<Rect>) {
        self.commands.push_viewport(viewport);
    }

    pub fn sdf_params(&self) -> [Vec4; 3] {
        *self.commands.sdf_params().current()
    }

    pub fn set_sdf_params(&mut self, params: [Vec4; 3]) {
        self.commands.push_sdf_params(params);
    }

    pub fn internal_ps_constants(&self) -> Vec4 {
        *self.commands.internal_ps_constants().current()
    }

    pub fn set_internal_ps_constants(&mut self, constants: Vec4) {
        self.commands.push_internal_ps_constants(constants);
    }

    pub fn render_target(&self) -> Option<RenderTexture> {
        self.commands.render_targets().current().clone()
    }

    /// Redirect drawing to a render texture, or back to the scene with `None`.
    ///
    /// A texture cannot be sampled while it is the target, so any slot still
    /// holding it is unbound first.
    pub fn set_render_target(&mut self, target: Option<RenderTexture>) {
        if let Some(rt) = &target {
            let id = rt.id();
            let mut unbound = false;
            for slot in 0..MAX_SAMPLER_COUNT {
                if *self.commands.vs_textures(slot).current() == id {
                    self.commands.push_vs_texture(slot, None);
                    unbound = true;
                }
                if *self.commands.ps_textures(slot).current() == id {
                    self.commands.push_ps_texture(slot, None);
                    unbound = true;
                }
            }
            if unbound {
                self.commands.flush();
            }
        }
        self.commands.push_render_target(target);
    }

    pub fn local_transform(&self) -> Affine2 {
        self.commands.current_local_transform()
    }

    pub fn set_local_transform(&mut self, transform: Affine2) {
        self.commands.push_local_transform(transform);
    }

    pub fn camera_transform(&self) -> Affine2 {
        self.commands.current_camera_transform()
    }

    pub fn set_camera_transform(&mut self, transform: Affine2) {
        self.commands.push_camera_transform(transform);
    }

    /// Largest axis scale of the combined transform.
    pub fn max_scaling(&self) -> f32 {
        self.commands.current_max_scaling()
    }

    pub fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: &ConstantBuffer, data: &[Vec4]) {
        self.commands.push_constant_buffer(stage, slot, buffer, data);
    }

    pub fn vs_texture(&self, slot: usize) -> Option<TextureId> {
        (slot < MAX_SAMPLER_COUNT).then(|| *self.commands.vs_textures(slot).current())
    }

    pub fn set_vs_texture(&mut self, slot: usize, texture: Option<&Texture>) {
        if slot < MAX_SAMPLER_COUNT {
            self.commands.push_vs_texture(slot, texture);
        }
    }

    pub fn ps_texture(&self, slot: usize) -> Option<TextureId> {
        (slot < MAX_SAMPLER_COUNT).then(|| *self.commands.ps_textures(slot).current())
    }

    pub fn set_ps_texture(&mut self, slot: usize, texture: Option<&Texture>) {
        if slot < MAX_SAMPLER_COUNT {
            self.commands.push_ps_texture(slot, texture);
        }
    }

    pub fn custom_vs(&self) -> Option<&VertexShader> {
        self.custom_vs.as_ref()
    }

    /// Override the sprite vertex shader until the next flush.
    pub fn set_custom_vs(&mut self, shader: Option<VertexShader>) {
        if let Some(vs) = &shader {
            self.commands.push_custom_vs(vs);
        }
        self.custom_vs = shader;
    }

    pub fn custom_ps(&self) -> Option<&PixelShader> {
        self.custom_ps.as_ref()
    }

    /// Override the shape pixel shaders until the next flush.
    pub fn set_custom_ps(&mut self, shader: Option<PixelShader>) {
        if let Some(ps) = &shader {
            self.commands.push_custom_ps(ps);
        }
        self.custom_ps = shader;
    }
}
