//! Mesh and line drawing in 3D.
//!
//! Mesh geometry lives in the [`MeshService`]; each [`Renderer3D::add_mesh`]
//! records one draw. Lines are tessellated into a double-buffered
//! [`LineBatch3D`] and accumulate like 2D shapes.

mod replay;

pub use replay::{PsMaterial3D, PsPerFrame3D, VsConstants3D};

use glam::{Mat4, Vec3, Vec4};
use lumora_core::profiling::profile_function;
use lumora_test_utils::RenderContext;

use crate::batch::{BufferRequest, BufferWriter, LineBatch3D};
use crate::blend::BlendMode;
use crate::builder;
use crate::color::Color;
use crate::command::{CommandManager3D, InputLayout3D, PhongMaterial};
use crate::config::Renderer3DConfig;
use crate::error::RenderError;
use crate::resource::{
    ConstantBuffer, Mesh, PixelShader, RenderTexture, Texture, TextureId, VertexShader,
};
use crate::services::{FrameContext, MeshService, ShaderService, StandardShaders3D};
use crate::state::{
    DepthStencilState, MAX_SAMPLER_COUNT, RasterizerState, Rect, SamplerState, ShaderStage,
};
use crate::vertex::VertexLine3D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats3D {
    pub draw_calls: u32,
    pub triangle_count: u32,
    pub line_count: u32,
    pub render_passes: u32,
    pub skipped_draws: u32,
}

struct LineRequest<'a> {
    batch: &'a mut LineBatch3D,
    commands: &'a mut CommandManager3D,
}

impl BufferRequest<VertexLine3D, u32> for LineRequest<'_> {
    fn request(&mut self, vertex_count: u32, index_count: u32) -> Option<BufferWriter<'_, VertexLine3D, u32>> {
        self.batch
            .request_buffer(vertex_count, index_count, self.commands)
    }
}

pub struct Renderer3D {
    config: Renderer3DConfig,
    commands: CommandManager3D,
    line_batches: [LineBatch3D; 2],
    standard: StandardShaders3D,
    custom_vs: Option<VertexShader>,
    custom_ps: Option<PixelShader>,
    draw_count: u64,
    stats: RenderStats3D,
}

impl Renderer3D {
    pub fn new(ctx: &dyn RenderContext, shaders: &dyn ShaderService, config: Renderer3DConfig) -> Self {
        let line_batches = [
            LineBatch3D::new(ctx, config.line_batch, "Renderer3D Lines 0"),
            LineBatch3D::new(ctx, config.line_batch, "Renderer3D Lines 1"),
        ];
        tracing::info!("Created 3D renderer");

        Self {
            standard: shaders.standard_3d(),
            commands: CommandManager3D::new(),
            line_batches,
            custom_vs: None,
            custom_ps: None,
            draw_count: 0,
            stats: RenderStats3D::default(),
            config,
        }
    }

    pub fn begin_frame(&mut self) {
        self.stats = RenderStats3D::default();
    }

    pub fn stats(&self) -> RenderStats3D {
        self.stats
    }

    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub fn command_manager(&self) -> &CommandManager3D {
        &self.commands
    }

    pub fn active_line_batch(&self) -> &LineBatch3D {
        &self.line_batches[(self.draw_count % 2) as usize]
    }

    /// Replay everything recorded since the last flush. Cleanup runs whether
    /// or not replay succeeds.
    pub fn flush(&mut self, frame: &mut FrameContext<'_>, meshes: &mut dyn MeshService) -> Result<(), RenderError> {
        profile_function!();

        self.commands.flush();
        let lines = &mut self.line_batches[(self.draw_count % 2) as usize];
        let result = replay::replay(&self.commands, lines, frame, meshes, &self.config, &mut self.stats);

        frame.pass.end_pass();
        lines.reset();
        self.commands.reset();
        self.custom_vs = None;
        self.custom_ps = None;
        self.draw_count += 1;
        lumora_core::profiling::new_frame();

        result
    }

    fn push_mesh_shaders(&mut self) {
        self.commands.push_input_layout(InputLayout3D::Mesh);
        match &self.custom_vs {
            Some(vs) => self.commands.push_custom_vs(vs),
            None => self.commands.push_standard_vs(self.standard.mesh_vs),
        }
        match &self.custom_ps {
            Some(ps) => self.commands.push_custom_ps(ps),
            None => self.commands.push_standard_ps(self.standard.mesh_ps),
        }
    }

    /// Draw `index_count` indices of `mesh` starting at `start_index`, with
    /// the current local transform.
    pub fn add_mesh(&mut self, mesh: &Mesh, start_index: u32, index_count: u32, material: PhongMaterial) {
        self.add_mesh_instanced(mesh, start_index, index_count, material, 1);
    }

    pub fn add_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        start_index: u32,
        index_count: u32,
        material: PhongMaterial,
        instance_count: u32,
    ) {
        if index_count == 0 || instance_count == 0 {
            return;
        }
        self.push_mesh_shaders();
        self.commands.push_mesh(mesh);
        self.commands
            .push_draw(start_index, index_count, material, instance_count);
    }

    /// Like [`add_mesh`](Self::add_mesh), sampling `texture` from pixel slot 0.
    pub fn add_textured_mesh(
        &mut self,
        mesh: &Mesh,
        start_index: u32,
        index_count: u32,
        texture: &Texture,
        material: PhongMaterial,
    ) {
        if index_count == 0 {
            return;
        }
        self.push_mesh_shaders();
        self.commands.push_mesh(mesh);
        self.commands.push_ps_texture(0, Some(texture));
        self.commands
            .push_draw(start_index, index_count, material.with_diffuse_texture(), 1);
    }

    pub fn add_line3d(&mut self, begin: Vec3, end: Vec3, colors: [Color; 2]) {
        let count = builder::build_line3d(
            &mut LineRequest {
                batch: &mut self.line_batches[(self.draw_count % 2) as usize],
                commands: &mut self.commands,
            },
            begin,
            end,
            colors,
        );
        if count == 0 {
            return;
        }
        self.commands.push_input_layout(InputLayout3D::Line3D);
        self.commands.push_standard_vs(self.standard.line_vs);
        self.commands.push_standard_ps(self.standard.line_ps);
        self.commands.push_draw_line3d(count);
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

    pub fn depth_stencil_state(&self) -> DepthStencilState {
        *self.commands.depth_stencil_states().current()
    }

    pub fn set_depth_stencil_state(&mut self, state: DepthStencilState) {
        self.commands.push_depth_stencil_state(state);
    }

    pub fn vs_sampler_state(&self, slot: usize) -> Option<SamplerState> {
        (slot < MAX_SAMPLER_COUNT).then(|| *self.commands.vs_sampler_states(slot).current())
    }

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

    pub fn set_scissor_rect(&mut self, rect: Rect) {
        self.commands.push_scissor_rect(rect);
    }

    pub fn viewport(&self) -> Option<Rect> {
        *self.commands.viewports().current()
    }

    pub fn set_viewport(&mut self, viewport: Option<Rect>) {
        self.commands.push_viewport(viewport);
    }

    pub fn render_target(&self) -> Option<RenderTexture> {
        self.commands.render_targets().current().clone()
    }

    /// Any texture slot holding the new target is unbound first.
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

    /// World-to-clip transform and the eye position used for specular light.
    pub fn set_camera(&mut self, view_projection: Mat4, eye_position: Vec3) {
        self.commands.push_camera_transform(view_projection);
        self.commands.push_eye_position(eye_position);
    }

    pub fn camera_transform(&self) -> Mat4 {
        *self.commands.camera_transforms().current()
    }

    pub fn eye_position(&self) -> Vec3 {
        *self.commands.eye_positions().current()
    }

    pub fn local_transform(&self) -> Mat4 {
        *self.commands.local_transforms().current()
    }

    pub fn set_local_transform(&mut self, transform: Mat4) {
        self.commands.push_local_transform(transform);
    }

    pub fn uv_transform(&self) -> Vec4 {
        *self.commands.uv_transforms().current()
    }

    /// `(scale_u, scale_v, offset_u, offset_v)`.
    pub fn set_uv_transform(&mut self, transform: Vec4) {
        self.commands.push_uv_transform(transform);
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

    pub fn global_ambient_color(&self) -> Vec3 {
        *self.commands.global_ambient_colors().current()
    }

    pub fn set_global_ambient_color(&mut self, color: Vec3) {
        self.commands.push_global_ambient_color(color);
    }

    pub fn sun_direction(&self) -> Vec3 {
        *self.commands.sun_directions().current()
    }

    /// Normalized before recording. A zero vector is ignored.
    pub fn set_sun_direction(&mut self, direction: Vec3) {
        if let Some(direction) = direction.try_normalize() {
            self.commands.push_sun_direction(direction);
        }
    }

    pub fn sun_color(&self) -> Vec3 {
        *self.commands.sun_colors().current()
    }

    pub fn set_sun_color(&mut self, color: Vec3) {
        self.commands.push_sun_color(color);
    }

    pub fn custom_vs(&self) -> Option<&VertexShader> {
        self.custom_vs.as_ref()
    }

    /// Override the mesh vertex shader until the next flush. Lines always use
    /// the built-in line shaders.
    pub fn set_custom_vs(&mut self, shader: Option<VertexShader>) {
        self.custom_vs = shader;
    }

    pub fn custom_ps(&self) -> Option<&PixelShader> {
        self.custom_ps.as_ref()
    }

    pub fn set_custom_ps(&mut self, shader: Option<PixelShader>) {
        self.custom_ps = shader;
    }
}
