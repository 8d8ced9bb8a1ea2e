//! Walks a recorded 3D command list and drives the pass encoder.

use ahash::AHashMap;
use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};
use lumora_core::profiling::profile_function;
use lumora_test_utils::PassTarget;

use super::RenderStats3D;
use crate::batch::{BatchInfo, LineBatch3D};
use crate::blend::BlendMode;
use crate::command::renderer3d::{
    DEFAULT_GLOBAL_AMBIENT, DEFAULT_SUN_COLOR, DEFAULT_UV_TRANSFORM, default_sun_direction,
};
use crate::command::{Command3DKind, CommandManager3D, InputLayout3D, PhongMaterial};
use crate::config::Renderer3DConfig;
use crate::error::RenderError;
use crate::resource::{MeshId, PixelShaderId, TextureId, VertexShaderId};
use crate::services::{FrameContext, MeshService, PipelineKey, RenderTargetInfo};
use crate::state::{
    DepthStencilState, MAX_SAMPLER_COUNT, RasterizerState, Rect, SamplerState, ShaderStage,
};
use crate::vertex::VertexLayout;

/// Vertex stage constants, slot 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VsConstants3D {
    pub local_to_world: [[f32; 4]; 4],
    pub world_to_projected: [[f32; 4]; 4],
    /// `(scale_u, scale_v, offset_u, offset_v)`.
    pub uv_transform: [f32; 4],
}

/// Pixel stage lighting constants, slot 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PsPerFrame3D {
    pub global_ambient_color: [f32; 4],
    pub sun_color: [f32; 4],
    /// Points toward the sun.
    pub sun_direction: [f32; 4],
    pub eye_position: [f32; 4],
}

/// Pixel stage material constants, slot 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PsMaterial3D {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub emission: [f32; 4],
    pub specular: [f32; 4],
    /// `x` is the shininess, `y` is 1 when a diffuse texture is bound.
    pub params: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<VsConstants3D>(), 144);
static_assertions::const_assert_eq!(std::mem::size_of::<PsPerFrame3D>(), 64);
static_assertions::const_assert_eq!(std::mem::size_of::<PsMaterial3D>(), 80);

impl Default for VsConstants3D {
    fn default() -> Self {
        Self {
            local_to_world: Mat4::IDENTITY.to_cols_array_2d(),
            world_to_projected: Mat4::IDENTITY.to_cols_array_2d(),
            uv_transform: DEFAULT_UV_TRANSFORM.to_array(),
        }
    }
}

impl Default for PsPerFrame3D {
    fn default() -> Self {
        Self {
            global_ambient_color: DEFAULT_GLOBAL_AMBIENT.extend(0.0).to_array(),
            sun_color: DEFAULT_SUN_COLOR.extend(0.0).to_array(),
            sun_direction: default_sun_direction().extend(0.0).to_array(),
            eye_position: Vec4::ZERO.to_array(),
        }
    }
}

impl From<&PhongMaterial> for PsMaterial3D {
    fn from(material: &PhongMaterial) -> Self {
        Self {
            ambient: material.ambient.to_array(),
            diffuse: material.diffuse.to_array(),
            emission: material.emission.to_array(),
            specular: material.specular.to_array(),
            params: [
                material.shininess,
                if material.has_diffuse_texture { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

fn vec3_constant(v: Vec3) -> [f32; 4] {
    v.extend(0.0).to_array()
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ReplayDirty: u32 {
        const VS_CONSTANTS = 1 << 0;
        const PS_PER_FRAME = 1 << 1;
        const PS_MATERIAL = 1 << 2;
        const VS_RESOURCES = 1 << 3;
        const PS_RESOURCES = 1 << 4;
        const CONSTANT_BUFFERS = 1 << 5;
        const SCISSOR = 1 << 6;
    }
}

/// Vertex buffers currently bound to the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundBuffers {
    Nothing,
    Mesh(MeshId),
    Lines,
}

struct Replay3D<'r, 'f> {
    frame: &'r mut FrameContext<'f>,
    meshes: &'r mut dyn MeshService,
    commands: &'r CommandManager3D,
    lines: &'r mut LineBatch3D,
    config: &'r Renderer3DConfig,
    stats: &'r mut RenderStats3D,

    target: RenderTargetInfo,
    target_id: Option<TextureId>,
    scene_cleared: bool,

    vs_constants: VsConstants3D,
    ps_per_frame: PsPerFrame3D,
    ps_material: PsMaterial3D,
    blend: BlendMode,
    rasterizer: RasterizerState,
    depth_stencil: DepthStencilState,
    scissor: Rect,
    layout: InputLayout3D,
    vs: VertexShaderId,
    ps: PixelShaderId,
    mesh: MeshId,
    vs_textures: [TextureId; MAX_SAMPLER_COUNT],
    ps_textures: [TextureId; MAX_SAMPLER_COUNT],
    vs_samplers: [SamplerState; MAX_SAMPLER_COUNT],
    ps_samplers: [SamplerState; MAX_SAMPLER_COUNT],
    constant_buffers: AHashMap<(ShaderStage, u32), u32>,

    line_info: BatchInfo,
    line_start_index: u32,
    bound: BoundBuffers,
    dirty: ReplayDirty,
    last_key: Option<PipelineKey>,
}

pub(crate) fn replay(
    commands: &CommandManager3D,
    lines: &mut LineBatch3D,
    frame: &mut FrameContext<'_>,
    meshes: &mut dyn MeshService,
    config: &Renderer3DConfig,
    stats: &mut RenderStats3D,
) -> Result<(), RenderError> {
    profile_function!();

    let scene = frame.scene.clone();
    let mut replay = Replay3D {
        target: scene.clone(),
        target_id: None,
        scene_cleared: false,
        vs_constants: VsConstants3D::default(),
        ps_per_frame: PsPerFrame3D::default(),
        ps_material: PsMaterial3D::from(&PhongMaterial::default()),
        blend: BlendMode::DEFAULT_3D,
        rasterizer: RasterizerState::DEFAULT_3D,
        depth_stencil: DepthStencilState::DEFAULT_3D,
        scissor: Rect::default(),
        layout: InputLayout3D::Mesh,
        vs: VertexShaderId::INVALID,
        ps: PixelShaderId::INVALID,
        mesh: MeshId::INVALID,
        vs_textures: [TextureId::INVALID; MAX_SAMPLER_COUNT],
        ps_textures: [TextureId::INVALID; MAX_SAMPLER_COUNT],
        vs_samplers: [SamplerState::DEFAULT_3D; MAX_SAMPLER_COUNT],
        ps_samplers: [SamplerState::DEFAULT_3D; MAX_SAMPLER_COUNT],
        constant_buffers: AHashMap::new(),
        line_info: BatchInfo::default(),
        line_start_index: 0,
        bound: BoundBuffers::Nothing,
        dirty: ReplayDirty::all(),
        last_key: None,
        frame,
        meshes,
        commands,
        lines,
        config,
        stats,
    };

    replay.begin_target(None, scene);
    replay.run()
}

impl Replay3D<'_, '_> {
    fn run(&mut self) -> Result<(), RenderError> {
        use Command3DKind::*;

        let commands = self.commands;
        for command in commands.commands() {
            tracing::trace!("{:?}[{}]", command.kind, command.index);
            let index = command.index;

            match command.kind {
                Null => {}
                UpdateLineBuffers => {
                    self.line_info = self.lines.update_buffers(self.frame.device, index);
                    self.line_start_index = self.line_info.start_index_location;
                }
                Draw => {
                    if let Some(draw) = commands.draw(index) {
                        self.draw_mesh(
                            draw.start_index,
                            draw.index_count,
                            draw.instance_count,
                            &draw.material,
                        );
                    }
                }
                DrawLine3D => {
                    if let Some(count) = commands.line_draw(index) {
                        self.draw_lines(count);
                    }
                }
                BlendState => {
                    if let Some(blend) = commands.blend_states().get(index) {
                        self.blend = *blend;
                    }
                }
                RasterizerState => {
                    if let Some(rasterizer) = commands.rasterizer_states().get(index) {
                        self.rasterizer = *rasterizer;
                        self.dirty |= ReplayDirty::SCISSOR;
                    }
                }
                DepthStencilState => {
                    if let Some(state) = commands.depth_stencil_states().get(index) {
                        self.depth_stencil = *state;
                    }
                }
                VsSamplerState(slot) => {
                    if let Some(state) = commands.vs_sampler_states(slot as usize).get(index) {
                        self.vs_samplers[slot as usize] = *state;
                        self.dirty |= ReplayDirty::VS_RESOURCES;
                    }
                }
                PsSamplerState(slot) => {
                    if let Some(state) = commands.ps_sampler_states(slot as usize).get(index) {
                        self.ps_samplers[slot as usize] = *state;
                        self.dirty |= ReplayDirty::PS_RESOURCES;
                    }
                }
                ScissorRect => {
                    if let Some(rect) = commands.scissor_rects().get(index) {
                        self.scissor = *rect;
                        self.dirty |= ReplayDirty::SCISSOR;
                    }
                }
                Viewport => {
                    if let Some(viewport) = commands.viewports().get(index) {
                        self.apply_viewport(*viewport);
                    }
                }
                SetRenderTarget => {
                    if let Some(target) = commands.render_targets().get(index) {
                        self.set_render_target(target.as_ref().map(|rt| rt.id()))?;
                    }
                }
                InputLayout => {
                    if let Some(layout) = commands.input_layouts().get(index) {
                        self.layout = *layout;
                    }
                }
                SetVs => {
                    if let Some(&id) = commands.vs().get(index)
                        && id.is_valid()
                    {
                        self.vs = id;
                    }
                }
                SetPs => {
                    if let Some(&id) = commands.ps().get(index)
                        && id.is_valid()
                    {
                        self.ps = id;
                    }
                }
                CameraTransform => {
                    if let Some(camera) = commands.camera_transforms().get(index) {
                        self.vs_constants.world_to_projected = camera.to_cols_array_2d();
                        self.dirty |= ReplayDirty::VS_CONSTANTS;
                    }
                }
                EyePosition => {
                    if let Some(&eye) = commands.eye_positions().get(index) {
                        self.ps_per_frame.eye_position = eye.extend(1.0).to_array();
                        self.dirty |= ReplayDirty::PS_PER_FRAME;
                    }
                }
                LocalTransform => {
                    if let Some(local) = commands.local_transforms().get(index) {
                        self.vs_constants.local_to_world = local.to_cols_array_2d();
                        self.dirty |= ReplayDirty::VS_CONSTANTS;
                    }
                }
                UvTransform => {
                    if let Some(uv) = commands.uv_transforms().get(index) {
                        self.vs_constants.uv_transform = uv.to_array();
                        self.dirty |= ReplayDirty::VS_CONSTANTS;
                    }
                }
                SetConstantBuffer => self.set_constant_buffer(index),
                VsTexture(slot) => {
                    if let Some(&id) = commands.vs_textures(slot as usize).get(index) {
                        self.vs_textures[slot as usize] = id;
                        self.dirty |= ReplayDirty::VS_RESOURCES;
                    }
                }
                PsTexture(slot) => {
                    if let Some(&id) = commands.ps_textures(slot as usize).get(index) {
                        self.ps_textures[slot as usize] = id;
                        self.dirty |= ReplayDirty::PS_RESOURCES;
                    }
                }
                SetMesh => {
                    if let Some(&id) = commands.meshes().get(index) {
                        self.mesh = id;
                    }
                }
                GlobalAmbientColor => {
                    if let Some(&color) = commands.global_ambient_colors().get(index) {
                        self.ps_per_frame.global_ambient_color = vec3_constant(color);
                        self.dirty |= ReplayDirty::PS_PER_FRAME;
                    }
                }
                SunDirection => {
                    if let Some(&direction) = commands.sun_directions().get(index) {
                        self.ps_per_frame.sun_direction = vec3_constant(direction);
                        self.dirty |= ReplayDirty::PS_PER_FRAME;
                    }
                }
                SunColor => {
                    if let Some(&color) = commands.sun_colors().get(index) {
                        self.ps_per_frame.sun_color = vec3_constant(color);
                        self.dirty |= ReplayDirty::PS_PER_FRAME;
                    }
                }
            }
        }

        Ok(())
    }

    fn draw_mesh(&mut self, start_index: u32, index_count: u32, instance_count: u32, material: &PhongMaterial) {
        let material = PsMaterial3D::from(material);
        if material != self.ps_material {
            self.ps_material = material;
            self.dirty |= ReplayDirty::PS_MATERIAL;
        }

        if !self.mesh.is_valid() {
            tracing::warn!("Mesh draw with no mesh bound, skipping");
            self.stats.skipped_draws += 1;
            return;
        }
        if !self.prepare_draw(VertexLayout::Mesh3D, wgpu::PrimitiveTopology::TriangleList) {
            return;
        }
        if self.bound != BoundBuffers::Mesh(self.mesh) {
            if !self.meshes.bind_mesh_to_pass(self.frame.pass, self.mesh) {
                tracing::warn!("Mesh {:?} is not available, skipping draw", self.mesh);
                self.bound = BoundBuffers::Nothing;
                self.stats.skipped_draws += 1;
                return;
            }
            self.bound = BoundBuffers::Mesh(self.mesh);
        }

        self.frame
            .pass
            .draw_indexed(start_index..start_index + index_count, 0, 0..instance_count);
        self.stats.draw_calls += 1;
        self.stats.triangle_count += index_count / 3 * instance_count;
    }

    fn draw_lines(&mut self, index_count: u32) {
        if self.prepare_draw(VertexLayout::Line3D, wgpu::PrimitiveTopology::LineList) {
            if self.bound != BoundBuffers::Lines {
                self.lines.set_buffers(self.frame.pass);
                self.bound = BoundBuffers::Lines;
            }
            let start = self.line_start_index;
            self.frame.pass.draw_indexed(
                start..start + index_count,
                self.line_info.base_vertex_location as i32,
                0..1,
            );
            self.stats.draw_calls += 1;
            self.stats.line_count += index_count / 2;
        }
        self.line_start_index += index_count;
    }

    fn prepare_draw(&mut self, layout: VertexLayout, topology: wgpu::PrimitiveTopology) -> bool {
        let expected = match self.layout {
            InputLayout3D::Mesh => VertexLayout::Mesh3D,
            InputLayout3D::Line3D => VertexLayout::Line3D,
        };
        if expected != layout {
            tracing::warn!("{:?} draw recorded under the {:?} input layout, skipping", layout, self.layout);
            self.stats.skipped_draws += 1;
            return false;
        }

        let key = PipelineKey {
            vs: self.vs,
            ps: self.ps,
            blend: self.blend,
            rasterizer: self.rasterizer,
            depth_stencil: self.target.depth_format.map(|_| self.depth_stencil),
            target_format: self.target.format,
            depth_format: self.target.depth_format,
            sample_count: self.target.sample_count,
            layout,
            topology,
        };

        if self.last_key != Some(key) {
            let pipeline = if key.vs.is_valid() && key.ps.is_valid() {
                self.frame.shaders.pipeline(&key)
            } else {
                None
            };
            let Some(pipeline) = pipeline else {
                tracing::warn!(
                    "No pipeline for vs {:?} / ps {:?} ({:?}), skipping draw",
                    key.vs,
                    key.ps,
                    key.layout
                );
                self.last_key = None;
                self.stats.skipped_draws += 1;
                return false;
            };
            self.frame.pass.set_pipeline(&pipeline);
            self.last_key = Some(key);
        }

        self.bind_dirty_state();
        true
    }

    fn bind_dirty_state(&mut self) {
        let dirty = std::mem::replace(&mut self.dirty, ReplayDirty::empty());
        let pass = &mut *self.frame.pass;
        let shaders = &mut *self.frame.shaders;

        if dirty.contains(ReplayDirty::VS_CONSTANTS) {
            shaders.bind_constants(pass, ShaderStage::Vertex, 0, bytemuck::bytes_of(&self.vs_constants));
        }
        if dirty.contains(ReplayDirty::PS_PER_FRAME) {
            shaders.bind_constants(pass, ShaderStage::Pixel, 0, bytemuck::bytes_of(&self.ps_per_frame));
        }
        if dirty.contains(ReplayDirty::PS_MATERIAL) {
            shaders.bind_constants(pass, ShaderStage::Pixel, 1, bytemuck::bytes_of(&self.ps_material));
        }
        if dirty.contains(ReplayDirty::VS_RESOURCES) {
            for slot in 0..MAX_SAMPLER_COUNT {
                let textures = &mut *self.frame.textures;
                textures.bind_texture(pass, ShaderStage::Vertex, slot as u32, self.vs_textures[slot]);
                textures.bind_sampler(pass, ShaderStage::Vertex, slot as u32, &self.vs_samplers[slot]);
            }
        }
        if dirty.contains(ReplayDirty::PS_RESOURCES) {
            for slot in 0..MAX_SAMPLER_COUNT {
                let textures = &mut *self.frame.textures;
                textures.bind_texture(pass, ShaderStage::Pixel, slot as u32, self.ps_textures[slot]);
                textures.bind_sampler(pass, ShaderStage::Pixel, slot as u32, &self.ps_samplers[slot]);
            }
        }
        if dirty.contains(ReplayDirty::CONSTANT_BUFFERS) {
            for (&(stage, slot), &index) in &self.constant_buffers {
                if let Some(command) = self.commands.constant_buffer_command(index) {
                    let start = command.offset as usize;
                    let data = &self.commands.constants()[start..start + command.num_vectors as usize];
                    shaders.bind_constant_buffer(pass, stage, slot, command.buffer.id(), bytemuck::cast_slice(data));
                }
            }
        }
        if dirty.contains(ReplayDirty::SCISSOR) {
            let size = self.target.size;
            let rect = if self.rasterizer.scissor_enable && self.scissor.has_area() {
                self.scissor.clamp_to(size.x, size.y)
            } else {
                Rect::from_size(size.x as i32, size.y as i32)
            };
            pass.set_scissor_rect(rect.x as u32, rect.y as u32, rect.w as u32, rect.h as u32);
        }
    }

    fn set_constant_buffer(&mut self, index: u32) {
        let Some(command) = self.commands.constant_buffer_command(index) else {
            return;
        };
        if command.num_vectors == 0 {
            return;
        }
        let start = command.offset as usize;
        let data = &self.commands.constants()[start..start + command.num_vectors as usize];
        self.frame.shaders.bind_constant_buffer(
            self.frame.pass,
            command.stage,
            command.slot,
            command.buffer.id(),
            bytemuck::cast_slice(data),
        );
        self.constant_buffers.insert((command.stage, command.slot), index);
    }

    fn set_render_target(&mut self, id: Option<TextureId>) -> Result<(), RenderError> {
        if id == self.target_id && self.frame.pass.is_pass_open() {
            return Ok(());
        }
        let info = match id {
            None => self.frame.scene.clone(),
            Some(id) => self
                .frame
                .textures
                .render_target_view(id)
                .ok_or(RenderError::MissingRenderTarget(id))?,
        };
        self.begin_target(id, info);
        Ok(())
    }

    fn begin_target(&mut self, id: Option<TextureId>, info: RenderTargetInfo) {
        let first_scene_pass = id.is_none() && !self.scene_cleared;
        if first_scene_pass {
            self.scene_cleared = true;
        }

        let mut target = PassTarget::color(&info.view).with_label(match id {
            None => "Lumora 3D Scene",
            Some(_) => "Lumora 3D Render Texture",
        });
        if let Some(depth) = &info.depth {
            target = target.with_depth(depth);
        }
        if first_scene_pass {
            if let Some(color) = self.config.clear_color {
                target = target.with_clear_color(color.to_wgpu());
            }
            if let Some(depth) = self.config.clear_depth {
                target = target.with_clear_depth(depth);
            }
        }
        self.frame.pass.begin_pass(&target);
        self.stats.render_passes += 1;

        self.target_id = id;
        self.target = info;
        self.dirty = ReplayDirty::all();
        self.bound = BoundBuffers::Nothing;
        self.last_key = None;
        self.set_full_viewport();
    }

    fn set_full_viewport(&mut self) {
        let size = self.target.size;
        self.frame
            .pass
            .set_viewport(0.0, 0.0, size.x as f32, size.y as f32, 0.0, 1.0);
    }

    fn apply_viewport(&mut self, viewport: Option<Rect>) {
        let Some(rect) = viewport else {
            self.set_full_viewport();
            return;
        };
        let size = self.target.size;
        let rect = rect.clamp_to(size.x, size.y);
        if !rect.has_area() {
            tracing::trace!("Viewport {:?} lies outside the target, ignoring", rect);
            return;
        }
        self.frame.pass.set_viewport(
            rect.x as f32,
            rect.y as f32,
            rect.w as f32,
            rect.h as f32,
            0.0,
            1.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_material_packing() {
        let material = PhongMaterial::from_diffuse(Color::RED).with_diffuse_texture();
        let packed = PsMaterial3D::from(&material);
        assert_eq!(packed.diffuse, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(packed.params, [1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_default_lighting() {
        let frame = PsPerFrame3D::default();
        assert_eq!(frame.global_ambient_color, [0.4, 0.4, 0.4, 0.0]);
        assert_eq!(frame.sun_color, [0.6, 0.6, 0.6, 0.0]);
        let dir = Vec3::from_slice(&frame.sun_direction[..3]);
        assert!((dir.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vs_constants_are_column_major() {
        let mut constants = VsConstants3D::default();
        constants.local_to_world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)).to_cols_array_2d();
        assert_eq!(constants.local_to_world[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
