//! Walks a recorded 2D command list and drives the pass encoder.

use ahash::AHashMap;
use bitflags::bitflags;
use glam::{Affine2, Vec2};
use lumora_core::math::screen_transform;
use lumora_core::profiling::profile_function;
use lumora_test_utils::PassTarget;

use super::RenderStats2D;
use crate::batch::{BatchInfo, VertexBatch2D};
use crate::blend::BlendMode;
use crate::command::renderer2d::DEFAULT_SDF_PARAMS;
use crate::command::{Command2DKind, CommandManager2D};
use crate::config::Renderer2DConfig;
use crate::error::RenderError;
use crate::resource::{PixelShaderId, TextureId, VertexShaderId};
use crate::services::{FrameContext, PipelineKey, RenderTargetInfo};
use crate::state::{MAX_SAMPLER_COUNT, RasterizerState, Rect, SamplerState, ShaderStage};
use crate::vertex::VertexLayout;

/// Vertex stage constants, slot 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VsConstants2D {
    /// Rows `(m11, m12, m31, m32)` and `(m21, m22, 0, 1)` of the
    /// pixel-to-clip transform.
    pub transform: [[f32; 4]; 2],
    pub color_mul: [f32; 4],
}

/// Pixel stage constants, slot 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PsConstants2D {
    pub color_add: [f32; 4],
    pub sdf_param: [f32; 4],
    pub sdf_outline_color: [f32; 4],
    pub sdf_shadow_color: [f32; 4],
    pub internal: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<VsConstants2D>(), 48);
static_assertions::const_assert_eq!(std::mem::size_of::<PsConstants2D>(), 80);

impl Default for VsConstants2D {
    fn default() -> Self {
        Self {
            transform: pack_transform(Affine2::IDENTITY),
            color_mul: [1.0; 4],
        }
    }
}

impl Default for PsConstants2D {
    fn default() -> Self {
        Self {
            color_add: [0.0; 4],
            sdf_param: DEFAULT_SDF_PARAMS[0].to_array(),
            sdf_outline_color: DEFAULT_SDF_PARAMS[1].to_array(),
            sdf_shadow_color: DEFAULT_SDF_PARAMS[2].to_array(),
            internal: [0.0; 4],
        }
    }
}

/// Pack an affine transform into the two rows the sprite shader reads.
pub fn pack_transform(m: Affine2) -> [[f32; 4]; 2] {
    let x = m.matrix2.x_axis;
    let y = m.matrix2.y_axis;
    [
        [x.x, x.y, m.translation.x, m.translation.y],
        [y.x, y.y, 0.0, 1.0],
    ]
}

bitflags! {
    /// Pass state that must be re-sent before the next draw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ReplayDirty: u32 {
        const BUFFERS = 1 << 0;
        const VS_CONSTANTS = 1 << 1;
        const PS_CONSTANTS = 1 << 2;
        const VS_RESOURCES = 1 << 3;
        const PS_RESOURCES = 1 << 4;
        const CONSTANT_BUFFERS = 1 << 5;
        const SCISSOR = 1 << 6;
    }
}

struct Replay2D<'r, 'f> {
    frame: &'r mut FrameContext<'f>,
    commands: &'r CommandManager2D,
    batch: &'r mut VertexBatch2D,
    config: &'r Renderer2DConfig,
    stats: &'r mut RenderStats2D,

    target: RenderTargetInfo,
    target_id: Option<TextureId>,
    scene_cleared: bool,

    screen: Affine2,
    transform: Affine2,
    vs_constants: VsConstants2D,
    ps_constants: PsConstants2D,
    blend: BlendMode,
    rasterizer: RasterizerState,
    scissor: Rect,
    vs: VertexShaderId,
    ps: PixelShaderId,
    vs_textures: [TextureId; MAX_SAMPLER_COUNT],
    ps_textures: [TextureId; MAX_SAMPLER_COUNT],
    vs_samplers: [SamplerState; MAX_SAMPLER_COUNT],
    ps_samplers: [SamplerState; MAX_SAMPLER_COUNT],
    /// `(stage, slot)` to the constant buffer command bound there.
    constant_buffers: AHashMap<(ShaderStage, u32), u32>,

    batch_info: BatchInfo,
    start_index: u32,
    dirty: ReplayDirty,
    last_key: Option<PipelineKey>,
}

/// Replay every recorded command into `frame.pass`.
///
/// Leaves the last pass open; the caller ends it during cleanup.
pub(crate) fn replay(
    commands: &CommandManager2D,
    batch: &mut VertexBatch2D,
    frame: &mut FrameContext<'_>,
    config: &Renderer2DConfig,
    stats: &mut RenderStats2D,
) -> Result<(), RenderError> {
    profile_function!();

    let scene = frame.scene.clone();
    let mut replay = Replay2D {
        screen: screen_transform(scene.size.as_vec2()),
        target: scene,
        target_id: None,
        scene_cleared: false,
        transform: Affine2::IDENTITY,
        vs_constants: VsConstants2D::default(),
        ps_constants: PsConstants2D::default(),
        blend: BlendMode::DEFAULT_2D,
        rasterizer: RasterizerState::DEFAULT_2D,
        scissor: Rect::default(),
        vs: VertexShaderId::INVALID,
        ps: PixelShaderId::INVALID,
        vs_textures: [TextureId::INVALID; MAX_SAMPLER_COUNT],
        ps_textures: [TextureId::INVALID; MAX_SAMPLER_COUNT],
        vs_samplers: [SamplerState::DEFAULT_2D; MAX_SAMPLER_COUNT],
        ps_samplers: [SamplerState::DEFAULT_2D; MAX_SAMPLER_COUNT],
        constant_buffers: AHashMap::new(),
        batch_info: BatchInfo::default(),
        start_index: 0,
        dirty: ReplayDirty::all(),
        last_key: None,
        frame,
        commands,
        batch,
        config,
        stats,
    };

    replay.begin_target(None, replay.target.clone());
    replay.run()
}

impl Replay2D<'_, '_> {
    fn run(&mut self) -> Result<(), RenderError> {
        use Command2DKind::*;

        let commands = self.commands;
        for command in commands.commands() {
            tracing::trace!("{:?}[{}]", command.kind, command.index);
            let index = command.index;

            match command.kind {
                Null => {}
                SetBuffers => {
                    self.batch.set_buffers(self.frame.pass);
                    self.dirty.remove(ReplayDirty::BUFFERS);
                }
                UpdateBuffers => {
                    self.batch_info = self.batch.update_buffers(self.frame.device, index);
                    self.start_index = self.batch_info.start_index_location;
                }
                Draw => {
                    if let Some(draw) = commands.draw(index) {
                        self.draw_indexed(draw.index_count);
                    }
                }
                DrawNull => {
                    if let Some(count) = commands.null_draw(index) {
                        self.draw_null(count);
                    }
                }
                ColorMul => {
                    if let Some(color) = commands.color_mul().get(index) {
                        self.vs_constants.color_mul = color.to_array();
                        self.dirty |= ReplayDirty::VS_CONSTANTS;
                    }
                }
                ColorAdd => {
                    if let Some(color) = commands.color_add().get(index) {
                        self.ps_constants.color_add = color.to_array();
                        self.dirty |= ReplayDirty::PS_CONSTANTS;
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
                SdfParams => {
                    if let Some(params) = commands.sdf_params().get(index) {
                        self.ps_constants.sdf_param = params[0].to_array();
                        self.ps_constants.sdf_outline_color = params[1].to_array();
                        self.ps_constants.sdf_shadow_color = params[2].to_array();
                        self.dirty |= ReplayDirty::PS_CONSTANTS;
                    }
                }
                InternalPsConstants => {
                    if let Some(value) = commands.internal_ps_constants().get(index) {
                        self.ps_constants.internal = value.to_array();
                        self.dirty |= ReplayDirty::PS_CONSTANTS;
                    }
                }
                SetRenderTarget => {
                    if let Some(target) = commands.render_targets().get(index) {
                        self.set_render_target(target.as_ref().map(|rt| rt.id()))?;
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
                Transform => {
                    if let Some(transform) = commands.transforms().get(index) {
                        self.transform = *transform;
                        self.update_vs_transform();
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
            }
        }

        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if self.prepare_draw(VertexLayout::Sprite2D) {
            let start = self.start_index;
            self.frame.pass.draw_indexed(
                start..start + index_count,
                self.batch_info.base_vertex_location as i32,
                0..1,
            );
            self.stats.draw_calls += 1;
            self.stats.triangle_count += index_count / 3;
        }
        self.start_index += index_count;
    }

    fn draw_null(&mut self, vertex_count: u32) {
        if self.prepare_draw(VertexLayout::None) {
            self.frame.pass.draw(0..vertex_count, 0..1);
            self.stats.draw_calls += 1;
            self.stats.triangle_count += vertex_count / 3;
        }
    }

    /// Bind the pipeline and everything marked dirty. Returns `false` if the
    /// draw has to be skipped.
    fn prepare_draw(&mut self, layout: VertexLayout) -> bool {
        let key = PipelineKey {
            vs: self.vs,
            ps: self.ps,
            blend: self.blend,
            rasterizer: self.rasterizer,
            depth_stencil: None,
            target_format: self.target.format,
            depth_format: None,
            sample_count: self.target.sample_count,
            layout,
            topology: wgpu::PrimitiveTopology::TriangleList,
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

        if dirty.contains(ReplayDirty::BUFFERS) {
            self.batch.set_buffers(pass);
        }
        if dirty.contains(ReplayDirty::VS_CONSTANTS) {
            self.frame.shaders.bind_constants(
                pass,
                ShaderStage::Vertex,
                0,
                bytemuck::bytes_of(&self.vs_constants),
            );
        }
        if dirty.contains(ReplayDirty::PS_CONSTANTS) {
            self.frame.shaders.bind_constants(
                pass,
                ShaderStage::Pixel,
                0,
                bytemuck::bytes_of(&self.ps_constants),
            );
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
                    self.frame.shaders.bind_constant_buffer(
                        pass,
                        stage,
                        slot,
                        command.buffer.id(),
                        bytemuck::cast_slice(data),
                    );
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

    /// End the current pass and start one on `info`, with a full viewport.
    fn begin_target(&mut self, id: Option<TextureId>, info: RenderTargetInfo) {
        let clear = match id {
            None if !self.scene_cleared => {
                self.scene_cleared = true;
                self.config.clear_color
            }
            _ => None,
        };

        let mut target = PassTarget::color(&info.view).with_label(match id {
            None => "Lumora 2D Scene",
            Some(_) => "Lumora 2D Render Texture",
        });
        if let Some(color) = clear {
            target = target.with_clear_color(color.to_wgpu());
        }
        self.frame.pass.begin_pass(&target);
        self.stats.render_passes += 1;

        self.target_id = id;
        self.target = info;
        self.dirty = ReplayDirty::all();
        self.last_key = None;
        self.set_full_viewport();
    }

    fn set_full_viewport(&mut self) {
        let size = self.target.size;
        self.frame
            .pass
            .set_viewport(0.0, 0.0, size.x as f32, size.y as f32, 0.0, 1.0);
        self.screen = screen_transform(size.as_vec2());
        self.update_vs_transform();
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
        self.screen = screen_transform(Vec2::new(rect.w as f32, rect.h as f32));
        self.update_vs_transform();
    }

    fn update_vs_transform(&mut self) {
        self.vs_constants.transform = pack_transform(self.screen * self.transform);
        self.dirty |= ReplayDirty::VS_CONSTANTS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_identity() {
        assert_eq!(
            pack_transform(Affine2::IDENTITY),
            [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 1.0]]
        );
    }

    #[test]
    fn test_pack_screen_transform() {
        let packed = pack_transform(screen_transform(Vec2::new(200.0, 100.0)));
        assert_eq!(packed[0], [0.01, 0.0, -1.0, 1.0]);
        assert_eq!(packed[1], [0.0, -0.02, 0.0, 1.0]);
    }

    #[test]
    fn test_transform_applies_before_screen() {
        let screen = screen_transform(Vec2::new(100.0, 100.0));
        let local = Affine2::from_translation(Vec2::new(50.0, 50.0));
        let combined = screen * local;
        assert_eq!(combined.transform_point2(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_default_constants() {
        let vs = VsConstants2D::default();
        assert_eq!(vs.color_mul, [1.0; 4]);
        let ps = PsConstants2D::default();
        assert_eq!(ps.sdf_param, [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(ps.sdf_shadow_color, [0.0, 0.0, 0.0, 0.5]);
    }
}
