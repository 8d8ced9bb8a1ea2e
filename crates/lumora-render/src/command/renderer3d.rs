use ahash::AHashMap;
use glam::{Mat4, Vec3, Vec4};
use lumora_core::profiling::profile_function;
use static_assertions::const_assert;

use super::{Command, CommandKind, ConstantBufferCommand, StateChanges, StateHistory};
use crate::batch::UpdateBuffersSink;
use crate::blend::BlendMode;
use crate::color::Color;
use crate::resource::{
    ConstantBuffer, Mesh, MeshId, PixelShader, PixelShaderId, RenderTexture, Texture, TextureId,
    VertexShader, VertexShaderId,
};
use crate::state::{
    DepthStencilState, MAX_SAMPLER_COUNT, RasterizerState, Rect, SamplerState, ShaderStage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command3DKind {
    Null,
    UpdateLineBuffers,
    Draw,
    DrawLine3D,
    BlendState,
    RasterizerState,
    DepthStencilState,
    VsSamplerState(u8),
    PsSamplerState(u8),
    ScissorRect,
    Viewport,
    SetRenderTarget,
    InputLayout,
    SetVs,
    SetPs,
    CameraTransform,
    EyePosition,
    LocalTransform,
    UvTransform,
    SetConstantBuffer,
    VsTexture(u8),
    PsTexture(u8),
    SetMesh,
    GlobalAmbientColor,
    SunDirection,
    SunColor,
}

const SLOTS: u32 = MAX_SAMPLER_COUNT as u32;

impl CommandKind for Command3DKind {
    const COUNT: u32 = 22 + 4 * SLOTS;

    fn bit(self) -> u32 {
        use Command3DKind::*;
        match self {
            Null => 0,
            UpdateLineBuffers => 1,
            Draw => 2,
            DrawLine3D => 3,
            BlendState => 4,
            RasterizerState => 5,
            DepthStencilState => 6,
            VsSamplerState(slot) => 7 + slot as u32,
            PsSamplerState(slot) => 7 + SLOTS + slot as u32,
            ScissorRect => 7 + 2 * SLOTS,
            Viewport => 8 + 2 * SLOTS,
            SetRenderTarget => 9 + 2 * SLOTS,
            InputLayout => 10 + 2 * SLOTS,
            SetVs => 11 + 2 * SLOTS,
            SetPs => 12 + 2 * SLOTS,
            CameraTransform => 13 + 2 * SLOTS,
            EyePosition => 14 + 2 * SLOTS,
            LocalTransform => 15 + 2 * SLOTS,
            UvTransform => 16 + 2 * SLOTS,
            SetConstantBuffer => 17 + 2 * SLOTS,
            VsTexture(slot) => 18 + 2 * SLOTS + slot as u32,
            PsTexture(slot) => 18 + 3 * SLOTS + slot as u32,
            SetMesh => 18 + 4 * SLOTS,
            GlobalAmbientColor => 19 + 4 * SLOTS,
            SunDirection => 20 + 4 * SLOTS,
            SunColor => 21 + 4 * SLOTS,
        }
    }
}

const_assert!(<Command3DKind as CommandKind>::COUNT <= u64::BITS);

pub const DEFAULT_UV_TRANSFORM: Vec4 = Vec4::new(1.0, 1.0, 0.0, 0.0);
pub const DEFAULT_GLOBAL_AMBIENT: Vec3 = Vec3::splat(0.4);
pub const DEFAULT_SUN_COLOR: Vec3 = Vec3::splat(0.6);

pub fn default_sun_direction() -> Vec3 {
    Vec3::new(1.0, 1.0, -1.0).normalize()
}

/// Which vertex buffers a 3D draw reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputLayout3D {
    #[default]
    Mesh,
    Line3D,
}

/// Per-draw Phong parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongMaterial {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub emission: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
    pub has_diffuse_texture: bool,
}

impl PhongMaterial {
    pub fn from_diffuse(diffuse: Color) -> Self {
        Self {
            diffuse: diffuse.to_vec4(),
            ..Self::default()
        }
    }

    pub fn with_diffuse_texture(mut self) -> Self {
        self.has_diffuse_texture = true;
        self
    }
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            emission: Vec4::ZERO,
            specular: Vec4::ZERO,
            shininess: 1.0,
            has_diffuse_texture: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand3D {
    pub start_index: u32,
    pub index_count: u32,
    pub instance_count: u32,
    pub material: PhongMaterial,
}

fn slot_histories<T: Clone + PartialEq>(initial: T) -> [StateHistory<T>; MAX_SAMPLER_COUNT] {
    std::array::from_fn(|_| StateHistory::new(initial.clone()))
}

/// Command recorder for the 3D renderer.
///
/// Mesh draws are emitted one command per call. Line draws share the 3D line
/// batch and accumulate like 2D draws.
pub struct CommandManager3D {
    commands: Vec<Command<Command3DKind>>,
    changes: StateChanges<Command3DKind>,

    draws: Vec<DrawCommand3D>,
    line_draws: Vec<u32>,
    current_line_draw: u32,

    blend_states: StateHistory<BlendMode>,
    rasterizer_states: StateHistory<RasterizerState>,
    depth_stencil_states: StateHistory<DepthStencilState>,
    vs_sampler_states: [StateHistory<SamplerState>; MAX_SAMPLER_COUNT],
    ps_sampler_states: [StateHistory<SamplerState>; MAX_SAMPLER_COUNT],
    scissor_rects: StateHistory<Rect>,
    viewports: StateHistory<Option<Rect>>,
    render_targets: StateHistory<Option<RenderTexture>>,
    input_layouts: StateHistory<InputLayout3D>,
    vs: StateHistory<VertexShaderId>,
    ps: StateHistory<PixelShaderId>,
    camera_transforms: StateHistory<Mat4>,
    eye_positions: StateHistory<Vec3>,
    local_transforms: StateHistory<Mat4>,
    uv_transforms: StateHistory<Vec4>,

    constants: Vec<Vec4>,
    constant_buffer_commands: Vec<ConstantBufferCommand>,

    vs_textures: [StateHistory<TextureId>; MAX_SAMPLER_COUNT],
    ps_textures: [StateHistory<TextureId>; MAX_SAMPLER_COUNT],
    meshes: StateHistory<MeshId>,

    global_ambient_colors: StateHistory<Vec3>,
    sun_directions: StateHistory<Vec3>,
    sun_colors: StateHistory<Vec3>,

    reserved_vs: AHashMap<VertexShaderId, VertexShader>,
    reserved_ps: AHashMap<PixelShaderId, PixelShader>,
    reserved_textures: AHashMap<TextureId, Texture>,
    reserved_meshes: AHashMap<MeshId, Mesh>,
}

impl Default for CommandManager3D {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager3D {
    pub fn new() -> Self {
        let mut manager = Self {
            commands: Vec::new(),
            changes: StateChanges::new(),
            draws: Vec::new(),
            line_draws: Vec::new(),
            current_line_draw: 0,
            blend_states: StateHistory::new(BlendMode::DEFAULT_3D),
            rasterizer_states: StateHistory::new(RasterizerState::DEFAULT_3D),
            depth_stencil_states: StateHistory::new(DepthStencilState::DEFAULT_3D),
            vs_sampler_states: slot_histories(SamplerState::DEFAULT_3D),
            ps_sampler_states: slot_histories(SamplerState::DEFAULT_3D),
            scissor_rects: StateHistory::new(Rect::default()),
            viewports: StateHistory::new(None),
            render_targets: StateHistory::new(None),
            input_layouts: StateHistory::new(InputLayout3D::Mesh),
            vs: StateHistory::new(VertexShaderId::INVALID),
            ps: StateHistory::new(PixelShaderId::INVALID),
            camera_transforms: StateHistory::new(Mat4::IDENTITY),
            eye_positions: StateHistory::new(Vec3::ZERO),
            local_transforms: StateHistory::new(Mat4::IDENTITY),
            uv_transforms: StateHistory::new(DEFAULT_UV_TRANSFORM),
            constants: Vec::new(),
            constant_buffer_commands: Vec::new(),
            vs_textures: slot_histories(TextureId::INVALID),
            ps_textures: slot_histories(TextureId::INVALID),
            meshes: StateHistory::new(MeshId::INVALID),
            global_ambient_colors: StateHistory::new(DEFAULT_GLOBAL_AMBIENT),
            sun_directions: StateHistory::new(default_sun_direction()),
            sun_colors: StateHistory::new(DEFAULT_SUN_COLOR),
            reserved_vs: AHashMap::new(),
            reserved_ps: AHashMap::new(),
            reserved_textures: AHashMap::new(),
            reserved_meshes: AHashMap::new(),
        };
        manager.reset();
        manager
    }

    pub fn reset(&mut self) {
        use Command3DKind::*;

        self.commands.clear();
        self.changes.clear_all();
        self.draws.clear();
        self.line_draws.clear();
        self.current_line_draw = 0;

        self.blend_states.reset();
        self.rasterizer_states.reset();
        self.depth_stencil_states.reset();
        for history in self
            .vs_sampler_states
            .iter_mut()
            .chain(self.ps_sampler_states.iter_mut())
        {
            history.reset();
        }
        self.scissor_rects.reset();
        self.viewports.reset();
        self.render_targets.reset();
        self.input_layouts.reset();
        self.vs.reset_to(VertexShaderId::INVALID);
        self.ps.reset_to(PixelShaderId::INVALID);
        self.camera_transforms.reset();
        self.eye_positions.reset();
        self.local_transforms.reset();
        self.uv_transforms.reset_to(DEFAULT_UV_TRANSFORM);
        for history in self.vs_textures.iter_mut().chain(self.ps_textures.iter_mut()) {
            history.reset_to(TextureId::INVALID);
        }
        self.meshes.reset_to(MeshId::INVALID);
        self.global_ambient_colors.reset();
        self.sun_directions.reset();
        self.sun_colors.reset();

        self.constants.clear();
        self.constant_buffer_commands.clear();

        self.reserved_vs.clear();
        self.reserved_ps.clear();
        self.reserved_textures.clear();
        self.reserved_meshes.clear();

        let setup = [UpdateLineBuffers, BlendState, RasterizerState, DepthStencilState];
        self.commands.extend(setup.into_iter().map(|kind| Command::new(kind, 0)));
        for slot in 0..SLOTS as u8 {
            self.commands.push(Command::new(VsSamplerState(slot), 0));
        }
        for slot in 0..SLOTS as u8 {
            self.commands.push(Command::new(PsSamplerState(slot), 0));
        }
        let setup = [
            ScissorRect,
            Viewport,
            InputLayout,
            SetRenderTarget,
            SetVs,
            SetPs,
            CameraTransform,
            EyePosition,
            LocalTransform,
            UvTransform,
        ];
        self.commands.extend(setup.into_iter().map(|kind| Command::new(kind, 0)));
        for slot in 0..SLOTS as u8 {
            self.commands.push(Command::new(VsTexture(slot), 0));
        }
        for slot in 0..SLOTS as u8 {
            self.commands.push(Command::new(PsTexture(slot), 0));
        }
        let setup = [SetMesh, GlobalAmbientColor, SunDirection, SunColor];
        self.commands.extend(setup.into_iter().map(|kind| Command::new(kind, 0)));
    }

    pub fn flush(&mut self) {
        use Command3DKind::*;
        profile_function!();

        if self.current_line_draw > 0 {
            self.commands
                .push(Command::new(DrawLine3D, self.line_draws.len() as u32));
            self.line_draws.push(self.current_line_draw);
            self.current_line_draw = 0;
        }

        let changes = &self.changes;
        let commands = &mut self.commands;

        self.blend_states.commit_into(BlendState, changes, commands);
        self.rasterizer_states
            .commit_into(RasterizerState, changes, commands);
        self.depth_stencil_states
            .commit_into(DepthStencilState, changes, commands);
        for (slot, history) in self.vs_sampler_states.iter_mut().enumerate() {
            history.commit_into(VsSamplerState(slot as u8), changes, commands);
        }
        for (slot, history) in self.ps_sampler_states.iter_mut().enumerate() {
            history.commit_into(PsSamplerState(slot as u8), changes, commands);
        }
        self.scissor_rects.commit_into(ScissorRect, changes, commands);
        self.viewports.commit_into(Viewport, changes, commands);
        self.input_layouts.commit_into(InputLayout, changes, commands);
        self.render_targets
            .commit_into(SetRenderTarget, changes, commands);
        self.vs.commit_into(SetVs, changes, commands);
        self.ps.commit_into(SetPs, changes, commands);
        self.camera_transforms
            .commit_into(CameraTransform, changes, commands);
        self.eye_positions.commit_into(EyePosition, changes, commands);
        self.local_transforms
            .commit_into(LocalTransform, changes, commands);
        self.uv_transforms.commit_into(UvTransform, changes, commands);

        if changes.has(SetConstantBuffer) {
            let index = self.constant_buffer_commands.len().saturating_sub(1) as u32;
            commands.push(Command::new(SetConstantBuffer, index));
        }

        for (slot, history) in self.vs_textures.iter_mut().enumerate() {
            history.commit_into(VsTexture(slot as u8), changes, commands);
        }
        for (slot, history) in self.ps_textures.iter_mut().enumerate() {
            history.commit_into(PsTexture(slot as u8), changes, commands);
        }
        self.meshes.commit_into(SetMesh, changes, commands);
        self.global_ambient_colors
            .commit_into(GlobalAmbientColor, changes, commands);
        self.sun_directions.commit_into(SunDirection, changes, commands);
        self.sun_colors.commit_into(SunColor, changes, commands);

        self.changes.clear_all();
    }

    /// Record one mesh draw. Pending lines and state are committed first.
    pub fn push_draw(
        &mut self,
        start_index: u32,
        index_count: u32,
        material: PhongMaterial,
        instance_count: u32,
    ) {
        self.flush();
        self.commands.push(Command::new(
            Command3DKind::Draw,
            self.draws.len() as u32,
        ));
        self.draws.push(DrawCommand3D {
            start_index,
            index_count,
            instance_count,
            material,
        });
    }

    pub fn push_draw_line3d(&mut self, index_count: u32) {
        if self.changes.has_state_change() {
            self.flush();
        }
        self.current_line_draw += index_count;
    }

    pub fn push_update_line3d_buffers(&mut self, segment: u32) {
        self.flush();
        self.commands
            .push(Command::new(Command3DKind::UpdateLineBuffers, segment));
    }

    /// True if any mesh or line draw was recorded this frame.
    pub fn has_draw(&self) -> bool {
        !self.draws.is_empty() || !self.line_draws.is_empty() || self.current_line_draw > 0
    }

    pub fn push_blend_state(&mut self, state: BlendMode) {
        self.blend_states
            .push(state, Command3DKind::BlendState, &mut self.changes);
    }

    pub fn push_rasterizer_state(&mut self, state: RasterizerState) {
        self.rasterizer_states
            .push(state, Command3DKind::RasterizerState, &mut self.changes);
    }

    pub fn push_depth_stencil_state(&mut self, state: DepthStencilState) {
        self.depth_stencil_states
            .push(state, Command3DKind::DepthStencilState, &mut self.changes);
    }

    pub fn push_vs_sampler_state(&mut self, slot: usize, state: SamplerState) {
        self.vs_sampler_states[slot].push(
            state,
            Command3DKind::VsSamplerState(slot as u8),
            &mut self.changes,
        );
    }

    pub fn push_ps_sampler_state(&mut self, slot: usize, state: SamplerState) {
        self.ps_sampler_states[slot].push(
            state,
            Command3DKind::PsSamplerState(slot as u8),
            &mut self.changes,
        );
    }

    pub fn push_scissor_rect(&mut self, rect: Rect) {
        self.scissor_rects
            .push(rect, Command3DKind::ScissorRect, &mut self.changes);
    }

    pub fn push_viewport(&mut self, viewport: Option<Rect>) {
        self.viewports
            .push(viewport, Command3DKind::Viewport, &mut self.changes);
    }

    pub fn push_render_target(&mut self, target: Option<RenderTexture>) {
        self.render_targets
            .push(target, Command3DKind::SetRenderTarget, &mut self.changes);
    }

    pub fn push_input_layout(&mut self, layout: InputLayout3D) {
        self.input_layouts
            .push(layout, Command3DKind::InputLayout, &mut self.changes);
    }

    pub fn push_standard_vs(&mut self, id: VertexShaderId) {
        self.vs.push(id, Command3DKind::SetVs, &mut self.changes);
    }

    pub fn push_custom_vs(&mut self, shader: &VertexShader) {
        let id = shader.id();
        if self.vs.push(id, Command3DKind::SetVs, &mut self.changes) {
            self.reserved_vs
                .entry(id)
                .or_insert_with(|| shader.clone());
        }
    }

    pub fn push_standard_ps(&mut self, id: PixelShaderId) {
        self.ps.push(id, Command3DKind::SetPs, &mut self.changes);
    }

    pub fn push_custom_ps(&mut self, shader: &PixelShader) {
        let id = shader.id();
        if self.ps.push(id, Command3DKind::SetPs, &mut self.changes) {
            self.reserved_ps
                .entry(id)
                .or_insert_with(|| shader.clone());
        }
    }

    /// World to clip.
    pub fn push_camera_transform(&mut self, transform: Mat4) {
        self.camera_transforms
            .push(transform, Command3DKind::CameraTransform, &mut self.changes);
    }

    pub fn push_eye_position(&mut self, position: Vec3) {
        self.eye_positions
            .push(position, Command3DKind::EyePosition, &mut self.changes);
    }

    /// Local to world.
    pub fn push_local_transform(&mut self, transform: Mat4) {
        self.local_transforms
            .push(transform, Command3DKind::LocalTransform, &mut self.changes);
    }

    /// `(scale_u, scale_v, offset_u, offset_v)`.
    pub fn push_uv_transform(&mut self, transform: Vec4) {
        self.uv_transforms
            .push(transform, Command3DKind::UvTransform, &mut self.changes);
    }

    pub fn push_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        buffer: &ConstantBuffer,
        data: &[Vec4],
    ) {
        self.flush();
        let offset = self.constants.len() as u32;
        self.constants.extend_from_slice(data);
        self.constant_buffer_commands.push(ConstantBufferCommand {
            stage,
            slot,
            offset,
            num_vectors: data.len() as u32,
            buffer: buffer.clone(),
        });
        self.changes.set(Command3DKind::SetConstantBuffer);
    }

    pub fn push_vs_texture(&mut self, slot: usize, texture: Option<&Texture>) {
        let id = texture.map_or(TextureId::INVALID, |t| t.id());
        let pending =
            self.vs_textures[slot].push(id, Command3DKind::VsTexture(slot as u8), &mut self.changes);
        if pending && let Some(texture) = texture {
            self.reserved_textures
                .entry(id)
                .or_insert_with(|| texture.clone());
        }
    }

    pub fn push_ps_texture(&mut self, slot: usize, texture: Option<&Texture>) {
        let id = texture.map_or(TextureId::INVALID, |t| t.id());
        let pending =
            self.ps_textures[slot].push(id, Command3DKind::PsTexture(slot as u8), &mut self.changes);
        if pending && let Some(texture) = texture {
            self.reserved_textures
                .entry(id)
                .or_insert_with(|| texture.clone());
        }
    }

    pub fn push_mesh(&mut self, mesh: &Mesh) {
        let id = mesh.id();
        if self.meshes.push(id, Command3DKind::SetMesh, &mut self.changes) {
            self.reserved_meshes
                .entry(id)
                .or_insert_with(|| mesh.clone());
        }
    }

    pub fn push_global_ambient_color(&mut self, color: Vec3) {
        self.global_ambient_colors
            .push(color, Command3DKind::GlobalAmbientColor, &mut self.changes);
    }

    pub fn push_sun_direction(&mut self, direction: Vec3) {
        self.sun_directions
            .push(direction, Command3DKind::SunDirection, &mut self.changes);
    }

    pub fn push_sun_color(&mut self, color: Vec3) {
        self.sun_colors
            .push(color, Command3DKind::SunColor, &mut self.changes);
    }

    pub fn commands(&self) -> &[Command<Command3DKind>] {
        &self.commands
    }

    pub fn has_state_change(&self) -> bool {
        self.changes.has_state_change()
    }

    pub fn draw(&self, index: u32) -> Option<&DrawCommand3D> {
        self.draws.get(index as usize)
    }

    pub fn line_draw(&self, index: u32) -> Option<u32> {
        self.line_draws.get(index as usize).copied()
    }

    pub fn constant_buffer_command(&self, index: u32) -> Option<&ConstantBufferCommand> {
        self.constant_buffer_commands.get(index as usize)
    }

    pub fn constants(&self) -> &[Vec4] {
        &self.constants
    }

    pub fn blend_states(&self) -> &StateHistory<BlendMode> {
        &self.blend_states
    }

    pub fn rasterizer_states(&self) -> &StateHistory<RasterizerState> {
        &self.rasterizer_states
    }

    pub fn depth_stencil_states(&self) -> &StateHistory<DepthStencilState> {
        &self.depth_stencil_states
    }

    pub fn vs_sampler_states(&self, slot: usize) -> &StateHistory<SamplerState> {
        &self.vs_sampler_states[slot]
    }

    pub fn ps_sampler_states(&self, slot: usize) -> &StateHistory<SamplerState> {
        &self.ps_sampler_states[slot]
    }

    pub fn scissor_rects(&self) -> &StateHistory<Rect> {
        &self.scissor_rects
    }

    pub fn viewports(&self) -> &StateHistory<Option<Rect>> {
        &self.viewports
    }

    pub fn render_targets(&self) -> &StateHistory<Option<RenderTexture>> {
        &self.render_targets
    }

    pub fn input_layouts(&self) -> &StateHistory<InputLayout3D> {
        &self.input_layouts
    }

    pub fn vs(&self) -> &StateHistory<VertexShaderId> {
        &self.vs
    }

    pub fn ps(&self) -> &StateHistory<PixelShaderId> {
        &self.ps
    }

    pub fn camera_transforms(&self) -> &StateHistory<Mat4> {
        &self.camera_transforms
    }

    pub fn eye_positions(&self) -> &StateHistory<Vec3> {
        &self.eye_positions
    }

    pub fn local_transforms(&self) -> &StateHistory<Mat4> {
        &self.local_transforms
    }

    pub fn uv_transforms(&self) -> &StateHistory<Vec4> {
        &self.uv_transforms
    }

    pub fn vs_textures(&self, slot: usize) -> &StateHistory<TextureId> {
        &self.vs_textures[slot]
    }

    pub fn ps_textures(&self, slot: usize) -> &StateHistory<TextureId> {
        &self.ps_textures[slot]
    }

    pub fn meshes(&self) -> &StateHistory<MeshId> {
        &self.meshes
    }

    pub fn global_ambient_colors(&self) -> &StateHistory<Vec3> {
        &self.global_ambient_colors
    }

    pub fn sun_directions(&self) -> &StateHistory<Vec3> {
        &self.sun_directions
    }

    pub fn sun_colors(&self) -> &StateHistory<Vec3> {
        &self.sun_colors
    }

    pub fn is_texture_reserved(&self, id: TextureId) -> bool {
        self.reserved_textures.contains_key(&id)
    }

    pub fn is_mesh_reserved(&self, id: MeshId) -> bool {
        self.reserved_meshes.contains_key(&id)
    }

    pub fn is_vs_reserved(&self, id: VertexShaderId) -> bool {
        self.reserved_vs.contains_key(&id)
    }

    pub fn is_ps_reserved(&self, id: PixelShaderId) -> bool {
        self.reserved_ps.contains_key(&id)
    }
}

impl UpdateBuffersSink for CommandManager3D {
    fn push_update_buffers(&mut self, segment: u32) {
        self.push_update_line3d_buffers(segment);
    }
}
