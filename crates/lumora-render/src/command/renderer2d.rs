use ahash::AHashMap;
use glam::{Affine2, Vec4};
use lumora_core::math::max_scaling;
use lumora_core::profiling::profile_function;
use static_assertions::const_assert;

use super::{Command, CommandKind, StateChanges, StateHistory};
use crate::batch::UpdateBuffersSink;
use crate::blend::BlendMode;
use crate::color::Color;
use crate::resource::{
    ConstantBuffer, PixelShader, PixelShaderId, RenderTexture, Texture, TextureId, VertexShader,
    VertexShaderId,
};
use crate::state::{MAX_SAMPLER_COUNT, RasterizerState, Rect, SamplerState, ShaderStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command2DKind {
    Null,
    SetBuffers,
    UpdateBuffers,
    Draw,
    DrawNull,
    ColorMul,
    ColorAdd,
    BlendState,
    RasterizerState,
    VsSamplerState(u8),
    PsSamplerState(u8),
    ScissorRect,
    Viewport,
    SdfParams,
    InternalPsConstants,
    SetRenderTarget,
    SetVs,
    SetPs,
    Transform,
    SetConstantBuffer,
    VsTexture(u8),
    PsTexture(u8),
}

const SLOTS: u32 = MAX_SAMPLER_COUNT as u32;

impl CommandKind for Command2DKind {
    const COUNT: u32 = 18 + 4 * SLOTS;

    fn bit(self) -> u32 {
        use Command2DKind::*;
        match self {
            Null => 0,
            SetBuffers => 1,
            UpdateBuffers => 2,
            Draw => 3,
            DrawNull => 4,
            ColorMul => 5,
            ColorAdd => 6,
            BlendState => 7,
            RasterizerState => 8,
            VsSamplerState(slot) => 9 + slot as u32,
            PsSamplerState(slot) => 9 + SLOTS + slot as u32,
            ScissorRect => 9 + 2 * SLOTS,
            Viewport => 10 + 2 * SLOTS,
            SdfParams => 11 + 2 * SLOTS,
            InternalPsConstants => 12 + 2 * SLOTS,
            SetRenderTarget => 13 + 2 * SLOTS,
            SetVs => 14 + 2 * SLOTS,
            SetPs => 15 + 2 * SLOTS,
            Transform => 16 + 2 * SLOTS,
            SetConstantBuffer => 17 + 2 * SLOTS,
            VsTexture(slot) => 18 + 2 * SLOTS + slot as u32,
            PsTexture(slot) => 18 + 3 * SLOTS + slot as u32,
        }
    }
}

const_assert!(<Command2DKind as CommandKind>::COUNT <= u64::BITS);

/// Font SDF parameters in effect when nothing else was pushed.
pub const DEFAULT_SDF_PARAMS: [Vec4; 3] = [
    Vec4::new(0.5, 0.5, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
    Vec4::new(0.0, 0.0, 0.0, 0.5),
];

/// Accumulated indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawCommand2D {
    pub index_count: u32,
}

/// A user constant buffer update, pointing into the flat constants blob.
#[derive(Debug, Clone)]
pub struct ConstantBufferCommand {
    pub stage: ShaderStage,
    pub slot: u32,
    /// Offset into [`CommandManager2D::constants`], in vectors.
    pub offset: u32,
    pub num_vectors: u32,
    pub buffer: ConstantBuffer,
}

fn slot_histories<T: Clone + PartialEq>(initial: T) -> [StateHistory<T>; MAX_SAMPLER_COUNT] {
    std::array::from_fn(|_| StateHistory::new(initial.clone()))
}

/// Command recorder for the 2D renderer.
///
/// State persists across frames; [`reset`](Self::reset) only clears the
/// command list and re-emits every category at history index 0 so replay
/// starts from a fully specified state. Shaders and textures are the
/// exception: they fall back to invalid because their pins are released.
pub struct CommandManager2D {
    commands: Vec<Command<Command2DKind>>,
    changes: StateChanges<Command2DKind>,

    draws: Vec<DrawCommand2D>,
    null_draws: Vec<u32>,
    current_draw: DrawCommand2D,

    color_mul: StateHistory<Color>,
    color_add: StateHistory<Color>,
    blend_states: StateHistory<BlendMode>,
    rasterizer_states: StateHistory<RasterizerState>,
    vs_sampler_states: [StateHistory<SamplerState>; MAX_SAMPLER_COUNT],
    ps_sampler_states: [StateHistory<SamplerState>; MAX_SAMPLER_COUNT],
    scissor_rects: StateHistory<Rect>,
    viewports: StateHistory<Option<Rect>>,
    sdf_params: StateHistory<[Vec4; 3]>,
    internal_ps_constants: StateHistory<Vec4>,
    render_targets: StateHistory<Option<RenderTexture>>,
    vs: StateHistory<VertexShaderId>,
    ps: StateHistory<PixelShaderId>,

    transforms: StateHistory<Affine2>,
    current_local_transform: Affine2,
    current_camera_transform: Affine2,
    current_max_scaling: f32,

    constants: Vec<Vec4>,
    constant_buffer_commands: Vec<ConstantBufferCommand>,

    vs_textures: [StateHistory<TextureId>; MAX_SAMPLER_COUNT],
    ps_textures: [StateHistory<TextureId>; MAX_SAMPLER_COUNT],

    reserved_vs: AHashMap<VertexShaderId, VertexShader>,
    reserved_ps: AHashMap<PixelShaderId, PixelShader>,
    reserved_textures: AHashMap<TextureId, Texture>,
}

impl Default for CommandManager2D {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager2D {
    pub fn new() -> Self {
        let mut manager = Self {
            commands: Vec::new(),
            changes: StateChanges::new(),
            draws: Vec::new(),
            null_draws: Vec::new(),
            current_draw: DrawCommand2D::default(),
            color_mul: StateHistory::new(Color::WHITE),
            color_add: StateHistory::new(Color::TRANSPARENT),
            blend_states: StateHistory::new(BlendMode::DEFAULT_2D),
            rasterizer_states: StateHistory::new(RasterizerState::DEFAULT_2D),
            vs_sampler_states: slot_histories(SamplerState::DEFAULT_2D),
            ps_sampler_states: slot_histories(SamplerState::DEFAULT_2D),
            scissor_rects: StateHistory::new(Rect::default()),
            viewports: StateHistory::new(None),
            sdf_params: StateHistory::new(DEFAULT_SDF_PARAMS),
            internal_ps_constants: StateHistory::new(Vec4::ZERO),
            render_targets: StateHistory::new(None),
            vs: StateHistory::new(VertexShaderId::INVALID),
            ps: StateHistory::new(PixelShaderId::INVALID),
            transforms: StateHistory::new(Affine2::IDENTITY),
            current_local_transform: Affine2::IDENTITY,
            current_camera_transform: Affine2::IDENTITY,
            current_max_scaling: 1.0,
            constants: Vec::new(),
            constant_buffer_commands: Vec::new(),
            vs_textures: slot_histories(TextureId::INVALID),
            ps_textures: slot_histories(TextureId::INVALID),
            reserved_vs: AHashMap::new(),
            reserved_ps: AHashMap::new(),
            reserved_textures: AHashMap::new(),
        };
        manager.reset();
        manager
    }

    /// Clear the command list and start a new frame.
    pub fn reset(&mut self) {
        use Command2DKind::*;

        self.commands.clear();
        self.changes.clear_all();
        self.draws.clear();
        self.null_draws.clear();
        self.current_draw = DrawCommand2D::default();

        self.color_mul.reset();
        self.color_add.reset();
        self.blend_states.reset();
        self.rasterizer_states.reset();
        for history in self
            .vs_sampler_states
            .iter_mut()
            .chain(self.ps_sampler_states.iter_mut())
        {
            history.reset();
        }
        self.scissor_rects.reset();
        self.viewports.reset();
        self.sdf_params.reset();
        self.internal_ps_constants.reset();
        self.render_targets.reset();
        self.vs.reset_to(VertexShaderId::INVALID);
        self.ps.reset_to(PixelShaderId::INVALID);
        self.transforms.reset();
        for history in self.vs_textures.iter_mut().chain(self.ps_textures.iter_mut()) {
            history.reset_to(TextureId::INVALID);
        }

        self.constants.clear();
        self.constant_buffer_commands.clear();

        self.reserved_vs.clear();
        self.reserved_ps.clear();
        self.reserved_textures.clear();

        let setup = [
            SetBuffers,
            UpdateBuffers,
            BlendState,
            ColorMul,
            ColorAdd,
            RasterizerState,
        ];
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
            SdfParams,
            InternalPsConstants,
            SetRenderTarget,
            SetVs,
            SetPs,
            Transform,
        ];
        self.commands.extend(setup.into_iter().map(|kind| Command::new(kind, 0)));
        for slot in 0..SLOTS as u8 {
            self.commands.push(Command::new(VsTexture(slot), 0));
        }
        for slot in 0..SLOTS as u8 {
            self.commands.push(Command::new(PsTexture(slot), 0));
        }
    }

    /// Commit the pending draw and every dirty category.
    pub fn flush(&mut self) {
        use Command2DKind::*;
        profile_function!();

        if self.current_draw.index_count > 0 {
            self.commands
                .push(Command::new(Draw, self.draws.len() as u32));
            self.draws.push(self.current_draw);
            self.current_draw = DrawCommand2D::default();
        }

        let changes = &self.changes;
        let commands = &mut self.commands;

        self.color_mul.commit_into(ColorMul, changes, commands);
        self.color_add.commit_into(ColorAdd, changes, commands);
        self.blend_states.commit_into(BlendState, changes, commands);
        self.rasterizer_states
            .commit_into(RasterizerState, changes, commands);
        for (slot, history) in self.vs_sampler_states.iter_mut().enumerate() {
            history.commit_into(VsSamplerState(slot as u8), changes, commands);
        }
        for (slot, history) in self.ps_sampler_states.iter_mut().enumerate() {
            history.commit_into(PsSamplerState(slot as u8), changes, commands);
        }
        self.scissor_rects.commit_into(ScissorRect, changes, commands);
        self.viewports.commit_into(Viewport, changes, commands);
        self.sdf_params.commit_into(SdfParams, changes, commands);
        self.internal_ps_constants
            .commit_into(InternalPsConstants, changes, commands);
        self.render_targets
            .commit_into(SetRenderTarget, changes, commands);
        self.vs.commit_into(SetVs, changes, commands);
        self.ps.commit_into(SetPs, changes, commands);
        self.transforms.commit_into(Transform, changes, commands);

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

        self.changes.clear_all();
    }

    /// Add `index_count` indices to the pending draw, committing dirty state
    /// first.
    pub fn push_draw(&mut self, index_count: u32) {
        if self.changes.has_state_change() {
            self.flush();
        }
        self.current_draw.index_count += index_count;
    }

    /// Record a non-indexed draw of `count` vertices.
    pub fn push_null_vertices(&mut self, count: u32) {
        self.flush();
        self.commands.push(Command::new(
            Command2DKind::DrawNull,
            self.null_draws.len() as u32,
        ));
        self.null_draws.push(count);
    }

    pub fn push_update_buffers(&mut self, segment: u32) {
        self.flush();
        self.commands
            .push(Command::new(Command2DKind::UpdateBuffers, segment));
    }

    pub fn push_color_mul(&mut self, color: Color) {
        self.color_mul
            .push(color, Command2DKind::ColorMul, &mut self.changes);
    }

    pub fn push_color_add(&mut self, color: Color) {
        self.color_add
            .push(color, Command2DKind::ColorAdd, &mut self.changes);
    }

    pub fn push_blend_state(&mut self, state: BlendMode) {
        self.blend_states
            .push(state, Command2DKind::BlendState, &mut self.changes);
    }

    pub fn push_rasterizer_state(&mut self, state: RasterizerState) {
        self.rasterizer_states
            .push(state, Command2DKind::RasterizerState, &mut self.changes);
    }

    pub fn push_vs_sampler_state(&mut self, slot: usize, state: SamplerState) {
        self.vs_sampler_states[slot].push(
            state,
            Command2DKind::VsSamplerState(slot as u8),
            &mut self.changes,
        );
    }

    pub fn push_ps_sampler_state(&mut self, slot: usize, state: SamplerState) {
        self.ps_sampler_states[slot].push(
            state,
            Command2DKind::PsSamplerState(slot as u8),
            &mut self.changes,
        );
    }

    pub fn push_scissor_rect(&mut self, rect: Rect) {
        self.scissor_rects
            .push(rect, Command2DKind::ScissorRect, &mut self.changes);
    }

    /// `None` covers the whole render target.
    pub fn push_viewport(&mut self, viewport: Option<Rect>) {
        self.viewports
            .push(viewport, Command2DKind::Viewport, &mut self.changes);
    }

    pub fn push_sdf_params(&mut self, params: [Vec4; 3]) {
        self.sdf_params
            .push(params, Command2DKind::SdfParams, &mut self.changes);
    }

    pub fn push_internal_ps_constants(&mut self, constants: Vec4) {
        self.internal_ps_constants.push(
            constants,
            Command2DKind::InternalPsConstants,
            &mut self.changes,
        );
    }

    /// `None` targets the scene.
    pub fn push_render_target(&mut self, target: Option<RenderTexture>) {
        self.render_targets
            .push(target, Command2DKind::SetRenderTarget, &mut self.changes);
    }

    /// Select a built-in vertex shader. Built-ins are never pinned.
    pub fn push_standard_vs(&mut self, id: VertexShaderId) {
        self.vs.push(id, Command2DKind::SetVs, &mut self.changes);
    }

    pub fn push_custom_vs(&mut self, shader: &VertexShader) {
        let id = shader.id();
        if self.vs.push(id, Command2DKind::SetVs, &mut self.changes) {
            self.reserved_vs
                .entry(id)
                .or_insert_with(|| shader.clone());
        }
    }

    pub fn push_standard_ps(&mut self, id: PixelShaderId) {
        self.ps.push(id, Command2DKind::SetPs, &mut self.changes);
    }

    pub fn push_custom_ps(&mut self, shader: &PixelShader) {
        let id = shader.id();
        if self.ps.push(id, Command2DKind::SetPs, &mut self.changes) {
            self.reserved_ps
                .entry(id)
                .or_insert_with(|| shader.clone());
        }
    }

    pub fn push_local_transform(&mut self, local: Affine2) {
        self.current_local_transform = local;
        self.push_combined_transform();
    }

    pub fn push_camera_transform(&mut self, camera: Affine2) {
        self.current_camera_transform = camera;
        self.push_combined_transform();
    }

    fn push_combined_transform(&mut self) {
        let combined = self.current_camera_transform * self.current_local_transform;
        self.transforms
            .push(combined, Command2DKind::Transform, &mut self.changes);
        self.current_max_scaling = max_scaling(&combined);
    }

    /// Record a constant buffer update. Always flushes first, so the update
    /// is ordered after every draw recorded before it.
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
        self.changes.set(Command2DKind::SetConstantBuffer);
    }

    /// `None` unbinds the slot.
    pub fn push_vs_texture(&mut self, slot: usize, texture: Option<&Texture>) {
        let id = texture.map_or(TextureId::INVALID, |t| t.id());
        let pending =
            self.vs_textures[slot].push(id, Command2DKind::VsTexture(slot as u8), &mut self.changes);
        if pending && let Some(texture) = texture {
            self.reserved_textures
                .entry(id)
                .or_insert_with(|| texture.clone());
        }
    }

    /// `None` unbinds the slot.
    pub fn push_ps_texture(&mut self, slot: usize, texture: Option<&Texture>) {
        let id = texture.map_or(TextureId::INVALID, |t| t.id());
        let pending =
            self.ps_textures[slot].push(id, Command2DKind::PsTexture(slot as u8), &mut self.changes);
        if pending && let Some(texture) = texture {
            self.reserved_textures
                .entry(id)
                .or_insert_with(|| texture.clone());
        }
    }

    pub fn commands(&self) -> &[Command<Command2DKind>] {
        &self.commands
    }

    pub fn has_state_change(&self) -> bool {
        self.changes.has_state_change()
    }

    /// Indices accumulated since the last committed draw.
    pub fn pending_index_count(&self) -> u32 {
        self.current_draw.index_count
    }

    pub fn draw(&self, index: u32) -> Option<DrawCommand2D> {
        self.draws.get(index as usize).copied()
    }

    pub fn null_draw(&self, index: u32) -> Option<u32> {
        self.null_draws.get(index as usize).copied()
    }

    pub fn constant_buffer_command(&self, index: u32) -> Option<&ConstantBufferCommand> {
        self.constant_buffer_commands.get(index as usize)
    }

    /// Flat blob of every constant buffer update recorded this frame.
    pub fn constants(&self) -> &[Vec4] {
        &self.constants
    }

    pub fn color_mul(&self) -> &StateHistory<Color> {
        &self.color_mul
    }

    pub fn color_add(&self) -> &StateHistory<Color> {
        &self.color_add
    }

    pub fn blend_states(&self) -> &StateHistory<BlendMode> {
        &self.blend_states
    }

    pub fn rasterizer_states(&self) -> &StateHistory<RasterizerState> {
        &self.rasterizer_states
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

    pub fn sdf_params(&self) -> &StateHistory<[Vec4; 3]> {
        &self.sdf_params
    }

    pub fn internal_ps_constants(&self) -> &StateHistory<Vec4> {
        &self.internal_ps_constants
    }

    pub fn render_targets(&self) -> &StateHistory<Option<RenderTexture>> {
        &self.render_targets
    }

    pub fn vs(&self) -> &StateHistory<VertexShaderId> {
        &self.vs
    }

    pub fn ps(&self) -> &StateHistory<PixelShaderId> {
        &self.ps
    }

    /// Combined local and camera transforms.
    pub fn transforms(&self) -> &StateHistory<Affine2> {
        &self.transforms
    }

    pub fn current_local_transform(&self) -> Affine2 {
        self.current_local_transform
    }

    pub fn current_camera_transform(&self) -> Affine2 {
        self.current_camera_transform
    }

    pub fn current_max_scaling(&self) -> f32 {
        self.current_max_scaling
    }

    pub fn vs_textures(&self, slot: usize) -> &StateHistory<TextureId> {
        &self.vs_textures[slot]
    }

    pub fn ps_textures(&self, slot: usize) -> &StateHistory<TextureId> {
        &self.ps_textures[slot]
    }

    pub fn is_texture_reserved(&self, id: TextureId) -> bool {
        self.reserved_textures.contains_key(&id)
    }

    pub fn is_vs_reserved(&self, id: VertexShaderId) -> bool {
        self.reserved_vs.contains_key(&id)
    }

    pub fn is_ps_reserved(&self, id: PixelShaderId) -> bool {
        self.reserved_ps.contains_key(&id)
    }
}

impl UpdateBuffersSink for CommandManager2D {
    fn push_update_buffers(&mut self, segment: u32) {
        CommandManager2D::push_update_buffers(self, segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ConstantBufferId;
    use std::sync::Arc;

    fn new_commands(manager: &CommandManager2D, setup_len: usize) -> Vec<Command<Command2DKind>> {
        manager.commands()[setup_len..].to_vec()
    }

    #[test]
    fn test_setup_commands_cover_every_category() {
        let manager = CommandManager2D::new();
        let commands = manager.commands();

        assert_eq!(commands.len(), 6 + 8 + 8 + 8 + 8 + 8);
        assert!(commands.iter().all(|c| c.index == 0));
        assert_eq!(commands[0].kind, Command2DKind::SetBuffers);
        assert_eq!(commands[1].kind, Command2DKind::UpdateBuffers);
        assert_eq!(
            commands.last().map(|c| c.kind),
            Some(Command2DKind::PsTexture(7))
        );
    }

    #[test]
    fn test_bits_are_unique() {
        use Command2DKind::*;
        let mut kinds = vec![
            Null,
            SetBuffers,
            UpdateBuffers,
            Draw,
            DrawNull,
            ColorMul,
            ColorAdd,
            BlendState,
            RasterizerState,
            ScissorRect,
            Viewport,
            SdfParams,
            InternalPsConstants,
            SetRenderTarget,
            SetVs,
            SetPs,
            Transform,
            SetConstantBuffer,
        ];
        for slot in 0..8 {
            kinds.extend([
                VsSamplerState(slot),
                PsSamplerState(slot),
                VsTexture(slot),
                PsTexture(slot),
            ]);
        }
        let mut bits: Vec<u32> = kinds.iter().map(|k| k.bit()).collect();
        bits.sort_unstable();
        bits.dedup();
        assert_eq!(bits.len() as u32, Command2DKind::COUNT);
        assert_eq!(bits.last().copied(), Some(Command2DKind::COUNT - 1));
    }

    #[test]
    fn test_flush_order_follows_category_order() {
        let mut manager = CommandManager2D::new();
        let setup = manager.commands().len();

        manager.push_ps_texture(0, Some(&Texture::detached(TextureId(1))));
        manager.push_blend_state(BlendMode::Additive);
        manager.push_color_mul(Color::RED);
        manager.flush();

        let kinds: Vec<_> = new_commands(&manager, setup).iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Command2DKind::ColorMul,
                Command2DKind::BlendState,
                Command2DKind::PsTexture(0)
            ]
        );
    }

    #[test]
    fn test_null_vertices_emit_pending_draw_first() {
        let mut manager = CommandManager2D::new();
        let setup = manager.commands().len();

        manager.push_draw(6);
        manager.push_null_vertices(3);

        let commands = new_commands(&manager, setup);
        assert_eq!(commands[0], Command::new(Command2DKind::Draw, 0));
        assert_eq!(commands[1], Command::new(Command2DKind::DrawNull, 0));
        assert_eq!(manager.null_draw(0), Some(3));
    }

    #[test]
    fn test_update_buffers_closes_pending_draw() {
        let mut manager = CommandManager2D::new();
        let setup = manager.commands().len();

        manager.push_draw(6);
        manager.push_update_buffers(1);
        manager.push_draw(12);
        manager.flush();

        let commands = new_commands(&manager, setup);
        assert_eq!(
            commands,
            vec![
                Command::new(Command2DKind::Draw, 0),
                Command::new(Command2DKind::UpdateBuffers, 1),
                Command::new(Command2DKind::Draw, 1),
            ]
        );
        assert_eq!(manager.draw(1), Some(DrawCommand2D { index_count: 12 }));
    }

    #[test]
    fn test_constant_buffer_forces_flush() {
        let mut manager = CommandManager2D::new();
        let setup = manager.commands().len();
        let buffer = ConstantBuffer::detached(ConstantBufferId(0));

        manager.push_draw(6);
        manager.push_constant_buffer(ShaderStage::Pixel, 1, &buffer, &[Vec4::ONE, Vec4::ZERO]);
        assert!(manager.has_state_change());
        manager.push_draw(6);

        let commands = new_commands(&manager, setup);
        assert_eq!(commands[0].kind, Command2DKind::Draw);
        assert_eq!(commands[1], Command::new(Command2DKind::SetConstantBuffer, 0));

        let cb = manager.constant_buffer_command(0).unwrap();
        assert_eq!((cb.offset, cb.num_vectors, cb.slot), (0, 2, 1));
        assert_eq!(manager.constants(), &[Vec4::ONE, Vec4::ZERO]);
    }

    #[test]
    fn test_textures_are_pinned_until_reset() {
        let owner: Arc<dyn std::any::Any + Send + Sync> = Arc::new([0u8; 4]);
        let texture = Texture::new(TextureId(7), owner.clone());
        let mut manager = CommandManager2D::new();

        manager.push_ps_texture(0, Some(&texture));
        drop(texture);
        assert!(manager.is_texture_reserved(TextureId(7)));
        assert_eq!(Arc::strong_count(&owner), 2);

        manager.flush();
        manager.reset();
        assert!(!manager.is_texture_reserved(TextureId(7)));
        assert_eq!(Arc::strong_count(&owner), 1);
        assert_eq!(*manager.ps_textures(0).current(), TextureId::INVALID);
    }

    #[test]
    fn test_cancelled_texture_push_keeps_pin_until_reset() {
        let mut manager = CommandManager2D::new();
        let texture = Texture::detached(TextureId(2));

        manager.push_ps_texture(1, Some(&texture));
        manager.push_ps_texture(1, None);
        assert!(!manager.has_state_change());
        assert!(manager.is_texture_reserved(TextureId(2)));
    }

    #[test]
    fn test_standard_shaders_are_not_pinned() {
        let mut manager = CommandManager2D::new();
        manager.push_standard_vs(VertexShaderId(0));
        manager.push_custom_ps(&PixelShader::detached(PixelShaderId(9)));

        assert!(!manager.is_vs_reserved(VertexShaderId(0)));
        assert!(manager.is_ps_reserved(PixelShaderId(9)));
    }

    #[test]
    fn test_transform_combines_local_then_camera() {
        let mut manager = CommandManager2D::new();
        let local = Affine2::from_scale(glam::Vec2::splat(2.0));
        let camera = Affine2::from_translation(glam::Vec2::new(10.0, 0.0));

        manager.push_local_transform(local);
        manager.push_camera_transform(camera);

        let combined = *manager.transforms().current();
        assert_eq!(
            combined.transform_point2(glam::Vec2::new(1.0, 1.0)),
            glam::Vec2::new(12.0, 2.0)
        );
        assert!((manager.current_max_scaling() - 2.0).abs() < 1e-5);
    }
}
