//! External collaborators driven by replay.
//!
//! Shader compilation, pipeline caching, texture storage and mesh storage live
//! outside this crate. Replay only needs the narrow capabilities below.

use glam::UVec2;
use lumora_test_utils::{GpuRenderPipeline, GpuTextureView, PassEncoder, RenderContext};

use crate::blend::BlendMode;
use crate::resource::{ConstantBufferId, MeshId, PixelShaderId, TextureId, VertexShaderId};
use crate::state::{DepthStencilState, RasterizerState, SamplerState, ShaderStage};
use crate::vertex::VertexLayout;

/// Everything that selects a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub vs: VertexShaderId,
    pub ps: PixelShaderId,
    pub blend: BlendMode,
    pub rasterizer: RasterizerState,
    /// `None` for passes without a depth attachment.
    pub depth_stencil: Option<DepthStencilState>,
    pub target_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
    pub layout: VertexLayout,
    pub topology: wgpu::PrimitiveTopology,
}

impl PipelineKey {
    /// Pipeline descriptor pieces derived from the key.
    pub fn color_target(&self) -> wgpu::ColorTargetState {
        self.blend.to_color_target_state(self.target_format)
    }

    pub fn primitive(&self) -> wgpu::PrimitiveState {
        self.rasterizer.to_primitive_state(self.topology)
    }

    pub fn depth_stencil_state(&self) -> Option<wgpu::DepthStencilState> {
        let format = self.depth_format?;
        let state = self.depth_stencil.unwrap_or(DepthStencilState::DISABLED);
        Some(state.to_wgpu(format, self.rasterizer.depth_bias))
    }
}

/// Built-in 2D shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardShaders2D {
    pub sprite_vs: VertexShaderId,
    pub shape_ps: PixelShaderId,
    pub texture_ps: PixelShaderId,
    pub square_dot_ps: PixelShaderId,
    pub round_dot_ps: PixelShaderId,
}

/// Built-in 3D shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardShaders3D {
    pub mesh_vs: VertexShaderId,
    pub mesh_ps: PixelShaderId,
    pub line_vs: VertexShaderId,
    pub line_ps: PixelShaderId,
}

pub trait ShaderService {
    fn standard_2d(&self) -> StandardShaders2D;

    fn standard_3d(&self) -> StandardShaders3D;

    /// Look up or build the pipeline for `key`. `None` skips the draw.
    fn pipeline(&mut self, key: &PipelineKey) -> Option<GpuRenderPipeline>;

    /// Upload and bind one of the renderer's own constant blocks.
    fn bind_constants(&mut self, pass: &mut dyn PassEncoder, stage: ShaderStage, slot: u32, data: &[u8]);

    /// Upload `data` into a user constant buffer and bind it.
    fn bind_constant_buffer(
        &mut self,
        pass: &mut dyn PassEncoder,
        stage: ShaderStage,
        slot: u32,
        buffer: ConstantBufferId,
        data: &[u8],
    );
}

/// Attachments of a render target, scene or render texture.
#[derive(Debug, Clone)]
pub struct RenderTargetInfo {
    pub view: GpuTextureView,
    pub depth: Option<GpuTextureView>,
    pub size: UVec2,
    pub format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
}

impl RenderTargetInfo {
    pub fn new(view: GpuTextureView, size: UVec2, format: wgpu::TextureFormat) -> Self {
        Self {
            view,
            depth: None,
            size,
            format,
            depth_format: None,
            sample_count: 1,
        }
    }

    pub fn with_depth(mut self, view: GpuTextureView, format: wgpu::TextureFormat) -> Self {
        self.depth = Some(view);
        self.depth_format = Some(format);
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }
}

pub trait TextureService {
    fn render_target_view(&self, id: TextureId) -> Option<RenderTargetInfo>;

    /// [`TextureId::INVALID`] binds the empty texture.
    fn bind_texture(&mut self, pass: &mut dyn PassEncoder, stage: ShaderStage, slot: u32, texture: TextureId);

    fn bind_sampler(&mut self, pass: &mut dyn PassEncoder, stage: ShaderStage, slot: u32, state: &SamplerState);
}

pub trait MeshService {
    /// Bind the mesh's vertex and index buffers. Returns `false` if the mesh
    /// is unknown.
    fn bind_mesh_to_pass(&mut self, pass: &mut dyn PassEncoder, mesh: MeshId) -> bool;
}

/// Device, pass and services for one replay.
pub struct FrameContext<'a> {
    pub device: &'a dyn RenderContext,
    pub pass: &'a mut dyn PassEncoder,
    pub scene: &'a RenderTargetInfo,
    pub shaders: &'a mut dyn ShaderService,
    pub textures: &'a mut dyn TextureService,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PipelineKey {
        PipelineKey {
            vs: VertexShaderId(0),
            ps: PixelShaderId(1),
            blend: BlendMode::Alpha,
            rasterizer: RasterizerState::DEFAULT_2D,
            depth_stencil: None,
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            depth_format: None,
            sample_count: 1,
            layout: VertexLayout::Sprite2D,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    #[test]
    fn test_key_without_depth_format_has_no_depth_state() {
        assert!(key().depth_stencil_state().is_none());
    }

    #[test]
    fn test_key_depth_state_uses_rasterizer_bias() {
        let mut key = key();
        key.depth_format = Some(wgpu::TextureFormat::Depth32Float);
        key.depth_stencil = Some(DepthStencilState::DEFAULT_3D);
        key.rasterizer.depth_bias = 4;

        let state = key.depth_stencil_state().unwrap();
        assert!(state.depth_write_enabled);
        assert_eq!(state.bias.constant, 4);
    }

    #[test]
    fn test_keys_hash_by_value() {
        let mut set = ahash::AHashSet::new();
        set.insert(key());
        set.insert(key());
        let mut other = key();
        other.blend = BlendMode::Additive;
        set.insert(other);
        assert_eq!(set.len(), 2);
    }
}
