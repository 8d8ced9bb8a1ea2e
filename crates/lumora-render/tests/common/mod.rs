//! Recording fakes for the replay services.

#![allow(dead_code)]

use glam::UVec2;
use lumora_render::{
    ConstantBufferId, FrameContext, MeshId, MeshService, PipelineKey, PixelShaderId, RenderTargetInfo, SamplerState,
    ShaderService, ShaderStage, StandardShaders2D, StandardShaders3D, TextureId, TextureService, VertexShaderId,
};
use lumora_test_utils::{
    GpuBuffer, GpuRenderPipeline, GpuTextureView, MockPassEncoder, MockRenderContext, PassEncoder,
};

pub const SCENE_SIZE: UVec2 = UVec2::new(800, 600);

pub const STANDARD_2D: StandardShaders2D = StandardShaders2D {
    sprite_vs: VertexShaderId(0),
    shape_ps: PixelShaderId(0),
    texture_ps: PixelShaderId(1),
    square_dot_ps: PixelShaderId(2),
    round_dot_ps: PixelShaderId(3),
};

pub const STANDARD_3D: StandardShaders3D = StandardShaders3D {
    mesh_vs: VertexShaderId(10),
    mesh_ps: PixelShaderId(10),
    line_vs: VertexShaderId(11),
    line_ps: PixelShaderId(11),
};

/// Hands out one mock pipeline per distinct key.
#[derive(Default)]
pub struct FakeShaders {
    pub keys: Vec<PipelineKey>,
    pub missing_ps: Vec<PixelShaderId>,
    pub constants: Vec<(ShaderStage, u32, Vec<u8>)>,
    pub buffers: Vec<(ShaderStage, u32, ConstantBufferId, Vec<u8>)>,
}

impl FakeShaders {
    /// Last block bound to `(stage, slot)` through `bind_constants`.
    pub fn last_constants(&self, stage: ShaderStage, slot: u32) -> Option<&[u8]> {
        self.constants
            .iter()
            .rev()
            .find(|(s, i, _)| *s == stage && *i == slot)
            .map(|(_, _, data)| data.as_slice())
    }
}

impl ShaderService for FakeShaders {
    fn standard_2d(&self) -> StandardShaders2D {
        STANDARD_2D
    }

    fn standard_3d(&self) -> StandardShaders3D {
        STANDARD_3D
    }

    fn pipeline(&mut self, key: &PipelineKey) -> Option<GpuRenderPipeline> {
        if self.missing_ps.contains(&key.ps) {
            return None;
        }
        let id = match self.keys.iter().position(|k| k == key) {
            Some(id) => id,
            None => {
                self.keys.push(*key);
                self.keys.len() - 1
            }
        };
        Some(GpuRenderPipeline::mock(id))
    }

    fn bind_constants(&mut self, _pass: &mut dyn PassEncoder, stage: ShaderStage, slot: u32, data: &[u8]) {
        self.constants.push((stage, slot, data.to_vec()));
    }

    fn bind_constant_buffer(
        &mut self,
        _pass: &mut dyn PassEncoder,
        stage: ShaderStage,
        slot: u32,
        buffer: ConstantBufferId,
        data: &[u8],
    ) {
        self.buffers.push((stage, slot, buffer, data.to_vec()));
    }
}

#[derive(Default)]
pub struct FakeTextures {
    pub targets: Vec<(TextureId, RenderTargetInfo)>,
    pub textures: Vec<(ShaderStage, u32, TextureId)>,
    pub sampler_binds: usize,
}

impl FakeTextures {
    pub fn add_target(&mut self, id: TextureId, view_id: usize, size: UVec2) {
        let info = RenderTargetInfo::new(GpuTextureView::mock(view_id), size, wgpu::TextureFormat::Rgba8Unorm);
        self.targets.push((id, info));
    }

    /// Valid textures bound to `(stage, slot)`, in order.
    pub fn bound(&self, stage: ShaderStage, slot: u32) -> Vec<TextureId> {
        self.textures
            .iter()
            .filter(|(s, i, id)| *s == stage && *i == slot && id.is_valid())
            .map(|(_, _, id)| *id)
            .collect()
    }
}

impl TextureService for FakeTextures {
    fn render_target_view(&self, id: TextureId) -> Option<RenderTargetInfo> {
        self.targets
            .iter()
            .find(|(target, _)| *target == id)
            .map(|(_, info)| info.clone())
    }

    fn bind_texture(&mut self, _pass: &mut dyn PassEncoder, stage: ShaderStage, slot: u32, texture: TextureId) {
        self.textures.push((stage, slot, texture));
    }

    fn bind_sampler(&mut self, _pass: &mut dyn PassEncoder, _stage: ShaderStage, _slot: u32, _state: &SamplerState) {
        self.sampler_binds += 1;
    }
}

/// Known meshes bind vertex buffer `1000 + id`.
#[derive(Default)]
pub struct FakeMeshes {
    pub known: Vec<MeshId>,
    pub binds: Vec<MeshId>,
}

impl MeshService for FakeMeshes {
    fn bind_mesh_to_pass(&mut self, pass: &mut dyn PassEncoder, mesh: MeshId) -> bool {
        if !self.known.contains(&mesh) {
            return false;
        }
        let id = 1000 + mesh.0 as usize;
        pass.set_vertex_buffer(0, &GpuBuffer::mock(id, 1024), 0);
        pass.set_index_buffer(&GpuBuffer::mock(id, 1024), wgpu::IndexFormat::Uint32, 0);
        self.binds.push(mesh);
        true
    }
}

/// Device, pass and services for one test.
pub struct Harness {
    pub device: MockRenderContext,
    pub pass: MockPassEncoder,
    pub scene: RenderTargetInfo,
    pub shaders: FakeShaders,
    pub textures: FakeTextures,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            device: MockRenderContext::new(),
            pass: MockPassEncoder::new(),
            scene: RenderTargetInfo::new(GpuTextureView::mock(0), SCENE_SIZE, wgpu::TextureFormat::Bgra8UnormSrgb),
            shaders: FakeShaders::default(),
            textures: FakeTextures::default(),
        }
    }

    /// Scene with a depth attachment, view id 1.
    pub fn with_depth() -> Self {
        let mut harness = Self::new();
        harness.scene = harness
            .scene
            .clone()
            .with_depth(GpuTextureView::mock(1), wgpu::TextureFormat::Depth32Float);
        harness
    }

    pub fn frame(&mut self) -> FrameContext<'_> {
        FrameContext {
            device: &self.device,
            pass: &mut self.pass,
            scene: &self.scene,
            shaders: &mut self.shaders,
            textures: &mut self.textures,
        }
    }
}
