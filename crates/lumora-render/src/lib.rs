//! Lumora Render
//!
//! Deferred 2D and 3D rendering on top of `wgpu`. Drawing calls record state
//! changes and accumulated draws into a compact command list; [`Renderer2D::flush`]
//! and [`Renderer3D::flush`] replay that list once per frame through the
//! [`PassEncoder`](lumora_test_utils::PassEncoder) seam.
//!
//! Shader, texture and mesh storage are supplied by the caller through the
//! traits in [`services`].

pub mod batch;
pub mod blend;
pub mod builder;
pub mod color;
pub mod command;
pub mod config;
mod context;
mod context_impl;
pub mod error;
mod pass;
pub mod renderer2d;
pub mod renderer3d;
pub mod resource;
pub mod services;
pub mod state;
pub mod vertex;

pub use batch::{BatchInfo, LineBatch3D, VertexBatch, VertexBatch2D};
pub use blend::BlendMode;
pub use builder::{LineCap, LineDot, LineStyle, RectF};
pub use color::Color;
pub use config::{BatchConfig, Renderer2DConfig, Renderer3DConfig};
pub use context::{GraphicsContext, GraphicsContextDescriptor};
pub use error::{GraphicsError, RenderError};
pub use pass::WgpuPassEncoder;
pub use renderer2d::{RenderStats2D, Renderer2D};
pub use renderer3d::{RenderStats3D, Renderer3D};
pub use resource::{
    ConstantBuffer, ConstantBufferId, Handle, Mesh, MeshId, PixelShader, PixelShaderId, RenderTexture, Texture,
    TextureId, VertexShader, VertexShaderId,
};
pub use services::{
    FrameContext, MeshService, PipelineKey, RenderTargetInfo, ShaderService, StandardShaders2D, StandardShaders3D,
    TextureService,
};
pub use state::{CullMode, DepthStencilState, FillMode, RasterizerState, Rect, SamplerState, ShaderStage};

pub use lumora_test_utils::{PassEncoder, PassTarget, RenderContext};
