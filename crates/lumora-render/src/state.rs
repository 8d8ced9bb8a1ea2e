//! Value types for the pipeline state categories.

/// Sampler slots per shader stage.
pub const MAX_SAMPLER_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Integer pixel rectangle used for scissor and viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle anchored at the origin.
    pub const fn from_size(w: i32, h: i32) -> Self {
        Self { x: 0, y: 0, w, h }
    }

    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Intersection with `(0, 0, width, height)`. Empty intersections come back
    /// with zero size.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let right = (self.x.saturating_add(self.w)).clamp(0, width as i32);
        let bottom = (self.y.saturating_add(self.h)).clamp(0, height as i32);
        let x = self.x.clamp(0, width as i32);
        let y = self.y.clamp(0, height as i32);
        Rect {
            x,
            y,
            w: (right - x).max(0),
            h: (bottom - y).max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerState {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    /// Scissor rects are only applied while this is set.
    pub scissor_enable: bool,
    pub depth_bias: i32,
}

impl RasterizerState {
    pub const DEFAULT_2D: RasterizerState = RasterizerState {
        fill_mode: FillMode::Solid,
        cull_mode: CullMode::None,
        scissor_enable: false,
        depth_bias: 0,
    };

    pub const DEFAULT_3D: RasterizerState = RasterizerState {
        fill_mode: FillMode::Solid,
        cull_mode: CullMode::Back,
        scissor_enable: false,
        depth_bias: 0,
    };

    pub const SCISSOR_2D: RasterizerState = RasterizerState {
        scissor_enable: true,
        ..Self::DEFAULT_2D
    };

    pub fn to_primitive_state(self, topology: wgpu::PrimitiveTopology) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode: match self.cull_mode {
                CullMode::None => None,
                CullMode::Front => Some(wgpu::Face::Front),
                CullMode::Back => Some(wgpu::Face::Back),
            },
            unclipped_depth: false,
            polygon_mode: match self.fill_mode {
                FillMode::Solid => wgpu::PolygonMode::Fill,
                FillMode::Wireframe => wgpu::PolygonMode::Line,
            },
            conservative: false,
        }
    }
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self::DEFAULT_2D
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub address_u: wgpu::AddressMode,
    pub address_v: wgpu::AddressMode,
    pub address_w: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mip_filter: wgpu::FilterMode,
    pub max_anisotropy: u16,
}

impl SamplerState {
    pub const DEFAULT_2D: SamplerState = SamplerState {
        address_u: wgpu::AddressMode::ClampToEdge,
        address_v: wgpu::AddressMode::ClampToEdge,
        address_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mip_filter: wgpu::FilterMode::Linear,
        max_anisotropy: 1,
    };

    pub const DEFAULT_3D: SamplerState = SamplerState {
        address_u: wgpu::AddressMode::Repeat,
        address_v: wgpu::AddressMode::Repeat,
        address_w: wgpu::AddressMode::Repeat,
        ..Self::DEFAULT_2D
    };

    pub const CLAMP_NEAREST: SamplerState = SamplerState {
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mip_filter: wgpu::FilterMode::Nearest,
        ..Self::DEFAULT_2D
    };

    pub fn to_descriptor(&self) -> wgpu::SamplerDescriptor<'static> {
        wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: self.address_u,
            address_mode_v: self.address_v,
            address_mode_w: self.address_w,
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            mipmap_filter: self.mip_filter,
            anisotropy_clamp: self.max_anisotropy.max(1),
            ..Default::default()
        }
    }
}

impl Default for SamplerState {
    fn default() -> Self {
        Self::DEFAULT_2D
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl DepthStencilState {
    pub const DEFAULT_3D: DepthStencilState = DepthStencilState {
        depth_enable: true,
        depth_write_enable: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
    };

    pub const DISABLED: DepthStencilState = DepthStencilState {
        depth_enable: false,
        depth_write_enable: false,
        depth_compare: wgpu::CompareFunction::Always,
    };

    pub fn to_wgpu(self, format: wgpu::TextureFormat, depth_bias: i32) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_enable && self.depth_write_enable,
            depth_compare: if self.depth_enable {
                self.depth_compare
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: depth_bias,
                ..Default::default()
            },
        }
    }
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self::DEFAULT_3D
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_has_area() {
        assert!(Rect::new(0, 0, 1, 1).has_area());
        assert!(!Rect::new(5, 5, 0, 10).has_area());
        assert!(!Rect::default().has_area());
    }

    #[test]
    fn test_rect_clamp() {
        let clamped = Rect::new(-10, 20, 100, 500).clamp_to(64, 128);
        assert_eq!(clamped, Rect::new(0, 20, 64, 108));

        let outside = Rect::new(200, 200, 10, 10).clamp_to(64, 64);
        assert!(!outside.has_area());
    }

    #[test]
    fn test_rasterizer_to_primitive_state() {
        let state = RasterizerState::DEFAULT_3D.to_primitive_state(wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(state.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(state.polygon_mode, wgpu::PolygonMode::Fill);
    }

    #[test]
    fn test_disabled_depth_never_writes() {
        let state = DepthStencilState::DISABLED.to_wgpu(wgpu::TextureFormat::Depth32Float, 0);
        assert!(!state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Always);
    }
}
