use crate::color::Color;
use glam::{Vec2, Vec3};
use static_assertions::const_assert_eq;

/// Vertex layouts understood by the built-in pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// No vertex buffer; the shader generates positions.
    None,
    Sprite2D,
    /// Owned by the mesh service.
    Mesh3D,
    Line3D,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2D {
    pub pos: [f32; 2],
    pub tex: [f32; 2],
    pub color: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<Vertex2D>(), 32);

impl Vertex2D {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn new(pos: Vec2, tex: Vec2, color: Color) -> Self {
        Self {
            pos: pos.to_array(),
            tex: tex.to_array(),
            color: color.to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexLine3D {
    pub pos: [f32; 4],
    pub color: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<VertexLine3D>(), 32);

impl VertexLine3D {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

    pub fn new(pos: Vec3, color: Color) -> Self {
        Self {
            pos: pos.extend(1.0).to_array(),
            color: color.to_array(),
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex2d_layout_stride() {
        let layout = Vertex2D::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 16);
    }

    #[test]
    fn test_line_vertex_homogeneous() {
        let v = VertexLine3D::new(Vec3::new(1.0, 2.0, 3.0), Color::RED);
        assert_eq!(v.pos, [1.0, 2.0, 3.0, 1.0]);
    }
}
