//! Shape tessellation into batch write regions.
//!
//! Every builder requests exactly the vertices and indices it needs, fills
//! them, and returns the number of indices written. A return value of 0 means
//! nothing was written and the caller must not record a draw.

use glam::{Vec2, Vec3};
use std::f32::consts::PI;

use crate::batch::{BufferRequest, BufferWriter};
use crate::color::Color;
use crate::vertex::{Vertex2D, VertexLine3D};

const RECT_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

const RECT_FRAME_INDICES: [u16; 24] = [
    0, 1, 2, 3, 2, 1, 0, 4, 1, 5, 1, 4, 5, 4, 7, 6, 7, 4, 3, 7, 2, 6, 2, 7,
];

const QUAD_INDICES: [u16; 6] = [0, 1, 3, 3, 1, 2];

/// Axis-aligned rectangle in pixels or texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    /// The whole texture.
    pub const FULL_UV: RectF = RectF::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

/// How line ends are finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Ends exactly at the end points.
    Flat,
    /// Extends half the thickness past each end point.
    #[default]
    Square,
    /// Half-disc at each end point.
    Round,
}

/// Dash pattern, evaluated by the dot pixel shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineDot {
    #[default]
    Solid,
    Square,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineStyle {
    pub cap: LineCap,
    pub dot: LineDot,
    /// Phase of the dot pattern, in pixels.
    pub dot_offset: f32,
    /// Round dots only: stretch the pattern so both ends land on a dot.
    pub aligned_dot: bool,
}

impl LineStyle {
    pub const SQUARE_CAP: LineStyle = LineStyle::new(LineCap::Square, LineDot::Solid);
    pub const ROUND_CAP: LineStyle = LineStyle::new(LineCap::Round, LineDot::Solid);
    pub const UNCAPPED: LineStyle = LineStyle::new(LineCap::Flat, LineDot::Solid);
    pub const SQUARE_DOT: LineStyle = LineStyle::new(LineCap::Square, LineDot::Square);
    pub const ROUND_DOT: LineStyle = LineStyle {
        aligned_dot: true,
        ..LineStyle::new(LineCap::Square, LineDot::Round)
    };

    pub const fn new(cap: LineCap, dot: LineDot) -> Self {
        Self {
            cap,
            dot,
            dot_offset: 0.0,
            aligned_dot: false,
        }
    }

    pub const fn offset(mut self, dot_offset: f32) -> Self {
        self.dot_offset = dot_offset;
        self
    }

    pub fn has_square_dot(&self) -> bool {
        self.dot == LineDot::Square
    }

    pub fn has_round_dot(&self) -> bool {
        self.dot == LineDot::Round
    }
}

/// Segment count for a filled circle whose on-screen radius is `size`.
pub fn circle_quality(size: f32) -> u16 {
    if size <= 5.0 {
        (size + 3.0) as u16 * 2
    } else {
        (18.0 + (size - 5.0) / 2.2).min(255.0) as u16
    }
}

/// Segment count for a circle outline whose on-screen outer radius is `size`.
pub fn circle_frame_quality(size: f32) -> u16 {
    if size <= 1.0 {
        6
    } else if size <= 8.0 {
        ((2.0 * size) as u16).max(8)
    } else {
        (16.0 + (size - 8.0) / 2.2).min(255.0) as u16
    }
}

/// Unit vector for step `i` of `quality`, y pointing down.
fn circle_point(i: u16, quality: u16) -> Vec2 {
    let rad = 2.0 * PI * i as f32 / quality as f32;
    Vec2::new(rad.cos(), -rad.sin())
}

fn fraction(x: f32) -> f32 {
    x - x.floor()
}

fn write_indices(writer: &mut BufferWriter<'_, Vertex2D, u16>, local: &[u16]) {
    let base = writer.index_offset as u16;
    for (dst, &i) in writer.indices.iter_mut().zip(local) {
        *dst = base + i;
    }
}

pub fn build_triangle(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    points: [Vec2; 3],
    colors: [Color; 3],
) -> u32 {
    let Some(mut writer) = request.request(3, 3) else {
        return 0;
    };

    for ((vertex, point), color) in writer.vertices.iter_mut().zip(points).zip(colors) {
        *vertex = Vertex2D::new(point, Vec2::ZERO, color);
    }
    write_indices(&mut writer, &[0, 1, 2]);
    3
}

/// `colors` are top-left, top-right, bottom-right, bottom-left.
pub fn build_rect(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    rect: RectF,
    colors: [Color; 4],
) -> u32 {
    let Some(mut writer) = request.request(4, 6) else {
        return 0;
    };

    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    writer.vertices[0] = Vertex2D::new(Vec2::new(l, t), Vec2::ZERO, colors[0]);
    writer.vertices[1] = Vertex2D::new(Vec2::new(r, t), Vec2::ZERO, colors[1]);
    writer.vertices[2] = Vertex2D::new(Vec2::new(l, b), Vec2::ZERO, colors[3]);
    writer.vertices[3] = Vertex2D::new(Vec2::new(r, b), Vec2::ZERO, colors[2]);
    write_indices(&mut writer, &RECT_INDICES);
    6
}

/// Outline drawn outside `rect`.
pub fn build_rect_frame(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    rect: RectF,
    thickness: f32,
    inner: Color,
    outer: Color,
) -> u32 {
    let Some(mut writer) = request.request(8, 24) else {
        return 0;
    };

    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let positions = [
        (Vec2::new(l - thickness, t - thickness), outer),
        (Vec2::new(l, t), inner),
        (Vec2::new(l - thickness, b + thickness), outer),
        (Vec2::new(l, b), inner),
        (Vec2::new(r + thickness, t - thickness), outer),
        (Vec2::new(r, t), inner),
        (Vec2::new(r + thickness, b + thickness), outer),
        (Vec2::new(r, b), inner),
    ];
    for (vertex, (pos, color)) in writer.vertices.iter_mut().zip(positions) {
        *vertex = Vertex2D::new(pos, Vec2::ZERO, color);
    }
    write_indices(&mut writer, &RECT_FRAME_INDICES);
    24
}

/// Triangle fan around `center`. `scale` is the current transform's maximum
/// scaling and only affects tessellation quality.
pub fn build_circle(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    center: Vec2,
    r: f32,
    inner: Color,
    outer: Color,
    scale: f32,
) -> u32 {
    let quality = circle_quality(r.abs() * scale);
    let index_count = quality as u32 * 3;
    let Some(writer) = request.request(quality as u32 + 1, index_count) else {
        return 0;
    };

    writer.vertices[0] = Vertex2D::new(center, Vec2::ZERO, inner);
    for i in 0..quality {
        let pos = center + circle_point(i, quality) * r;
        writer.vertices[i as usize + 1] = Vertex2D::new(pos, Vec2::ZERO, outer);
    }

    let base = writer.index_offset as u16;
    for (i, tri) in writer.indices.chunks_exact_mut(3).enumerate() {
        let i = i as u16;
        let next = if i + 1 == quality { 1 } else { i + 2 };
        tri.copy_from_slice(&[base + i + 1, base, base + next]);
    }
    index_count
}

pub fn build_circle_frame(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    center: Vec2,
    r_inner: f32,
    thickness: f32,
    inner: Color,
    outer: Color,
    scale: f32,
) -> u32 {
    let r_outer = r_inner + thickness;
    let quality = circle_frame_quality(r_outer * scale);
    let vertex_count = quality as u32 * 2;
    let index_count = quality as u32 * 6;
    let Some(writer) = request.request(vertex_count, index_count) else {
        return 0;
    };

    for i in 0..quality {
        let dir = circle_point(i, quality);
        let k = i as usize * 2;
        writer.vertices[k] = Vertex2D::new(center + dir * r_outer, Vec2::ZERO, outer);
        writer.vertices[k + 1] = Vertex2D::new(center + dir * r_inner, Vec2::ZERO, inner);
    }

    let base = writer.index_offset as u16;
    let ring = quality * 2;
    for (i, quad) in writer.indices.chunks_exact_mut(6).enumerate() {
        let i = i as u16;
        for (dst, local) in quad.iter_mut().zip(RECT_INDICES) {
            *dst = base + (i * 2 + local) % ring;
        }
    }
    index_count
}

/// `points` in winding order; `colors` match `points`.
pub fn build_quad(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    points: [Vec2; 4],
    colors: [Color; 4],
) -> u32 {
    let Some(mut writer) = request.request(4, 6) else {
        return 0;
    };

    for ((vertex, point), color) in writer.vertices.iter_mut().zip(points).zip(colors) {
        *vertex = Vertex2D::new(point, Vec2::ZERO, color);
    }
    write_indices(&mut writer, &QUAD_INDICES);
    6
}

/// Thick line from `begin` to `end`.
///
/// Dotted styles store the pattern coordinate in the texture coordinates and
/// must be drawn with the matching dot pixel shader.
pub fn build_line(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    style: LineStyle,
    begin: Vec2,
    end: Vec2,
    thickness: f32,
    colors: [Color; 2],
    scale: f32,
) -> u32 {
    let length = begin.distance(end);
    if thickness <= 0.0 || length <= 0.0 {
        return 0;
    }

    let half = thickness * 0.5;
    let dir = (end - begin) / length;
    let normal = dir.perp() * half;

    let round_caps = style.cap == LineCap::Round && style.dot == LineDot::Solid;
    let cap_quality = if round_caps {
        (circle_quality(half * scale) / 2).max(3)
    } else {
        0
    };
    let cap_vertices = (cap_quality as u32 + 2) * 2;
    let (vertex_count, index_count) = if round_caps {
        (4 + cap_vertices, 6 + cap_quality as u32 * 6)
    } else {
        (4, 6)
    };

    let Some(mut writer) = request.request(vertex_count, index_count) else {
        return 0;
    };

    // Dotted lines have no round cap geometry and extend like square caps.
    let extension = if style.cap == LineCap::Square || (style.cap == LineCap::Round && !round_caps) {
        dir * half
    } else {
        Vec2::ZERO
    };

    let (tex_begin, tex_end) = line_pattern_coords(style, length, thickness, scale);
    let corners = [
        (begin + normal - extension, tex_begin[0], colors[0]),
        (begin - normal - extension, tex_begin[1], colors[0]),
        (end + normal + extension, tex_end[0], colors[1]),
        (end - normal + extension, tex_end[1], colors[1]),
    ];
    for (vertex, (pos, tex, color)) in writer.vertices.iter_mut().zip(corners) {
        *vertex = Vertex2D::new(pos, tex, color);
    }
    write_indices(&mut writer, &RECT_INDICES);

    if round_caps {
        write_half_disc(&mut writer, 4, 6, begin, normal, cap_quality, colors[0]);
        let second = 4 + cap_quality as usize + 2;
        let second_index = 6 + cap_quality as usize * 3;
        write_half_disc(&mut writer, second, second_index, end, -normal, cap_quality, colors[1]);
    }

    index_count
}

/// Texture coordinates for the two begin and two end corners of a line.
fn line_pattern_coords(
    style: LineStyle,
    length: f32,
    thickness: f32,
    scale: f32,
) -> ([Vec2; 2], [Vec2; 2]) {
    let length_n = length / thickness;
    match style.dot {
        LineDot::Solid => ([Vec2::ZERO; 2], [Vec2::ZERO; 2]),
        LineDot::Square => {
            let u = (1.0 - fraction(style.dot_offset / 3.0 / thickness)) * 3.0;
            let v = (1.0 / (thickness * scale)).min(1.0);
            (
                [Vec2::new(u, v); 2],
                [Vec2::new(u + length_n, v); 2],
            )
        }
        LineDot::Round => {
            let mut u = (1.0 - fraction(style.dot_offset / 2.0 / thickness)) * 2.0;
            let mut length_n = length_n;
            if style.aligned_dot {
                let m = (length_n - 1.0) % 2.0;
                length_n += 2.0 - m;
                u = 0.5;
            }
            (
                [Vec2::new(u, 1.0), Vec2::new(u, -1.0)],
                [Vec2::new(u + length_n, 1.0), Vec2::new(u + length_n, -1.0)],
            )
        }
    }
}

/// Fan from `start` sweeping half a turn counter-clockwise.
fn write_half_disc(
    writer: &mut BufferWriter<'_, Vertex2D, u16>,
    vertex_start: usize,
    index_start: usize,
    center: Vec2,
    start: Vec2,
    quality: u16,
    color: Color,
) {
    writer.vertices[vertex_start] = Vertex2D::new(center, Vec2::ZERO, color);
    for i in 0..=quality {
        let rotation = Vec2::from_angle(PI * i as f32 / quality as f32);
        writer.vertices[vertex_start + 1 + i as usize] =
            Vertex2D::new(center + rotation.rotate(start), Vec2::ZERO, color);
    }

    let base = writer.index_offset as u16 + vertex_start as u16;
    let indices = &mut writer.indices[index_start..index_start + quality as usize * 3];
    for (i, tri) in indices.chunks_exact_mut(3).enumerate() {
        let i = i as u16;
        tri.copy_from_slice(&[base, base + 1 + i, base + 2 + i]);
    }
}

/// Pre-triangulated polygon. Returns 0 if any triangle refers to a missing
/// vertex.
pub fn build_polygon(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    vertices: &[Vec2],
    triangles: &[[u16; 3]],
    offset: Vec2,
    color: Color,
) -> u32 {
    if vertices.is_empty() || triangles.is_empty() {
        return 0;
    }
    if triangles
        .iter()
        .flatten()
        .any(|&i| i as usize >= vertices.len())
    {
        return 0;
    }

    let index_count = triangles.len() as u32 * 3;
    let Some(writer) = request.request(vertices.len() as u32, index_count) else {
        return 0;
    };

    for (dst, &point) in writer.vertices.iter_mut().zip(vertices) {
        *dst = Vertex2D::new(point + offset, Vec2::ZERO, color);
    }
    let base = writer.index_offset as u16;
    for (dst, &i) in writer.indices.iter_mut().zip(triangles.iter().flatten()) {
        *dst = base + i;
    }
    index_count
}

/// Rectangle showing the `uv` region of a texture.
pub fn build_textured_region(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    rect: RectF,
    uv: RectF,
    color: Color,
) -> u32 {
    let Some(mut writer) = request.request(4, 6) else {
        return 0;
    };

    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    writer.vertices[0] = Vertex2D::new(Vec2::new(l, t), Vec2::new(uv.left(), uv.top()), color);
    writer.vertices[1] = Vertex2D::new(Vec2::new(r, t), Vec2::new(uv.right(), uv.top()), color);
    writer.vertices[2] = Vertex2D::new(Vec2::new(l, b), Vec2::new(uv.left(), uv.bottom()), color);
    writer.vertices[3] = Vertex2D::new(Vec2::new(r, b), Vec2::new(uv.right(), uv.bottom()), color);
    write_indices(&mut writer, &RECT_INDICES);
    6
}

/// Arbitrary quad mapped to the `uv` region of a texture. `points` start at
/// the corner that receives the top-left texel and run clockwise on screen.
pub fn build_textured_quad(
    request: &mut impl BufferRequest<Vertex2D, u16>,
    points: [Vec2; 4],
    uv: RectF,
    color: Color,
) -> u32 {
    let Some(mut writer) = request.request(4, 6) else {
        return 0;
    };

    let tex = [
        Vec2::new(uv.left(), uv.top()),
        Vec2::new(uv.right(), uv.top()),
        Vec2::new(uv.right(), uv.bottom()),
        Vec2::new(uv.left(), uv.bottom()),
    ];
    for ((vertex, point), tex) in writer.vertices.iter_mut().zip(points).zip(tex) {
        *vertex = Vertex2D::new(point, tex, color);
    }
    write_indices(&mut writer, &QUAD_INDICES);
    6
}

/// One segment of a 3D line list.
pub fn build_line3d(
    request: &mut impl BufferRequest<VertexLine3D, u32>,
    begin: Vec3,
    end: Vec3,
    colors: [Color; 2],
) -> u32 {
    let Some(writer) = request.request(2, 2) else {
        return 0;
    };

    writer.vertices[0] = VertexLine3D::new(begin, colors[0]);
    writer.vertices[1] = VertexLine3D::new(end, colors[1]);
    writer.indices[0] = writer.index_offset;
    writer.indices[1] = writer.index_offset + 1;
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scratch {
        vertices: Vec<Vertex2D>,
        indices: Vec<u16>,
        max_vertices: usize,
    }

    impl Scratch {
        fn new(max_vertices: usize) -> Self {
            Self {
                vertices: Vec::new(),
                indices: Vec::new(),
                max_vertices,
            }
        }
    }

    impl BufferRequest<Vertex2D, u16> for Scratch {
        fn request(
            &mut self,
            vertex_count: u32,
            index_count: u32,
        ) -> Option<BufferWriter<'_, Vertex2D, u16>> {
            let vertex_start = self.vertices.len();
            let index_start = self.indices.len();
            if vertex_start + vertex_count as usize > self.max_vertices {
                return None;
            }
            self.vertices
                .resize(vertex_start + vertex_count as usize, Vertex2D::default());
            self.indices.resize(index_start + index_count as usize, 0);
            Some(BufferWriter {
                vertices: &mut self.vertices[vertex_start..],
                indices: &mut self.indices[index_start..],
                index_offset: vertex_start as u32,
            })
        }
    }

    fn assert_indices_in_range(scratch: &Scratch) {
        assert!(
            scratch
                .indices
                .iter()
                .all(|&i| (i as usize) < scratch.vertices.len())
        );
    }

    #[test]
    fn test_circle_quality() {
        assert_eq!(circle_quality(0.0), 6);
        assert_eq!(circle_quality(5.0), 16);
        assert_eq!(circle_quality(27.5), 28);
        assert_eq!(circle_quality(10_000.0), 255);
    }

    #[test]
    fn test_circle_frame_quality() {
        assert_eq!(circle_frame_quality(0.5), 6);
        assert_eq!(circle_frame_quality(2.0), 8);
        assert_eq!(circle_frame_quality(8.0), 16);
        assert_eq!(circle_frame_quality(10_000.0), 255);
    }

    #[test]
    fn test_rect_indices_are_offset() {
        let mut scratch = Scratch::new(64);
        build_triangle(&mut scratch, [Vec2::ZERO; 3], [Color::WHITE; 3]);
        let count = build_rect(&mut scratch, RectF::new(0.0, 0.0, 10.0, 5.0), [Color::RED; 4]);

        assert_eq!(count, 6);
        assert_eq!(&scratch.indices[3..], &[3, 4, 5, 5, 4, 6]);
        assert_eq!(scratch.vertices[6].pos, [10.0, 5.0]);
    }

    #[test]
    fn test_rect_corner_colors() {
        let mut scratch = Scratch::new(4);
        let colors = [Color::RED, Color::GREEN, Color::BLUE, Color::BLACK];
        build_rect(&mut scratch, RectF::new(0.0, 0.0, 1.0, 1.0), colors);

        assert_eq!(scratch.vertices[2].color, Color::BLACK.to_array());
        assert_eq!(scratch.vertices[3].color, Color::BLUE.to_array());
    }

    #[test]
    fn test_rect_frame() {
        let mut scratch = Scratch::new(8);
        let count = build_rect_frame(
            &mut scratch,
            RectF::new(10.0, 10.0, 20.0, 20.0),
            2.0,
            Color::WHITE,
            Color::BLACK,
        );

        assert_eq!(count, 24);
        assert_eq!(scratch.vertices[0].pos, [8.0, 8.0]);
        assert_eq!(scratch.vertices[7].pos, [30.0, 30.0]);
        assert_eq!(scratch.vertices[0].color, Color::BLACK.to_array());
        assert_eq!(scratch.vertices[1].color, Color::WHITE.to_array());
    }

    #[test]
    fn test_circle_fan_closes() {
        let mut scratch = Scratch::new(256);
        let count = build_circle(&mut scratch, Vec2::new(50.0, 50.0), 5.0, Color::WHITE, Color::WHITE, 1.0);

        assert_eq!(count, 16 * 3);
        assert_eq!(scratch.vertices.len(), 17);
        assert_eq!(&scratch.indices[count as usize - 3..], &[16, 0, 1]);
        assert_indices_in_range(&scratch);

        let first = Vec2::from(scratch.vertices[1].pos);
        assert!((first - Vec2::new(55.0, 50.0)).length() < 1e-4);
    }

    #[test]
    fn test_circle_scale_raises_quality() {
        let mut scratch = Scratch::new(1024);
        let small = build_circle(&mut scratch, Vec2::ZERO, 5.0, Color::WHITE, Color::WHITE, 1.0);
        let large = build_circle(&mut scratch, Vec2::ZERO, 5.0, Color::WHITE, Color::WHITE, 4.0);
        assert!(large > small);
    }

    #[test]
    fn test_circle_frame_wraps() {
        let mut scratch = Scratch::new(256);
        let count = build_circle_frame(&mut scratch, Vec2::ZERO, 4.0, 2.0, Color::WHITE, Color::BLACK, 1.0);

        assert_eq!(count, 12 * 6);
        assert_eq!(&scratch.indices[count as usize - 6..], &[22, 23, 0, 0, 23, 1]);
        assert_indices_in_range(&scratch);
    }

    #[test]
    fn test_no_space_returns_zero() {
        let mut scratch = Scratch::new(3);
        assert_eq!(build_rect(&mut scratch, RectF::new(0.0, 0.0, 1.0, 1.0), [Color::WHITE; 4]), 0);
        assert!(scratch.vertices.is_empty());
        assert_eq!(build_triangle(&mut scratch, [Vec2::ZERO; 3], [Color::WHITE; 3]), 3);
    }

    #[test]
    fn test_degenerate_lines_are_skipped() {
        let mut scratch = Scratch::new(64);
        let colors = [Color::WHITE; 2];
        assert_eq!(build_line(&mut scratch, LineStyle::default(), Vec2::ZERO, Vec2::X, 0.0, colors, 1.0), 0);
        assert_eq!(build_line(&mut scratch, LineStyle::default(), Vec2::ONE, Vec2::ONE, 2.0, colors, 1.0), 0);
        assert!(scratch.vertices.is_empty());
    }

    #[test]
    fn test_square_cap_extends_line() {
        let mut scratch = Scratch::new(64);
        let count = build_line(
            &mut scratch,
            LineStyle::SQUARE_CAP,
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            2.0,
            [Color::WHITE; 2],
            1.0,
        );

        assert_eq!(count, 6);
        assert_eq!(scratch.vertices[0].pos, [-1.0, 1.0]);
        assert_eq!(scratch.vertices[3].pos, [11.0, -1.0]);
    }

    #[test]
    fn test_uncapped_line_ends_at_points() {
        let mut scratch = Scratch::new(64);
        build_line(
            &mut scratch,
            LineStyle::UNCAPPED,
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            2.0,
            [Color::WHITE; 2],
            1.0,
        );
        assert_eq!(scratch.vertices[0].pos, [0.0, 1.0]);
        assert_eq!(scratch.vertices[2].pos, [10.0, 1.0]);
    }

    #[test]
    fn test_round_cap_adds_half_discs() {
        let mut scratch = Scratch::new(256);
        let count = build_line(
            &mut scratch,
            LineStyle::ROUND_CAP,
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            4.0,
            [Color::WHITE; 2],
            1.0,
        );

        let quality = (circle_quality(2.0) / 2).max(3) as u32;
        assert_eq!(count, 6 + quality * 6);
        assert_eq!(scratch.vertices.len() as u32, 4 + (quality + 2) * 2);
        assert_indices_in_range(&scratch);

        // The start cap reaches behind `begin`.
        let min_x = scratch
            .vertices
            .iter()
            .map(|v| v.pos[0])
            .fold(f32::INFINITY, f32::min);
        assert!((min_x + 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_round_dot_aligned_pattern() {
        let mut scratch = Scratch::new(64);
        build_line(
            &mut scratch,
            LineStyle::ROUND_DOT,
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
            2.0,
            [Color::WHITE; 2],
            1.0,
        );

        assert_eq!(scratch.vertices[0].tex, [0.5, 1.0]);
        assert_eq!(scratch.vertices[1].tex, [0.5, -1.0]);
        assert_eq!(scratch.vertices[2].tex, [7.5, 1.0]);
    }

    #[test]
    fn test_polygon_rejects_bad_indices() {
        let mut scratch = Scratch::new(64);
        let points = [Vec2::ZERO, Vec2::X, Vec2::Y];
        assert_eq!(build_polygon(&mut scratch, &points, &[[0, 1, 3]], Vec2::ZERO, Color::WHITE), 0);

        let count = build_polygon(&mut scratch, &points, &[[0, 1, 2]], Vec2::splat(5.0), Color::WHITE);
        assert_eq!(count, 3);
        assert_eq!(scratch.vertices[1].pos, [6.0, 5.0]);
    }

    #[test]
    fn test_textured_region_uvs() {
        let mut scratch = Scratch::new(4);
        build_textured_region(
            &mut scratch,
            RectF::new(0.0, 0.0, 32.0, 32.0),
            RectF::new(0.5, 0.0, 0.5, 0.5),
            Color::WHITE,
        );
        assert_eq!(scratch.vertices[0].tex, [0.5, 0.0]);
        assert_eq!(scratch.vertices[3].tex, [1.0, 0.5]);
    }

    #[test]
    fn test_quad_winding() {
        let mut scratch = Scratch::new(4);
        let points = [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
        build_textured_quad(&mut scratch, points, RectF::FULL_UV, Color::WHITE);

        assert_eq!(scratch.indices, vec![0, 1, 3, 3, 1, 2]);
        assert_eq!(scratch.vertices[2].tex, [1.0, 1.0]);
    }
}
