//! CPU staging arrays and GPU upload for batched geometry.
//!
//! Shapes are written into growable CPU arrays. The arrays are split into
//! segments, each small enough to fit one GPU vertex/index buffer pair. At
//! replay time every segment is uploaded through a [`RingCursor`] and drawn
//! with the returned [`BatchInfo`].

mod ring;

pub use ring::{RingCursor, RingRange};

use bytemuck::{Pod, Zeroable};
use lumora_core::profiling::profile_function;
use lumora_test_utils::{GpuBuffer, PassEncoder, RenderContext};

use crate::config::BatchConfig;
use crate::vertex::{Vertex2D, VertexLine3D};

/// Index element types a batch can store.
pub trait BatchIndex: Pod + Default + Send + Sync + 'static {
    const FORMAT: wgpu::IndexFormat;
    /// Largest vertex count addressable by this index type.
    const MAX_VERTICES: u32;

    fn from_u32(value: u32) -> Self;
}

impl BatchIndex for u16 {
    const FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;
    const MAX_VERTICES: u32 = u16::MAX as u32;

    fn from_u32(value: u32) -> Self {
        value as u16
    }
}

impl BatchIndex for u32 {
    const FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint32;
    const MAX_VERTICES: u32 = u32::MAX;

    fn from_u32(value: u32) -> Self {
        value
    }
}

/// Receives a notification whenever a batch opens a new segment.
pub trait UpdateBuffersSink {
    fn push_update_buffers(&mut self, segment: u32);
}

/// Draw parameters for one uploaded segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchInfo {
    pub index_count: u32,
    pub start_index_location: u32,
    pub base_vertex_location: u32,
}

/// Write region returned by [`VertexBatch::request_buffer`].
///
/// Callers must fill every element and bias index values by `index_offset`.
pub struct BufferWriter<'a, V, I> {
    pub vertices: &'a mut [V],
    pub indices: &'a mut [I],
    pub index_offset: u32,
}

/// Anything that can hand out [`BufferWriter`]s.
pub trait BufferRequest<V, I> {
    fn request(&mut self, vertex_count: u32, index_count: u32) -> Option<BufferWriter<'_, V, I>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct BatchSegment {
    vertex_pos: u32,
    index_pos: u32,
}

pub type VertexBatch2D = VertexBatch<Vertex2D, u16>;
pub type LineBatch3D = VertexBatch<VertexLine3D, u32>;

/// CPU staging for one frame's geometry plus a fixed-size GPU buffer pair.
///
/// Geometry past one GPU buffer's capacity opens a new segment, and each
/// segment is uploaded by its own `UpdateBuffers` command. A later segment
/// may wrap the ring over an earlier one. Queue writes land before the
/// submitted commands execute, so a single submission holds at most one GPU
/// buffer's worth of geometry intact; split larger frames across submissions.
pub struct VertexBatch<V: Pod, I: BatchIndex> {
    config: BatchConfig,
    vertices: Vec<V>,
    indices: Vec<I>,
    vertex_write_pos: usize,
    index_write_pos: usize,
    segments: Vec<BatchSegment>,
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    ring: RingCursor,
    upload_scratch: Vec<u8>,
}

/// Round an index count up so its byte size is a multiple of
/// `wgpu::COPY_BUFFER_ALIGNMENT`.
fn aligned_index_count<I>(count: u32) -> u32 {
    let per_word = (wgpu::COPY_BUFFER_ALIGNMENT as usize / std::mem::size_of::<I>()).max(1) as u32;
    count.div_ceil(per_word) * per_word
}

/// Doubling growth from `current` until `target` fits, capped at `max`.
fn grown_size(current: usize, target: usize, max: usize) -> Option<usize> {
    if target > max {
        return None;
    }
    let mut size = current.max(1);
    while size < target {
        size *= 2;
    }
    Some(size.min(max))
}

impl<V: Pod, I: BatchIndex> VertexBatch<V, I> {
    pub fn new(ctx: &dyn RenderContext, config: BatchConfig, label: &str) -> Self {
        let mut config = config;
        if config.gpu_vertex_capacity > I::MAX_VERTICES {
            tracing::warn!(
                "{}: {} vertices are not addressable with {:?} indices, clamping",
                label,
                config.gpu_vertex_capacity,
                I::FORMAT
            );
            config.gpu_vertex_capacity = I::MAX_VERTICES;
        }
        config.gpu_index_capacity = aligned_index_count::<I>(config.gpu_index_capacity);

        let vertex_label = format!("{} Vertex Buffer", label);
        let index_label = format!("{} Index Buffer", label);

        let vertex_buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(vertex_label.as_str()),
            size: config.gpu_vertex_capacity as u64 * std::mem::size_of::<V>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(index_label.as_str()),
            size: config.gpu_index_capacity as u64 * std::mem::size_of::<I>() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::debug!(
            "Created {} batch: {} vertices / {} indices per GPU buffer",
            label,
            config.gpu_vertex_capacity,
            config.gpu_index_capacity
        );

        Self {
            vertices: vec![<V as Zeroable>::zeroed(); config.initial_vertex_capacity as usize],
            indices: vec![<I as Zeroable>::zeroed(); config.initial_index_capacity as usize],
            vertex_write_pos: 0,
            index_write_pos: 0,
            segments: vec![BatchSegment::default()],
            ring: RingCursor::new(config.gpu_vertex_capacity, config.gpu_index_capacity),
            vertex_buffer,
            index_buffer,
            upload_scratch: Vec::new(),
            config,
        }
    }

    /// Reserve room for one shape.
    ///
    /// Returns `None`, with no side effects, if the CPU arrays would have to
    /// grow past their hard cap or the shape cannot fit in a single GPU buffer.
    /// When the current segment is full a new one is opened and `sink` is told
    /// its index.
    pub fn request_buffer(
        &mut self,
        vertex_count: u32,
        index_count: u32,
        sink: &mut dyn UpdateBuffersSink,
    ) -> Option<BufferWriter<'_, V, I>> {
        profile_function!();

        if vertex_count > self.config.gpu_vertex_capacity
            || index_count > self.config.gpu_index_capacity
        {
            return None;
        }

        let max = self.config.max_cpu_elements as usize;
        let vertex_end = self.vertex_write_pos + vertex_count as usize;
        let index_end = self.index_write_pos + index_count as usize;

        let new_vertex_len = if vertex_end > self.vertices.len() {
            Some(grown_size(self.vertices.len(), vertex_end, max)?)
        } else {
            None
        };
        let new_index_len = if index_end > self.indices.len() {
            Some(grown_size(self.indices.len(), index_end, max)?)
        } else {
            None
        };

        if let Some(len) = new_vertex_len {
            tracing::debug!("Growing vertex staging array {} -> {}", self.vertices.len(), len);
            self.vertices.resize(len, <V as Zeroable>::zeroed());
        }
        if let Some(len) = new_index_len {
            tracing::debug!("Growing index staging array {} -> {}", self.indices.len(), len);
            self.indices.resize(len, <I as Zeroable>::zeroed());
        }

        let current = self.segments.last().copied().unwrap_or_default();
        if current.vertex_pos + vertex_count > self.config.gpu_vertex_capacity
            || aligned_index_count::<I>(current.index_pos + index_count) > self.config.gpu_index_capacity
        {
            self.segments.push(BatchSegment::default());
            sink.push_update_buffers((self.segments.len() - 1) as u32);
        }

        let segment = self.segments.last_mut()?;
        let index_offset = segment.vertex_pos;
        segment.vertex_pos += vertex_count;
        segment.index_pos += index_count;

        let vertex_start = self.vertex_write_pos;
        let index_start = self.index_write_pos;
        self.vertex_write_pos = vertex_end;
        self.index_write_pos = index_end;

        Some(BufferWriter {
            vertices: &mut self.vertices[vertex_start..vertex_end],
            indices: &mut self.indices[index_start..index_end],
            index_offset,
        })
    }

    /// Upload one segment and return where it landed.
    pub fn update_buffers(&mut self, ctx: &dyn RenderContext, segment_index: u32) -> BatchInfo {
        profile_function!();

        let Some(segment) = self.segments.get(segment_index as usize).copied() else {
            tracing::warn!("update_buffers: no batch segment {}", segment_index);
            return BatchInfo::default();
        };

        if segment.index_pos == 0 && segment.vertex_pos == 0 {
            return BatchInfo {
                index_count: 0,
                start_index_location: self.ring.index_position(),
                base_vertex_location: self.ring.vertex_position(),
            };
        }

        let (vertex_offset, index_offset) = self.segments[..segment_index as usize]
            .iter()
            .fold((0usize, 0usize), |(v, i), s| {
                (v + s.vertex_pos as usize, i + s.index_pos as usize)
            });

        let padded_indices = aligned_index_count::<I>(segment.index_pos);
        let Some(range) = self.ring.reserve(segment.vertex_pos, padded_indices) else {
            tracing::warn!("update_buffers: segment {} exceeds GPU buffer capacity", segment_index);
            return BatchInfo::default();
        };

        let vertex_data = &self.vertices[vertex_offset..vertex_offset + segment.vertex_pos as usize];
        ctx.write_buffer(
            &self.vertex_buffer,
            range.vertex_start as u64 * std::mem::size_of::<V>() as u64,
            bytemuck::cast_slice(vertex_data),
        );

        let index_data = &self.indices[index_offset..index_offset + segment.index_pos as usize];
        self.upload_scratch.clear();
        self.upload_scratch.extend_from_slice(bytemuck::cast_slice(index_data));
        self.upload_scratch
            .resize(padded_indices as usize * std::mem::size_of::<I>(), 0);
        ctx.write_buffer(
            &self.index_buffer,
            range.index_start as u64 * std::mem::size_of::<I>() as u64,
            &self.upload_scratch,
        );

        BatchInfo {
            index_count: segment.index_pos,
            start_index_location: range.index_start,
            base_vertex_location: range.vertex_start,
        }
    }

    /// Bind this batch's GPU buffers to the pass.
    pub fn set_buffers(&self, pass: &mut dyn PassEncoder) {
        pass.set_vertex_buffer(0, &self.vertex_buffer, 0);
        pass.set_index_buffer(&self.index_buffer, I::FORMAT, 0);
    }

    /// Drop all recorded geometry. The GPU ring cursor keeps its position.
    pub fn reset(&mut self) {
        self.segments.clear();
        self.segments.push(BatchSegment::default());
        self.vertex_write_pos = 0;
        self.index_write_pos = 0;
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// `(vertices, indices)` recorded into a segment so far.
    pub fn segment_len(&self, segment: usize) -> Option<(u32, u32)> {
        self.segments
            .get(segment)
            .map(|s| (s.vertex_pos, s.index_pos))
    }

    /// Current CPU staging capacities `(vertices, indices)`.
    pub fn cpu_capacity(&self) -> (usize, usize) {
        (self.vertices.len(), self.indices.len())
    }

    /// CPU write cursors `(vertices, indices)`.
    pub fn write_position(&self) -> (usize, usize) {
        (self.vertex_write_pos, self.index_write_pos)
    }

    pub fn ring(&self) -> &RingCursor {
        &self.ring
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &GpuBuffer {
        &self.index_buffer
    }
}
