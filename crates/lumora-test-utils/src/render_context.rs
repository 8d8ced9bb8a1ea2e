//! Trait abstracting GPU buffer operations.

use crate::gpu_types::GpuBuffer;
use wgpu::BufferDescriptor;

/// Buffer creation and uploads.
///
/// Methods take `&self` and return owned wrappers, so one context can be
/// shared behind an `Arc` and mocked with interior mutability.
///
/// # Example
///
/// ```rust,no_run
/// use lumora_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload(ctx: &dyn RenderContext, data: &[u8]) {
///     let buffer = ctx.create_buffer(&BufferDescriptor {
///         label: None,
///         size: data.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     ctx.write_buffer(&buffer, 0, data);
/// }
/// ```
pub trait RenderContext: Send + Sync {
    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer.
    ///
    /// For real buffers, this maps to `queue.write_buffer()`. `offset` and
    /// `data.len()` must be multiples of `wgpu::COPY_BUFFER_ALIGNMENT`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);
}
