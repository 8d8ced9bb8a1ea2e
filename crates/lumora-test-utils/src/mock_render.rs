//! Mock implementation of RenderContext for testing.
//!
//! Buffers are backed by plain byte vectors so tests can read back exactly
//! what a renderer uploaded.

use crate::{gpu_types::GpuBuffer, render_context::RenderContext};
use parking_lot::Mutex;
use wgpu::{BufferDescriptor, BufferUsages};

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        label: Option<String>,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
}

#[derive(Debug)]
struct MockBuffer {
    usage: BufferUsages,
    contents: Vec<u8>,
}

/// Mock implementation of RenderContext for testing.
///
/// Methods take `&self` but need to record calls, so state lives behind
/// `parking_lot::Mutex`, which keeps the type `Send + Sync` as the trait
/// requires.
///
/// # Example
///
/// ```rust
/// use lumora_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 16,
///     usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///     mapped_at_creation: false,
/// });
/// mock.write_buffer(&buffer, 4, &[1, 2, 3, 4]);
///
/// assert!(buffer.is_mock());
/// assert_eq!(&mock.buffer_contents(0).unwrap()[4..8], &[1, 2, 3, 4]);
/// ```
#[derive(Debug, Default)]
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    buffers: Mutex<Vec<MockBuffer>>,
}

impl MockRenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::CreateBuffer { .. }))
            .count()
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, RenderCall::WriteBuffer { .. }))
            .count()
    }

    /// `(offset, size)` of every write into the given buffer, in order.
    pub fn writes_to(&self, buffer_id: usize) -> Vec<(u64, usize)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::WriteBuffer {
                    buffer_id: id,
                    offset,
                    size,
                } if *id == buffer_id => Some((*offset, *size)),
                _ => None,
            })
            .collect()
    }

    /// Current contents of a mock buffer.
    pub fn buffer_contents(&self, buffer_id: usize) -> Option<Vec<u8>> {
        self.buffers
            .lock()
            .get(buffer_id)
            .map(|buffer| buffer.contents.clone())
    }

    pub fn buffer_usage(&self, buffer_id: usize) -> Option<BufferUsages> {
        self.buffers.lock().get(buffer_id).map(|buffer| buffer.usage)
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let mut buffers = self.buffers.lock();
        let id = buffers.len();

        buffers.push(MockBuffer {
            usage: desc.usage,
            contents: vec![0; desc.size as usize],
        });

        self.calls.lock().push(RenderCall::CreateBuffer {
            label: desc.label.map(|s| s.to_string()),
            size: desc.size,
            usage: desc.usage,
        });

        GpuBuffer::mock(id, desc.size)
    }

    /// # Panics
    /// Panics on an out-of-bounds or misaligned write, which `wgpu` would
    /// reject as a validation error.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        assert!(
            offset % wgpu::COPY_BUFFER_ALIGNMENT == 0
                && data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0,
            "misaligned write_buffer: offset {}, size {}",
            offset,
            data.len()
        );

        if let Some(mock) = self.buffers.lock().get_mut(buffer_id) {
            let start = offset as usize;
            let end = start + data.len();
            assert!(
                end <= mock.contents.len(),
                "write_buffer out of bounds: {}..{} of {}",
                start,
                end,
                mock.contents.len()
            );
            mock.contents[start..end].copy_from_slice(data);
        }

        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }
}
