//! Segment splitting, uploads and CPU growth of `VertexBatch`.

use lumora_render::batch::{BatchInfo, UpdateBuffersSink};
use lumora_render::{BatchConfig, VertexBatch2D};
use lumora_test_utils::MockRenderContext;

/// Records the segment indices a batch reports.
#[derive(Default)]
struct SegmentLog(Vec<u32>);

impl UpdateBuffersSink for SegmentLog {
    fn push_update_buffers(&mut self, segment: u32) {
        self.0.push(segment);
    }
}

fn fill(batch: &mut VertexBatch2D, log: &mut SegmentLog, vertices: u32, indices: u32) -> bool {
    match batch.request_buffer(vertices, indices, log) {
        Some(writer) => {
            for (i, index) in writer.indices.iter_mut().enumerate() {
                *index = (writer.index_offset + i as u32 % vertices) as u16;
            }
            true
        }
        None => false,
    }
}

#[test]
fn test_overflow_opens_one_segment_per_boundary() {
    let ctx = MockRenderContext::new();
    let config = BatchConfig::default().with_gpu_capacity(8, 12);
    let mut batch = VertexBatch2D::new(&ctx, config, "Test");
    let mut log = SegmentLog::default();

    for _ in 0..5 {
        assert!(fill(&mut batch, &mut log, 4, 6));
    }

    // Two quads fill a segment exactly.
    assert_eq!(log.0, vec![1, 2]);
    assert_eq!(batch.segment_count(), 3);
    assert_eq!(batch.segment_len(0), Some((8, 12)));
    assert_eq!(batch.segment_len(2), Some((4, 6)));
}

#[test]
fn test_segments_upload_consecutively_until_the_ring_wraps() {
    let ctx = MockRenderContext::new();
    let config = BatchConfig::default().with_gpu_capacity(16, 24);
    let mut batch = VertexBatch2D::new(&ctx, config, "Test");
    let mut log = SegmentLog::default();

    // Frame 1: one small segment.
    assert!(fill(&mut batch, &mut log, 4, 6));
    let first = batch.update_buffers(&ctx, 0);
    batch.reset();

    // Frame 2 continues where frame 1 ended.
    assert!(fill(&mut batch, &mut log, 4, 6));
    let second = batch.update_buffers(&ctx, 0);
    assert_eq!(second.base_vertex_location, first.base_vertex_location + 4);
    assert_eq!(second.start_index_location, first.start_index_location + 6);
    assert!(!batch.ring().wrapped());
    batch.reset();

    // Frame 3 fills a whole segment, which cannot fit behind the others.
    for _ in 0..4 {
        assert!(fill(&mut batch, &mut log, 4, 6));
    }
    let third = batch.update_buffers(&ctx, 0);
    assert!(batch.ring().wrapped());
    assert_eq!(
        third,
        BatchInfo {
            index_count: 24,
            start_index_location: 0,
            base_vertex_location: 0
        }
    );
    assert!(log.0.is_empty());
}

#[test]
fn test_index_upload_is_padded_to_four_bytes() {
    let ctx = MockRenderContext::new();
    let mut batch = VertexBatch2D::new(&ctx, BatchConfig::default(), "Test");
    let mut log = SegmentLog::default();
    let index_buffer = batch.index_buffer().mock_id().unwrap();

    assert!(fill(&mut batch, &mut log, 3, 3));
    let info = batch.update_buffers(&ctx, 0);

    assert_eq!(info.index_count, 3);
    assert_eq!(ctx.writes_to(index_buffer), vec![(0, 8)]);

    let contents = ctx.buffer_contents(index_buffer).unwrap();
    assert_eq!(&contents[..8], &[0, 0, 1, 0, 2, 0, 0, 0]);
}

#[test]
fn test_empty_segment_uploads_nothing() {
    let ctx = MockRenderContext::new();
    let mut batch = VertexBatch2D::new(&ctx, BatchConfig::default(), "Test");

    let info = batch.update_buffers(&ctx, 0);

    assert_eq!(info.index_count, 0);
    assert_eq!(ctx.count_buffer_writes(), 0);
}

#[test]
fn test_cpu_arrays_double_until_the_cap() {
    let ctx = MockRenderContext::new();
    let config = BatchConfig::default().with_cpu_capacity(4, 4, 16);
    let mut batch = VertexBatch2D::new(&ctx, config, "Test");
    let mut log = SegmentLog::default();

    assert!(fill(&mut batch, &mut log, 6, 6));
    assert_eq!(batch.cpu_capacity(), (8, 8));

    assert!(fill(&mut batch, &mut log, 6, 6));
    assert_eq!(batch.cpu_capacity(), (16, 16));
}

#[test]
fn test_request_past_the_cap_is_rejected_without_side_effects() {
    let ctx = MockRenderContext::new();
    let config = BatchConfig::default().with_cpu_capacity(4, 4, 16);
    let mut batch = VertexBatch2D::new(&ctx, config, "Test");
    let mut log = SegmentLog::default();

    assert!(fill(&mut batch, &mut log, 12, 12));
    let capacity = batch.cpu_capacity();
    let position = batch.write_position();

    for _ in 0..2 {
        assert!(!fill(&mut batch, &mut log, 8, 8));
        assert_eq!(batch.cpu_capacity(), capacity);
        assert_eq!(batch.write_position(), position);
    }
    assert!(log.0.is_empty());

    // Smaller shapes still fit.
    assert!(fill(&mut batch, &mut log, 4, 4));
}
