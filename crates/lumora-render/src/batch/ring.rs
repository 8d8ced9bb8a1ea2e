/// Start of a reserved region in a vertex/index buffer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingRange {
    pub vertex_start: u32,
    pub index_start: u32,
}

/// Write cursor over a fixed-size vertex/index buffer pair.
///
/// Reservations advance both lanes together. When either lane would run past
/// its capacity, both rewind to 0 and the new region overwrites the oldest
/// data. Nothing fences the overwrite: callers alternate between two batches
/// so the GPU is never reading a region that is being rewritten.
#[derive(Debug, Clone)]
pub struct RingCursor {
    vertex_capacity: u32,
    index_capacity: u32,
    vertex_pos: u32,
    index_pos: u32,
    wrap_count: u64,
    wrapped: bool,
}

impl RingCursor {
    pub fn new(vertex_capacity: u32, index_capacity: u32) -> Self {
        Self {
            vertex_capacity,
            index_capacity,
            vertex_pos: 0,
            index_pos: 0,
            wrap_count: 0,
            wrapped: false,
        }
    }

    /// Reserve `vertices`/`indices` elements. `None` if the request is larger
    /// than the buffers themselves.
    pub fn reserve(&mut self, vertices: u32, indices: u32) -> Option<RingRange> {
        if vertices > self.vertex_capacity || indices > self.index_capacity {
            return None;
        }

        self.wrapped = self.vertex_pos + vertices > self.vertex_capacity
            || self.index_pos + indices > self.index_capacity;

        if self.wrapped {
            self.vertex_pos = 0;
            self.index_pos = 0;
            self.wrap_count += 1;
        }

        let range = RingRange {
            vertex_start: self.vertex_pos,
            index_start: self.index_pos,
        };
        self.vertex_pos += vertices;
        self.index_pos += indices;
        Some(range)
    }

    /// Whether the most recent reservation rewound to the start.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }

    pub fn vertex_position(&self) -> u32 {
        self.vertex_pos
    }

    pub fn index_position(&self) -> u32 {
        self.index_pos
    }
}
