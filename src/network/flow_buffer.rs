use bytes::Bytes;

/// A fixed block of filler bytes used as the source for all outgoing flow
/// data. The contents are never inspected by clients, only counted, so the
/// block is left zeroed.
///
/// Constructed once at startup and never mutated afterwards. Cloning shares
/// the underlying allocation, so every connection's send loop references the
/// same block without copying or locking.
#[derive(Debug, Clone)]
pub struct FlowBuffer {
    block: Bytes,
}

impl FlowBuffer {
    pub fn new(capacity: usize) -> FlowBuffer {
        FlowBuffer {
            block: Bytes::from(vec![0u8; capacity]),
        }
    }

    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    /// The slice to hand to the next write call of a transfer with
    /// `remaining` bytes left, clamped to the buffer capacity.
    pub fn chunk(&self, remaining: usize) -> &[u8] {
        &self.block[..remaining.min(self.block.len())]
    }
}
