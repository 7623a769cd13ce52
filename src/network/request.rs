use bytes::{Buf, BytesMut};

use crate::AppError::Incomplete;
use crate::AppResult;

/// Wire size of a flow request: two 4-byte unsigned integers.
pub const REQUEST_HEADER_SIZE: usize = 8;

/// One client-requested flow: which flow it is and how many bytes to stream.
///
/// Integers travel in the host's native byte order. This mirrors the clients
/// this server is used with and is a hard compatibility constraint of the
/// wire format, not an oversight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowRequest {
    pub index: u32,
    pub size: u32,
}

impl FlowRequest {
    fn check(buffer: &BytesMut) -> AppResult<()> {
        if buffer.remaining() < REQUEST_HEADER_SIZE {
            return Err(Incomplete);
        }
        Ok(())
    }

    /// Consumes one request header from `buffer` if enough bytes have
    /// accumulated. Returns `None` when the header is still incomplete;
    /// the caller keeps reading in that case.
    pub(crate) fn parse(buffer: &mut BytesMut) -> AppResult<Option<FlowRequest>> {
        match FlowRequest::check(buffer) {
            Ok(_) => {
                let index = buffer.get_u32_ne();
                let size = buffer.get_u32_ne();
                Ok(Some(FlowRequest { index, size }))
            }
            Err(Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The exact 8 bytes the client sent for this request, for echoing back.
    pub fn encode(&self) -> [u8; REQUEST_HEADER_SIZE] {
        let mut buf = [0u8; REQUEST_HEADER_SIZE];
        buf[..4].copy_from_slice(&self.index.to_ne_bytes());
        buf[4..].copy_from_slice(&self.size.to_ne_bytes());
        buf
    }
}
