use std::io::{self, ErrorKind};

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;

use crate::network::FlowRequest;
use crate::AppResult;

/// Read side of a connection to a client.
///
/// Wraps the stream's read half together with an accumulation buffer, so a
/// request header split across several receives is reassembled before it is
/// handed to the protocol loop.
#[derive(Debug)]
pub struct Connection {
    reader: OwnedReadHalf,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(reader: OwnedReadHalf, buffer_size: usize) -> Connection {
        Connection {
            reader,
            buffer: BytesMut::with_capacity(buffer_size),
        }
    }

    /// Reads the next `FlowRequest` from the connection.
    ///
    /// Keeps reading from the stream until a complete 8-byte header has
    /// accumulated. A short read never yields a request; the loop continues
    /// until the header is whole or the stream ends.
    ///
    /// If the client closes the connection between requests, `None` is
    /// returned. If it closes mid-header, an error is returned and the
    /// connection should be dropped.
    pub async fn read_request(&mut self) -> AppResult<Option<FlowRequest>> {
        loop {
            if let Some(request) = FlowRequest::parse(&mut self.buffer)? {
                return Ok(Some(request));
            }
            if 0 == self.reader.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    // client has closed the connection gracefully
                    Ok(None)
                } else {
                    // client closed the connection while sending a header
                    Err(
                        io::Error::new(ErrorKind::ConnectionReset, "connection reset by peer")
                            .into(),
                    )
                };
            }
        }
    }
}
