use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

use crate::network::{Connection, FlowBuffer, FlowRequest};
use crate::AppError;
use crate::AppResult;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// handler for each connection
struct ConnectionHandler {
    connection_id: u64,
    client_ip: String,
    connection: Connection,
    writer: BufWriter<OwnedWriteHalf>,
    flow_buffer: FlowBuffer,
}

impl ConnectionHandler {
    /// Runs the protocol loop for one connection: read a request header,
    /// echo it back, stream the requested number of flow bytes, repeat.
    ///
    /// A connection serves an unbounded sequence of requests; the loop only
    /// ends when the client closes the connection or a transfer fails.
    async fn handle_connection(&mut self) -> AppResult<()> {
        loop {
            // read the next request; if the client closed the connection
            // between requests this returns None, if it closed mid-header
            // it returns Err
            let maybe_request = self.connection.read_request().await?;

            let request = match maybe_request {
                Some(request) => request,
                // client closed the connection gracefully
                None => break,
            };

            debug!(
                "flow request: index: {} size: {}",
                request.index, request.size
            );

            self.echo_header(&request).await?;
            self.send_flow(request.size as usize).await?;

            self.writer
                .flush()
                .await
                .map_err(|e| AppError::DetailedIoError(format!("flush error: {}", e)))?;
        }
        debug!("connection handler exit read loop");

        Ok(())
    }

    /// Echoes the request header byte-for-byte before any flow data. Partial
    /// writes are absorbed by `write_all`.
    async fn echo_header(&mut self, request: &FlowRequest) -> AppResult<()> {
        self.writer
            .write_all(&request.encode())
            .await
            .map_err(|e| AppError::DetailedIoError(format!("header echo error: {}", e)))
    }

    /// Streams exactly `size` bytes from the shared flow buffer, at most one
    /// buffer's worth per write, the last write truncated to the remainder.
    async fn send_flow(&mut self, size: usize) -> AppResult<()> {
        let mut remaining = size;
        while remaining > 0 {
            let chunk = self.flow_buffer.chunk(remaining);
            self.writer
                .write_all(chunk)
                .await
                .map_err(|e| AppError::DetailedIoError(format!("flow write error: {}", e)))?;
            remaining -= chunk.len();
        }
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        // fires exactly once however the handler ends, including panics
        info!(
            "connection {} to {} closed",
            self.connection_id, self.client_ip
        );
    }
}

/// The acceptor: owns the listening endpoint and hands every accepted
/// connection to its own task running a `ConnectionHandler`.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    limit_connections: Arc<Semaphore>,
    flow_buffer: FlowBuffer,
    conn_read_buffer_size: usize,
}

impl Server {
    pub fn new(
        listener: TcpListener,
        limit_connections: Arc<Semaphore>,
        flow_buffer: FlowBuffer,
        conn_read_buffer_size: usize,
    ) -> Self {
        Server {
            listener,
            limit_connections,
            flow_buffer,
            conn_read_buffer_size,
        }
    }

    /// Accepts connections until the process terminates.
    ///
    /// Each accepted connection gets a connection id and its own task; the
    /// accept loop never waits on a connection's handling. A handler failure
    /// ends only that connection's task - it is logged and the permit is
    /// released, nothing propagates back here.
    ///
    /// # Returns
    /// Under normal operation, never. Exits with an error only if accepting
    /// new connections fails persistently.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> AppResult<()> {
        loop {
            let permit = self
                .limit_connections
                .clone()
                .acquire_owned()
                .await
                .unwrap();

            debug!("accept new connection");

            let socket = self.accept().await?;

            // header echoes must not sit in Nagle buffers
            if let Err(err) = socket.set_nodelay(true) {
                debug!("failed to set TCP_NODELAY: {}", err);
            }

            let client_ip = socket
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "unknown".to_string());

            let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
            let (reader, writer) = socket.into_split();

            let mut handler = ConnectionHandler {
                connection_id,
                client_ip,
                connection: Connection::new(reader, self.conn_read_buffer_size),
                writer: BufWriter::new(writer),
                flow_buffer: self.flow_buffer.clone(),
            };

            info!(
                "connection {} established to {}",
                connection_id, handler.client_ip
            );

            tokio::spawn(async move {
                if let Err(err) = handler.handle_connection().await {
                    // mid-transfer disconnects land here too; this is the
                    // normal way a load-generating client goes away
                    debug!("connection {} error: {:?}", handler.connection_id, err);
                }
                // whether gracefully or unexpectedly closed, release connection
                drop(handler);
                drop(permit);
            });
        }
    }

    async fn accept(&self) -> AppResult<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > 64 {
                        return Err(AppError::Accept(format!(
                            "accept tcp server error: {}",
                            err
                        )));
                    }
                    error!("accept error: {}, retrying in {}s", err, backoff);
                    time::sleep(Duration::from_secs(backoff)).await;
                    backoff *= 2;
                }
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        debug!("tcp server dropped");
    }
}
