use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::{runtime, signal};
use tracing::{error, info};

use crate::network::FlowBuffer;
use crate::service::Server;
use crate::AppError::IllegalStateError;
use crate::{AppResult, ServerConfig};

/// Top-level entry point for the traffic generator process. Owns the
/// configuration, builds the runtime, and runs the accept loop until the
/// process is told to stop.
pub struct Generator {
    config: ServerConfig,
}

impl Generator {
    pub fn new(config: ServerConfig) -> Self {
        Generator { config }
    }

    pub fn start(&self) -> AppResult<()> {
        self.config.validate()?;

        // startup tokio runtime
        let rt = runtime::Builder::new_multi_thread().enable_all().build()?;

        rt.block_on(Self::run_tcp_server(&self.config))
    }

    async fn run_tcp_server(config: &ServerConfig) -> AppResult<()> {
        let listen_address = format!("{}:{}", config.network.ip, config.network.port);

        let bind_result = TcpListener::bind(&listen_address).await;
        if let Err(err) = &bind_result {
            let error_msg = format!(
                "Failed to bind server to address: {} - Error: {}",
                listen_address, err
            );
            error!("{}", error_msg);
            return Err(IllegalStateError(error_msg));
        }
        info!("traffic generator server started");
        info!("listening on {}", listen_address);

        let server = Server::new(
            bind_result?,
            Arc::new(Semaphore::new(config.network.max_connection)),
            FlowBuffer::new(config.flow.buffer_size),
            config.network.conn_read_buffer_size,
        );

        // in-flight connections are not drained; whole-process termination
        // is the only server-side way a connection ends
        tokio::select! {
            res = server.run() => {
                if let Err(err) = res {
                    error!(cause = %err, "failed to accept");
                }
            }
            _ = signal::ctrl_c() => {
                info!("get shutdown signal");
            }
        }

        Ok(())
    }
}
