extern crate config as _;

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AppError, AppResult};

/// Default listening port, shared by the config defaults and the CLI.
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub ip: String,
    pub port: u16,
    pub max_connection: usize,
    pub conn_read_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            ip: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_connection: 1024,
            conn_read_buffer_size: 4 * 1024,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FlowConfig {
    /// Capacity of the shared flow buffer. Also the upper bound on the number
    /// of bytes handed to a single write call while streaming a flow.
    pub buffer_size: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            buffer_size: 8 * 1024,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub flow: FlowConfig,
}

impl ServerConfig {
    pub fn set_up_config<P: AsRef<Path>>(path: P) -> AppResult<ServerConfig> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or(AppError::InvalidValue(format!(
                "config file path: {}",
                path.as_ref().to_string_lossy()
            )))?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path_str))
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;

        Ok(server_config)
    }

    /// The flow buffer must hold at least one byte, otherwise the send loop
    /// could never make progress. Same for the per-connection read buffer.
    pub fn validate(&self) -> AppResult<()> {
        if self.flow.buffer_size == 0 {
            return Err(AppError::InvalidValue(
                "flow.buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.network.conn_read_buffer_size == 0 {
            return Err(AppError::InvalidValue(
                "network.conn_read_buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
