pub use app_error::{AppError, AppResult};
pub use config::{FlowConfig, NetworkConfig, ServerConfig, DEFAULT_PORT};
pub use generator::Generator;
pub use server::Server;
pub use tracing_config::{setup_local_tracing, setup_tracing};

mod app_error;
mod config;
mod generator;
mod server;
mod tracing_config;
