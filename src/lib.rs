mod network;
mod service;

pub use network::{Connection, FlowBuffer, FlowRequest, REQUEST_HEADER_SIZE};
pub use service::{
    setup_local_tracing, setup_tracing, AppError, AppResult, FlowConfig, Generator, NetworkConfig,
    Server, ServerConfig, DEFAULT_PORT,
};
