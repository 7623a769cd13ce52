//! Network Module Implementation
//!
//! This module provides the core networking functionality for the traffic
//! generator, handling TCP connections, flow request parsing, and the shared
//! flow data source.
//!
//! # Architecture
//!
//! The network module is built on tokio's async I/O primitives and consists of:
//! - Connection management for reading from TCP connections
//! - Flow request parsing for the fixed 8-byte request header
//! - A shared, immutable filler buffer backing every outgoing flow
//!
//! # Components
//!
//! - `Connection`: wraps a connection's read half with header reassembly
//! - `FlowRequest`: the `(index, size)` pair a client sends to start a flow
//! - `FlowBuffer`: read-only filler block shared across all connections
//!
//! # Features
//!
//! - Asynchronous I/O operations
//! - Short reads absorbed by buffer accumulation
//! - Zero-allocation flow streaming from the shared buffer
//! - Error handling for network operations

pub use connection::Connection;
pub use flow_buffer::FlowBuffer;
pub use request::{FlowRequest, REQUEST_HEADER_SIZE};
mod connection;
mod flow_buffer;
mod request;
