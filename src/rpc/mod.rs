//! JSON-RPC forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! handler (method, params)
//!     → client.rs (build envelope, POST with timeout)
//!     → types.rs (RpcResponse: verbatim reply or typed failure)
//! ```
//!
//! # Design Decisions
//! - The gateway relays calls; it never interprets method semantics
//! - Every outbound call has a deadline
//! - Failures are values, never panics or propagated errors

pub mod client;
pub mod types;

pub use client::{HttpRpcClient, RpcClient};
pub use types::{RpcError, RpcRequest, RpcResponse};
