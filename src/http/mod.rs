//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, tracing span)
//!     → handlers.rs (discover → resolve → forward)
//!     → response.rs (JSON shaping, error envelopes, CORS headers)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::{build_router, AppState, GatewayState, HttpServer};
