//! Engine orchestrator for flowplay.
//!
//! Drives the client side of the flow protocol: initialize, move, join,
//! sync, polling while the host computes, and component-scoped paginated
//! data fetches. Network transport and rendering are injected seams; all
//! model state lives in a shared [`ModelStore`](flowplay_model::ModelStore).

mod errors;
pub use errors::EngineError;

mod client;
pub use client::{paths, Method, NetworkClient, NetworkError, RequestHeaders};

mod render;
pub use render::{NoopRenderHook, RenderHook};

mod engine;
pub use engine::{Engine, EngineOptions};
