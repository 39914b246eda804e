pub mod client;
pub mod debug_logger;
pub mod status_renderer;
pub mod types;
pub mod url;
pub mod verifier;

// Re-export commonly used items
pub use client::{perform, IsahcProbeClient, ProbeClient};
pub use debug_logger::{get_debug_logger, DebugLogger};
pub use status_renderer::StatusRenderer;
pub use types::*;
pub use verifier::{run_verification, Verifier};
