pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::{parse_port, ENV_HTTPS_PORT, ENV_HTTP_PORT, ENV_PROXY_PORT};
pub use types::*;
