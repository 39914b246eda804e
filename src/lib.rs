//! proxyprobe - forward proxy connectivity harness
//!
//! Proves a forward proxy relays plain HTTP requests and tunnels HTTPS
//! requests via CONNECT, authenticating with a fixed credential and trusting
//! any certificate on the far end.

pub mod cli;
pub mod config;
pub mod core;
