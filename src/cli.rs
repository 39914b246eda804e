use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "proxyprobe")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(
    about = "Verify a forward proxy relays HTTP and tunnels HTTPS",
    long_about = "Reads MASTER_PORT, SERVERS_PORT_HTTP and SERVERS_PORT_HTTPS, then issues \
                  one plain HTTP request and one HTTPS request through the proxy. \
                  Exits non-zero naming the failing leg."
)]
pub struct Cli {
    /// Validate configuration and exit
    #[arg(short = 'c', long = "check")]
    pub check: bool,

    /// Print resolved configuration as TOML and exit
    #[arg(short = 'p', long = "print")]
    pub print: bool,

    /// Proxy host (port comes from MASTER_PORT)
    #[arg(long = "proxy-host", value_name = "HOST")]
    pub proxy_host: Option<String>,

    /// Backend host requested through the proxy
    #[arg(long = "target-host", value_name = "HOST")]
    pub target_host: Option<String>,

    /// Requested body size in bytes
    #[arg(long = "size", value_name = "BYTES")]
    pub size: Option<usize>,

    /// Proxy username
    #[arg(long = "username")]
    pub username: Option<String>,

    /// Proxy password
    #[arg(long = "password")]
    pub password: Option<String>,

    /// Validate backend certificates instead of trusting any
    #[arg(long = "verify-certs")]
    pub verify_certs: bool,

    /// Total per-request timeout in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Connect timeout in milliseconds
    #[arg(long = "connect-timeout-ms", value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Fail when a body size differs from the requested size
    #[arg(long = "strict-size")]
    pub strict_size: bool,

    /// Suppress body echo and summary
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Print the run report as JSON on stderr
    #[arg(long = "json", conflicts_with = "quiet")]
    pub json: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
