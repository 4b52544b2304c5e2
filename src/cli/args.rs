use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fetch a URL, refusing destinations usable for server-side request forgery"
)]
pub struct Args {
    /// Path to configuration file (TOML)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Allow connections to the specified CIDR ranges even if otherwise forbidden
    #[arg(long = "allow-cidr", value_delimiter = ',')]
    pub allow_cidr: Vec<String>,

    /// Forbid connections to the specified CIDR ranges
    #[arg(long = "forbid-cidr", value_delimiter = ',')]
    pub forbid_cidr: Vec<String>,

    /// Forbid the specified hostnames (exact, case-insensitive)
    #[arg(long = "forbid-host", value_delimiter = ',')]
    pub forbid_host: Vec<String>,

    /// Dial IPv6 destinations as well as IPv4
    #[arg(long = "dual-stack")]
    pub dual_stack: bool,

    /// Ignore HTTP_PROXY, HTTPS_PROXY and NO_PROXY
    #[arg(long = "no-proxy")]
    pub no_proxy: bool,

    /// Overall request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of redirects to follow (0 disables following)
    #[arg(long = "max-redirects", value_name = "N")]
    pub max_redirects: Option<usize>,

    /// URL to fetch
    pub url: String,
}
