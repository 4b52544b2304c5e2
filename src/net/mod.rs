pub mod dialer;
pub mod parser;
pub mod resolver;
pub mod validator;

// Re-export main types and functions
pub use dialer::{Connector, Network, SafeDialer, StackMode, TcpConnector};
pub use parser::split_host_port;
pub use resolver::{DnsResolver, SystemDnsResolver};
pub use validator::{IpFamily, ValidatedAddress, validate};
