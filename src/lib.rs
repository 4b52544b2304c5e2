pub mod cli;
pub mod client;
pub mod error;
pub mod net;
pub mod policy;

pub use client::{ClientBuilder, SafeClient, default_client};
pub use error::ParanoidError;
pub use net::SafeDialer;
pub use policy::{AddressPolicy, PolicyBuilder, default_policy};
