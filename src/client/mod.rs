pub mod body;
pub mod connector;
pub mod factory;
mod redirect;

pub use body::ResponseBody;
pub use connector::{SafeConnector, SafeStream, Transport};
pub use factory::{ClientBuilder, DialerConfig, SafeClient, TransportConfig, default_client};
