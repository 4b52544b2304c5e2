pub mod args;
pub mod config;
pub mod loader;

pub use args::Args;
pub use config::{ClientSection, ConfigFile, DialerSection, PolicySection};
pub use loader::{ClientLoader, PolicyLoader};
