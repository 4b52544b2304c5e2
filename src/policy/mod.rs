pub mod host;
pub mod model;
pub mod net;

use std::sync::{Arc, LazyLock};

// Re-export main types for convenience
pub use host::{HostPolicy, HostRule};
pub use model::{AddressPolicy, PolicyBuilder};
pub use net::{IpPolicy, is_global_unicast};

static DEFAULT_POLICY: LazyLock<Arc<AddressPolicy>> =
    LazyLock::new(|| Arc::new(AddressPolicy::default()));

/// Process-wide default policy, built on first use
pub fn default_policy() -> Arc<AddressPolicy> {
    Arc::clone(&DEFAULT_POLICY)
}
