use std::{sync::Arc, time::Duration};

use crate::client::ClientBuilder;
use crate::error::ParanoidError;
use crate::net::StackMode;
use crate::policy::{AddressPolicy, HostRule, PolicyBuilder};

use super::args::Args;
use super::config::{ConfigFile, parse_cidr};

/// Load and merge policies from command line arguments and config file
pub struct PolicyLoader;

impl PolicyLoader {
    /// Load the complete policy; CLI entries extend the config file's
    pub fn load(args: &Args) -> Result<AddressPolicy, ParanoidError> {
        let config = load_config(args)?;
        Self::merge(args, config.as_ref())
    }

    fn merge(args: &Args, config: Option<&ConfigFile>) -> Result<AddressPolicy, ParanoidError> {
        let mut builder = match config {
            Some(config) => config.to_policy_builder()?,
            None => PolicyBuilder::default(),
        };

        for entry in &args.forbid_cidr {
            builder = builder.forbid_range(parse_cidr(entry)?);
        }
        for entry in &args.allow_cidr {
            builder = builder.allow_range(parse_cidr(entry)?);
        }
        for host in &args.forbid_host {
            builder = builder.forbid_host(HostRule::exact(host.as_str()));
        }

        Ok(builder.build())
    }
}

/// Assemble a [`ClientBuilder`] from the config file and CLI flags
pub struct ClientLoader;

impl ClientLoader {
    pub fn load(args: &Args) -> Result<ClientBuilder, ParanoidError> {
        let config = load_config(args)?;
        let policy = PolicyLoader::merge(args, config.as_ref())?;
        let config = config.unwrap_or_default();

        let mut dialer = config.dialer_config();
        if args.dual_stack {
            dialer.stack = StackMode::DualStack;
        }
        let mut transport = config.transport_config();
        if args.no_proxy {
            transport.proxy_from_env = false;
        }

        let mut builder = ClientBuilder::new(Arc::new(policy))
            .dialer_config(dialer)
            .transport_config(transport);
        if let Some(timeout) = args.timeout.map(Duration::from_secs).or(config.timeout()) {
            builder = builder.timeout(timeout);
        }
        if let Some(max) = args.max_redirects.or(config.max_redirects()) {
            builder = builder.max_redirects(max);
        }

        Ok(builder)
    }
}

fn load_config(args: &Args) -> Result<Option<ConfigFile>, ParanoidError> {
    args.config
        .as_deref()
        .map(|path| {
            log::debug!("Loading config from {}", path.display());
            ConfigFile::load(path)
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(url: &str) -> Args {
        Args {
            config: None,
            allow_cidr: vec![],
            forbid_cidr: vec![],
            forbid_host: vec![],
            dual_stack: false,
            no_proxy: false,
            timeout: None,
            max_redirects: None,
            url: url.to_string(),
        }
    }

    #[test]
    fn load_without_config_uses_default_policy() {
        let policy = PolicyLoader::load(&args("https://example.org/")).unwrap();
        assert_eq!(policy, AddressPolicy::default());
    }

    #[test]
    fn cli_entries_extend_config_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "[policy]\nforbidden_cidrs = [\"100.64.0.0/10\"]\nforbidden_hosts = [\"metadata\"]\n"
        )
        .unwrap();

        let args = Args {
            config: Some(tmp.path().to_path_buf()),
            allow_cidr: vec!["192.168.10.0/24".to_string()],
            forbid_cidr: vec!["198.51.100.0/24".to_string()],
            forbid_host: vec!["admin.example".to_string()],
            ..args("https://example.org/")
        };

        let policy = PolicyLoader::load(&args).unwrap();
        assert!(policy.is_ip_forbidden("100.64.0.1".parse().unwrap()));
        assert!(policy.is_ip_forbidden("198.51.100.7".parse().unwrap()));
        assert!(!policy.is_ip_forbidden("192.168.10.5".parse().unwrap()));
        assert!(policy.is_ip_forbidden("192.168.11.5".parse().unwrap()));
        assert!(policy.is_host_forbidden("metadata"));
        assert!(policy.is_host_forbidden("admin.example"));
        assert!(policy.is_host_forbidden("localhost"));
    }

    #[test]
    fn invalid_cli_cidr_is_rejected() {
        let args = Args {
            allow_cidr: vec!["not-a-cidr".to_string()],
            ..args("https://example.org/")
        };
        assert!(matches!(
            PolicyLoader::load(&args),
            Err(ParanoidError::InvalidCidr { .. })
        ));
    }

    #[test]
    fn cli_flags_override_config_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "[dialer]\nconnect_timeout_secs = 3\n\n[client]\ntimeout_secs = 9\nproxy_from_env = true\n"
        )
        .unwrap();

        let args = Args {
            config: Some(tmp.path().to_path_buf()),
            dual_stack: true,
            no_proxy: true,
            timeout: Some(2),
            max_redirects: Some(0),
            ..args("https://example.org/")
        };

        let client = ClientLoader::load(&args).unwrap().build().unwrap();
        assert_eq!(client.dialer().stack(), StackMode::DualStack);
        assert_eq!(client.connector().connect_timeout(), Duration::from_secs(3));
        assert_eq!(client.timeout(), Duration::from_secs(2));
        assert_eq!(client.max_redirects(), 0);
    }

    #[test]
    fn config_timeout_applies_without_cli_flag() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[client]\ntimeout_secs = 9\nmax_redirects = 4\n").unwrap();

        let args = Args {
            config: Some(tmp.path().to_path_buf()),
            no_proxy: true,
            ..args("https://example.org/")
        };

        let client = ClientLoader::load(&args).unwrap().build().unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(9));
        assert_eq!(client.max_redirects(), 4);
        assert_eq!(client.dialer().stack(), StackMode::Ipv4Only);
    }
}
