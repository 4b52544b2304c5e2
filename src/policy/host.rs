use std::fmt;

/// A single rule rejecting a symbolic hostname before it is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRule {
    /// Case-insensitive equality, e.g. `localhost`
    Exact(String),
    /// Case-insensitive match of the domain itself or any subdomain of it
    Suffix(String),
    /// Any whitespace anywhere in the hostname
    ContainsWhitespace,
}

impl HostRule {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn suffix(domain: impl Into<String>) -> Self {
        Self::Suffix(domain.into().trim_start_matches('.').to_string())
    }

    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(name) => host.eq_ignore_ascii_case(name),
            Self::Suffix(domain) => {
                let host = host.to_ascii_lowercase();
                let domain = domain.to_ascii_lowercase();
                host == domain || host.ends_with(&format!(".{domain}"))
            }
            Self::ContainsWhitespace => host.chars().any(char::is_whitespace),
        }
    }
}

impl fmt::Display for HostRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "exact:{name}"),
            Self::Suffix(domain) => write!(f, "suffix:{domain}"),
            Self::ContainsWhitespace => f.write_str("whitespace"),
        }
    }
}

/// Hostname rules, evaluated in order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostPolicy {
    pub(crate) rules: Vec<HostRule>,
}

impl HostPolicy {
    /// Rules rejecting `localhost` and any host containing whitespace
    pub fn with_defaults() -> Self {
        Self {
            rules: vec![HostRule::exact("localhost"), HostRule::ContainsWhitespace],
        }
    }

    pub fn rules(&self) -> &[HostRule] {
        &self.rules
    }

    /// Return the first rule matching the hostname
    pub fn matching_rule(&self, host: &str) -> Option<&HostRule> {
        self.rules.iter().find(|rule| rule.matches(host))
    }

    pub fn is_forbidden(&self, host: &str) -> bool {
        self.matching_rule(host).is_some()
    }
}
