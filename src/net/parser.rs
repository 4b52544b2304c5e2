use crate::error::ParanoidError;

type Port = u16;

/// Split a `host:port` pair
///
/// Accepts `host:port`, `a.b.c.d:port` and `[v6]:port`. The port must be
/// numeric. Brackets are stripped from IPv6 hosts.
///
/// # Examples
/// ```
/// use paranoid::net::parser::split_host_port;
///
/// assert_eq!(split_host_port("example.com:443").unwrap(), ("example.com", 443));
/// assert_eq!(split_host_port("[::1]:80").unwrap(), ("::1", 80));
/// ```
pub fn split_host_port(hostport: &str) -> Result<(&str, Port), ParanoidError> {
    let invalid = |reason: &str| ParanoidError::InvalidAddress {
        addr: hostport.to_string(),
        reason: reason.to_string(),
    };

    let (host, port_part) = if let Some(rest) = hostport.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing ']' in address"))?;
        let port_part = after
            .strip_prefix(':')
            .ok_or_else(|| invalid("missing port in address"))?;
        (host, port_part)
    } else {
        let (host, port_part) = hostport
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port in address"))?;
        if host.contains(':') {
            return Err(invalid("too many colons in address"));
        }
        (host, port_part)
    };

    if host.is_empty() {
        return Err(invalid("missing host in address"));
    }
    if host.contains(['[', ']']) {
        return Err(invalid("unexpected bracket in address"));
    }
    if port_part.is_empty() || !port_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("invalid port"));
    }

    let port = port_part
        .parse::<Port>()
        .map_err(|_| invalid("invalid port number"))?;

    Ok((host, port))
}
