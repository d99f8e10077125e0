// ABOUTME: Probe target overrides given on the command line.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@[::1]:port".

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
}

impl Target {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("target cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user, rest) = match s.split_once('@') {
            Some((user, _)) if user.is_empty() => {
                return Err("username cannot be empty".to_string());
            }
            Some((user, rest)) => (Some(user.to_string()), rest),
            None => (None, s),
        };

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| format!("missing closing bracket in: {}", rest))?;
            match after {
                "" => (host, None),
                _ => match after.strip_prefix(':') {
                    Some(port_str) => (host, Some(parse_port(port_str)?)),
                    None => return Err(format!("unexpected text after address: {}", after)),
                },
            }
        } else if rest.matches(':').count() > 1 {
            return Err(format!(
                "IPv6 addresses must be bracketed, e.g. [{}]:22",
                rest
            ));
        } else {
            match rest.rsplit_once(':') {
                Some((host, port_str)) => (host, Some(parse_port(port_str)?)),
                None => (rest, None),
            }
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(Target {
            host: host.to_string(),
            port,
            user,
        })
    }
}

fn parse_port(s: &str) -> Result<u16, String> {
    s.parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| format!("invalid port: {}", s))
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_only() {
        let target = Target::parse("localhost").unwrap();
        assert_eq!(target.host, "localhost");
        assert_eq!(target.port, None);
        assert_eq!(target.user, None);
    }

    #[test]
    fn user_host_port() {
        let target = Target::parse("admin@127.0.0.1:2222").unwrap();
        assert_eq!(target.user.as_deref(), Some("admin"));
        assert_eq!(target.host, "127.0.0.1");
        assert_eq!(target.port, Some(2222));
        assert_eq!(target.to_string(), "admin@127.0.0.1:2222");
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Target::parse("localhost:ssh").unwrap_err().contains("invalid port"));
        assert!(Target::parse("localhost:0").is_err());
        assert!(Target::parse("localhost:70000").is_err());
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(Target::parse("").is_err());
        assert!(Target::parse("@localhost").is_err());
        assert!(Target::parse("admin@:22").is_err());
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let target = Target::parse("admin@[::1]:2222").unwrap();
        assert_eq!(target.host, "::1");
        assert_eq!(target.port, Some(2222));
        assert_eq!(target.to_string(), "admin@[::1]:2222");
    }

    #[test]
    fn bracketed_ipv6_without_port() {
        let target = Target::parse("[fe80::1]").unwrap();
        assert_eq!(target.host, "fe80::1");
        assert_eq!(target.port, None);
    }

    #[test]
    fn rejects_unbracketed_ipv6() {
        let err = Target::parse("::1").unwrap_err();
        assert!(err.contains("must be bracketed"));
        assert!(Target::parse("fe80::1:2222").is_err());
    }

    #[test]
    fn rejects_malformed_brackets() {
        assert!(Target::parse("[::1").unwrap_err().contains("closing bracket"));
        assert!(Target::parse("[::1]2222").is_err());
        assert!(Target::parse("[]:22").unwrap_err().contains("hostname"));
        assert!(Target::parse("[::1]:0").is_err());
    }
}
