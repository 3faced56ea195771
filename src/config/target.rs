// ABOUTME: Connection target parsed from the command line.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

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
        let (user_part, rest) = match s.rfind('@') {
            Some(at_pos) => (Some(&s[..at_pos]), &s[at_pos + 1..]),
            None => (None, s),
        };

        let (host, port) = match rest.rfind(':') {
            Some(colon_pos) => {
                let port_str = &rest[colon_pos + 1..];
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port_str))?;
                (&rest[..colon_pos], Some(port))
            }
            None => (rest, None),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if user_part.is_some_and(str::is_empty) {
            return Err("user cannot be empty".to_string());
        }

        Ok(Target {
            host: host.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
        })
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_only() {
        let t = Target::parse("example.com").unwrap();
        assert_eq!(t.host, "example.com");
        assert_eq!(t.port, None);
        assert_eq!(t.user, None);
    }

    #[test]
    fn user_host_port() {
        let t = Target::parse("deploy@example.com:2222").unwrap();
        assert_eq!(t.host, "example.com");
        assert_eq!(t.port, Some(2222));
        assert_eq!(t.user.as_deref(), Some("deploy"));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Target::parse("example.com:ssh").unwrap_err().contains("invalid port"));
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(Target::parse("").is_err());
        assert!(Target::parse("user@").is_err());
        assert!(Target::parse("@host").is_err());
        assert!(Target::parse(":22").is_err());
    }
}
