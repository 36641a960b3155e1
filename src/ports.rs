use anyhow::{bail, Context, Result};

/// Well-known services keyed by port, in ascending port order.
const COMMON_SERVICES: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (80, "http"),
    (443, "https"),
    (445, "smb"),
    (3389, "rdp"),
    (8080, "http-alt"),
];

/// Parse a port range specification into an inclusive `(start, end)` pair.
///
/// Supported formats:
/// - single port number: `80` (yields `(80, 80)`)
/// - inclusive range: `1-1000`
/// - surrounding whitespace is ignored
pub fn parse_port_range(s: &str) -> Result<(u16, u16)> {
    let spec = s.trim();
    if spec.is_empty() {
        bail!("empty port range");
    }

    if let Some((a, b)) = spec.split_once('-') {
        let start = parse_port_str(a.trim())
            .with_context(|| format!("invalid start in range: {a}"))?;
        let end = parse_port_str(b.trim())
            .with_context(|| format!("invalid end in range: {b}"))?;
        if start > end {
            bail!("invalid range {start}-{end} (start > end)");
        }
        return Ok((start, end));
    }

    let p = parse_port_str(spec).with_context(|| format!("invalid port value: {spec}"))?;
    Ok((p, p))
}

/// Guess the service name for a port from the well-known table.
pub fn service_guess(port: u16) -> Option<&'static str> {
    COMMON_SERVICES
        .binary_search_by_key(&port, |&(p, _)| p)
        .ok()
        .map(|idx| COMMON_SERVICES[idx].1)
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range() {
        assert_eq!(parse_port_range("1-1000").unwrap(), (1, 1000));
        assert_eq!(parse_port_range(" 20 - 25 ").unwrap(), (20, 25));
    }

    #[test]
    fn parse_single_port() {
        assert_eq!(parse_port_range("443").unwrap(), (443, 443));
    }

    #[test]
    fn invalid_values_error() {
        assert!(parse_port_range("70000").is_err());
        assert!(parse_port_range("0-10").is_err());
        assert!(parse_port_range("100-10").is_err());
        assert!(parse_port_range("a-b").is_err());
        assert!(parse_port_range("").is_err());
    }

    #[test]
    fn known_services_are_guessed() {
        assert_eq!(service_guess(22), Some("ssh"));
        assert_eq!(service_guess(8080), Some("http-alt"));
        assert_eq!(service_guess(31337), None);
    }

    #[test]
    fn service_table_is_sorted_for_binary_search() {
        assert!(COMMON_SERVICES.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
