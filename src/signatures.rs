//! Static exploit-signature and OS-hint tables.
//!
//! Both tables are ordered slices: the first matching entry wins, so entry
//! order is part of the matching behavior.

use crate::types::{ExploitSignature, OsHint, Severity};

pub const EXPLOIT_SIGNATURES: &[ExploitSignature] = &[
    ExploitSignature {
        pattern: "OpenSSH_7",
        cve_id: "CVE-2018-15473",
        severity: Severity::High,
    },
    ExploitSignature {
        pattern: "Apache/2.2",
        cve_id: "CVE-2017-5638",
        severity: Severity::Critical,
    },
    ExploitSignature {
        pattern: "vsftpd 2.3.4",
        cve_id: "CVE-2011-2523",
        severity: Severity::Critical,
    },
];

pub const OS_HINTS: &[OsHint] = &[
    OsHint {
        pattern: "Ubuntu",
        os_name: "Linux",
    },
    OsHint {
        pattern: "Debian",
        os_name: "Linux",
    },
    OsHint {
        pattern: "Microsoft",
        os_name: "Windows",
    },
    OsHint {
        pattern: "IIS",
        os_name: "Windows",
    },
];

pub const UNKNOWN_OS: &str = "unknown";

/// Return the first signature whose pattern is a case-sensitive substring of `banner`.
pub fn match_exploit(banner: &str) -> Option<&'static ExploitSignature> {
    match_exploit_in(EXPLOIT_SIGNATURES, banner)
}

/// [`match_exploit`] against an arbitrary ordered table.
pub fn match_exploit_in<'a>(
    table: &'a [ExploitSignature],
    banner: &str,
) -> Option<&'a ExploitSignature> {
    table.iter().find(|sig| banner.contains(sig.pattern))
}

/// Guess the operating system from every banner collected in a session.
///
/// Banners are joined and searched case-insensitively for each hint in table
/// order. Returns [`UNKNOWN_OS`] when nothing matches.
pub fn infer_os<'a, I>(banners: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    infer_os_in(OS_HINTS, banners).unwrap_or(UNKNOWN_OS)
}

/// [`infer_os`] against an arbitrary ordered table; `None` when nothing matches.
pub fn infer_os_in<'t, 'a, I>(table: &'t [OsHint], banners: I) -> Option<&'t str>
where
    I: IntoIterator<Item = &'a str>,
{
    let combined = banners
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    table
        .iter()
        .find(|hint| combined.contains(&hint.pattern.to_lowercase()))
        .map(|hint| hint.os_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apache_22_is_critical() {
        let sig = match_exploit("Apache/2.2.3 Server (100% confidence)").unwrap();
        assert_eq!(sig.cve_id, "CVE-2017-5638");
        assert_eq!(sig.severity, Severity::Critical);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(match_exploit("apache/2.2.3").is_none());
        assert!(match_exploit("220 (vsFTPd 2.3.4)").is_none());
        assert!(match_exploit("220 vsftpd 2.3.4 ready").is_some());
    }

    #[test]
    fn first_match_wins_in_table_order() {
        let banner = "OpenSSH_7.4 behind Apache/2.2.15";
        assert_eq!(match_exploit(banner).unwrap().cve_id, "CVE-2018-15473");

        let reversed: Vec<ExploitSignature> = EXPLOIT_SIGNATURES.iter().rev().copied().collect();
        assert_eq!(
            match_exploit_in(&reversed, banner).unwrap().cve_id,
            "CVE-2017-5638"
        );
    }

    #[test]
    fn matching_is_deterministic() {
        let banner = "SSH-2.0-OpenSSH_7.2p2 Ubuntu";
        assert_eq!(match_exploit(banner), match_exploit(banner));
    }

    #[test]
    fn os_inference_is_case_insensitive() {
        let banners = ["SSH-2.0-OpenSSH_8.2p1 ubuntu-4", "nginx"];
        assert_eq!(infer_os(banners), "Linux");
    }

    #[test]
    fn os_inference_follows_table_order() {
        let banners = ["Microsoft-IIS/10.0", "OpenSSH Debian"];
        assert_eq!(infer_os(banners), "Linux");
    }

    #[test]
    fn os_inference_defaults_to_unknown() {
        assert_eq!(infer_os(["nginx/1.18"]), UNKNOWN_OS);
        assert_eq!(infer_os(std::iter::empty()), UNKNOWN_OS);
    }
}
