use exposure_scan::ports::{parse_port_range, service_guess};

#[test]
fn parse_range_and_single_port() {
    assert_eq!(parse_port_range("1-1000").expect("parse ok"), (1, 1000));
    assert_eq!(parse_port_range("8080").expect("parse ok"), (8080, 8080));
    assert_eq!(parse_port_range("65535-65535").expect("parse ok"), (65535, 65535));
}

#[test]
fn invalid_range_rejected() {
    assert!(parse_port_range("0").is_err());
    assert!(parse_port_range("1-65536").is_err());
    assert!(parse_port_range("10-1").is_err());
}

#[test]
fn common_services() {
    assert_eq!(service_guess(21), Some("ftp"));
    assert_eq!(service_guess(445), Some("smb"));
    assert_eq!(service_guess(3389), Some("rdp"));
    assert_eq!(service_guess(1), None);
}
