//! Wire frame parsing for the TCP ingress protocol: `HEARTBEAT`, or a
//! case-insensitive `KIND:VALUE` line, with `KIND` defaulting to `RFID`
//! when no colon is present.

use crate::domain::CredentialKind;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Heartbeat,
    Scan { kind: CredentialKind, value: String },
    Invalid,
}

pub fn parse_frame(raw: &str) -> Frame {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Frame::Invalid;
    }
    if trimmed.eq_ignore_ascii_case("HEARTBEAT") || trimmed.contains("KeepAlive") {
        return Frame::Heartbeat;
    }

    match trimmed.split_once(':') {
        Some((kind_str, value)) => match CredentialKind::from_str(kind_str) {
            Ok(kind) => {
                let value = value.trim();
                if value.is_empty() {
                    Frame::Invalid
                } else {
                    Frame::Scan {
                        kind,
                        value: value.to_string(),
                    }
                }
            }
            Err(_) => Frame::Invalid,
        },
        None => Frame::Scan {
            kind: CredentialKind::Rfid,
            value: trimmed.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_token_is_case_insensitive() {
        assert_eq!(parse_frame("HEARTBEAT"), Frame::Heartbeat);
        assert_eq!(parse_frame("heartbeat"), Frame::Heartbeat);
        assert_eq!(parse_frame("  HeartBeat  "), Frame::Heartbeat);
    }

    #[test]
    fn frame_containing_keepalive_substring_is_heartbeat() {
        assert_eq!(parse_frame("DEVICE-KeepAlive-PING"), Frame::Heartbeat);
        assert_eq!(parse_frame("KeepAlive"), Frame::Heartbeat);
        // lowercase "keepalive" is a different literal substring, not matched.
        assert_eq!(
            parse_frame("keepalive"),
            Frame::Scan {
                kind: CredentialKind::Rfid,
                value: "keepalive".to_string(),
            }
        );
    }

    #[test]
    fn missing_colon_defaults_to_rfid() {
        assert_eq!(
            parse_frame("E2801160"),
            Frame::Scan {
                kind: CredentialKind::Rfid,
                value: "E2801160".to_string(),
            }
        );
    }

    #[test]
    fn kind_prefix_is_case_insensitive() {
        assert_eq!(
            parse_frame("lpr:BG-123-AA"),
            Frame::Scan {
                kind: CredentialKind::Lpr,
                value: "BG-123-AA".to_string(),
            }
        );
    }

    #[test]
    fn unknown_kind_prefix_is_invalid() {
        assert_eq!(parse_frame("BADGE:XYZ"), Frame::Invalid);
    }

    #[test]
    fn whitespace_is_trimmed_from_both_sides() {
        assert_eq!(
            parse_frame("  QR:TICKET-9001  "),
            Frame::Scan {
                kind: CredentialKind::Qr,
                value: "TICKET-9001".to_string(),
            }
        );
    }

    #[test]
    fn empty_line_is_invalid() {
        assert_eq!(parse_frame(""), Frame::Invalid);
        assert_eq!(parse_frame("   "), Frame::Invalid);
    }

    #[test]
    fn colon_with_empty_payload_is_invalid() {
        assert_eq!(parse_frame("RFID:"), Frame::Invalid);
    }
}
