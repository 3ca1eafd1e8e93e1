//! Client-side handshake negotiation.
//!
//! The client opens with the 4-byte magic preamble followed by four 4-byte
//! version proposals, most preferred first. Each proposal is laid out
//! big-endian as `00 RR MN MJ`: a reserved zero byte, a minor-version
//! range (Bolt 4.3+), the minor, and the major. The server answers with a
//! single 4-byte version in the same layout, or all zeros when nothing
//! overlaps, which closes the connection.

use super::version::BoltVersion;
use super::{BOLT_MAGIC, HANDSHAKE_REPLY_SIZE, HANDSHAKE_SIZE};
use crate::bolt::error::HandshakeError;

/// One version proposal slot: `major.minor` and how many consecutive
/// earlier minors of the same major are also acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProposal {
    /// Major version
    pub major: u8,
    /// Highest minor version offered
    pub minor: u8,
    /// How many consecutive earlier minors are also acceptable
    pub range: u8,
}

impl VersionProposal {
    /// Proposal for a single exact version.
    pub const fn exact(major: u8, minor: u8) -> Self {
        Self {
            major,
            minor,
            range: 0,
        }
    }

    /// Proposal covering `major.minor` down to `major.(minor - range)`.
    pub const fn down_to(major: u8, minor: u8, range: u8) -> Self {
        Self {
            major,
            minor,
            range,
        }
    }

    /// Wire layout `00 RR MN MJ`.
    pub fn to_bytes(self) -> [u8; 4] {
        [0, self.range, self.minor, self.major]
    }
}

/// The four proposals this client sends, covering every supported version:
/// 5.0-5.4, then 4.3-4.4 (the `patch_bolt` generation), then 4.0-4.2,
/// then 3.0.
pub const PROPOSALS: [VersionProposal; 4] = [
    VersionProposal::down_to(5, 4, 4),
    VersionProposal::down_to(4, 4, 1),
    VersionProposal::down_to(4, 2, 2),
    VersionProposal::exact(3, 0),
];

/// Build the 20-byte client handshake: magic plus four proposals.
pub fn build_handshake() -> [u8; HANDSHAKE_SIZE] {
    let mut buf = [0u8; HANDSHAKE_SIZE];
    buf[0..4].copy_from_slice(&BOLT_MAGIC);
    for (i, proposal) in PROPOSALS.iter().enumerate() {
        let offset = 4 + i * 4;
        buf[offset..offset + 4].copy_from_slice(&proposal.to_bytes());
    }
    buf
}

/// Parse the server's 4-byte version choice.
///
/// All zeros means the server supports none of the proposals. A version
/// outside this client's table is also a handshake failure; the server
/// must pick from what was proposed.
pub fn parse_server_choice(
    reply: [u8; HANDSHAKE_REPLY_SIZE],
) -> Result<BoltVersion, HandshakeError> {
    let major = reply[3];
    let minor = reply[2];

    if major == 0 && minor == 0 {
        return Err(HandshakeError::NoCompatibleVersion);
    }

    BoltVersion::from_parts(major, minor)
        .ok_or(HandshakeError::UnsupportedVersion { major, minor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_starts_with_magic() {
        let buf = build_handshake();
        assert_eq!(&buf[0..4], &[0x60, 0x60, 0xB0, 0x17]);
    }

    #[test]
    fn proposal_layout_is_range_minor_major() {
        let buf = build_handshake();
        // First slot: 5.4 with range 4
        assert_eq!(&buf[4..8], &[0x00, 0x04, 0x04, 0x05]);
        // Second slot: 4.4 with range 1
        assert_eq!(&buf[8..12], &[0x00, 0x01, 0x04, 0x04]);
        // Third slot: 4.2 with range 2
        assert_eq!(&buf[12..16], &[0x00, 0x02, 0x02, 0x04]);
        // Fourth slot: 3.0 exact
        assert_eq!(&buf[16..20], &[0x00, 0x00, 0x00, 0x03]);
    }

    #[test]
    fn proposals_cover_all_supported_versions() {
        for version in BoltVersion::ALL {
            let covered = PROPOSALS.iter().any(|p| {
                p.major == version.major()
                    && version.minor() <= p.minor
                    && version.minor() >= p.minor.saturating_sub(p.range)
            });
            assert!(covered, "{} is not covered by any proposal", version);
        }
    }

    #[test]
    fn server_choice_parses() {
        assert_eq!(
            parse_server_choice([0, 0, 4, 4]).unwrap(),
            BoltVersion::V4_4
        );
        assert_eq!(
            parse_server_choice([0, 0, 0, 5]).unwrap(),
            BoltVersion::V5_0
        );
        assert_eq!(
            parse_server_choice([0, 0, 0, 3]).unwrap(),
            BoltVersion::V3_0
        );
    }

    #[test]
    fn zero_reply_is_no_compatible_version() {
        assert_eq!(
            parse_server_choice([0, 0, 0, 0]).unwrap_err(),
            HandshakeError::NoCompatibleVersion
        );
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert_eq!(
            parse_server_choice([0, 0, 0, 2]).unwrap_err(),
            HandshakeError::UnsupportedVersion { major: 2, minor: 0 }
        );
        assert_eq!(
            parse_server_choice([0, 0, 9, 5]).unwrap_err(),
            HandshakeError::UnsupportedVersion { major: 5, minor: 9 }
        );
    }
}
