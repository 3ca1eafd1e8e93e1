//! Bolt protocol version definitions.

use std::fmt;

/// Bolt protocol versions supported by this client.
///
/// Versions are stored as `0x00MM_00mm` (major in the high half-word,
/// minor in the low), which keeps numeric ordering aligned with protocol
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum BoltVersion {
    /// Bolt 3.0 - RUN/BEGIN with metadata maps, PULL_ALL/DISCARD_ALL
    V3_0 = 0x0003_0000,
    /// Bolt 4.0 - PULL/DISCARD with flow control (`n`, `qid`), multi-database
    V4_0 = 0x0004_0000,
    /// Bolt 4.1 - routing context in HELLO
    V4_1 = 0x0004_0001,
    /// Bolt 4.2
    V4_2 = 0x0004_0002,
    /// Bolt 4.3 - ROUTE message, `patch_bolt` negotiation
    V4_3 = 0x0004_0003,
    /// Bolt 4.4 - ROUTE extra map, impersonation
    V4_4 = 0x0004_0004,
    /// Bolt 5.0 - element IDs, UTC datetimes by default
    V5_0 = 0x0005_0000,
    /// Bolt 5.1 - LOGON/LOGOFF session authentication
    V5_1 = 0x0005_0001,
    /// Bolt 5.2 - notification filtering
    V5_2 = 0x0005_0002,
    /// Bolt 5.3 - bolt agent metadata
    V5_3 = 0x0005_0003,
    /// Bolt 5.4 - TELEMETRY
    V5_4 = 0x0005_0004,
}

impl BoltVersion {
    /// All supported versions, newest first.
    pub const ALL: [BoltVersion; 11] = [
        BoltVersion::V5_4,
        BoltVersion::V5_3,
        BoltVersion::V5_2,
        BoltVersion::V5_1,
        BoltVersion::V5_0,
        BoltVersion::V4_4,
        BoltVersion::V4_3,
        BoltVersion::V4_2,
        BoltVersion::V4_1,
        BoltVersion::V4_0,
        BoltVersion::V3_0,
    ];

    /// Look up a version by protocol (major, minor) pair.
    pub fn from_parts(major: u8, minor: u8) -> Option<Self> {
        match (major, minor) {
            (3, 0) => Some(BoltVersion::V3_0),
            (4, 0) => Some(BoltVersion::V4_0),
            (4, 1) => Some(BoltVersion::V4_1),
            (4, 2) => Some(BoltVersion::V4_2),
            (4, 3) => Some(BoltVersion::V4_3),
            (4, 4) => Some(BoltVersion::V4_4),
            (5, 0) => Some(BoltVersion::V5_0),
            (5, 1) => Some(BoltVersion::V5_1),
            (5, 2) => Some(BoltVersion::V5_2),
            (5, 3) => Some(BoltVersion::V5_3),
            (5, 4) => Some(BoltVersion::V5_4),
            _ => None,
        }
    }

    /// Protocol major version.
    pub fn major(self) -> u8 {
        ((self as u32) >> 16) as u8
    }

    /// Protocol minor version.
    pub fn minor(self) -> u8 {
        ((self as u32) & 0xFF) as u8
    }

    /// Whether this version carries an `extra` map on PULL/DISCARD.
    /// Bolt 3 used bare PULL_ALL/DISCARD_ALL instead.
    pub fn has_pull_extra(self) -> bool {
        self.major() >= 4
    }

    /// Whether the ROUTE message exists (Bolt 4.3+).
    pub fn supports_route(self) -> bool {
        self >= BoltVersion::V4_3
    }

    /// Whether ROUTE takes an extra map with `db`/`imp_user` (Bolt 4.4+).
    pub fn supports_route_extra(self) -> bool {
        self >= BoltVersion::V4_4
    }

    /// Whether impersonation (`imp_user`) is understood (Bolt 4.4+).
    pub fn supports_impersonation(self) -> bool {
        self >= BoltVersion::V4_4
    }

    /// Whether nodes and relationships carry element ID strings (Bolt 5.0+).
    pub fn has_element_ids(self) -> bool {
        self.major() >= 5
    }

    /// Whether authentication moves to a separate LOGON exchange (Bolt 5.1+).
    pub fn supports_logon(self) -> bool {
        self >= BoltVersion::V5_1
    }

    /// Whether TELEMETRY is understood (Bolt 5.4+).
    pub fn supports_telemetry(self) -> bool {
        self >= BoltVersion::V5_4
    }

    /// Whether the `utc` patch can be negotiated via `patch_bolt`.
    /// Only 4.3 and 4.4 understand the patch; 5.0+ uses UTC by default.
    pub fn supports_utc_patch(self) -> bool {
        matches!(self, BoltVersion::V4_3 | BoltVersion::V4_4)
    }

    /// Whether UTC datetime structs are the default (Bolt 5.0+).
    pub fn utc_by_default(self) -> bool {
        self.major() >= 5
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_roundtrip() {
        for version in BoltVersion::ALL {
            assert_eq!(
                BoltVersion::from_parts(version.major(), version.minor()),
                Some(version)
            );
        }
        assert_eq!(BoltVersion::from_parts(2, 0), None);
        assert_eq!(BoltVersion::from_parts(0, 0), None);
        assert_eq!(BoltVersion::from_parts(5, 9), None);
    }

    #[test]
    fn ordering_follows_protocol() {
        assert!(BoltVersion::V5_4 > BoltVersion::V5_0);
        assert!(BoltVersion::V5_0 > BoltVersion::V4_4);
        assert!(BoltVersion::V4_3 > BoltVersion::V4_2);
        assert!(BoltVersion::V4_0 > BoltVersion::V3_0);
    }

    #[test]
    fn display() {
        assert_eq!(BoltVersion::V3_0.to_string(), "3.0");
        assert_eq!(BoltVersion::V4_4.to_string(), "4.4");
        assert_eq!(BoltVersion::V5_1.to_string(), "5.1");
    }

    #[test]
    fn feature_gates() {
        assert!(!BoltVersion::V4_2.supports_route());
        assert!(BoltVersion::V4_3.supports_route());
        assert!(!BoltVersion::V4_3.supports_route_extra());
        assert!(BoltVersion::V4_4.supports_route_extra());

        assert!(!BoltVersion::V4_4.has_element_ids());
        assert!(BoltVersion::V5_0.has_element_ids());

        assert!(!BoltVersion::V5_0.supports_logon());
        assert!(BoltVersion::V5_1.supports_logon());

        assert!(!BoltVersion::V5_3.supports_telemetry());
        assert!(BoltVersion::V5_4.supports_telemetry());

        assert!(!BoltVersion::V3_0.has_pull_extra());
        assert!(BoltVersion::V4_0.has_pull_extra());
    }

    #[test]
    fn utc_negotiation_gates() {
        assert!(!BoltVersion::V4_2.supports_utc_patch());
        assert!(BoltVersion::V4_3.supports_utc_patch());
        assert!(BoltVersion::V4_4.supports_utc_patch());
        assert!(!BoltVersion::V5_0.supports_utc_patch());

        assert!(!BoltVersion::V4_4.utc_by_default());
        assert!(BoltVersion::V5_0.utc_by_default());
    }
}
