//! PackStream marker bytes.
//!
//! Every PackStream value starts with a marker byte. Small integers,
//! strings, lists, maps and structures fold their size into the marker
//! itself; everything else carries an explicit big-endian length prefix.

/// Null marker
pub const NULL: u8 = 0xC0;

/// Float marker (64-bit IEEE 754, big-endian)
pub const FLOAT_64: u8 = 0xC1;

/// Boolean markers
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

/// Integer markers for values outside the tiny range
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// Byte array markers
pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

/// String markers. Strings of 0-15 bytes use 0x80-0x8F.
pub const TINY_STRING: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

/// List markers. Lists of 0-15 items use 0x90-0x9F.
pub const TINY_LIST: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Map markers. Maps of 0-15 entries use 0xA0-0xAF.
pub const TINY_MAP: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structure marker. Structures carry 0-15 fields plus a one-byte tag.
pub const TINY_STRUCT: u8 = 0xB0;

/// Largest size that fits into a tiny marker nibble.
pub const TINY_SIZE_MAX: usize = 15;

/// Tiny integer bounds. Tiny ints are encoded as the value itself:
/// 0x00-0x7F for 0..=127 and 0xF0-0xFF for -16..=-1.
pub const TINY_INT_MIN: i64 = -16;
pub const TINY_INT_MAX: i64 = 127;

/// Structure tags for graph entities.
pub const TAG_NODE: u8 = b'N'; // 0x4E
pub const TAG_RELATIONSHIP: u8 = b'R'; // 0x52
pub const TAG_UNBOUND_RELATIONSHIP: u8 = b'r'; // 0x72
pub const TAG_PATH: u8 = b'P'; // 0x50

/// Structure tags for temporal values.
pub const TAG_DATE: u8 = b'D'; // 0x44
pub const TAG_TIME: u8 = b'T'; // 0x54
pub const TAG_LOCAL_TIME: u8 = b't'; // 0x74
pub const TAG_LOCAL_DATE_TIME: u8 = b'd'; // 0x64
pub const TAG_DATE_TIME_LEGACY: u8 = b'F'; // 0x46, local seconds + offset
pub const TAG_DATE_TIME_ZONE_LEGACY: u8 = b'f'; // 0x66, local seconds + zone name
pub const TAG_DATE_TIME_UTC: u8 = b'I'; // 0x49, utc seconds + offset
pub const TAG_DATE_TIME_ZONE_UTC: u8 = b'i'; // 0x69, utc seconds + zone name
pub const TAG_DURATION: u8 = b'E'; // 0x45

/// Structure tags for spatial values.
pub const TAG_POINT_2D: u8 = b'X'; // 0x58
pub const TAG_POINT_3D: u8 = b'Y'; // 0x59

/// Whether an integer fits into a single tiny-int byte.
#[inline]
pub fn fits_tiny_int(value: i64) -> bool {
    (TINY_INT_MIN..=TINY_INT_MAX).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_int_bounds() {
        assert!(fits_tiny_int(0));
        assert!(fits_tiny_int(127));
        assert!(fits_tiny_int(-16));
        assert!(!fits_tiny_int(128));
        assert!(!fits_tiny_int(-17));
    }

    #[test]
    fn tag_bytes_match_wire_values() {
        assert_eq!(TAG_NODE, 0x4E);
        assert_eq!(TAG_RELATIONSHIP, 0x52);
        assert_eq!(TAG_UNBOUND_RELATIONSHIP, 0x72);
        assert_eq!(TAG_PATH, 0x50);
        assert_eq!(TAG_DATE_TIME_LEGACY, 0x46);
        assert_eq!(TAG_DATE_TIME_ZONE_LEGACY, 0x66);
        assert_eq!(TAG_DATE_TIME_UTC, 0x49);
        assert_eq!(TAG_DATE_TIME_ZONE_UTC, 0x69);
        assert_eq!(TAG_POINT_2D, 0x58);
        assert_eq!(TAG_POINT_3D, 0x59);
    }

    #[test]
    fn marker_ranges_do_not_overlap() {
        assert!(TINY_STRING < TINY_LIST);
        assert!(TINY_LIST < TINY_MAP);
        assert!(TINY_MAP < TINY_STRUCT);
        assert!(TINY_STRUCT < NULL);
    }
}
