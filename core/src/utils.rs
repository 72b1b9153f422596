use std::fmt;

use bincode::config::{Configuration, Limit, LittleEndian, Varint};
use num_enum::TryFromPrimitive;

use crate::constants::MAX_OSMB_BLOCK;

/// bincode settings for everything this crate writes.
pub fn bincode_config() -> Configuration {
    bincode::config::standard()
}

/// Same wire layout as `bincode_config`, but no length prefix may claim
/// more than `MAX_OSMB_BLOCK` bytes while decoding.
pub fn bincode_decode_config() -> Configuration<LittleEndian, Varint, Limit<MAX_OSMB_BLOCK>> {
    bincode::config::standard().with_limit::<MAX_OSMB_BLOCK>()
}

pub fn compute_checksum(data: &[u8]) -> u32 {
    use crc32fast::Hasher;
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

/// Number of decimal digits needed to print `n` (at least 1).
pub fn decimal_width(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

/// Split `scheme://rest` and return the scheme, if any.
pub fn url_scheme(location: &str) -> Option<&str> {
    let (scheme, _) = location.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(decimal_width(0), 1);
        assert_eq!(decimal_width(9), 1);
        assert_eq!(decimal_width(10), 2);
        assert_eq!(decimal_width(2001), 4);
    }

    #[test]
    fn schemes() {
        assert_eq!(url_scheme("https://example.com/a.opl"), Some("https"));
        assert_eq!(url_scheme("data/a.opl"), None);
        assert_eq!(url_scheme("://x"), None);
        assert_eq!(url_scheme("we ird://x"), None);
    }

    #[test]
    fn crc_is_stable() {
        assert_eq!(compute_checksum(b"123456789"), 0xCBF4_3926);
    }
}
