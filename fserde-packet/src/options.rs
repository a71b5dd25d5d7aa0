//! Layer option lists
//!
//! Options arrive as the raw text between a layer's parentheses,
//! `key=value, key=value`. Keys are case-insensitive. Values are lower-cased
//! unless they are quoted, in which case the quotes are stripped and the case
//! is kept.

use fserde_core::{Error, MacAddr, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// One `key=value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOption {
    pub key: String,
    pub value: String,
}

/// Split an option list into `key=value` pairs.
///
/// Commas inside quotes do not split. Empty pieces are skipped; a non-empty
/// piece without `=` is a malformed frame string.
pub fn parse_options(layer: &str, options: &str) -> Result<Vec<LayerOption>> {
    split_top_level(options, ',')
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            let (key, value) = piece.split_once('=').ok_or_else(|| {
                Error::malformed(format!("{}: option '{}' is not key=value", layer, piece))
            })?;
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return Err(Error::malformed(format!(
                    "{}: option '{}' has an empty key",
                    layer, piece
                )));
            }
            let value = value.trim();
            let value = match unquote(value) {
                Some(literal) => literal.to_string(),
                None => value.to_lowercase(),
            };
            Ok(LayerOption { key, value })
        })
        .collect()
}

/// Split on `sep` outside of quotes and `{}` groups, trimming each piece
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                pieces.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(text[start..].trim());
    pieces
}

/// Strip matching single or double quotes
pub fn unquote(value: &str) -> Option<&str> {
    ['\'', '"'].iter().find_map(|q| {
        value
            .strip_prefix(*q)
            .and_then(|rest| rest.strip_suffix(*q))
    })
}

/// Parse an unsigned number with optional `0x`, `0o` or `0b` prefix
pub fn parse_number<T>(layer: &str, key: &str, value: &str) -> Result<T>
where
    T: TryFrom<u64>,
{
    let value = value.trim();
    let parsed = if let Some(hex) = value.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(oct) = value.strip_prefix("0o") {
        u64::from_str_radix(oct, 8)
    } else if let Some(bin) = value.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        value.parse::<u64>()
    };

    let number = parsed.map_err(|_| {
        Error::invalid_option(layer, key, format!("'{}' is not a number", value))
    })?;
    T::try_from(number)
        .map_err(|_| Error::invalid_option(layer, key, format!("value {} out of range", number)))
}

/// Parse a number that must fit in `bits` bits
pub fn parse_bits(layer: &str, key: &str, value: &str, bits: u32) -> Result<u32> {
    let number: u32 = parse_number(layer, key, value)?;
    if bits < 32 && number >> bits != 0 {
        return Err(Error::invalid_option(
            layer,
            key,
            format!("value {} does not fit in {} bits", number, bits),
        ));
    }
    Ok(number)
}

/// Parse an on/off style boolean
pub fn parse_bool(layer: &str, key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "on" | "yes" | "true" | "enable" | "enabled" => Ok(true),
        "0" | "off" | "no" | "false" | "disable" | "disabled" => Ok(false),
        other => Err(Error::invalid_option(
            layer,
            key,
            format!("'{}' is not a boolean", other),
        )),
    }
}

pub fn parse_mac(layer: &str, key: &str, value: &str) -> Result<MacAddr> {
    MacAddr::from_str(value).map_err(|_| {
        Error::invalid_option(layer, key, format!("'{}' is not a MAC address", value))
    })
}

pub fn parse_ipv4(layer: &str, key: &str, value: &str) -> Result<Ipv4Addr> {
    Ipv4Addr::from_str(value.trim()).map_err(|_| {
        Error::invalid_option(layer, key, format!("'{}' is not an IPv4 address", value))
    })
}

pub fn parse_ipv6(layer: &str, key: &str, value: &str) -> Result<Ipv6Addr> {
    Ipv6Addr::from_str(value.trim()).map_err(|_| {
        Error::invalid_option(layer, key, format!("'{}' is not an IPv6 address", value))
    })
}

/// Error for a key that a strict layer does not accept
pub fn unknown_key(layer: &str, key: &str) -> Error {
    Error::invalid_option(layer, key, "unknown option")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(options: &[LayerOption]) -> Vec<(&str, &str)> {
        options
            .iter()
            .map(|o| (o.key.as_str(), o.value.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_options_basic() {
        let opts = parse_options("UDP", " SPort = 1111 , dport=0x0D05,Checksum=ON").unwrap();
        assert_eq!(
            pairs(&opts),
            vec![("sport", "1111"), ("dport", "0x0d05"), ("checksum", "on")]
        );
    }

    #[test]
    fn test_parse_options_empty_and_trailing() {
        assert!(parse_options("Ether", "").unwrap().is_empty());
        assert!(parse_options("Ether", "  ").unwrap().is_empty());
        assert_eq!(parse_options("Ether", "proto=1,").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_options_quoted_keeps_case_and_commas() {
        let opts = parse_options("Payload", "string='Hello, World',size=12").unwrap();
        assert_eq!(pairs(&opts), vec![("string", "Hello, World"), ("size", "12")]);
    }

    #[test]
    fn test_parse_options_value_with_equals() {
        let opts = parse_options("Payload", "string=\"a=b\"").unwrap();
        assert_eq!(pairs(&opts), vec![("string", "a=b")]);
    }

    #[test]
    fn test_parse_options_missing_equals() {
        let err = parse_options("UDP", "sport").unwrap_err();
        assert!(matches!(err, Error::MalformedFrameString(_)));
        assert!(parse_options("UDP", "=5").is_err());
    }

    #[test]
    fn test_split_top_level_braces() {
        let pieces = split_top_level("Dot1q{vlan=1, pcp=2}, Dot1q{vlan=3}", ',');
        assert_eq!(pieces, vec!["Dot1q{vlan=1, pcp=2}", "Dot1q{vlan=3}"]);
    }

    #[test]
    fn test_parse_number_radixes() {
        assert_eq!(parse_number::<u16>("x", "k", "0x800").unwrap(), 0x800);
        assert_eq!(parse_number::<u16>("x", "k", "2048").unwrap(), 2048);
        assert_eq!(parse_number::<u8>("x", "k", "0b101").unwrap(), 5);
        assert_eq!(parse_number::<u8>("x", "k", "0o17").unwrap(), 15);
    }

    #[test]
    fn test_parse_number_errors() {
        assert!(parse_number::<u8>("x", "k", "256").is_err());
        assert!(parse_number::<u16>("x", "k", "abc").is_err());
        assert!(parse_number::<u16>("x", "k", "-1").is_err());
        assert!(parse_number::<u16>("x", "k", "").is_err());
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("Dot1Q", "vid", "4095", 12).unwrap(), 4095);
        assert!(parse_bits("Dot1Q", "vid", "4096", 12).is_err());
        assert!(parse_bits("Dot1Q", "pcp", "8", 3).is_err());
    }

    #[test]
    fn test_parse_bool_synonyms() {
        for v in ["1", "on", "yes", "true", "enable", "enabled"] {
            assert!(parse_bool("UDP", "checksum", v).unwrap());
        }
        for v in ["0", "off", "no", "false", "disable", "disabled"] {
            assert!(!parse_bool("UDP", "checksum", v).unwrap());
        }
        assert!(parse_bool("UDP", "checksum", "maybe").is_err());
    }

    #[test]
    fn test_parse_addresses() {
        assert_eq!(
            parse_ipv4("IPv4", "src", "10.0.0.2").unwrap(),
            Ipv4Addr::new(10, 0, 0, 2)
        );
        assert!(parse_ipv4("IPv4", "src", "10.0.0").is_err());
        assert!(parse_ipv6("IPv6", "dst", "2001:db8::1").is_ok());
        assert!(parse_mac("Ether", "dst", "00:11:22:33:44:55").is_ok());
        assert!(matches!(
            parse_mac("Ether", "dst", "bogus").unwrap_err(),
            Error::InvalidOption { .. }
        ));
    }
}
