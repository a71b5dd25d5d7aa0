//! Layers that steer frame construction and emit no bytes

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::parse_number;
use fserde_core::{Error, Result};
use std::fmt;

/// `Count(n)`: how many copies of the frame capture output receives
///
/// Zero means unset; the effective count is then 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountLayer {
    pub count: u32,
}

impl CountLayer {
    pub const DEFAULT_COUNT: u32 = 1;

    /// Count used when emitting the frame
    pub fn effective(&self) -> u32 {
        if self.count == 0 {
            Self::DEFAULT_COUNT
        } else {
            self.count
        }
    }
}

impl LayerCodec for CountLayer {
    const KIND: LayerKind = LayerKind::Count;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        let value = options.trim();
        if value.is_empty() {
            return Ok(());
        }

        let count: u32 = parse_number(name, "count", value)?;
        if count == 0 {
            return Err(Error::invalid_option(name, "count", "count must be positive"));
        }
        self.count = count;
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.count == 0 {
            self.count = defaults.count;
        }
    }

    fn apply_builtin_defaults(&mut self) {
        self.count = self.effective();
    }

    fn header_len(&self) -> usize {
        0
    }

    fn write(&self, _buf: &mut FrameBuffer) -> Result<()> {
        Ok(())
    }
}

impl fmt::Display for CountLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Count({})", self.effective())
    }
}

/// `Defaults(name)`: links the frame to a registered defaults template
///
/// The name is resolved against the registry while the frame is parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultsLayer {
    pub name: String,
}

impl LayerCodec for DefaultsLayer {
    const KIND: LayerKind = LayerKind::Defaults;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = options.trim();
        if name.is_empty() {
            return Err(Error::malformed("Defaults() requires a frame name"));
        }
        self.name = name.to_string();
        Ok(())
    }

    fn apply_defaults(&mut self, _defaults: &Self) {}

    fn header_len(&self) -> usize {
        0
    }

    fn write(&self, _buf: &mut FrameBuffer) -> Result<()> {
        Ok(())
    }
}

impl fmt::Display for DefaultsLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Defaults({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_parse() {
        let mut count = CountLayer::default();
        count.parse(" 2 ").unwrap();
        assert_eq!(count.effective(), 2);
        assert_eq!(count.to_string(), "Count(2)");
    }

    #[test]
    fn test_count_unset_is_one() {
        let mut count = CountLayer::default();
        count.parse("").unwrap();
        assert_eq!(count.count, 0);
        assert_eq!(count.effective(), 1);
    }

    #[test]
    fn test_count_rejects_zero_and_text() {
        let mut count = CountLayer::default();
        assert!(matches!(
            count.parse("0").unwrap_err(),
            Error::InvalidOption { .. }
        ));
        assert!(count.parse("many").is_err());
    }

    #[test]
    fn test_count_defaults_only_when_unset() {
        let template = CountLayer { count: 5 };

        let mut count = CountLayer::default();
        count.apply_defaults(&template);
        assert_eq!(count.effective(), 5);

        let mut count = CountLayer { count: 2 };
        count.apply_defaults(&template);
        assert_eq!(count.effective(), 2);
    }

    #[test]
    fn test_defaults_name_keeps_case() {
        let mut layer = DefaultsLayer::default();
        layer.parse(" Defaults-0 ").unwrap();
        assert_eq!(layer.name, "Defaults-0");
        assert!(layer.parse("").is_err());
    }
}
