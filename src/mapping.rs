//! Value mappings and number formatting for decoded fields

use crate::error::{DecodeError, Result};

/// A rule translating a raw numeric value into a label
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mapping {
    /// Exactly one value
    Mono {
        /// Matched value
        value: u64,
        /// Label reported on match
        label: String,
    },
    /// An inclusive range of values
    Range {
        /// Lowest matched value
        min: u64,
        /// Highest matched value
        max: u64,
        /// Label reported on match
        label: String,
    },
}

impl Mapping {
    /// Map a single value
    pub fn mono(value: u64, label: impl Into<String>) -> Self {
        Mapping::Mono {
            value,
            label: label.into(),
        }
    }

    /// Map the inclusive range `[min, max]`
    pub fn range(min: u64, max: u64, label: impl Into<String>) -> Self {
        Mapping::Range {
            min,
            max,
            label: label.into(),
        }
    }

    /// Label if `value` matches this rule
    pub fn matches(&self, value: u64) -> Option<&str> {
        match self {
            Mapping::Mono { value: v, label } if *v == value => Some(label),
            Mapping::Range { min, max, label } if (*min..=*max).contains(&value) => Some(label),
            _ => None,
        }
    }

    fn verify(&self) -> Result<()> {
        if let Mapping::Range { min, max, label } = self {
            if min > max {
                return Err(DecodeError::malformed_template(format!(
                    "mapping '{}' has inverted range [{}, {}]",
                    label, min, max
                )));
            }
        }
        Ok(())
    }
}

/// An ordered list of mappings; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ValueMappings(Vec<Mapping>);

impl ValueMappings {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    pub fn push(&mut self, mapping: Mapping) {
        self.0.push(mapping);
    }

    /// Builder-style append of a mono mapping
    pub fn with(mut self, value: u64, label: impl Into<String>) -> Self {
        self.0.push(Mapping::mono(value, label));
        self
    }

    /// Builder-style append of a range mapping
    pub fn with_range(mut self, min: u64, max: u64, label: impl Into<String>) -> Self {
        self.0.push(Mapping::range(min, max, label));
        self
    }

    /// Resolve the label for `value`
    pub fn resolve(&self, value: u64) -> Option<&str> {
        self.0.iter().find_map(|m| m.matches(value))
    }

    /// Whether the table holds no rules
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check every rule
    pub fn verify(&self) -> Result<()> {
        self.0.iter().try_for_each(Mapping::verify)
    }
}

impl FromIterator<Mapping> for ValueMappings {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        ValueMappings(iter.into_iter().collect())
    }
}

/// Format `value` with a printf-style format string
///
/// Supported conversions are `%d`, `%u`, `%x`, `%X`, `%o` and `%b`, each with
/// an optional zero-padded width such as `%04X`, plus `%%`. Text around the
/// conversion is copied as is. An unknown conversion is copied verbatim.
pub fn format_number(format: &str, value: u64) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut directive = String::from("%");
        let zero_pad = chars.peek() == Some(&'0');
        if zero_pad {
            directive.push('0');
            chars.next();
        }
        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|d| d.to_digit(10)) {
            directive.push(chars.next().unwrap_or('0'));
            width = width * 10 + d as usize;
        }

        let digits = match chars.next() {
            Some('%') => {
                out.push('%');
                continue;
            }
            Some('d') | Some('u') => value.to_string(),
            Some('x') => format!("{:x}", value),
            Some('X') => format!("{:X}", value),
            Some('o') => format!("{:o}", value),
            Some('b') => format!("{:b}", value),
            Some(other) => {
                directive.push(other);
                out.push_str(&directive);
                continue;
            }
            None => {
                out.push_str(&directive);
                break;
            }
        };

        let fill = if zero_pad { '0' } else { ' ' };
        for _ in digits.len()..width {
            out.push(fill);
        }
        out.push_str(&digits);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_and_range_resolution() {
        let table = ValueMappings::new().with(5, "Foo").with_range(10, 20, "Bar");
        assert_eq!(table.resolve(5), Some("Foo"));
        assert_eq!(table.resolve(10), Some("Bar"));
        assert_eq!(table.resolve(15), Some("Bar"));
        assert_eq!(table.resolve(20), Some("Bar"));
        assert_eq!(table.resolve(21), None);
        assert_eq!(table.resolve(6), None);
    }

    #[test]
    fn test_first_match_wins() {
        let table = ValueMappings::new()
            .with_range(0x80, 0xFE, "user private")
            .with(0x86, "shadowed");
        assert_eq!(table.resolve(0x86), Some("user private"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let table = ValueMappings::new().with_range(9, 3, "broken");
        assert!(table.verify().is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("%d", 42), "42");
        assert_eq!(format_number("0x%04X", 0x1FF), "0x01FF");
        assert_eq!(format_number("%x kHz", 255), "ff kHz");
        assert_eq!(format_number("%08b", 5), "00000101");
        assert_eq!(format_number("%4d|", 7), "   7|");
        assert_eq!(format_number("100%%", 0), "100%");
        assert_eq!(format_number("%q", 1), "%q");
        assert_eq!(format_number("plain", 1), "plain");
    }
}
