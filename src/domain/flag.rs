//! Per-post Markdown flag stored in post metadata.
//!
//! The stored value is a free-form string owned by the host metadata store.
//! Only two spellings carry an explicit decision: any value whose leading
//! integer has an absolute value of one enables Markdown, and the literal `"0"`
//! disables it. Everything else, including an absent key, defers to the global
//! default policy.

/// Metadata key holding the flag. Also used as the render cache key prefix.
pub const META_KEY: &str = "mdtoggle_use_markdown";

/// Interpreted state of the stored flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownFlag {
    Enabled,
    Disabled,
    Unset,
}

impl MarkdownFlag {
    /// Interpret a raw metadata value.
    pub fn from_meta(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return MarkdownFlag::Unset;
        };

        if leading_integer(raw).map(i64::unsigned_abs) == Some(1) {
            MarkdownFlag::Enabled
        } else if raw == "0" {
            MarkdownFlag::Disabled
        } else {
            MarkdownFlag::Unset
        }
    }

    /// Normalized flag for a submitted toggle value.
    pub fn from_submission(enabled: bool) -> Self {
        if enabled {
            MarkdownFlag::Enabled
        } else {
            MarkdownFlag::Disabled
        }
    }

    /// Resolve against the global default.
    pub fn resolve(self, default: bool) -> bool {
        match self {
            MarkdownFlag::Enabled => true,
            MarkdownFlag::Disabled => false,
            MarkdownFlag::Unset => default,
        }
    }

    /// Normalized value written back to metadata. `Unset` is never persisted.
    pub fn as_meta_value(self) -> Option<&'static str> {
        match self {
            MarkdownFlag::Enabled => Some("1"),
            MarkdownFlag::Disabled => Some("0"),
            MarkdownFlag::Unset => None,
        }
    }
}

/// Parse the leading integer of `raw` the way loosely-typed metadata is read:
/// optional leading whitespace, an optional sign, then at least one digit.
/// Trailing garbage is ignored; values out of range saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: i64 = 0;
    let mut seen = false;
    for digit in digits {
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'));
    }

    seen.then_some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_value_is_unset() {
        assert_eq!(MarkdownFlag::from_meta(None), MarkdownFlag::Unset);
        assert_eq!(MarkdownFlag::from_meta(Some("")), MarkdownFlag::Unset);
    }

    #[test]
    fn literal_zero_disables() {
        assert_eq!(MarkdownFlag::from_meta(Some("0")), MarkdownFlag::Disabled);
    }

    #[test]
    fn zero_lookalikes_fall_back_to_default() {
        for raw in ["00", " 0", "0.0", "false", "no", "2", "-2", "abc"] {
            assert_eq!(
                MarkdownFlag::from_meta(Some(raw)),
                MarkdownFlag::Unset,
                "`{raw}` should not carry an explicit decision"
            );
        }
    }

    #[test]
    fn absolute_one_enables() {
        for raw in ["1", "-1", "+1", " 1", "01", "1abc", "1.9"] {
            assert_eq!(
                MarkdownFlag::from_meta(Some(raw)),
                MarkdownFlag::Enabled,
                "`{raw}` should enable markdown"
            );
        }
    }

    #[test]
    fn resolve_only_consults_default_when_unset() {
        assert!(MarkdownFlag::Enabled.resolve(false));
        assert!(!MarkdownFlag::Disabled.resolve(true));
        assert!(MarkdownFlag::Unset.resolve(true));
        assert!(!MarkdownFlag::Unset.resolve(false));
    }

    #[test]
    fn submissions_normalize_to_integer_strings() {
        assert_eq!(MarkdownFlag::from_submission(true).as_meta_value(), Some("1"));
        assert_eq!(MarkdownFlag::from_submission(false).as_meta_value(), Some("0"));
        assert_eq!(MarkdownFlag::Unset.as_meta_value(), None);
    }

    #[test]
    fn huge_values_saturate_instead_of_overflowing() {
        assert_eq!(
            MarkdownFlag::from_meta(Some("99999999999999999999999")),
            MarkdownFlag::Unset
        );
    }
}
