//! Identifier casing transforms

use heck::{ToLowerCamelCase as _, ToTitleCase as _};
use std::str::FromStr;
use tracing::warn;

/// Supported casing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Casing {
    Lower,
    Upper,
    Capitalize,
    Camel,
    Title,
}

impl Casing {
    /// Names accepted by [`Casing::from_str`]
    pub const VALID: &[&str] = &["lower", "upper", "capitalize", "camel", "title"];

    /// Apply the casing to a single segment
    ///
    /// Whitespace produced by word splitting is removed from the result.
    #[must_use]
    pub fn apply(self, segment: &str) -> String {
        let cased = match self {
            Self::Lower => words(segment).to_lowercase(),
            Self::Upper => words(segment).to_uppercase(),
            Self::Capitalize => {
                let lowered = segment.to_lowercase();
                let mut chars = lowered.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            }
            Self::Camel => segment.to_lower_camel_case(),
            Self::Title => segment.to_lowercase().to_title_case(),
        };
        cased.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

impl FromStr for Casing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lower" | "lowerCase" => Ok(Self::Lower),
            "upper" | "upperCase" => Ok(Self::Upper),
            "capitalize" => Ok(Self::Capitalize),
            "camel" | "camelCase" => Ok(Self::Camel),
            "title" | "titleCase" => Ok(Self::Title),
            other => Err(format!(
                "invalid transform case {other} ({})",
                Self::VALID.join(", ")
            )),
        }
    }
}

/// Split into words on separators and case boundaries, joined by spaces
fn words(segment: &str) -> String {
    segment.to_title_case()
}

/// Transform `value` to the casing named by `mode`
///
/// The value is split on `.` and each segment is transformed on its own, so
/// `foo.bar` in title case becomes `Foo.Bar`. An unknown mode logs a warning
/// and returns the value unchanged.
#[must_use]
pub fn transform_case(value: &str, mode: &str) -> String {
    let casing = match mode.parse::<Casing>() {
        Ok(casing) => casing,
        Err(message) => {
            warn!("{message}.");
            return value.to_owned();
        }
    };

    value
        .split('.')
        .map(|segment| casing.apply(segment))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_segments() {
        assert_eq!(transform_case("foo.bar", "title"), "Foo.Bar");
        assert_eq!(transform_case("user service", "title"), "UserService");
        assert_eq!(transform_case("FooBar", "title"), "Foobar");
    }

    #[test]
    fn test_modes() {
        assert_eq!(transform_case("user-list", "lower"), "userlist");
        assert_eq!(transform_case("user list", "upper"), "USERLIST");
        assert_eq!(transform_case("hello World", "capitalize"), "Helloworld");
        assert_eq!(transform_case("user list", "camel"), "userList");
        assert_eq!(transform_case("db", "titleCase"), "Db");
    }

    #[test]
    fn test_unknown_mode_passthrough() {
        assert_eq!(transform_case("Foo.bar", "shouty"), "Foo.bar");
    }
}
