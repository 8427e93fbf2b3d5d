//! Spending categories.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Spending category of a transaction.
///
/// Unknown category strings coming from the server fall back to
/// [`Category::Others`], which is also the server-side default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Retail purchases.
    Shopping,
    /// Recurring bills and utilities.
    Bills,
    /// Restaurants, cafes and take-away.
    #[serde(rename = "Eating Out")]
    EatingOut,
    /// Anything else.
    #[default]
    #[serde(other)]
    Others,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [Self::Shopping, Self::Bills, Self::EatingOut, Self::Others];

    /// Returns the wire name of the category.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shopping => "Shopping",
            Self::Bills => "Bills",
            Self::EatingOut => "Eating Out",
            Self::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Parses a category name, ignoring ASCII case and accepting
    /// `eating-out` / `eating_out` as aliases for "Eating Out".
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Self::ALL
            .into_iter()
            .find(|cat| cat.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eating_out_uses_spaced_wire_name() {
        let json = serde_json::to_string(&Category::EatingOut).unwrap();
        assert_eq!(json, r#""Eating Out""#);
        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Category::EatingOut);
    }

    #[test]
    fn unknown_server_category_is_others() {
        let parsed: Category = serde_json::from_str(r#""Travel""#).unwrap();
        assert_eq!(parsed, Category::Others);
    }

    #[test]
    fn parse_user_input() {
        assert_eq!("bills".parse::<Category>().unwrap(), Category::Bills);
        assert_eq!("eating-out".parse::<Category>().unwrap(), Category::EatingOut);
        assert_eq!(" Eating Out ".parse::<Category>().unwrap(), Category::EatingOut);
        assert!("groceries".parse::<Category>().is_err());
    }
}
