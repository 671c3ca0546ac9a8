//! Shared pieces of form posts and the dropdown data sent back with them.

use serde::{Deserialize, Deserializer, Serialize};

/// One entry of a dropdown list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: i64,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: i64, label: impl Into<String>, selected: Option<i64>) -> Self {
        Self {
            value,
            label: label.into(),
            selected: selected == Some(value),
        }
    }
}

/// Browsers submit untouched optional inputs as empty strings
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A number picked from a select or typed by the user.
///
/// Blank and non-numeric input both read as `None`, so validation can
/// report the field and the form can be shown again.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<i64>().ok()))
}

/// Same as [`empty_string_as_none`] for free-text inputs
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}
