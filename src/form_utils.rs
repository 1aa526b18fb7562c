/// Serde helpers for HTML form deserialization.
///
/// `<select>` elements with an `<option value="">All</option>` and empty
/// `<input type="date">` fields send an empty string. These helpers treat
/// empty or whitespace-only values as `None`.
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid date '{}', expected YYYY-MM-DD", v))),
    }
}
