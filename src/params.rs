//! Helpers for deserializing query strings and partial JSON bodies.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, de};

/// Deserialize an optional query parameter, treating an empty value (`?category=`)
/// the same as a missing one.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = Option::<String>::deserialize(deserializer)?;

    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => T::from_str(text).map(Some).map_err(de::Error::custom),
    }
}

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use together with `#[serde(default)]`: a missing field stays `None`, while
/// `null` becomes `Some(None)`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
