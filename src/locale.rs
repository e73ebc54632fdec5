//! Localized strings and the process-wide display locale.

use std::borrow::Cow;
use std::fmt;
use std::sync::RwLock;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const FALLBACK_LOCALE: &str = "en";

// Read by every `local_string` call; written only through `set_global_locale`.
static GLOBAL_LOCALE: RwLock<Cow<'static, str>> = RwLock::new(Cow::Borrowed(FALLBACK_LOCALE));

/// Set the locale used by [`LocalizedString::local_string`] on every instance.
pub fn set_global_locale(locale: &str) -> Result<()> {
    let len = locale.chars().count();
    if !(2..=8).contains(&len) {
        return Err(Error::InvalidLocale(locale.to_string()));
    }
    let mut current = GLOBAL_LOCALE.write().unwrap_or_else(|e| e.into_inner());
    *current = Cow::Owned(locale.to_string());
    Ok(())
}

pub fn global_locale() -> String {
    GLOBAL_LOCALE.read().unwrap_or_else(|e| e.into_inner()).to_string()
}

/// The same text in several locales, kept in the order the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedString {
    entries: Vec<(String, String)>,
}

impl LocalizedString {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace the value for `locale`, keeping the original position on replace.
    pub fn insert(&mut self, locale: impl Into<String>, value: impl Into<String>) {
        let locale = locale.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == locale) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((locale, value)),
        }
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.entries.iter().find(|(l, _)| l == locale).map(|(_, v)| v.as_str())
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(|(l, _)| l.as_str()) }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> { self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str())) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Display value for the current global locale.
    ///
    /// Recomputed on every call: global locale, then `en`, then the first
    /// entry, then the empty string.
    pub fn local_string(&self) -> &str {
        let locale = GLOBAL_LOCALE.read().unwrap_or_else(|e| e.into_inner());
        self.local_string_in(&locale)
    }

    /// Same selection as [`local_string`](Self::local_string) with an explicit locale.
    pub fn local_string_in(&self, locale: &str) -> &str {
        self.get(locale)
            .or_else(|| self.get(FALLBACK_LOCALE))
            .or_else(|| self.entries.first().map(|(_, v)| v.as_str()))
            .unwrap_or("")
    }

    /// True if any locale's value matches `needle`, ignoring ASCII case.
    pub fn matches_any(&self, needle: &str) -> bool {
        self.entries.iter().any(|(_, v)| v.eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for LocalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.local_string()) }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for LocalizedString {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut out = LocalizedString::new();
        for (l, v) in iter { out.insert(l, v); }
        out
    }
}

impl Serialize for LocalizedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (l, v) in &self.entries {
            map.serialize_entry(l, v)?;
        }
        map.end()
    }
}

// The API encodes an empty localized map as `[]`; a list of maps is merged in order.
impl<'de> Deserialize<'de> for LocalizedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LocalizedVisitor;

        impl<'de> Visitor<'de> for LocalizedVisitor {
            type Value = LocalizedString;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of locale codes to strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut out = LocalizedString::new();
                while let Some((locale, value)) = access.next_entry::<String, Option<String>>()? {
                    out.insert(locale, value.unwrap_or_default());
                }
                Ok(out)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut out = LocalizedString::new();
                while let Some(part) = access.next_element::<LocalizedString>()? {
                    for (l, v) in part.entries { out.insert(l, v); }
                }
                Ok(out)
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> { Ok(LocalizedString::new()) }
            fn visit_none<E>(self) -> std::result::Result<Self::Value, E> { Ok(LocalizedString::new()) }
        }

        deserializer.deserialize_any(LocalizedVisitor)
    }
}
