//! Cache key construction
//!
//! A key is an ordered tuple of parts joined with `:`. Parts are rendered
//! as-is and absent parts become the empty string, so the same tuple always
//! yields the same key. Two different tuples can only collide when a part
//! itself contains the separator.
//!
//! Compound values (filter sets and the like) must be rendered with
//! [`canonical_digest`] before they are used as a part.

use serde::Serialize;

/// Separator between key parts
pub const SEPARATOR: char = ':';

/// A value that can appear as one part of a cache key
pub trait KeyPart {
    fn write_part(&self, out: &mut String);
}

impl KeyPart for str {
    fn write_part(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl KeyPart for String {
    fn write_part(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn write_part(&self, out: &mut String) {
        (**self).write_part(out);
    }
}

impl<T: KeyPart> KeyPart for Option<T> {
    fn write_part(&self, out: &mut String) {
        if let Some(part) = self {
            part.write_part(out);
        }
    }
}

macro_rules! display_key_part {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyPart for $ty {
                fn write_part(&self, out: &mut String) {
                    use std::fmt::Write;
                    let _ = write!(out, "{}", self);
                }
            }
        )*
    };
}

display_key_part!(bool, char, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

/// Incremental key builder starting from a namespace tag
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    key: String,
}

impl KeyBuilder {
    pub fn new(namespace: impl KeyPart) -> Self {
        let mut key = String::new();
        namespace.write_part(&mut key);
        Self { key }
    }

    /// Append one part
    pub fn part(mut self, part: impl KeyPart) -> Self {
        self.key.push(SEPARATOR);
        part.write_part(&mut self.key);
        self
    }

    /// Append every part of `parts` in order
    pub fn parts<I>(self, parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: KeyPart,
    {
        parts.into_iter().fold(self, |builder, part| builder.part(part))
    }

    pub fn finish(self) -> String {
        self.key
    }

    /// Join a homogeneous tuple of parts
    pub fn build<I>(parts: I) -> String
    where
        I: IntoIterator,
        I::Item: KeyPart,
    {
        let mut key = String::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                key.push(SEPARATOR);
            }
            part.write_part(&mut key);
        }
        key
    }
}

/// Build a cache key from heterogeneous parts.
///
/// ```rust,ignore
/// let key = cache_key!("dashboard", user_id, 2024, "January", view);
/// // "dashboard:7:2024:January:Monthly"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($namespace:expr $(, $part:expr)* $(,)?) => {{
        $crate::KeyBuilder::new(&$namespace)
            $(.part(&$part))*
            .finish()
    }};
}

/// Render a compound value as canonical JSON.
///
/// Object keys come out sorted, so two logically equal maps give the same
/// digest regardless of insertion order. Sequence order is preserved; use
/// ordered sets for values whose order carries no meaning.
pub fn canonical_digest<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    #[test]
    fn test_key_determinism() {
        let view = "Monthly".to_owned();
        let first = cache_key!("dashboard", 7u32, 2024, "January", view);
        let second = cache_key!("dashboard", 7u32, 2024, "January", view);
        assert_eq!(first, "dashboard:7:2024:January:Monthly");
        assert_eq!(first, second);

        // A shorter tuple never equals a longer one
        assert_ne!(cache_key!("a", "b"), cache_key!("a", "b", "c"));
        assert_ne!(KeyBuilder::build(["a", "b"]), KeyBuilder::build(["a", "b", ""]));
        assert_eq!(KeyBuilder::build(["a", "b", "c"]), "a:b:c");
    }

    #[test]
    fn test_missing_parts_are_empty() {
        let month: Option<&str> = None;
        assert_eq!(cache_key!("list", "7", month, 2024), "list:7::2024");
        assert_eq!(KeyBuilder::build([Some("a"), None, Some("c")]), "a::c");
        assert_eq!(KeyBuilder::build(Vec::<&str>::new()), "");
        assert_eq!(cache_key!("list", "options"), "list:options");
    }

    #[test]
    fn test_builder_parts() {
        let key = KeyBuilder::new("reports")
            .part("7")
            .parts(["both", "January"])
            .part(Some("OFE Score"))
            .finish();
        assert_eq!(key, "reports:7:both:January:OFE Score");
        assert_eq!(KeyBuilder::new("details").part(7u64).part(true).finish(), "details:7:true");
    }

    #[test]
    fn test_separator_limitation() {
        // Parts containing the separator can collide; callers must avoid them
        assert_eq!(cache_key!("a:b", "c"), cache_key!("a", "b:c"));
    }

    #[test]
    fn test_canonical_digest() {
        let mut first: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        first.insert("sentiment", ["Positive", "Negative"].into_iter().collect());
        first.insert("audioStatus", ["Processed"].into_iter().collect());

        let mut second: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        second.insert("audioStatus", ["Processed"].into_iter().collect());
        second.insert("sentiment", ["Negative", "Positive"].into_iter().collect());

        let digest = canonical_digest(&first).unwrap();
        assert_eq!(digest, canonical_digest(&second).unwrap());
        assert_eq!(
            digest,
            r#"{"audioStatus":["Processed"],"sentiment":["Negative","Positive"]}"#
        );
    }
}
