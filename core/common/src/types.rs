//! Common types used throughout coffer.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Non-empty text used for node labels, entry content and group descriptions.
///
/// Construction is the only place the non-empty rule is checked, so a
/// `NonEmptyText` held anywhere in the tree is always valid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Create a new NonEmptyText from a string.
    ///
    /// # Preconditions
    /// - `text` must be non-empty
    ///
    /// # Errors
    /// - Returns a validation error if `text` is empty
    pub fn new(text: impl Into<String>) -> crate::Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(crate::Error::Validation(
                "Text cannot be empty".to_string(),
            ));
        }
        Ok(Self(text))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyText {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<NonEmptyText> for String {
    fn from(text: NonEmptyText) -> Self {
        text.0
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A path of group labels from the root group down to a subgroup.
///
/// This addresses groups by their labels, not by any storage location. In
/// text form components are separated by `/`; a label containing `/` or `\`
/// writes them as `\/` and `\\`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupPath {
    components: Vec<String>,
}

impl GroupPath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Create a path from label components.
    ///
    /// Components are labels taken verbatim and may contain `/`.
    ///
    /// # Errors
    /// - Returns error if any component is an empty string
    pub fn from_components(components: Vec<String>) -> crate::Result<Self> {
        if components.iter().any(String::is_empty) {
            return Err(crate::Error::Validation(
                "Path component cannot be empty".to_string(),
            ));
        }
        Ok(Self { components })
    }

    /// Parse a path string into GroupPath.
    ///
    /// Uses '/' as separator; `\/` and `\\` stand for a literal slash and
    /// backslash inside a label. Leading and trailing separators are ignored.
    ///
    /// # Errors
    /// - Returns error on an empty component between two separators, or on a
    ///   backslash not followed by `/` or `\`
    pub fn parse(path: &str) -> crate::Result<Self> {
        let mut components = vec![String::new()];
        let mut chars = path.chars();
        while let Some(c) = chars.next() {
            match c {
                '/' => components.push(String::new()),
                '\\' => match chars.next() {
                    Some(escaped @ ('/' | '\\')) => push_char(&mut components, escaped),
                    Some(other) => {
                        return Err(crate::Error::Validation(format!(
                            "Invalid escape \\{} in path {}",
                            other, path
                        )))
                    }
                    None => {
                        return Err(crate::Error::Validation(format!(
                            "Path ends with a dangling escape: {}",
                            path
                        )))
                    }
                },
                other => push_char(&mut components, other),
            }
        }

        let first = components
            .iter()
            .position(|c| !c.is_empty())
            .unwrap_or(components.len());
        components.drain(..first);
        while components.last().is_some_and(String::is_empty) {
            components.pop();
        }
        Self::from_components(components)
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            let mut components = self.components.clone();
            components.pop();
            Some(Self { components })
        }
    }

    /// Get the last label.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Join this path with a child label.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        let mut components = self.components.clone();
        components.push(child.to_string());
        Self::from_components(components)
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

fn push_char(components: &mut [String], c: char) {
    if let Some(current) = components.last_mut() {
        current.push(c);
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/")?;
            for c in component.chars() {
                if c == '/' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SensitiveBytes {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<&[u8]> for SensitiveBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_text_creation() {
        let text = NonEmptyText::new("Email").unwrap();
        assert_eq!(text.as_str(), "Email");
        assert_eq!(text.to_string(), "Email");
    }

    #[test]
    fn test_text_empty_fails() {
        assert!(matches!(NonEmptyText::new(""), Err(crate::Error::Validation(_))));
    }

    #[test]
    fn test_text_deserialize_rejects_empty() {
        let ok: NonEmptyText = serde_json::from_str("\"Bank\"").unwrap();
        assert_eq!(ok.as_str(), "Bank");
        assert!(serde_json::from_str::<NonEmptyText>("\"\"").is_err());
    }

    #[test]
    fn test_text_serializes_as_plain_string() {
        let text = NonEmptyText::new("Work Mail").unwrap();
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"Work Mail\"");
    }

    #[test]
    fn test_group_path_root() {
        for text in ["", "/", "//"] {
            let path = GroupPath::parse(text).unwrap();
            assert!(path.is_root());
            assert_eq!(path.to_string(), "/");
        }
    }

    #[test]
    fn test_group_path_parse() {
        let path = GroupPath::parse("/Work/Mail Accounts/").unwrap();
        assert_eq!(path.components(), &["Work", "Mail Accounts"]);
        assert_eq!(path.to_string(), "/Work/Mail Accounts");
    }

    #[test]
    fn test_group_path_rejects_empty_component() {
        assert!(GroupPath::parse("/Work//Mail").is_err());
    }

    #[test]
    fn test_group_path_join_and_parent() {
        let path = GroupPath::root().join("Work").unwrap().join("Mail").unwrap();
        assert_eq!(path.to_string(), "/Work/Mail");
        assert_eq!(path.name(), Some("Mail"));
        assert_eq!(path.parent().unwrap().to_string(), "/Work");
        assert!(path.join("").is_err());
    }

    #[test]
    fn test_group_path_escapes_separators() {
        let path = GroupPath::root().join("a/b").unwrap().join(r"c\d").unwrap();
        assert_eq!(path.components(), &["a/b", r"c\d"]);
        assert_eq!(path.to_string(), r"/a\/b/c\\d");
        assert_eq!(GroupPath::parse(&path.to_string()).unwrap(), path);

        assert_eq!(GroupPath::parse(r"a\/").unwrap().components(), &["a/"]);
        assert_eq!(GroupPath::parse(r"\//x").unwrap().components(), &["/", "x"]);
    }

    #[test]
    fn test_group_path_rejects_bad_escapes() {
        assert!(GroupPath::parse(r"/Work\").is_err());
        assert!(GroupPath::parse(r"/Wo\rk").is_err());
    }

    #[test]
    fn test_sensitive_bytes_debug_redacts() {
        let secret = SensitiveBytes::from("hunter2");
        assert_eq!(format!("{:?}", secret), "SensitiveBytes([REDACTED; 7 bytes])");
        assert_eq!(secret.as_bytes(), b"hunter2");
    }

    proptest! {
        #[test]
        fn prop_text_accepts_any_non_empty(raw in ".+") {
            let text = NonEmptyText::new(raw.clone()).unwrap();
            prop_assert_eq!(text.as_str(), raw.as_str());
        }

        #[test]
        fn prop_group_path_display_round_trips(parts in proptest::collection::vec(r"[A-Za-z0-9 /\\]{1,8}", 0..5)) {
            let path = GroupPath::from_components(parts).unwrap();
            let reparsed = GroupPath::parse(&path.to_string()).unwrap();
            prop_assert_eq!(reparsed, path);
        }
    }
}
