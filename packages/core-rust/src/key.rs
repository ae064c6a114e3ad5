//! Structured entity keys.
//!
//! A [`Key`] names one entity in the backing store: a kind, an identifier,
//! an optional parent key and a namespace. Keys whose identifier is
//! [`KeyId::Incomplete`] have their identity assigned by the store on write.
//!
//! # Encoding
//!
//! [`Key::encode`] produces a deterministic, URL-safe string used to derive
//! cache keys. Two keys encode to the same string iff they are equal.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Identifier part of a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyId {
    /// Identity not assigned yet. The store allocates one on write.
    Incomplete,
    /// Application-chosen string name. Must be non-empty.
    Name(String),
    /// Numeric identifier. Must be non-zero.
    Id(i64),
}

/// Identifier of an entity in the backing store.
///
/// Ordering is by kind, then id, then parent, then namespace. It exists so
/// keys can live in ordered collections; it carries no storage meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    /// Entity kind, e.g. `"User"`. Must be non-empty.
    pub kind: String,
    /// Name, numeric id, or incomplete.
    pub id: KeyId,
    /// Ancestor key, if the entity belongs to an entity group.
    pub parent: Option<Box<Key>>,
    /// Namespace for multi-tenant isolation. Empty is the default namespace.
    pub namespace: String,
}

impl Key {
    /// Creates an incomplete key; the store assigns its identity on write.
    #[must_use]
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self::new(kind.into(), KeyId::Incomplete)
    }

    /// Creates a complete key with a string name.
    #[must_use]
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(kind.into(), KeyId::Name(name.into()))
    }

    /// Creates a complete key with a numeric id.
    #[must_use]
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self::new(kind.into(), KeyId::Id(id))
    }

    fn new(kind: String, id: KeyId) -> Self {
        Self {
            kind,
            id,
            parent: None,
            namespace: String::new(),
        }
    }

    /// Places this key under `parent`, inheriting the parent's namespace.
    #[must_use]
    pub fn with_parent(mut self, parent: Key) -> Self {
        self.namespace.clone_from(&parent.namespace);
        self.parent = Some(Box::new(parent));
        self
    }

    /// Moves this key into `namespace`.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Whether the key has a name or id (the store does not need to assign one).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self.id, KeyId::Incomplete)
    }

    /// Whether the key can be written.
    ///
    /// Every key in the ancestor chain must have a non-empty kind and no empty
    /// name or zero id. Parents must be complete and share the child's namespace.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mut current = Some(self);
        while let Some(key) = current {
            if key.kind.is_empty() {
                return false;
            }
            match &key.id {
                KeyId::Name(name) if name.is_empty() => return false,
                KeyId::Id(0) => return false,
                _ => {}
            }
            if let Some(parent) = &key.parent {
                if !parent.is_complete() || parent.namespace != key.namespace {
                    return false;
                }
            }
            current = key.parent.as_deref();
        }
        true
    }

    /// Returns a copy of this key with the numeric id assigned by a store.
    #[must_use]
    pub fn completed_with(&self, id: i64) -> Self {
        Self {
            id: KeyId::Id(id),
            ..self.clone()
        }
    }

    /// Deterministic URL-safe encoding of the full key path.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.to_string())
    }
}

impl fmt::Display for Key {
    /// Formats as `namespace:"Parent","a"/"Kind",7`; kinds and names are quoted
    /// and escaped so the rendering is unambiguous.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{:?}:", self.namespace)?;
        }
        let mut path = Vec::new();
        let mut current = Some(self);
        while let Some(key) = current {
            path.push(key);
            current = key.parent.as_deref();
        }
        for (i, key) in path.iter().rev().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{:?},", key.kind)?;
            match &key.id {
                KeyId::Incomplete => f.write_str("?")?,
                KeyId::Name(name) => write!(f, "{name:?}")?,
                KeyId::Id(id) => write!(f, "{id}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_completeness() {
        assert!(!Key::incomplete("User").is_complete());
        assert!(Key::named("User", "alice").is_complete());
        assert!(Key::with_id("User", 7).is_complete());
    }

    #[test]
    fn validity_rules() {
        assert!(Key::named("User", "alice").is_valid());
        assert!(Key::incomplete("User").is_valid());
        assert!(!Key::named("", "alice").is_valid());
        assert!(!Key::named("User", "").is_valid());
        assert!(!Key::with_id("User", 0).is_valid());
    }

    #[test]
    fn parent_must_be_complete() {
        let child = Key::with_id("Post", 1).with_parent(Key::incomplete("User"));
        assert!(!child.is_valid());

        let child = Key::with_id("Post", 1).with_parent(Key::named("User", "alice"));
        assert!(child.is_valid());
    }

    #[test]
    fn parent_namespace_must_match() {
        let parent = Key::named("User", "alice").in_namespace("tenant-a");
        let child = Key::with_id("Post", 1).with_parent(parent);
        assert_eq!(child.namespace, "tenant-a");
        assert!(child.is_valid());

        let moved = child.in_namespace("tenant-b");
        assert!(!moved.is_valid());
    }

    #[test]
    fn display_renders_full_path() {
        let key = Key::with_id("Post", 42).with_parent(Key::named("User", "alice"));
        assert_eq!(key.to_string(), r#""User","alice"/"Post",42"#);

        let key = Key::incomplete("Event").in_namespace("ns");
        assert_eq!(key.to_string(), r#""ns":"Event",?"#);
    }

    #[test]
    fn encode_is_deterministic_and_distinguishes_keys() {
        let a = Key::named("User", "alice");
        assert_eq!(a.encode(), Key::named("User", "alice").encode());
        assert_ne!(a.encode(), Key::named("User", "bob").encode());
        // A name that looks like an id must not collide with the id.
        assert_ne!(Key::named("User", "7").encode(), Key::with_id("User", 7).encode());
        assert!(a
            .encode()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn completed_with_keeps_path() {
        let parent = Key::named("User", "alice");
        let key = Key::incomplete("Post").with_parent(parent.clone());
        let done = key.completed_with(99);
        assert_eq!(done.id, KeyId::Id(99));
        assert_eq!(done.parent.as_deref(), Some(&parent));
    }
}
