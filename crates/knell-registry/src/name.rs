//! Interned entity names.
//!
//! A [`Name`] is an immutable, cheaply-cloned string with pointer-fast
//! equality on the common path (clones of the same interned allocation
//! compare by pointer before falling back to content). Names are unique
//! among a single container's direct children, not globally.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use knell_core::RegistryError;

/// How a name lookup compares candidate names.
///
/// Call sites are statically one or the other; the committed path
/// grammar itself is case-preserving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameCase {
    /// Exact byte-for-byte comparison.
    Sensitive,
    /// ASCII case-insensitive comparison.
    Insensitive,
}

/// An interned entity name.
#[derive(Clone)]
pub struct Name(Arc<str>);

impl Name {
    /// Intern a name, validating it first.
    ///
    /// Legal names are non-empty, start with an ASCII letter or `_`,
    /// and continue with ASCII letters, digits, or `_`. The path
    /// separator `/` can therefore never appear in a name, and a name
    /// can never be mistaken for a numeric id segment.
    pub fn new(s: &str) -> Result<Self, RegistryError> {
        if !is_valid_name(s) {
            return Err(RegistryError::InvalidName(s.to_owned()));
        }
        Ok(Self(Arc::from(s)))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name matches `candidate` under the given case rule.
    pub fn matches(&self, candidate: &str, case: NameCase) -> bool {
        match case {
            NameCase::Sensitive => self.as_str() == candidate,
            NameCase::Insensitive => self.as_str().eq_ignore_ascii_case(candidate),
        }
    }
}

/// Whether `s` is a legal entity name.
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
