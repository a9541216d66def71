//! Document model for MODS records.
//!
//! This module contains the tree that records are built into:
//!
//! - [`Attributes`] - Attribute set (order-insensitive equality)
//! - [`Element`] - A named element with attributes, text and children
//! - [`ModsDocument`] - A complete record rooted at `mods:mods`
//!
//! Serialization lives in [`crate::output`].

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// MODS namespace URI.
pub const MODS_NS: &str = "http://www.loc.gov/mods/v3";

/// XLink namespace URI.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// XML Schema instance namespace URI.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Schema location advertised on every record.
pub const MODS_SCHEMA_LOCATION: &str =
    "http://www.loc.gov/mods/v3 http://www.loc.gov/standards/mods/v3/mods-3-4.xsd";

/// Qualified name of the record root.
pub const MODS_ROOT_TAG: &str = "mods:mods";

// =============================================================================
// Attributes
// =============================================================================

/// Attribute set of an element.
///
/// Keeps insertion order for serialization, but two sets compare equal
/// whenever they hold the same name/value pairs.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing the value of an existing name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(n, v)| other.get(n) == Some(v))
    }
}

impl Eq for Attributes {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Element
// =============================================================================

/// One element of a record tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with attributes and no content.
    pub fn new(tag: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            tag: tag.into(),
            attributes,
            text: None,
            children: Vec::new(),
        }
    }

    /// Append a child and return a mutable reference to it.
    pub fn append_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// True if this element has the given tag and an equal attribute set.
    pub fn matches(&self, tag: &str, attributes: &Attributes) -> bool {
        self.tag == tag && self.attributes == *attributes
    }

    /// Most recently appended direct child with the given tag.
    pub fn last_child_mut_by_tag(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().rev().find(|c| c.tag == tag)
    }

    /// Direct children with the given tag, in document order.
    pub fn children_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Empty elements serialize as self-closing tags.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.as_deref().map_or(true, str::is_empty)
    }
}

// =============================================================================
// MODS Document
// =============================================================================

/// A complete MODS record.
///
/// `Clone` is a deep copy: a record seeded from a parent never shares
/// nodes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModsDocument {
    root: Element,
}

impl ModsDocument {
    /// Create an empty record with the standard namespace declarations.
    pub fn new() -> Self {
        let attributes: Attributes = [
            ("xmlns:mods", MODS_NS),
            ("xmlns:xlink", XLINK_NS),
            ("xmlns:xsi", XSI_NS),
            ("xsi:schemaLocation", MODS_SCHEMA_LOCATION),
        ]
        .into_iter()
        .collect();

        Self {
            root: Element::new(MODS_ROOT_TAG, attributes),
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Top-level elements with the given tag, in document order.
    pub fn elements<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.children_by_tag(tag)
    }
}

impl Default for ModsDocument {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
