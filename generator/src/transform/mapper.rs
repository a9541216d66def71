//! Record mapper: builds one MODS record from (location, value) pairs.
//!
//! # Value syntax
//!
//! ```text
//! "Smith#creator || Jones, T."
//!  └─ entry 1 ──┘    └ entry 2 ┘     entries are split on "||"
//!  └part┘└ part┘                     parts are split on "#", part i feeds section i
//! ```
//!
//! Each entry creates one instance of the location's base element. An entry
//! whose resolved content already exists under the same parent (inherited
//! from a parent record or added earlier) is skipped.

use crate::error::{MapperError, MapperResult};
use crate::models::{Element, ModsDocument};

use super::location::{self, ElementSpec, Location, Section};

/// Separator between repeated entries in a cell.
pub const ENTRY_SEPARATOR: &str = "||";

/// Separator between the parts of one entry.
pub const PART_SEPARATOR: char = '#';

/// Sub-elements that may be given as a bare location, keyed by local name,
/// with the local name of the element they are added to.
const IMPLIED_PARENTS: &[(&str, &str)] = &[
    ("namePart", "name"),
    ("displayForm", "name"),
    ("affiliation", "name"),
    ("role", "name"),
    ("description", "name"),
    ("title", "titleInfo"),
    ("subTitle", "titleInfo"),
    ("partName", "titleInfo"),
    ("partNumber", "titleInfo"),
    ("nonSort", "titleInfo"),
    ("topic", "subject"),
    ("geographic", "subject"),
    ("temporal", "subject"),
    ("hierarchicalGeographic", "subject"),
    ("dateIssued", "originInfo"),
    ("dateCreated", "originInfo"),
    ("dateCaptured", "originInfo"),
    ("dateOther", "originInfo"),
    ("place", "originInfo"),
    ("publisher", "originInfo"),
    ("edition", "originInfo"),
    ("physicalLocation", "location"),
    ("shelfLocator", "location"),
    ("url", "location"),
    ("languageTerm", "language"),
    ("form", "physicalDescription"),
    ("extent", "physicalDescription"),
    ("digitalOrigin", "physicalDescription"),
    ("internetMediaType", "physicalDescription"),
];

/// Element a bare sub-element location belongs to, keeping the namespace
/// prefix of `tag`. `None` for top-level (or unknown) elements.
pub fn implied_parent(tag: &str) -> Option<String> {
    let (prefix, local) = match tag.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, tag),
    };
    IMPLIED_PARENTS
        .iter()
        .find(|(child, _)| *child == local)
        .map(|(_, parent)| match prefix {
            Some(p) => format!("{}:{}", p, parent),
            None => parent.to_string(),
        })
}

/// Builds a single MODS record.
///
/// # Example
/// ```
/// use mods_generator::RecordMapper;
///
/// let mut mapper = RecordMapper::new();
/// mapper.add_data("<mods:subject><mods:topic>", "Testing || Recursion").unwrap();
/// assert_eq!(mapper.document().elements("mods:subject").count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordMapper {
    document: ModsDocument,
}

impl RecordMapper {
    /// Mapper for a fresh, empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper seeded with a deep copy of a parent record.
    pub fn with_parent(parent: &ModsDocument) -> Self {
        Self {
            document: parent.clone(),
        }
    }

    /// Add a cell value at a location.
    ///
    /// Top-level elements are added to the record root. A location whose
    /// base element is a known sub-element (e.g. `mods:namePart`) is added
    /// to the most recent instance of its enclosing element, as with
    /// [`RecordMapper::add_data_under`].
    pub fn add_data(&mut self, location: &str, value: &str) -> MapperResult<()> {
        let parsed = location::parse(location)?;
        match implied_parent(&parsed.base.tag) {
            Some(parent_tag) => self.add_parsed_under(&parent_tag, location, &parsed, value),
            None => {
                append_new(self.document.root_mut(), build_entries(&parsed, value));
                Ok(())
            }
        }
    }

    /// Add a cell value inside the most recently added top-level
    /// `parent_tag` element.
    pub fn add_data_under(
        &mut self,
        parent_tag: &str,
        location: &str,
        value: &str,
    ) -> MapperResult<()> {
        let parsed = location::parse(location)?;
        self.add_parsed_under(parent_tag, location, &parsed, value)
    }

    pub fn document(&self) -> &ModsDocument {
        &self.document
    }

    pub fn into_document(self) -> ModsDocument {
        self.document
    }

    fn add_parsed_under(
        &mut self,
        parent_tag: &str,
        location: &str,
        parsed: &Location,
        value: &str,
    ) -> MapperResult<()> {
        let candidates = build_entries(parsed, value);
        if candidates.is_empty() {
            return Ok(());
        }
        let target = self
            .document
            .root_mut()
            .last_child_mut_by_tag(parent_tag)
            .ok_or_else(|| MapperError::NoAttachmentTarget {
                parent_tag: parent_tag.to_string(),
                location: location.to_string(),
            })?;
        append_new(target, candidates);
        Ok(())
    }
}

/// One detached base element per entry that resolves to content.
fn build_entries(location: &Location, value: &str) -> Vec<Element> {
    split_entries(value)
        .filter_map(|entry| build_entry(location, entry))
        .collect()
}

/// Append the candidates not already present under `target`.
fn append_new(target: &mut Element, candidates: Vec<Element>) {
    for candidate in candidates {
        if target.children().iter().any(|existing| is_duplicate(existing, &candidate)) {
            continue;
        }
        target.append_child(candidate);
    }
}

fn split_entries(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(ENTRY_SEPARATOR)
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

/// Resolve one entry into a detached base element, or `None` when no
/// section receives content.
fn build_entry(location: &Location, entry: &str) -> Option<Element> {
    let mut base = element_from_spec(&location.base);

    if location.sections.is_empty() {
        base.set_text(entry);
        return Some(base);
    }

    let parts: Vec<&str> = entry.split(PART_SEPARATOR).map(str::trim).collect();
    for (i, section) in location.sections.iter().enumerate() {
        let text = match section.leaf_literal() {
            Some(literal) => literal,
            None => match parts.get(i) {
                Some(part) if !part.is_empty() => *part,
                _ => continue,
            },
        };
        for root in build_section(section, text) {
            base.append_child(root);
        }
    }

    (!base.children().is_empty()).then_some(base)
}

/// Nest a section's elements, innermost element carrying `text`.
///
/// Each element goes inside the nearest preceding element that is still
/// open; a closed element's successor becomes its sibling. Usually yields a
/// single root.
fn build_section(section: &Section, text: &str) -> Vec<Element> {
    let last = section.len().saturating_sub(1);
    let mut roots = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    for (i, spec) in section.elements().iter().enumerate() {
        let mut element = element_from_spec(spec);
        if i == last {
            element.set_text(text);
        }
        if spec.closed {
            attach(&mut open, &mut roots, element);
        } else {
            open.push(element);
        }
    }
    while let Some(element) = open.pop() {
        attach(&mut open, &mut roots, element);
    }
    roots
}

fn attach(open: &mut [Element], roots: &mut Vec<Element>, element: Element) {
    match open.last_mut() {
        Some(parent) => {
            parent.append_child(element);
        }
        None => roots.push(element),
    }
}

fn element_from_spec(spec: &ElementSpec) -> Element {
    let mut element = Element::new(spec.tag.clone(), spec.attributes.clone());
    if let Some(literal) = &spec.literal {
        element.set_text(literal.clone());
    }
    element
}

/// Same tag and attributes, and identical resolved content.
fn is_duplicate(existing: &Element, candidate: &Element) -> bool {
    existing.matches(&candidate.tag, &candidate.attributes)
        && existing.text == candidate.text
        && existing.children == candidate.children
}
