//! Location string parser.
//!
//! Every column of the control row holds a location string telling the
//! mapper where that column's values go in the record:
//!
//! ```text
//! <mods:name type="personal"><mods:namePart>#<mods:role><mods:roleTerm type="text">winner
//! └──────── base element ──┘└── section 1 ─┘ └──────────── section 2 ────────────────────┘
//! ```
//!
//! - The first element is the **base element**; every value entry creates
//!   one instance of it.
//! - The elements after it form **sections**, separated by `#`. Each section
//!   is a chain: every element nests inside the previous one.
//! - Text after a tag is a **literal** default for that element.
//! - A closing tag right after an element's literal (`<mods:country>United
//!   States</mods:country>`) closes that element, so the next element of the
//!   section becomes its sibling instead of its child. Other closing tags are
//!   accepted and ignored.

use serde::Serialize;

use crate::error::{LocationError, LocationResult};
use crate::models::Attributes;

/// One element named by a location string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSpec {
    pub tag: String,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    /// Closed by its own end tag (or self-closing).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub closed: bool,
}

/// A chain of nested elements attached directly under the base element.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Section {
    elements: Vec<ElementSpec>,
}

impl Section {
    pub fn elements(&self) -> &[ElementSpec] {
        &self.elements
    }

    /// The innermost element, which receives the value text.
    pub fn leaf(&self) -> Option<&ElementSpec> {
        self.elements.last()
    }

    /// Non-empty literal baked into the leaf, if any.
    pub fn leaf_literal(&self) -> Option<&str> {
        self.leaf()
            .and_then(|e| e.literal.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A parsed location string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub base: ElementSpec,
    pub sections: Vec<Section>,
}

/// Parse a location string.
///
/// # Example
/// ```
/// use mods_generator::transform::location::parse;
///
/// let loc = parse(r#"<mods:titleInfo><mods:title>#<mods:partName>"#).unwrap();
/// assert_eq!(loc.base.tag, "mods:titleInfo");
/// assert_eq!(loc.sections.len(), 2);
/// ```
pub fn parse(location: &str) -> LocationResult<Location> {
    let mut p = Cursor::new(location);

    p.skip_ws();
    if p.peek() != Some('<') || p.starts_with("</") {
        return Err(p.error("location must start with an element tag"));
    }

    let mut base = p.element()?;
    base.literal = None;

    let mut sections = Vec::new();
    let mut chain: Vec<ElementSpec> = Vec::new();
    let mut open_separator: Option<usize> = None;

    loop {
        p.skip_ws();
        match p.peek() {
            None => break,
            Some('#') => {
                if chain.is_empty() {
                    return Err(p.error("'#' must follow an element"));
                }
                sections.push(Section {
                    elements: std::mem::take(&mut chain),
                });
                open_separator = Some(p.pos);
                p.bump();
            }
            Some('<') if p.starts_with("</") => {
                p.closing_tag()?;
            }
            Some('<') => {
                chain.push(p.element()?);
                open_separator = None;
            }
            Some(_) => return Err(p.error("unexpected text outside an element")),
        }
    }

    if let Some(pos) = open_separator {
        return Err(LocationError::malformed(
            location,
            pos,
            "'#' must be followed by an element",
        ));
    }
    if !chain.is_empty() {
        sections.push(Section { elements: chain });
    }

    Ok(Location { base, sections })
}

// =============================================================================
// Cursor
// =============================================================================

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Skip whitespace, returning whether any was skipped.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> LocationResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of location", expected))),
        }
    }

    fn error(&self, message: impl Into<String>) -> LocationError {
        LocationError::malformed(self.src, self.pos, message)
    }

    /// Qualified XML-ish name: `prefix:local`, letters, digits, `_ - . :`.
    fn name(&mut self, what: &str) -> LocationResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return Err(self.error(format!("expected {}", what))),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// `<tag attr="v"...>literal</tag>`
    fn element(&mut self) -> LocationResult<ElementSpec> {
        self.expect('<')?;
        let tag = self.name("tag name")?;
        let mut attributes = Attributes::new();
        let mut self_closing = false;

        loop {
            let spaced = self.skip_ws();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    self.expect('>')?;
                    self_closing = true;
                    break;
                }
                Some(_) if spaced => {
                    let (name, value) = self.attribute()?;
                    attributes.insert(name, value);
                }
                Some(c) => return Err(self.error(format!("unexpected '{}' in tag <{}>", c, tag))),
                None => return Err(self.error(format!("unterminated tag <{}>", tag))),
            }
        }

        let literal = if self_closing { None } else { self.literal() };

        let mut closed = self_closing;
        if !self_closing {
            let save = self.pos;
            self.skip_ws();
            if self.starts_with("</") {
                closed = self.closing_tag()? == tag;
            } else {
                self.pos = save;
            }
        }

        Ok(ElementSpec {
            tag,
            attributes,
            literal,
            closed,
        })
    }

    /// `name="value"`
    fn attribute(&mut self) -> LocationResult<(String, String)> {
        let name = self.name("attribute name")?;
        self.skip_ws();
        self.expect('=')?;
        self.skip_ws();
        self.expect('"')?;
        let start = self.pos;
        match self.rest().find('"') {
            Some(len) => {
                self.pos += len + 1;
                Ok((name, self.src[start..start + len].to_string()))
            }
            None => Err(self.error(format!("unterminated value for attribute '{}'", name))),
        }
    }

    /// Text up to the next tag, section separator or end.
    fn literal(&mut self) -> Option<String> {
        let len = self
            .rest()
            .find(|c: char| c == '<' || c == '#')
            .unwrap_or(self.rest().len());
        let text = self.src[self.pos..self.pos + len].trim();
        self.pos += len;
        (!text.is_empty()).then(|| text.to_string())
    }

    /// `</tag>`, returning the tag name.
    fn closing_tag(&mut self) -> LocationResult<String> {
        self.pos += 2;
        let name = self.name("closing tag name")?;
        self.skip_ws();
        self.expect('>')?;
        Ok(name)
    }
}
