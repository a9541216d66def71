//! MODS serialization and record files.
//!
//! Records are written with `quick-xml`, then re-encoded when the caller
//! asks for an output encoding other than UTF-8.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{OutputError, OutputResult};
use crate::models::{Element, ModsDocument};

/// Extension of generated record files.
pub const RECORD_EXTENSION: &str = "mods";

/// Serialize a record as UTF-8 XML.
pub fn serialize(document: &ModsDocument, pretty: bool) -> OutputResult<String> {
    write_xml(document, UTF_8.name(), pretty)
}

/// Serialize a record in the encoding named by `label` (any WHATWG label,
/// e.g. `utf-8`, `latin1`, `windows-1252`).
pub fn encode(document: &ModsDocument, label: &str, pretty: bool) -> OutputResult<Vec<u8>> {
    let encoding = resolve_encoding(label)?;
    let xml = write_xml(document, encoding.name(), pretty)?;
    if encoding == UTF_8 {
        return Ok(xml.into_bytes());
    }

    let (bytes, _, had_errors) = encoding.encode(&xml);
    if had_errors {
        return Err(OutputError::Unencodable {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Resolve an output encoding label.
///
/// Encodings `encoding_rs` cannot encode into (UTF-16, replacement) are
/// rejected rather than silently written as UTF-8.
pub fn resolve_encoding(label: &str) -> OutputResult<&'static Encoding> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| OutputError::Encoding(format!("unknown encoding '{}'", label)))?;
    if encoding.output_encoding() != encoding {
        return Err(OutputError::Encoding(format!(
            "cannot write records as {}",
            encoding.name()
        )));
    }
    Ok(encoding)
}

fn write_xml(document: &ModsDocument, encoding_name: &str, pretty: bool) -> OutputResult<String> {
    let mut writer = if pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding_name), None)))?;
    write_element(&mut writer, document.root())?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| OutputError::Xml(e.to_string()))
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> OutputResult<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (name, value) in element.attributes.iter() {
        start.push_attribute((name, value));
    }

    if element.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = element.text.as_deref().filter(|t| !t.is_empty()) {
        writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    }
    for child in element.children() {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.tag.as_str())))?;
    Ok(())
}

/// Make a cell value usable as a file name.
pub fn sanitize_file_stem(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim_matches('.').to_string()
}

/// Write `<dir>/<stem>.mods`, creating `dir` if needed.
pub fn write_record(dir: &Path, stem: &str, bytes: &[u8]) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", stem, RECORD_EXTENSION));
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::mapper::RecordMapper;

    #[test]
    fn test_empty_record() {
        let xml = serialize(&ModsDocument::new(), true).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(
            r#"<mods:mods xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink""#
        ));
        assert!(xml.contains(
            r#"xsi:schemaLocation="http://www.loc.gov/mods/v3 http://www.loc.gov/standards/mods/v3/mods-3-4.xsd"/>"#
        ));
        assert!(!xml.contains("</mods:mods>"));
        assert!(xml.ends_with("/>\n"));
    }

    #[test]
    fn test_pretty_nesting() {
        let mut m = RecordMapper::new();
        m.add_data(
            "<mods:titleInfo><mods:title>#<mods:partName>",
            "é. 1 Test#part 1",
        )
        .unwrap();

        let xml = serialize(m.document(), true).unwrap();
        assert!(xml.contains(
            "\n  <mods:titleInfo>\n    <mods:title>é. 1 Test</mods:title>\n    <mods:partName>part 1</mods:partName>\n  </mods:titleInfo>\n</mods:mods>"
        ));
    }

    #[test]
    fn test_text_escaping() {
        let mut m = RecordMapper::new();
        m.add_data(r#"<mods:note displayLabel="note label">"#, "Note 1&2").unwrap();
        m.add_data("<mods:note>", "3<4").unwrap();
        m.add_data("<mods:note>", r#"say "hi""#).unwrap();

        let xml = serialize(m.document(), false).unwrap();
        assert!(xml.contains(r#"<mods:note displayLabel="note label">Note 1&amp;2</mods:note>"#));
        assert!(xml.contains("<mods:note>3&lt;4</mods:note>"));
        assert!(xml.contains(r#"<mods:note>say "hi"</mods:note>"#));
    }

    #[test]
    fn test_attribute_order_preserved() {
        let mut m = RecordMapper::new();
        m.add_data(r#"<mods:identifier type="local" displayLabel="PN_DB_id">"#, "321")
            .unwrap();
        let xml = serialize(m.document(), false).unwrap();
        assert!(xml.contains(
            r#"<mods:identifier type="local" displayLabel="PN_DB_id">321</mods:identifier>"#
        ));
    }

    #[test]
    fn test_encode_latin1() {
        let mut m = RecordMapper::new();
        m.add_data("<mods:genre>", "Société").unwrap();

        let bytes = encode(m.document(), "latin1", false).unwrap();
        let text = encoding_rs::WINDOWS_1252.decode(&bytes).0;
        assert!(text.contains(r#"encoding="windows-1252""#));
        assert!(text.contains("Société"));
        // é is a single byte
        assert!(bytes.windows(2).all(|w| w != [0xC3, 0xA9]));
    }

    #[test]
    fn test_encode_unencodable() {
        let mut m = RecordMapper::new();
        m.add_data("<mods:subject><mods:topic>", "PROGRĄMMING").unwrap();

        let err = encode(m.document(), "latin1", false).unwrap_err();
        assert!(matches!(err, OutputError::Unencodable { .. }));
    }

    #[test]
    fn test_unknown_output_encoding() {
        let doc = ModsDocument::new();
        assert!(matches!(
            encode(&doc, "klingon", true),
            Err(OutputError::Encoding(_))
        ));
        assert!(matches!(
            encode(&doc, "utf-16le", true),
            Err(OutputError::Encoding(_))
        ));
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem(" test001 "), "test001");
        assert_eq!(sanitize_file_stem("a/b:c"), "a_b_c");
        assert_eq!(sanitize_file_stem("../x"), "_x");
    }

    #[test]
    fn test_write_record() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("xml_files");
        let path = write_record(&out, "test001", b"<x/>").unwrap();
        assert_eq!(path, out.join("test001.mods"));
        assert_eq!(std::fs::read(&path).unwrap(), b"<x/>");
    }
}
