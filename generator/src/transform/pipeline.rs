//! Batch conversion: one MODS record file per data row.
//!
//! # Example
//!
//! ```rust,no_run
//! use mods_generator::{process, ProcessOptions, RecordKind};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ProcessOptions {
//!         record_kind: RecordKind::Child,
//!         copy_parent_to_children: true,
//!         ..Default::default()
//!     };
//!     let summary = process(Path::new("catalog.xlsx"), &options)?;
//!
//!     println!("Wrote {} records", summary.written.len());
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OutputError, PipelineError, PipelineResult};
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::models::ModsDocument;
use crate::output;
use crate::parser::{DataHandler, DataRow, SourceOptions, DEFAULT_ID_MARKER};
use crate::transform::mapper::RecordMapper;

/// How rows relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Every row is an independent record.
    #[default]
    Parent,
    /// Rows with an id start a parent; the rows below without an id are
    /// its children.
    Child,
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parent" => Ok(RecordKind::Parent),
            "child" => Ok(RecordKind::Child),
            other => Err(format!(
                "unknown record type '{}' (expected 'parent' or 'child')",
                other
            )),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Parent => write!(f, "parent"),
            RecordKind::Child => write!(f, "child"),
        }
    }
}

/// Options for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Independent records or parent/child groups
    pub record_kind: RecordKind,

    /// Normalize dates with two-digit years too
    pub force_dates: bool,

    /// Seed each child with a copy of its parent's record
    pub copy_parent_to_children: bool,

    /// Sheet number in a workbook (starting at 1)
    pub sheet: usize,

    /// Row holding the location strings (starting at 1)
    pub control_row: usize,

    /// Encoding of delimited-text input, or `auto`
    pub input_encoding: String,

    /// Encoding of the written records
    pub output_encoding: String,

    /// Field delimiter for delimited text (auto-detect if not specified)
    pub delimiter: Option<char>,

    /// Directory receiving the `.mods` files
    pub output_dir: PathBuf,

    /// `displayLabel` of the identifier column
    pub id_marker: String,

    /// Indent the written XML
    pub pretty: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            record_kind: RecordKind::Parent,
            force_dates: false,
            copy_parent_to_children: false,
            sheet: 1,
            control_row: 2,
            input_encoding: "utf-8".to_string(),
            output_encoding: "utf-8".to_string(),
            delimiter: None,
            output_dir: PathBuf::from("xml_files"),
            id_marker: DEFAULT_ID_MARKER.to_string(),
            pretty: true,
        }
    }
}

impl ProcessOptions {
    /// The subset of options used to read the input.
    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            sheet: self.sheet,
            control_row: self.control_row,
            input_encoding: self.input_encoding.clone(),
            delimiter: self.delimiter,
            force_dates: self.force_dates,
            id_marker: self.id_marker.clone(),
        }
    }

    fn check(&self) -> PipelineResult<()> {
        if self.sheet == 0 {
            return Err(PipelineError::InvalidOptions(
                "sheet numbers start at 1".to_string(),
            ));
        }
        if self.control_row == 0 {
            return Err(PipelineError::InvalidOptions(
                "control row numbers start at 1".to_string(),
            ));
        }
        output::resolve_encoding(&self.output_encoding)?;
        Ok(())
    }
}

/// A data row that produced no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// 1-based row number in the input
    pub row: usize,
    pub reason: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessSummary {
    /// Files written, in row order
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedRecord>,
}

// =============================================================================
// Entry points
// =============================================================================

/// Convert every data row of a spreadsheet or delimited-text file.
///
/// Bad options, unreadable input and failed writes abort the run. A row
/// whose record cannot be built or encoded is logged and skipped.
pub fn process(path: &Path, options: &ProcessOptions) -> PipelineResult<ProcessSummary> {
    options.check()?;

    log_info(format!("Reading {}", path.display()));
    let handler = DataHandler::open(path, &options.source_options())?;
    if let Some(encoding) = handler.encoding() {
        log_info(format!("Encoding: {}", encoding));
    }

    process_handler(&handler, options)
}

/// Convert the data rows of an already loaded input.
pub fn process_handler(
    handler: &DataHandler,
    options: &ProcessOptions,
) -> PipelineResult<ProcessSummary> {
    options.check()?;

    let id_col = handler.id_col();
    match id_col {
        Some(col) => log_info(format!("Identifier column: {}", col + 1)),
        None if options.record_kind == RecordKind::Child => {
            return Err(PipelineError::InvalidOptions(format!(
                "child records need an identifier column (displayLabel=\"{}\")",
                options.id_marker
            )));
        }
        None => log_warning("No identifier column, records are named after their row"),
    }

    let mut run = Run::new(handler.control_row(), options);
    for row in handler.data_rows() {
        let id = id_col
            .and_then(|col| row.cells.get(col))
            .map(|cell| cell.trim().to_string())
            .filter(|id| !id.is_empty());

        match options.record_kind {
            RecordKind::Parent => run.parent_row(&row, id)?,
            RecordKind::Child => run.child_row(&row, id)?,
        }
    }

    let summary = run.summary;
    log_success(format!(
        "Wrote {} records to {}",
        summary.written.len(),
        options.output_dir.display()
    ));
    if !summary.skipped.is_empty() {
        log_warning(format!("Skipped {} records", summary.skipped.len()));
    }
    Ok(summary)
}

// =============================================================================
// Row handling
// =============================================================================

struct CurrentParent {
    id: String,
    document: ModsDocument,
    children: usize,
}

struct Run<'a> {
    control: &'a [String],
    options: &'a ProcessOptions,
    parent: Option<CurrentParent>,
    stems: HashSet<String>,
    summary: ProcessSummary,
}

impl<'a> Run<'a> {
    fn new(control: &'a [String], options: &'a ProcessOptions) -> Self {
        Self {
            control,
            options,
            parent: None,
            stems: HashSet::new(),
            summary: ProcessSummary::default(),
        }
    }

    fn parent_row(&mut self, row: &DataRow, id: Option<String>) -> PipelineResult<()> {
        let Some(document) = self.build(row, None) else {
            return Ok(());
        };
        let stem = record_stem(id.as_deref(), row.number);
        self.emit(row, &stem, &document)
    }

    fn child_row(&mut self, row: &DataRow, id: Option<String>) -> PipelineResult<()> {
        if let Some(id) = id {
            self.parent = None;
            let Some(document) = self.build(row, None) else {
                return Ok(());
            };
            let stem = record_stem(Some(&id), row.number);
            self.emit(row, &stem, &document)?;
            self.parent = Some(CurrentParent {
                id: stem,
                document,
                children: 0,
            });
            return Ok(());
        }

        let Some(parent) = self.parent.as_mut() else {
            self.skip(row.number, "child row has no parent record above it".to_string());
            return Ok(());
        };
        parent.children += 1;
        let stem = format!("{}_{}", parent.id, parent.children);
        let seed = self
            .options
            .copy_parent_to_children
            .then(|| parent.document.clone());

        let Some(document) = self.build(row, seed.as_ref()) else {
            return Ok(());
        };
        self.emit(row, &stem, &document)
    }

    /// Map one row onto a record, or log and skip it.
    fn build(&mut self, row: &DataRow, seed: Option<&ModsDocument>) -> Option<ModsDocument> {
        match map_row(self.control, row, seed) {
            Ok(document) => Some(document),
            Err(reason) => {
                self.skip(row.number, reason);
                None
            }
        }
    }

    fn emit(&mut self, row: &DataRow, stem: &str, document: &ModsDocument) -> PipelineResult<()> {
        let bytes = match output::encode(document, &self.options.output_encoding, self.options.pretty)
        {
            Ok(bytes) => bytes,
            Err(OutputError::Io(e)) => return Err(OutputError::Io(e).into()),
            Err(e) => {
                self.skip(row.number, format!("record {}: {}", stem, e));
                return Ok(());
            }
        };

        if !self.stems.insert(stem.to_string()) {
            log_warning_indent(
                format!("Row {}: {}.{} is overwritten", row.number, stem, output::RECORD_EXTENSION),
                1,
            );
        }
        let path = output::write_record(&self.options.output_dir, stem, &bytes)?;
        self.summary.written.push(path);
        Ok(())
    }

    fn skip(&mut self, row: usize, reason: String) {
        log_warning_indent(format!("Row {} skipped: {}", row, reason), 1);
        self.summary.skipped.push(SkippedRecord { row, reason });
    }
}

/// File stem from the id cell, or `row<N>` when it leaves nothing usable.
fn record_stem(id: Option<&str>, row_number: usize) -> String {
    id.map(output::sanitize_file_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| format!("row{}", row_number))
}

/// Add every non-blank cell of `row` at its column's location.
fn map_row(
    control: &[String],
    row: &DataRow,
    seed: Option<&ModsDocument>,
) -> Result<ModsDocument, String> {
    let mut mapper = match seed {
        Some(parent) => RecordMapper::with_parent(parent),
        None => RecordMapper::new(),
    };

    for (col, (location, value)) in control.iter().zip(&row.cells).enumerate() {
        if location.trim().is_empty() || value.trim().is_empty() {
            continue;
        }
        mapper
            .add_data(location, value)
            .map_err(|e| format!("column {} ({}): {}", col + 1, location, e))?;
    }
    Ok(mapper.into_document())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PARENT_CSV: &str = concat!(
        "Title,ID,Date,Subjects\n",
        "<mods:titleInfo><mods:title>,",
        "\"<mods:identifier type=\"\"local\"\" displayLabel=\"\"PN_DB_id\"\">\",",
        "\"<mods:originInfo><mods:dateCreated encoding=\"\"w3cdtf\"\">\",",
        "<mods:subject><mods:topic>\n",
        "First,test001,10/21/2005,Testing || Recursion\n",
        "Second,,1/2/2010,\n",
    );

    const CHILD_CSV: &str = concat!(
        "Title,ID,Note\n",
        "<mods:titleInfo><mods:title>,",
        "\"<mods:identifier type=\"\"local\"\" displayLabel=\"\"PN_DB_id\"\">\",",
        "<mods:note>\n",
        "Orphan,,lost\n",
        "Parent title,p1,parent note\n",
        "Child one,,child note\n",
        "Child two,,\n",
    );

    fn run(csv: &str, options: ProcessOptions) -> (tempfile::TempDir, ProcessSummary) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        fs::write(&input, csv).unwrap();

        let options = ProcessOptions {
            output_dir: dir.path().join("xml_files"),
            ..options
        };
        let summary = process(&input, &options).unwrap();
        (dir, summary)
    }

    fn read(dir: &tempfile::TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join("xml_files").join(name)).unwrap()
    }

    #[test]
    fn test_parent_records() {
        let (dir, summary) = run(PARENT_CSV, ProcessOptions::default());

        assert_eq!(summary.written.len(), 2);
        assert!(summary.skipped.is_empty());

        let first = read(&dir, "test001.mods");
        assert!(first.contains("<mods:title>First</mods:title>"));
        assert!(first.contains(r#"<mods:dateCreated encoding="w3cdtf">2005-10-21</mods:dateCreated>"#));
        assert!(first.contains("<mods:topic>Testing</mods:topic>"));
        assert!(first.contains("<mods:topic>Recursion</mods:topic>"));

        // No id: named after the row
        let second = read(&dir, "row4.mods");
        assert!(second.contains("<mods:title>Second</mods:title>"));
        assert!(second.contains("2010-01-02"));
        assert!(!second.contains("mods:identifier"));
    }

    #[test]
    fn test_child_records_with_copy() {
        let options = ProcessOptions {
            record_kind: RecordKind::Child,
            copy_parent_to_children: true,
            ..Default::default()
        };
        let (dir, summary) = run(CHILD_CSV, options);

        assert_eq!(summary.written.len(), 3);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].row, 3);

        let parent = read(&dir, "p1.mods");
        assert!(parent.contains("<mods:title>Parent title</mods:title>"));
        assert!(!parent.contains("Child one"));

        let child = read(&dir, "p1_1.mods");
        assert!(child.contains("<mods:title>Parent title</mods:title>"));
        assert!(child.contains("<mods:title>Child one</mods:title>"));
        assert!(child.contains("<mods:note>parent note</mods:note>"));
        assert!(child.contains("<mods:note>child note</mods:note>"));

        let second = read(&dir, "p1_2.mods");
        assert!(second.contains("<mods:title>Child two</mods:title>"));
        assert!(!second.contains("child note"));
    }

    #[test]
    fn test_child_records_without_copy() {
        let options = ProcessOptions {
            record_kind: RecordKind::Child,
            ..Default::default()
        };
        let (dir, _) = run(CHILD_CSV, options);

        let child = read(&dir, "p1_1.mods");
        assert!(child.contains("<mods:title>Child one</mods:title>"));
        assert!(!child.contains("Parent title"));
        assert!(!child.contains("mods:identifier"));
    }

    #[test]
    fn test_child_mode_unusable_id_named_after_row() {
        let csv = concat!(
            "Title,ID\n",
            "<mods:titleInfo><mods:title>,",
            "\"<mods:identifier type=\"\"local\"\" displayLabel=\"\"PN_DB_id\"\">\"\n",
            "Parent,...\n",
            "Child,\n",
        );
        let options = ProcessOptions {
            record_kind: RecordKind::Child,
            ..Default::default()
        };
        let (dir, summary) = run(csv, options);

        assert_eq!(summary.written.len(), 2);
        assert!(read(&dir, "row3.mods").contains("<mods:title>Parent</mods:title>"));
        assert!(read(&dir, "row3_1.mods").contains("<mods:title>Child</mods:title>"));
        assert!(!dir.path().join("xml_files").join(".mods").exists());
    }

    #[test]
    fn test_record_stem() {
        assert_eq!(record_stem(Some(" test001 "), 3), "test001");
        assert_eq!(record_stem(Some("..."), 4), "row4");
        assert_eq!(record_stem(None, 5), "row5");
    }

    #[test]
    fn test_malformed_location_skips_record() {
        let csv = "A,B\n<mods:note>,mods:genre\nkept,\nlost,value\n";
        let (dir, summary) = run(csv, ProcessOptions::default());

        assert_eq!(summary.written.len(), 1);
        assert!(read(&dir, "row3.mods").contains("<mods:note>kept</mods:note>"));
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].row, 4);
        assert!(summary.skipped[0].reason.contains("column 2"));
    }

    #[test]
    fn test_unencodable_record_skipped() {
        let csv = "A\n<mods:genre>\nSociété\nPROGRĄMMING\n";
        let options = ProcessOptions {
            output_encoding: "latin1".into(),
            ..Default::default()
        };
        let (dir, summary) = run(csv, options);

        assert_eq!(summary.written.len(), 1);
        let bytes = fs::read(dir.path().join("xml_files").join("row3.mods")).unwrap();
        assert!(bytes.contains(&0xE9));
        assert_eq!(summary.skipped[0].row, 4);
    }

    #[test]
    fn test_child_mode_needs_id_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        fs::write(&input, "A\n<mods:note>\nx\n").unwrap();

        let options = ProcessOptions {
            record_kind: RecordKind::Child,
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        assert!(matches!(
            process(&input, &options),
            Err(PipelineError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_fatal_errors_before_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        fs::write(&input, PARENT_CSV).unwrap();
        let out = dir.path().join("out");

        let options = ProcessOptions {
            output_encoding: "klingon".into(),
            output_dir: out.clone(),
            ..Default::default()
        };
        assert!(matches!(
            process(&input, &options),
            Err(PipelineError::Output(_))
        ));

        let options = ProcessOptions {
            input_encoding: "klingon".into(),
            output_dir: out.clone(),
            ..Default::default()
        };
        assert!(matches!(
            process(&input, &options),
            Err(PipelineError::Source(_))
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("parent".parse::<RecordKind>().unwrap(), RecordKind::Parent);
        assert_eq!(" Child ".parse::<RecordKind>().unwrap(), RecordKind::Child);
        assert!("sibling".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::Child.to_string(), "child");
    }
}
