//! Error types for the MODS generation pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`LocationError`] - Location string parsing errors
//! - [`MapperError`] - Record construction errors
//! - [`SourceError`] - Spreadsheet/CSV input errors
//! - [`OutputError`] - Serialization and file output errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Location Parsing Errors
// =============================================================================

/// Errors while parsing a column location string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The location string does not follow the element grammar.
    #[error("Malformed location '{location}' at offset {position}: {message}")]
    Malformed {
        location: String,
        position: usize,
        message: String,
    },
}

impl LocationError {
    pub(crate) fn malformed(location: &str, position: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            location: location.to_string(),
            position,
            message: message.into(),
        }
    }
}

// =============================================================================
// Mapper Errors
// =============================================================================

/// Errors while adding data to a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperError {
    /// The location could not be parsed.
    #[error(transparent)]
    Location(#[from] LocationError),

    /// A sub-element location has no enclosing element to attach to.
    #[error("No '{parent_tag}' element to attach '{location}' to")]
    NoAttachmentTarget { parent_tag: String, location: String },
}

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading tabular input.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown or unusable text encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid delimited-text content.
    #[error("Invalid CSV: {0}")]
    Csv(String),

    /// Workbook could not be opened or read.
    #[error("Invalid workbook: {0}")]
    Workbook(String),

    /// Requested sheet does not exist (1-based).
    #[error("Sheet {0} not found in workbook")]
    SheetNotFound(usize),

    /// Requested row does not exist (1-based).
    #[error("Row {row} out of range (input has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    /// The control row is past the end of the input.
    #[error("Control row {0} not found in input")]
    MissingControlRow(usize),

    /// Empty input.
    #[error("Input file is empty")]
    EmptyFile,
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while serializing or writing a record.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Failed to write file.
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),

    /// XML writer failure.
    #[error("XML error: {0}")]
    Xml(String),

    /// Unknown or unsupported output encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The record contains characters the output encoding cannot represent.
    #[error("Record contains characters not representable in {encoding}")]
    Unencodable { encoding: String },
}

impl From<quick_xml::Error> for OutputError {
    fn from(e: quick_xml::Error) -> Self {
        OutputError::Xml(e.to_string())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::process`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input error.
    #[error("Input error: {0}")]
    Source(#[from] SourceError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Record construction error.
    #[error("Mapping error: {0}")]
    Mapper(#[from] MapperError),

    /// Options that cannot be honored.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for location parsing.
pub type LocationResult<T> = Result<T, LocationError>;

/// Result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// Result type for input operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LocationError -> MapperError -> PipelineError
        let loc_err = LocationError::malformed("asdf", 0, "expected '<'");
        let mapper_err: MapperError = loc_err.into();
        let pipeline_err: PipelineError = mapper_err.into();
        assert!(pipeline_err.to_string().contains("asdf"));

        // SourceError -> PipelineError
        let source_err = SourceError::Encoding("unknown encoding 'klingon'".into());
        let pipeline_err: PipelineError = source_err.into();
        assert!(pipeline_err.to_string().contains("klingon"));
    }

    #[test]
    fn test_malformed_format() {
        let err = LocationError::malformed("<a attr=>", 8, "expected '\"'");
        let msg = err.to_string();
        assert!(msg.contains("<a attr=>"));
        assert!(msg.contains("offset 8"));
    }

    #[test]
    fn test_attachment_error_format() {
        let err = MapperError::NoAttachmentTarget {
            parent_tag: "mods:name".into(),
            location: "<mods:namePart type=\"date\">".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mods:name"));
        assert!(msg.contains("namePart"));
    }
}
