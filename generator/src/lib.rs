//! # mods-generator - MODS records from spreadsheets
//!
//! Builds one MODS XML record per spreadsheet row. A control row holds one
//! *location string* per column, telling where the column's values go in
//! the record.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ xlsx / csv  │────▶│   Parser    │────▶│   Mapper    │────▶│  .mods XML  │
//! │ (any enc.)  │     │ (ctrl row)  │     │ (locations) │     │  (per row)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mods_generator::{serialize, RecordMapper};
//!
//! let mut mapper = RecordMapper::new();
//! mapper
//!     .add_data("<mods:titleInfo><mods:title>#<mods:partName>", "Statutes#part 1")
//!     .unwrap();
//!
//! let xml = serialize(mapper.document(), true).unwrap();
//! assert!(xml.contains("<mods:partName>part 1</mods:partName>"));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - MODS document tree
//! - [`parser`] - Spreadsheet and CSV input
//! - [`transform`] - Locations, mapping, dates and the batch pipeline
//! - [`output`] - XML serialization and record files
//! - [`logs`] - Console and file logs

// Core modules
pub mod error;
pub mod models;

// Input
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod output;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    LocationError,
    MapperError,
    OutputError,
    PipelineError,
    SourceError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Attributes, Element, ModsDocument};

// =============================================================================
// Re-exports - Input
// =============================================================================

pub use parser::{
    Cell,
    DataHandler,
    DataRow,
    SourceOptions,
    decode_content,
    detect_delimiter,
    detect_encoding,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    normalize_text,
    parse_location,
    Location,
    RecordMapper,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process,
    process_handler,
    ProcessOptions,
    ProcessSummary,
    RecordKind,
    SkippedRecord,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{encode, serialize, write_record};
