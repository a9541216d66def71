//! Transformation module.
//!
//! This module turns spreadsheet cells into MODS records:
//! - Location: location string parser
//! - Mapper: cell values to record elements
//! - Dates: date cell normalization
//! - Pipeline: batch conversion of an input file

pub mod dates;
pub mod location;
pub mod mapper;
pub mod pipeline;

pub use dates::{normalize_cell, normalize_text};
pub use location::{parse as parse_location, ElementSpec, Location, Section};
pub use mapper::{implied_parent, RecordMapper};
pub use pipeline::*;
