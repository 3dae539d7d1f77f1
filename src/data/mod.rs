// src/data/mod.rs
//
// Mechanical text-to-typed-column conversion: CSV parsing plus column
// encoders, used to turn labeled data files into classification
// simulations.

pub mod csv;
pub mod encoders;

pub use csv::{parse_csv, ColumnRef, LabeledCsvReader};
pub use encoders::{Encoder, NumericEncoder, OneHotEncoder, StringEncoder};

use std::fmt;

/// Errors raised while parsing or encoding tabular data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// The input held no data rows.
    Empty,
    /// A value could not be converted by its column encoder.
    Parse { column: String, value: String },
    /// A categorical value outside the fitted level set.
    UnknownLevel { value: String },
    /// The named label column does not exist.
    UnknownColumn { column: String },
    /// An encoder was used before being fit.
    NotFit,
    /// A row with a different field count than the first row.
    Ragged { row: usize },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Empty => write!(f, "the input contained no data rows"),
            DataError::Parse { column, value } => {
                write!(f, "could not encode '{}' in column '{}'", value, column)
            }
            DataError::UnknownLevel { value } => {
                write!(f, "value '{}' is outside the fitted level set", value)
            }
            DataError::UnknownColumn { column } => {
                write!(f, "no column named '{}'", column)
            }
            DataError::NotFit => write!(f, "encoder used before being fit"),
            DataError::Ragged { row } => {
                write!(f, "row {} has a different field count than the header", row)
            }
        }
    }
}

impl std::error::Error for DataError {}
