// src/data/csv.rs
//
// CSV parsing and the labeled-column splitter that turns a CSV document
// into (contexts, labels) ready for a classification simulation.

use crate::types::{Action, Context, Feature};

use super::encoders::{Encoder, NumericEncoder, OneHotEncoder};
use super::DataError;

/// Parse CSV text into rows of string fields.
///
/// Handles quoted fields (including embedded commas, newlines, and doubled
/// quotes) and skips blank records.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if row.len() > 1 || !row[0].is_empty() {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        if row.len() > 1 || !row[0].is_empty() {
            rows.push(row);
        }
    }

    rows
}

/// Which column holds the label.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    Index(usize),
    Header(String),
}

/// Splits a CSV document into encoded feature contexts and labels.
///
/// Feature columns get explicit encoders if supplied (positionally, after
/// the label column is removed); otherwise each column is inferred as
/// numeric when every value parses as f64 and one-hot otherwise. Labels
/// stay as text actions. Reading consumes the reader because encoders are
/// fit against the document.
pub struct LabeledCsvReader {
    label: ColumnRef,
    has_header: bool,
    encoders: Vec<Box<dyn Encoder>>,
}

impl LabeledCsvReader {
    pub fn new(label: ColumnRef) -> Self {
        Self {
            label,
            has_header: true,
            encoders: Vec::new(),
        }
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    /// Explicit feature-column encoders; columns beyond the supplied list
    /// fall back to inference.
    pub fn with_encoders(mut self, encoders: Vec<Box<dyn Encoder>>) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn read(mut self, text: &str) -> Result<(Vec<Context>, Vec<Action>), DataError> {
        let mut rows = parse_csv(text);

        let headers: Option<Vec<String>> = if self.has_header {
            if rows.is_empty() {
                return Err(DataError::Empty);
            }
            Some(rows.remove(0))
        } else {
            None
        };

        if rows.is_empty() {
            return Err(DataError::Empty);
        }

        let width = rows[0].len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(DataError::Ragged { row: i });
            }
        }

        let label_index = match &self.label {
            ColumnRef::Index(index) => {
                if *index >= width {
                    return Err(DataError::UnknownColumn {
                        column: index.to_string(),
                    });
                }
                *index
            }
            ColumnRef::Header(name) => headers
                .as_ref()
                .and_then(|headers| headers.iter().position(|h| h == name))
                .ok_or_else(|| DataError::UnknownColumn {
                    column: name.clone(),
                })?,
        };

        // Column-major feature values, label column split out.
        let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); width - 1];
        let mut labels: Vec<Action> = Vec::with_capacity(rows.len());

        for row in rows {
            let mut feature_index = 0;
            for (column_index, value) in row.into_iter().enumerate() {
                if column_index == label_index {
                    labels.push(Action::Text(value));
                } else {
                    columns[feature_index].push(value);
                    feature_index += 1;
                }
            }
        }

        let mut encoded: Vec<Vec<Vec<Feature>>> = Vec::with_capacity(columns.len());
        let mut supplied = std::mem::take(&mut self.encoders).into_iter();

        for (feature_index, values) in columns.iter().enumerate() {
            let mut encoder = supplied.next().unwrap_or_else(|| infer_encoder(values));
            if !encoder.is_fit() {
                encoder.fit(values)?;
            }

            let column_name = column_name(headers.as_deref(), feature_index, label_index);
            let mut column = Vec::with_capacity(values.len());
            for value in values {
                let features = encoder.encode(value).map_err(|error| match error {
                    DataError::Parse { value, .. } => DataError::Parse {
                        column: column_name.clone(),
                        value,
                    },
                    other => other,
                })?;
                column.push(features);
            }
            encoded.push(column);
        }

        let mut contexts = Vec::with_capacity(labels.len());
        for row_index in 0..labels.len() {
            let mut features: Vec<Feature> = Vec::new();
            for column in &encoded {
                features.extend(column[row_index].clone());
            }
            contexts.push(Context::Vector(features));
        }

        Ok((contexts, labels))
    }
}

fn infer_encoder(values: &[String]) -> Box<dyn Encoder> {
    let all_numeric = values
        .iter()
        .all(|value| value.trim().parse::<f64>().is_ok());
    if all_numeric {
        Box::new(NumericEncoder)
    } else {
        Box::new(OneHotEncoder::singular_if_binary())
    }
}

fn column_name(headers: Option<&[String]>, feature_index: usize, label_index: usize) -> String {
    // The feature index skips the label column; undo that to find the
    // original column position.
    let column_index = if feature_index >= label_index {
        feature_index + 1
    } else {
        feature_index
    };
    match headers {
        Some(headers) => headers
            .get(column_index)
            .cloned()
            .unwrap_or_else(|| column_index.to_string()),
        None => column_index.to_string(),
    }
}
