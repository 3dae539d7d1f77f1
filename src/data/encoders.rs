// src/data/encoders.rs
//
// Column encoders: raw string values to typed features. An encoder is fit
// once against a column's full value set, then applied value by value.

use crate::types::Feature;

use super::DataError;

/// Converts one column's string values into features.
///
/// `encode` may expand a single value into several features (one-hot).
pub trait Encoder {
    /// Whether the encoder is ready to encode without fitting.
    fn is_fit(&self) -> bool {
        true
    }

    /// Learn whatever the encoder needs from the column's values.
    fn fit(&mut self, _values: &[String]) -> Result<(), DataError> {
        Ok(())
    }

    fn encode(&self, value: &str) -> Result<Vec<Feature>, DataError>;
}

/// Parses values as f64.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericEncoder;

impl Encoder for NumericEncoder {
    fn encode(&self, value: &str) -> Result<Vec<Feature>, DataError> {
        let number = value.trim().parse::<f64>().map_err(|_| DataError::Parse {
            column: String::new(),
            value: value.to_string(),
        })?;
        Ok(vec![Feature::Number(number)])
    }
}

/// Passes values through as text.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringEncoder;

impl Encoder for StringEncoder {
    fn encode(&self, value: &str) -> Result<Vec<Feature>, DataError> {
        Ok(vec![Feature::Text(value.to_string())])
    }
}

/// One-hot encodes a categorical column.
///
/// Levels are collected in first-seen order during `fit`. With
/// `singular_if_binary`, a two-level column collapses to a single 0/1
/// feature instead of two complementary ones.
#[derive(Debug, Default, Clone)]
pub struct OneHotEncoder {
    levels: Vec<String>,
    singular_if_binary: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singular_if_binary() -> Self {
        Self {
            levels: Vec::new(),
            singular_if_binary: true,
        }
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }
}

impl Encoder for OneHotEncoder {
    fn is_fit(&self) -> bool {
        !self.levels.is_empty()
    }

    fn fit(&mut self, values: &[String]) -> Result<(), DataError> {
        self.levels.clear();
        for value in values {
            if !self.levels.contains(value) {
                self.levels.push(value.clone());
            }
        }
        Ok(())
    }

    fn encode(&self, value: &str) -> Result<Vec<Feature>, DataError> {
        if self.levels.is_empty() {
            return Err(DataError::NotFit);
        }

        let position =
            self.levels
                .iter()
                .position(|level| level == value)
                .ok_or(DataError::UnknownLevel {
                    value: value.to_string(),
                })?;

        if self.singular_if_binary && self.levels.len() == 2 {
            return Ok(vec![Feature::Number(position as f64)]);
        }

        Ok((0..self.levels.len())
            .map(|i| Feature::Number(if i == position { 1.0 } else { 0.0 }))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_encoder_parses() {
        assert_eq!(
            NumericEncoder.encode("3.5").unwrap(),
            vec![Feature::Number(3.5)]
        );
        assert_eq!(
            NumericEncoder.encode(" 2 ").unwrap(),
            vec![Feature::Number(2.0)]
        );
    }

    #[test]
    fn test_numeric_encoder_rejects_text() {
        assert!(NumericEncoder.encode("abc").is_err());
    }

    #[test]
    fn test_string_encoder_passthrough() {
        assert_eq!(
            StringEncoder.encode("abc").unwrap(),
            vec![Feature::Text("abc".to_string())]
        );
    }

    #[test]
    fn test_one_hot_fit_first_seen_order() {
        let mut encoder = OneHotEncoder::new();
        let values = ["b", "a", "b", "c"].map(String::from);
        encoder.fit(&values).unwrap();
        assert_eq!(encoder.levels(), &["b", "a", "c"]);

        assert_eq!(
            encoder.encode("a").unwrap(),
            vec![
                Feature::Number(0.0),
                Feature::Number(1.0),
                Feature::Number(0.0)
            ]
        );
    }

    #[test]
    fn test_one_hot_unknown_level() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&["a".to_string()]).unwrap();
        assert!(matches!(
            encoder.encode("z"),
            Err(DataError::UnknownLevel { .. })
        ));
    }

    #[test]
    fn test_one_hot_requires_fit() {
        let encoder = OneHotEncoder::new();
        assert!(!encoder.is_fit());
        assert_eq!(encoder.encode("a"), Err(DataError::NotFit));
    }

    #[test]
    fn test_one_hot_singular_binary() {
        let mut encoder = OneHotEncoder::singular_if_binary();
        let values = ["no", "yes"].map(String::from);
        encoder.fit(&values).unwrap();

        assert_eq!(encoder.encode("no").unwrap(), vec![Feature::Number(0.0)]);
        assert_eq!(encoder.encode("yes").unwrap(), vec![Feature::Number(1.0)]);
    }

    #[test]
    fn test_one_hot_singular_only_applies_to_binary() {
        let mut encoder = OneHotEncoder::singular_if_binary();
        let values = ["a", "b", "c"].map(String::from);
        encoder.fit(&values).unwrap();
        assert_eq!(encoder.encode("b").unwrap().len(), 3);
    }
}
