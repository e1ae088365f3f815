use std::collections::BTreeMap;

use log::{debug, info, warn};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::{
    error::{PredictorErr, Result, ValidationReason},
    model::ModelHandle,
    schema::{self, FieldKind, FieldSpec, CHOICE_LABELS, FIELDS, NUM_FEATURES},
};

/// A value as submitted by the form, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Submitted values keyed by field key.
pub type RawValues = BTreeMap<String, RawValue>;

impl RawValue {
    /// Converts a JSON form value, anything but a number, boolean or string is rejected.
    ///
    /// # Arguments
    /// * `key` - The field the value was submitted for, named in the error.
    /// * `value` - The submitted JSON value.
    pub fn from_json(key: &str, value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number).ok_or_else(|| {
                PredictorErr::validation(key, ValidationReason::NotNumeric { got: n.to_string() })
            }),
            serde_json::Value::Bool(b) => Ok(RawValue::Flag(b)),
            serde_json::Value::String(s) => Ok(RawValue::Text(s)),
            other => Err(PredictorErr::validation(
                key,
                ValidationReason::NotNumeric {
                    got: other.to_string(),
                },
            )),
        }
    }
}

/// Converts a JSON object of submitted values, naming the first field whose value has the
/// wrong JSON type.
pub fn raw_values_from_json(
    doc: serde_json::Map<String, serde_json::Value>,
) -> Result<RawValues> {
    doc.into_iter()
        .map(|(key, value)| -> Result<(String, RawValue)> {
            let raw = RawValue::from_json(&key, value)?;
            Ok((key, raw))
        })
        .collect()
}

/// A validated feature vector in training order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    /// Creates a new `FeatureVector` from values already in training order.
    ///
    /// # Errors
    /// A validation error naming the first field that is non-finite or out of range.
    pub fn new(values: [f64; NUM_FEATURES]) -> Result<Self> {
        for (spec, &value) in FIELDS.iter().zip(&values) {
            check_range(spec, value)?;
            if spec.kind == FieldKind::Choice && value != 0. && value != 1. {
                return Err(PredictorErr::validation(
                    spec.key,
                    ValidationReason::InvalidChoice {
                        got: value.to_string(),
                    },
                ));
            }
        }

        Ok(Self { values })
    }

    /// Validates submitted values and assembles them in training order.
    ///
    /// Every schema field must be present; nothing is filled in from defaults.
    ///
    /// # Errors
    /// A validation error naming the first offending field.
    pub fn from_raw(raw: &RawValues) -> Result<Self> {
        let mut values = [0.; NUM_FEATURES];

        for (spec, slot) in FIELDS.iter().zip(values.iter_mut()) {
            let value = raw
                .get(spec.key)
                .ok_or_else(|| PredictorErr::validation(spec.key, ValidationReason::Missing))?;

            *slot = match spec.kind {
                FieldKind::Number => coerce_number(spec, value)?,
                FieldKind::Choice => coerce_choice(spec, value)?,
            };
        }

        if let Some(key) = raw.keys().find(|key| schema::field(key).is_none()) {
            return Err(PredictorErr::validation(
                key.as_str(),
                ValidationReason::Unknown,
            ));
        }

        Ok(Self { values })
    }

    /// Returns the value of the field with the given key.
    pub fn get(&self, key: &str) -> Option<f64> {
        schema::position(key).map(|i| self.values[i])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Iterates over the fields and their values in training order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldSpec, f64)> + '_ {
        FIELDS.iter().zip(self.values.iter().copied())
    }
}

fn check_range(spec: &FieldSpec, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(PredictorErr::validation(
            spec.key,
            ValidationReason::NotNumeric {
                got: value.to_string(),
            },
        ));
    }

    if !spec.contains(value) {
        return Err(PredictorErr::validation(
            spec.key,
            ValidationReason::OutOfRange {
                value,
                min: spec.minimum,
                max: spec.maximum,
            },
        ));
    }

    Ok(())
}

fn coerce_number(spec: &FieldSpec, value: &RawValue) -> Result<f64> {
    let x = match value {
        RawValue::Number(x) => *x,
        RawValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            PredictorErr::validation(spec.key, ValidationReason::NotNumeric { got: s.clone() })
        })?,
        RawValue::Flag(b) => {
            return Err(PredictorErr::validation(
                spec.key,
                ValidationReason::NotNumeric { got: b.to_string() },
            ))
        }
    };

    check_range(spec, x)?;
    Ok(x)
}

fn coerce_choice(spec: &FieldSpec, value: &RawValue) -> Result<f64> {
    let invalid = |got: String| {
        PredictorErr::validation(spec.key, ValidationReason::InvalidChoice { got })
    };

    match value {
        RawValue::Flag(b) => Ok(if *b { 1. } else { 0. }),
        RawValue::Number(x) if *x == 0. || *x == 1. => Ok(*x),
        RawValue::Number(x) => {
            check_range(spec, *x)?;
            Err(invalid(x.to_string()))
        }
        RawValue::Text(s) => {
            let s = s.trim();
            CHOICE_LABELS
                .iter()
                .position(|label| *label == s)
                .map(|i| i as f64)
                .or_else(|| s.parse::<f64>().ok().filter(|x| *x == 0. || *x == 1.))
                .ok_or_else(|| invalid(s.to_string()))
        }
    }
}

/// Rounds to the precision shown to the user and exported.
pub fn round_capacity(q: f64) -> f64 {
    (q * 1000.).round() / 1000.
}

/// The outcome of one successful prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    features: FeatureVector,
    raw_capacity: f64,
    predicted_capacity: f64,
}

impl PredictionRecord {
    /// Creates a new `PredictionRecord`, rounding the model's output.
    pub fn new(features: FeatureVector, raw_capacity: f64) -> Self {
        Self {
            features,
            raw_capacity,
            predicted_capacity: round_capacity(raw_capacity),
        }
    }

    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    /// The predicted adsorption capacity in mmol/g, rounded to 3 decimals.
    pub fn predicted_capacity(&self) -> f64 {
        self.predicted_capacity
    }

    /// The model's output before rounding.
    pub fn raw_capacity(&self) -> f64 {
        self.raw_capacity
    }

    /// The result line shown to the user.
    pub fn summary(&self) -> String {
        format!(
            "Predicted Adsorption Capacity: {:.3} mmol/g",
            self.predicted_capacity
        )
    }
}

/// Validates `raw`, runs the model on the assembled vector and rounds its output.
///
/// The model is never invoked unless every field is valid.
///
/// # Arguments
/// * `model` - The loaded estimator.
/// * `raw` - The submitted values, exactly the schema fields.
///
/// # Errors
/// `Validation` naming the offending field, or `Inference` if the model fails or returns a
/// malformed result.
pub fn predict(model: &ModelHandle, raw: &RawValues) -> Result<PredictionRecord> {
    let features = FeatureVector::from_raw(raw).inspect_err(|e| warn!("rejected input: {e}"))?;
    debug!("assembled features {:?}", features.as_slice());

    let q = infer(model, &features).inspect_err(|e| warn!("{e}"))?;

    let record = PredictionRecord::new(features, q);
    info!(capacity = record.predicted_capacity(); "prediction succeeded");
    Ok(record)
}

fn infer(model: &ModelHandle, features: &FeatureVector) -> Result<f64> {
    let x = ArrayView2::from_shape((1, NUM_FEATURES), features.as_slice())
        .map_err(|e| PredictorErr::Inference(e.to_string()))?;

    let y = model.predict(x).map_err(|e| match e {
        e @ PredictorErr::Inference(_) => e,
        other => PredictorErr::Inference(other.to_string()),
    })?;

    if y.len() != 1 {
        return Err(PredictorErr::Inference(format!(
            "expected a single output, got {}",
            y.len()
        )));
    }

    let q = y[0];
    if !round_capacity(q).is_finite() {
        return Err(PredictorErr::Inference(format!(
            "model returned a value that cannot be rounded: {q}"
        )));
    }

    Ok(q)
}
