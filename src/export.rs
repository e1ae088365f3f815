//! Delimited-text export of a prediction, one header row and one data row.
//!
//! Output is UTF-8, comma separated, `\n` terminated and uses `.` as decimal separator. Input
//! values are written as submitted (the modification choice as its label) and the capacity
//! with exactly 3 decimals.

use crate::{
    error::{PredictorErr, Result},
    pipeline::{FeatureVector, PredictionRecord, RawValue, RawValues},
    schema::{FieldKind, CHOICE_LABELS, FIELDS, NUM_FEATURES},
};

/// Default name of the downloaded file.
pub const EXPORT_FILE_NAME: &str = "MB_Adsorption_Prediction.csv";

pub const MIME_TYPE: &str = "text/csv";

/// Header of the result column.
pub const RESULT_LABEL: &str = "Predicted Q (mmol/g)";

const DELIMITER: char = ',';

/// A data row read back from exported text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRow {
    pub features: FeatureVector,
    pub predicted_capacity: f64,
}

/// Serializes `record` as a header row and a data row.
///
/// The output only depends on the record, the same record always yields the same bytes.
pub fn to_delimited_text(record: &PredictionRecord) -> Vec<u8> {
    let header = FIELDS
        .iter()
        .map(|f| f.export_label)
        .chain([RESULT_LABEL])
        .map(escape)
        .collect::<Vec<_>>();

    let row = record
        .features()
        .iter()
        .map(|(spec, value)| match spec.kind {
            FieldKind::Number => value.to_string(),
            FieldKind::Choice => CHOICE_LABELS[value as usize].to_string(),
        })
        .chain([format!("{:.3}", record.predicted_capacity())])
        .map(|cell| escape(&cell))
        .collect::<Vec<_>>();

    let delim = DELIMITER.to_string();
    format!("{}\n{}\n", header.join(&delim), row.join(&delim)).into_bytes()
}

/// Parses text produced by [`to_delimited_text`].
///
/// # Errors
/// `Export` if the text isn't a single-row table with the expected header, or `Validation` if
/// an input cell is not a valid value for its field.
pub fn from_delimited_text(bytes: &[u8]) -> Result<ExportedRow> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PredictorErr::Export(format!("not valid UTF-8: {e}")))?;

    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| PredictorErr::Export("missing header row".into()))
        .and_then(split_row)?;
    let row = lines
        .next()
        .ok_or_else(|| PredictorErr::Export("missing data row".into()))
        .and_then(split_row)?;

    if lines.next().is_some() {
        return Err(PredictorErr::Export("expected a single data row".into()));
    }

    let expected = FIELDS.iter().map(|f| f.export_label).chain([RESULT_LABEL]);
    if header.iter().map(String::as_str).ne(expected) {
        return Err(PredictorErr::Export(format!("unexpected header: {header:?}")));
    }
    if row.len() != NUM_FEATURES + 1 {
        return Err(PredictorErr::Export(format!(
            "expected {} columns, got {}",
            NUM_FEATURES + 1,
            row.len()
        )));
    }

    let raw: RawValues = FIELDS
        .iter()
        .zip(&row)
        .map(|(spec, cell)| (spec.key.to_string(), RawValue::Text(cell.clone())))
        .collect();
    let features = FeatureVector::from_raw(&raw)?;

    let cell = &row[NUM_FEATURES];
    let predicted_capacity = cell
        .trim()
        .parse::<f64>()
        .map_err(|_| PredictorErr::Export(format!("'{cell}' is not a capacity")))?;

    Ok(ExportedRow {
        features,
        predicted_capacity,
    })
}

fn escape(cell: &str) -> String {
    if cell.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Splits one line into cells, honouring double-quoted cells.
fn split_row(line: &str) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                cell.push('"');
            }
            '"' if quoted => quoted = false,
            '"' if cell.is_empty() => quoted = true,
            c if c == DELIMITER && !quoted => cells.push(std::mem::take(&mut cell)),
            c => cell.push(c),
        }
    }

    if quoted {
        return Err(PredictorErr::Export(format!("unterminated quote in '{line}'")));
    }

    cells.push(cell);
    Ok(cells)
}
