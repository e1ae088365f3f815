//! The fixed set of input fields the adsorption model is trained on.
//!
//! [`FIELDS`] is declared in the exact column order the deployed estimator expects; the
//! prediction pipeline assembles feature vectors by walking it front to back.

use serde::Serialize;

use crate::pipeline::{RawValue, RawValues};

/// Number of features the model consumes.
pub const NUM_FEATURES: usize = 12;

/// Labels of the two-valued surface modification choice, indexed by their encoded value.
pub const CHOICE_LABELS: [&str; 2] = ["No", "Yes"];

/// Where a field is grouped on the input form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Section {
    Synthesis,
    Material,
    Adsorption,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Synthesis => "Synthesis Conditions",
            Section::Material => "Material Properties",
            Section::Adsorption => "Adsorption Conditions",
        }
    }
}

/// How a field's value is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    /// A free numeric input bounded by the field's range.
    Number,
    /// A two-valued choice encoded as `0` or `1`.
    Choice,
}

/// Declarative description of one input field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Short name used when submitting values.
    pub key: &'static str,
    /// Human-readable form label.
    pub label: &'static str,
    /// Column header used in exported results.
    pub export_label: &'static str,
    pub unit: &'static str,
    pub minimum: f64,
    pub maximum: f64,
    pub default: f64,
    pub step: f64,
    pub kind: FieldKind,
    pub section: Section,
}

impl FieldSpec {
    /// Whether `value` lies in this field's closed interval.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.minimum && value <= self.maximum
    }
}

const fn number(
    key: &'static str,
    label: &'static str,
    export_label: &'static str,
    unit: &'static str,
    range: (f64, f64),
    default: f64,
    step: f64,
    section: Section,
) -> FieldSpec {
    FieldSpec {
        key,
        label,
        export_label,
        unit,
        minimum: range.0,
        maximum: range.1,
        default,
        step,
        kind: FieldKind::Number,
        section,
    }
}

/// The model's input fields in training order.
pub const FIELDS: [FieldSpec; NUM_FEATURES] = [
    number(
        "T_H",
        "Hydrothermal Temperature (°C)",
        "T_H (°C)",
        "°C",
        (80., 300.),
        180.,
        1.,
        Section::Synthesis,
    ),
    number(
        "time",
        "Reaction Time (h)",
        "Time (h)",
        "h",
        (0.5, 48.),
        6.,
        0.5,
        Section::Synthesis,
    ),
    number(
        "ratio",
        "Solid-to-liquid Ratio (g/mL)",
        "S/L Ratio",
        "g/mL",
        (0.01, 1.),
        0.1,
        0.01,
        Section::Synthesis,
    ),
    FieldSpec {
        key: "modified",
        label: "Surface Modification Applied?",
        export_label: "Modified",
        unit: "",
        minimum: 0.,
        maximum: 1.,
        default: 0.,
        step: 1.,
        kind: FieldKind::Choice,
        section: Section::Synthesis,
    },
    number(
        "C",
        "Carbon Content (wt%)",
        "C (wt%)",
        "wt%",
        (10., 90.),
        60.,
        0.5,
        Section::Material,
    ),
    number(
        "ONC",
        "Molar Ratio (O+N)/C",
        "(O+N)/C",
        "",
        (0.01, 2.),
        0.5,
        0.01,
        Section::Material,
    ),
    number(
        "HC",
        "Molar Ratio H/C",
        "H/C",
        "",
        (0.01, 2.),
        0.3,
        0.01,
        Section::Material,
    ),
    number(
        "OC",
        "Molar Ratio O/C",
        "O/C",
        "",
        (0.01, 2.),
        0.2,
        0.01,
        Section::Material,
    ),
    number(
        "BET",
        "BET Surface Area (m²/g)",
        "BET (m²/g)",
        "m²/g",
        (5., 2000.),
        400.,
        10.,
        Section::Material,
    ),
    number(
        "pH",
        "Solution pH",
        "pH",
        "",
        (1., 14.),
        7.,
        0.1,
        Section::Adsorption,
    ),
    number(
        "T",
        "Adsorption Temperature (°C)",
        "T (°C)",
        "°C",
        (10., 60.),
        25.,
        1.,
        Section::Adsorption,
    ),
    number(
        "C0",
        "Initial Dye/Adsorbent Ratio (mg/g)",
        "C₀ (mg/g)",
        "mg/g",
        (0.1, 500.),
        100.,
        1.,
        Section::Adsorption,
    ),
];

/// Looks up a field by its submission key.
pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}

/// Returns the position of `key` in the model's input vector.
pub fn position(key: &str) -> Option<usize> {
    FIELDS.iter().position(|f| f.key == key)
}

/// The submission keys in training order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|f| f.key)
}

/// Builds the initial form state, every field set to its default.
pub fn defaults() -> RawValues {
    FIELDS
        .iter()
        .map(|f| {
            let value = match f.kind {
                FieldKind::Number => RawValue::Number(f.default),
                FieldKind::Choice => RawValue::Text(CHOICE_LABELS[f.default as usize].to_string()),
            };
            (f.key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn keys_are_unique() {
        let unique: HashSet<_> = keys().collect();
        assert_eq!(unique.len(), NUM_FEATURES);
    }

    #[test]
    fn defaults_lie_within_ranges() {
        for f in &FIELDS {
            assert!(f.minimum < f.maximum, "{}", f.key);
            assert!(f.contains(f.default), "{}", f.key);
            assert!(f.step > 0., "{}", f.key);
        }
    }

    #[test]
    fn training_order_is_fixed() {
        let order: Vec<_> = keys().collect();
        assert_eq!(
            order,
            ["T_H", "time", "ratio", "modified", "C", "ONC", "HC", "OC", "BET", "pH", "T", "C0"]
        );
    }

    #[test]
    fn modification_is_the_only_choice() {
        let choices: Vec<_> = FIELDS
            .iter()
            .filter(|f| f.kind == FieldKind::Choice)
            .map(|f| f.key)
            .collect();
        assert_eq!(choices, ["modified"]);
        assert_eq!(position("modified"), Some(3));
    }

    #[test]
    fn sections_group_consecutive_fields() {
        let sections: Vec<_> = FIELDS.iter().map(|f| f.section).collect();
        assert!(sections[..4].iter().all(|s| *s == Section::Synthesis));
        assert!(sections[4..9].iter().all(|s| *s == Section::Material));
        assert!(sections[9..].iter().all(|s| *s == Section::Adsorption));
    }

    #[test]
    fn defaults_cover_every_field() {
        let values = defaults();
        assert_eq!(values.len(), NUM_FEATURES);
        assert_eq!(values["modified"], RawValue::Text("No".into()));
        assert_eq!(values["BET"], RawValue::Number(400.));
    }
}
