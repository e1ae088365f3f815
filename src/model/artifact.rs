use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::Deserialize;

use super::Regressor;
use crate::{
    error::{PredictorErr, Result},
    schema::{self, NUM_FEATURES},
};

/// A serialized estimator as stored on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    GradientBoosting(GradientBoosting),
    Linear(Linear),
}

/// An additive ensemble of regression trees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradientBoosting {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub baseline: f64,
    #[serde(default = "unit_rate")]
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

/// A single regression tree stored as a flat node array, the root at index `0`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go `left`, the rest go `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "go_left")]
        missing_go_to_left: bool,
    },
    Leaf {
        value: f64,
    },
}

/// An affine model `intercept + coefficients · x`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Linear {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

fn unit_rate() -> f64 {
    1.0
}

fn go_left() -> bool {
    true
}

impl Artifact {
    /// Parses an artifact from its JSON representation.
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {e}"))
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            Artifact::GradientBoosting(gb) => gb.feature_names.as_deref(),
            Artifact::Linear(lin) => lin.feature_names.as_deref(),
        }
    }

    /// Checks the artifact's structure against the input schema.
    ///
    /// # Returns
    /// A human-readable reason if the artifact can't be served.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(names) = self.feature_names() {
            let expected: Vec<_> = schema::keys().collect();
            if names.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(format!(
                    "feature order {names:?} does not match the input schema {expected:?}"
                ));
            }
        }

        match self {
            Artifact::GradientBoosting(gb) => gb.validate(),
            Artifact::Linear(lin) => lin.validate(),
        }
    }
}

impl Regressor for Artifact {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        match self {
            Artifact::GradientBoosting(gb) => gb.predict(x),
            Artifact::Linear(lin) => lin.predict(x),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Artifact::GradientBoosting(gb) => gb.kind(),
            Artifact::Linear(lin) => lin.kind(),
        }
    }
}

impl GradientBoosting {
    fn validate(&self) -> std::result::Result<(), String> {
        if !self.baseline.is_finite() || !self.learning_rate.is_finite() {
            return Err("baseline and learning_rate must be finite".into());
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".into());
        }

        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| format!("tree {t}: {e}"))?;
        }

        Ok(())
    }
}

impl Tree {
    fn validate(&self) -> std::result::Result<(), String> {
        let n = self.nodes.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= NUM_FEATURES {
                        return Err(format!(
                            "node {i} splits on feature {feature}, expected < {NUM_FEATURES}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    if left >= n || right >= n {
                        return Err(format!(
                            "node {i} has children ({left}, {right}) outside of {n} nodes"
                        ));
                    }
                }
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(format!("leaf {i} has a non-finite value"));
                }
                Node::Leaf { .. } => {}
            }
        }

        Ok(())
    }

    /// Walks the tree from the root down to a leaf for the given row.
    ///
    /// A walk longer than the number of nodes means the tree has a cycle.
    fn leaf_value(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut idx = 0;

        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx).ok_or_else(|| {
                PredictorErr::Inference(format!("node index {idx} out of bounds"))
            })?;

            match *node {
                Node::Leaf { value } => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_go_to_left,
                } => {
                    let x = *row.get(feature).ok_or_else(|| {
                        PredictorErr::Inference(format!("feature {feature} out of bounds"))
                    })?;

                    let go_left = if x.is_nan() {
                        missing_go_to_left
                    } else {
                        x <= threshold
                    };

                    idx = if go_left { left } else { right };
                }
            }
        }

        Err(PredictorErr::Inference(
            "tree traversal did not reach a leaf".into(),
        ))
    }
}

impl Regressor for GradientBoosting {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_width(&x)?;

        x.axis_iter(Axis(0))
            .map(|row| -> Result<f64> {
                let raw = self
                    .trees
                    .iter()
                    .map(|tree| tree.leaf_value(row))
                    .sum::<Result<f64>>()?;

                Ok(self.baseline + self.learning_rate * raw)
            })
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    fn kind(&self) -> &'static str {
        "gradient_boosting"
    }
}

impl Linear {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.coefficients.len() != NUM_FEATURES {
            return Err(format!(
                "expected {NUM_FEATURES} coefficients, got {}",
                self.coefficients.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("coefficients must be finite".into());
        }

        Ok(())
    }
}

impl Regressor for Linear {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        check_width(&x)?;

        let coefficients = ArrayView1::from(&self.coefficients[..]);
        Ok(x.dot(&coefficients) + self.intercept)
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

fn check_width(x: &ArrayView2<f64>) -> Result<()> {
    if x.ncols() != NUM_FEATURES {
        return Err(PredictorErr::Inference(format!(
            "expected {NUM_FEATURES} features per row, got {}",
            x.ncols()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    missing_go_to_left: true,
                },
                Node::Leaf { value: low },
                Node::Leaf { value: high },
            ],
        }
    }

    fn row(values: [f64; NUM_FEATURES]) -> Array2<f64> {
        Array2::from_shape_vec((1, NUM_FEATURES), values.to_vec()).unwrap()
    }

    #[test]
    fn test_split_threshold_is_inclusive_on_the_left() {
        let gb = GradientBoosting {
            feature_names: None,
            baseline: 1.0,
            learning_rate: 1.0,
            trees: vec![stump(8, 400.0, 0.25, 0.75)],
        };

        let mut x = row([0.; NUM_FEATURES]);
        x[[0, 8]] = 400.0;
        assert_eq!(gb.predict(x.view()).unwrap()[0], 1.25);

        x[[0, 8]] = 400.5;
        assert_eq!(gb.predict(x.view()).unwrap()[0], 1.75);
    }

    #[test]
    fn test_nan_follows_missing_direction() {
        let mut tree = stump(0, 1.0, -1.0, 1.0);
        if let Node::Split {
            missing_go_to_left, ..
        } = &mut tree.nodes[0]
        {
            *missing_go_to_left = false;
        }

        let gb = GradientBoosting {
            feature_names: None,
            baseline: 0.0,
            learning_rate: 1.0,
            trees: vec![tree],
        };

        let mut x = row([0.; NUM_FEATURES]);
        x[[0, 0]] = f64::NAN;
        assert_eq!(gb.predict(x.view()).unwrap()[0], 1.0);
    }

    #[test]
    fn test_ensemble_sums_scaled_leaves() {
        let gb = GradientBoosting {
            feature_names: None,
            baseline: 0.5,
            learning_rate: 0.1,
            trees: vec![stump(0, 100.0, 1.0, 2.0), stump(9, 7.0, 3.0, 4.0)],
        };

        let x = row([180., 6., 0.1, 0., 60., 0.5, 0.3, 0.2, 400., 7., 25., 100.]);
        let y = gb.predict(x.view()).unwrap();
        assert!((y[0] - (0.5 + 0.1 * (2.0 + 3.0))).abs() < 1e-12);
    }

    #[test]
    fn test_cycle_is_an_inference_error() {
        let gb = GradientBoosting {
            feature_names: None,
            baseline: 0.0,
            learning_rate: 1.0,
            trees: vec![Tree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                    missing_go_to_left: true,
                }],
            }],
        };

        let x = row([0.; NUM_FEATURES]);
        assert!(matches!(
            gb.predict(x.view()),
            Err(PredictorErr::Inference(_))
        ));
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let lin = Linear {
            feature_names: None,
            intercept: 0.0,
            coefficients: vec![1.0; NUM_FEATURES],
        };

        let x = Array2::<f64>::zeros((1, 3));
        assert!(matches!(
            lin.predict(x.view()),
            Err(PredictorErr::Inference(_))
        ));
    }

    #[test]
    fn test_linear_prediction() {
        let mut coefficients = vec![0.0; NUM_FEATURES];
        coefficients[0] = 0.01;
        coefficients[9] = -0.5;
        let lin = Linear {
            feature_names: None,
            intercept: 2.0,
            coefficients,
        };

        let x = row([200., 6., 0.1, 0., 60., 0.5, 0.3, 0.2, 400., 4., 25., 100.]);
        let y = lin.predict(x.view()).unwrap();
        assert!((y[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_tagged_artifact() {
        let json = br#"{
            "kind": "gradient_boosting",
            "baseline": 0.3,
            "trees": [{ "nodes": [
                { "feature": 2, "threshold": 0.05, "left": 1, "right": 2 },
                { "value": 0.1 },
                { "value": -0.1 }
            ]}]
        }"#;

        let artifact = Artifact::from_slice(json).unwrap();
        artifact.validate().unwrap();

        let Artifact::GradientBoosting(gb) = &artifact else {
            panic!("expected a gradient boosting artifact");
        };
        assert_eq!(gb.learning_rate, 1.0);
        assert_eq!(gb.trees[0], stump(2, 0.05, 0.1, -0.1));
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        let out_of_range_child = Artifact::GradientBoosting(GradientBoosting {
            feature_names: None,
            baseline: 0.0,
            learning_rate: 1.0,
            trees: vec![Tree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 5,
                    missing_go_to_left: true,
                }],
            }],
        });
        assert!(out_of_range_child.validate().is_err());

        let unknown_feature = Artifact::GradientBoosting(GradientBoosting {
            feature_names: None,
            baseline: 0.0,
            learning_rate: 1.0,
            trees: vec![stump(NUM_FEATURES, 0.0, 0.0, 0.0)],
        });
        assert!(unknown_feature.validate().is_err());

        let short_linear = Artifact::Linear(Linear {
            feature_names: None,
            intercept: 0.0,
            coefficients: vec![1.0; 11],
        });
        assert!(short_linear.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_permuted_feature_names() {
        let mut names: Vec<String> = schema::keys().map(String::from).collect();
        let lin = |names: Vec<String>| {
            Artifact::Linear(Linear {
                feature_names: Some(names),
                intercept: 0.0,
                coefficients: vec![0.0; NUM_FEATURES],
            })
        };

        assert!(lin(names.clone()).validate().is_ok());

        names.swap(1, 3);
        assert!(lin(names).validate().is_err());
    }
}
