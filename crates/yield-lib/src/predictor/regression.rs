//! Regression models stored as JSON parameters
//!
//! Linear models are a dot product plus intercept. Boosted ensembles are
//! flat node arrays; sklearn gradient boosting sends `x <= threshold` left,
//! XGBoost sends `x < threshold` left.

use super::features::ScaledVector;
use super::Regressor;
use crate::error::{PipelineError, Result};
use serde::Deserialize;

/// Which side of a split an exactly-equal value falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    LessOrEqual,
    Less,
}

impl SplitRule {
    fn goes_left(&self, value: f64, threshold: f64) -> bool {
        match self {
            SplitRule::LessOrEqual => value <= threshold,
            SplitRule::Less => value < threshold,
        }
    }
}

/// One node of a regression tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Structural checks: children point forward and stay in range, split
    /// features fit the input width, leaf values are finite.
    fn validate(&self, input_width: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Leaf { value } = node {
                if !value.is_finite() {
                    return Err(format!("leaf {} has a non-finite value", idx));
                }
            }
            if let TreeNode::Split {
                feature,
                left,
                right,
                threshold,
            } = node
            {
                if *feature >= input_width {
                    return Err(format!(
                        "node {} splits on feature {} but input has {} features",
                        idx, feature, input_width
                    ));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has a non-finite threshold", idx));
                }
                for child in [left, right] {
                    if *child <= idx || *child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child index {}", idx, child));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf
    pub fn evaluate(&self, features: &[f64], rule: SplitRule) -> Result<f64> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).ok_or_else(|| {
                        PipelineError::inference(format!(
                            "split on feature {} but input has {} features",
                            feature,
                            features.len()
                        ))
                    })?;
                    idx = if rule.goes_left(*value, *threshold) {
                        *left
                    } else {
                        *right
                    };
                }
                None => {
                    return Err(PipelineError::inference(format!(
                        "tree node {} does not exist",
                        idx
                    )))
                }
            }
        }
    }
}

/// Regression model decoded from a JSON artifact
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionModel {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    },
    Xgboost {
        base_score: f64,
        trees: Vec<RegressionTree>,
    },
}

impl RegressionModel {
    /// Check the parameters against the width of the scaled input
    pub fn validate(&self, input_width: usize) -> std::result::Result<(), String> {
        match self {
            RegressionModel::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != input_width {
                    return Err(format!(
                        "model has {} coefficients but input has {} features",
                        coefficients.len(),
                        input_width
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("non-finite model parameter".to_string());
                }
                Ok(())
            }
            RegressionModel::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => {
                if !init.is_finite() || !learning_rate.is_finite() {
                    return Err("non-finite model parameter".to_string());
                }
                Self::validate_trees(trees, input_width)
            }
            RegressionModel::Xgboost { base_score, trees } => {
                if !base_score.is_finite() {
                    return Err("non-finite model parameter".to_string());
                }
                Self::validate_trees(trees, input_width)
            }
        }
    }

    fn validate_trees(
        trees: &[RegressionTree],
        input_width: usize,
    ) -> std::result::Result<(), String> {
        if trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        trees.iter().enumerate().try_for_each(|(i, tree)| {
            tree.validate(input_width)
                .map_err(|e| format!("tree {}: {}", i, e))
        })
    }

    fn sum_trees(trees: &[RegressionTree], features: &[f64], rule: SplitRule) -> Result<f64> {
        trees
            .iter()
            .map(|tree| tree.evaluate(features, rule))
            .sum()
    }
}

impl Regressor for RegressionModel {
    fn predict(&self, input: &ScaledVector) -> Result<f64> {
        let x = input.values();
        match self {
            RegressionModel::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != x.len() {
                    return Err(PipelineError::inference(format!(
                        "model has {} coefficients but input has {} features",
                        coefficients.len(),
                        x.len()
                    )));
                }
                let dot: f64 = coefficients.iter().zip(x).map(|(c, v)| c * v).sum();
                Ok(dot + intercept)
            }
            RegressionModel::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => Ok(init + learning_rate * Self::sum_trees(trees, x, SplitRule::LessOrEqual)?),
            RegressionModel::Xgboost { base_score, trees } => {
                Ok(base_score + Self::sum_trees(trees, x, SplitRule::Less)?)
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RegressionModel::Linear { .. } => "linear",
            RegressionModel::GradientBoosting { .. } => "gradient_boosting",
            RegressionModel::Xgboost { .. } => "xgboost",
        }
    }
}
