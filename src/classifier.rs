//! Pre-trained classifiers over bag-of-words features.
//!
//! JSON artifacts carry the parameters of a multinomial naive Bayes or a
//! linear model; anything with an `.onnx` extension is run through tract.

use std::fmt;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Deserialize;
use tract_onnx::prelude::*;
use tracing::info;

use crate::error::{Result, SpamhamError};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    MultinomialNb {
        classes: Vec<i64>,
        class_log_prior: Vec<f64>,
        feature_log_prob: Vec<Vec<f64>>,
    },
    Linear {
        classes: Vec<i64>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
}

pub enum Classifier {
    MultinomialNb {
        classes: Vec<i64>,
        class_log_prior: Array1<f64>,
        feature_log_prob: Array2<f64>,
    },
    Linear {
        classes: Vec<i64>,
        coef: Array2<f64>,
        intercept: Array1<f64>,
    },
    Onnx {
        plan: OnnxPlan,
        n_features: usize,
    },
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("kind", &self.kind())
            .field("n_features", &self.n_features())
            .finish()
    }
}

impl Classifier {
    /// Builds a classifier over `n_features` columns from its parameters.
    pub fn from_artifact(
        artifact: ClassifierArtifact,
        n_features: usize,
    ) -> std::result::Result<Self, String> {
        match artifact {
            ClassifierArtifact::MultinomialNb {
                classes,
                class_log_prior,
                feature_log_prob,
            } => {
                let feature_log_prob = to_matrix(feature_log_prob, n_features)?;
                if classes.len() != feature_log_prob.nrows() || classes.len() != class_log_prior.len() {
                    return Err(format!(
                        "{} classes but {} priors and {} feature rows",
                        classes.len(),
                        class_log_prior.len(),
                        feature_log_prob.nrows()
                    ));
                }
                Ok(Classifier::MultinomialNb {
                    classes,
                    class_log_prior: Array1::from(class_log_prior),
                    feature_log_prob,
                })
            }
            ClassifierArtifact::Linear {
                classes,
                coef,
                intercept,
            } => {
                let coef = to_matrix(coef, n_features)?;
                if coef.nrows() != intercept.len() {
                    return Err(format!(
                        "{} coefficient rows but {} intercepts",
                        coef.nrows(),
                        intercept.len()
                    ));
                }
                let expected_classes = if coef.nrows() == 1 { 2 } else { coef.nrows() };
                if classes.len() != expected_classes {
                    return Err(format!(
                        "expected {} classes, found {}",
                        expected_classes,
                        classes.len()
                    ));
                }
                Ok(Classifier::Linear {
                    classes,
                    coef,
                    intercept: Array1::from(intercept),
                })
            }
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, n_features: usize) -> Result<Self> {
        let path = path.as_ref();
        let classifier = if path.extension().is_some_and(|ext| ext == "onnx") {
            Self::load_onnx(path, n_features)?
        } else {
            let content = std::fs::read(path).map_err(|source| SpamhamError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let artifact: ClassifierArtifact =
                serde_json::from_slice(&content).map_err(|e| SpamhamError::artifact(path, e))?;
            Self::from_artifact(artifact, n_features).map_err(|e| SpamhamError::artifact(path, e))?
        };

        info!(path = %path.display(), kind = classifier.kind(), n_features, "Loaded classifier");
        Ok(classifier)
    }

    fn load_onnx(path: &Path, n_features: usize) -> Result<Self> {
        if !path.exists() {
            return Err(SpamhamError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n_features]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| SpamhamError::artifact(path, e))?;

        Ok(Classifier::Onnx { plan, n_features })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::MultinomialNb { .. } => "multinomial_nb",
            Classifier::Linear { .. } => "linear",
            Classifier::Onnx { .. } => "onnx",
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Classifier::MultinomialNb { feature_log_prob, .. } => feature_log_prob.ncols(),
            Classifier::Linear { coef, .. } => coef.ncols(),
            Classifier::Onnx { n_features, .. } => *n_features,
        }
    }

    /// Predicts one class per row of `features`.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<i64>> {
        if features.ncols() != self.n_features() {
            return Err(SpamhamError::Inference(format!(
                "expected {} features, got {}",
                self.n_features(),
                features.ncols()
            )));
        }

        match self {
            Classifier::MultinomialNb {
                classes,
                class_log_prior,
                feature_log_prob,
            } => {
                let joint_log_likelihood = features.dot(&feature_log_prob.t()) + class_log_prior;
                Ok(argmax_rows(&joint_log_likelihood, classes))
            }
            Classifier::Linear {
                classes,
                coef,
                intercept,
            } => {
                let scores = features.dot(&coef.t()) + intercept;
                if coef.nrows() == 1 {
                    Ok(scores
                        .column(0)
                        .iter()
                        .map(|&score| if score > 0.0 { classes[1] } else { classes[0] })
                        .collect())
                } else {
                    Ok(argmax_rows(&scores, classes))
                }
            }
            Classifier::Onnx { plan, n_features } => features
                .axis_iter(Axis(0))
                .map(|row| run_onnx(plan, *n_features, row))
                .collect(),
        }
    }
}

fn to_matrix(rows: Vec<Vec<f64>>, n_features: usize) -> std::result::Result<Array2<f64>, String> {
    if rows.is_empty() {
        return Err("no parameter rows".to_string());
    }
    if let Some(row) = rows.iter().find(|row| row.len() != n_features) {
        return Err(format!(
            "parameter row has {} columns, vectorizer has {} features",
            row.len(),
            n_features
        ));
    }
    let n_rows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_features), flat).map_err(|e| e.to_string())
}

fn argmax_rows(scores: &Array2<f64>, classes: &[i64]) -> Vec<i64> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let (best, _) = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best, max), (i, &value)| {
                    if value > max {
                        (i, value)
                    } else {
                        (best, max)
                    }
                });
            classes[best]
        })
        .collect()
}

fn run_onnx(plan: &OnnxPlan, n_features: usize, row: ArrayView1<f64>) -> Result<i64> {
    let input: Vec<f32> = row.iter().map(|&v| v as f32).collect();
    let tensor = tract_ndarray::Array::from_shape_vec((1, n_features), input)
        .map_err(|e| SpamhamError::Inference(e.to_string()))?
        .into_tensor();

    let outputs = plan
        .run(tvec!(tensor.into()))
        .map_err(|e| SpamhamError::Inference(e.to_string()))?;
    let output = outputs
        .first()
        .ok_or_else(|| SpamhamError::Inference("model produced no outputs".to_string()))?;

    if let Ok(labels) = output.to_array_view::<i64>() {
        return labels
            .iter()
            .next()
            .copied()
            .ok_or_else(|| SpamhamError::Inference("empty label output".to_string()));
    }

    let scores = output
        .to_array_view::<f32>()
        .map_err(|e| SpamhamError::Inference(e.to_string()))?;
    match scores.len() {
        0 => Err(SpamhamError::Inference("empty score output".to_string())),
        // single probability of the positive class
        1 => Ok(i64::from(scores.iter().all(|&p| p > 0.5))),
        // one score per class, with the column index taken as the class label;
        // graphs must order their classes as 0, 1, ... for 1 to mean spam
        _ => Ok(scores
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |(best, max), (i, &value)| {
                if value > max {
                    (i, value)
                } else {
                    (best, max)
                }
            })
            .0 as i64),
    }
}
