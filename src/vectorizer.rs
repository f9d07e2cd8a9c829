//! Bag-of-words vectorizer loaded from a fitted artifact.

use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use serde::Deserialize;
use tracing::info;

use crate::error::{Result, SpamhamError};
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk form of a fitted count or tf-idf vectorizer.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
    #[serde(default)]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
}

#[derive(Debug, Clone)]
pub struct Vectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f64>>,
    norm: Option<Norm>,
    binary: bool,
    sublinear_tf: bool,
}

impl Vectorizer {
    pub fn from_artifact(artifact: VectorizerArtifact) -> std::result::Result<Self, String> {
        let n_features = artifact.vocabulary.len();
        if n_features == 0 {
            return Err("empty vocabulary".to_string());
        }
        if let Some((token, index)) = artifact
            .vocabulary
            .iter()
            .find(|&(_, &index)| index >= n_features)
        {
            return Err(format!(
                "column {} for {:?} is out of range for {} features",
                index, token, n_features
            ));
        }
        if let Some(idf) = &artifact.idf {
            if idf.len() != n_features {
                return Err(format!(
                    "idf has {} weights for {} features",
                    idf.len(),
                    n_features
                ));
            }
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            norm: artifact.norm,
            binary: artifact.binary,
            sublinear_tf: artifact.sublinear_tf,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| SpamhamError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: VectorizerArtifact =
            serde_json::from_slice(&content).map_err(|e| SpamhamError::artifact(path, e))?;
        let vectorizer = Self::from_artifact(artifact).map_err(|e| SpamhamError::artifact(path, e))?;

        info!(
            path = %path.display(),
            features = vectorizer.n_features(),
            tfidf = vectorizer.idf.is_some(),
            "Loaded vectorizer"
        );
        Ok(vectorizer)
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// One row per input text, one column per vocabulary entry.
    pub fn transform<S: AsRef<str>>(&self, tokenizer: &Tokenizer, texts: &[S]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((texts.len(), self.n_features()));

        for (i, text) in texts.iter().enumerate() {
            let mut row = matrix.row_mut(i);
            for token in tokenizer.tokenize(text.as_ref()) {
                if let Some(&column) = self.vocabulary.get(&token) {
                    row[column] += 1.0;
                }
            }

            row.mapv_inplace(|tf| {
                if tf == 0.0 {
                    tf
                } else if self.binary {
                    1.0
                } else if self.sublinear_tf {
                    1.0 + tf.ln()
                } else {
                    tf
                }
            });

            if let Some(idf) = &self.idf {
                row.iter_mut().zip(idf).for_each(|(value, weight)| *value *= weight);
            }

            let length = match self.norm {
                Some(Norm::L1) => row.iter().map(|v| v.abs()).sum::<f64>(),
                Some(Norm::L2) => row.iter().map(|v| v * v).sum::<f64>().sqrt(),
                None => 0.0,
            };
            if length > 0.0 {
                row.mapv_inplace(|v| v / length);
            }
        }

        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{FrequencyTable, StopWords};

    fn tokenizer() -> Tokenizer {
        let counts = [("cheap", 20), ("pills", 15), ("lunch", 30), ("meet", 25)]
            .into_iter()
            .map(|(t, c)| (t.to_string(), c))
            .collect();
        Tokenizer::new(FrequencyTable::new(counts), StopWords::english())
    }

    fn artifact() -> VectorizerArtifact {
        VectorizerArtifact {
            vocabulary: [("cheap", 0), ("pills", 1), ("lunch", 2)]
                .into_iter()
                .map(|(t, i)| (t.to_string(), i))
                .collect(),
            idf: None,
            norm: None,
            binary: false,
            sublinear_tf: false,
        }
    }

    #[test]
    fn counts_known_tokens() {
        let vectorizer = Vectorizer::from_artifact(artifact()).unwrap();
        let matrix = vectorizer.transform(&tokenizer(), &["cheap cheap pills", "meet for lunch"]);

        assert_eq!(matrix.shape(), &[2, 3]);
        assert_eq!(matrix.row(0).to_vec(), vec![2.0, 1.0, 0.0]);
        // "meet" passes the filter but is not in the vocabulary
        assert_eq!(matrix.row(1).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn empty_batch_gives_empty_matrix() {
        let vectorizer = Vectorizer::from_artifact(artifact()).unwrap();
        let matrix = vectorizer.transform::<&str>(&tokenizer(), &[]);
        assert_eq!(matrix.shape(), &[0, 3]);
    }

    #[test]
    fn binary_clips_counts() {
        let mut artifact = artifact();
        artifact.binary = true;
        let vectorizer = Vectorizer::from_artifact(artifact).unwrap();
        let matrix = vectorizer.transform(&tokenizer(), &["cheap cheap cheap"]);
        assert_eq!(matrix.row(0).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn tfidf_rows_are_l2_normalized() {
        let mut artifact = artifact();
        artifact.idf = Some(vec![2.0, 1.0, 1.5]);
        artifact.norm = Some(Norm::L2);
        let vectorizer = Vectorizer::from_artifact(artifact).unwrap();

        let matrix = vectorizer.transform(&tokenizer(), &["cheap pills", "nothing known"]);
        let row = matrix.row(0);
        let length: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((length - 1.0).abs() < 1e-12);
        assert!((row[0] / row[1] - 2.0).abs() < 1e-12);
        assert!(matrix.row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn sublinear_tf_uses_log_counts() {
        let mut artifact = artifact();
        artifact.sublinear_tf = true;
        let vectorizer = Vectorizer::from_artifact(artifact).unwrap();
        let matrix = vectorizer.transform(&tokenizer(), &["pills pills pills"]);
        assert!((matrix[[0, 1]] - (1.0 + 3f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_idf() {
        let mut artifact = artifact();
        artifact.idf = Some(vec![1.0]);
        assert!(Vectorizer::from_artifact(artifact).is_err());
    }

    #[test]
    fn rejects_out_of_range_column() {
        let mut artifact = artifact();
        artifact.vocabulary.insert("meet".to_string(), 7);
        assert!(Vectorizer::from_artifact(artifact).is_err());
    }

    #[test]
    fn loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorizer.json");
        std::fs::write(
            &path,
            r#"{"vocabulary": {"cheap": 0, "lunch": 1}, "idf": [1.2, 1.7], "norm": "l2"}"#,
        )
        .unwrap();

        let vectorizer = Vectorizer::from_file(&path).unwrap();
        assert_eq!(vectorizer.n_features(), 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vectorizer::from_file(dir.path().join("vectorizer.json")).unwrap_err();
        assert!(matches!(err, SpamhamError::Io { .. }));
    }
}
