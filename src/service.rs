use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::config::ModelsConfig;
use crate::error::Result;
use crate::models::Label;
use crate::tokenizer::{FrequencyTable, StopWords, Tokenizer};
use crate::vectorizer::Vectorizer;

/// Everything needed to label a batch of messages. Built once at startup
/// and shared read-only between workers.
#[derive(Debug)]
pub struct SpamhamService {
    tokenizer: Tokenizer,
    vectorizer: Vectorizer,
    classifier: Classifier,
}

impl SpamhamService {
    pub fn new(tokenizer: Tokenizer, vectorizer: Vectorizer, classifier: Classifier) -> Self {
        Self {
            tokenizer,
            vectorizer,
            classifier,
        }
    }

    /// Loads the frequency table, vectorizer and classifier, in that order.
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let frequencies = FrequencyTable::from_file(&config.frequency_path)?;
        let tokenizer = Tokenizer::new(frequencies, StopWords::english())
            .with_min_document_frequency(config.min_document_frequency);
        let vectorizer = Vectorizer::from_file(&config.vectorizer_path)?;
        let classifier = Classifier::from_file(&config.classifier_path, vectorizer.n_features())?;

        info!("Models loaded");
        Ok(Self::new(tokenizer, vectorizer, classifier))
    }

    pub fn classify<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Label>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let features = self.vectorizer.transform(&self.tokenizer, texts);
        let predictions = self.classifier.predict(&features)?;
        debug!(?predictions, "Raw predictions");

        Ok(predictions.into_iter().map(Label::from_prediction).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::ClassifierArtifact;
    use crate::error::SpamhamError;
    use crate::vectorizer::VectorizerArtifact;
    use std::path::Path;

    const FREQUENCIES: &str = r#"{
        "buy": 40, "cheap": 35, "pills": 12, "now": 90,
        "let": 20, "'s": 60, "meet": 25, "lunch": 18, "tomorrow": 22, "rare": 5
    }"#;

    const VECTORIZER: &str = r#"{
        "vocabulary": {"buy": 0, "cheap": 1, "pills": 2, "meet": 3, "lunch": 4, "tomorrow": 5}
    }"#;

    const CLASSIFIER: &str = r#"{
        "kind": "linear",
        "classes": [0, 1],
        "coef": [[1.2, 1.5, 2.0, -1.0, -1.3, -0.8]],
        "intercept": [-0.5]
    }"#;

    pub(crate) fn write_models(dir: &Path) -> ModelsConfig {
        let config = ModelsConfig {
            frequency_path: dir.join("doc_frequency.json"),
            vectorizer_path: dir.join("vectorizer.json"),
            classifier_path: dir.join("classifier.json"),
            min_document_frequency: 5,
        };
        std::fs::write(&config.frequency_path, FREQUENCIES).unwrap();
        std::fs::write(&config.vectorizer_path, VECTORIZER).unwrap();
        std::fs::write(&config.classifier_path, CLASSIFIER).unwrap();
        config
    }

    fn in_memory() -> SpamhamService {
        let counts = [("win", 30), ("prize", 25), ("meeting", 40)]
            .into_iter()
            .map(|(t, c)| (t.to_string(), c))
            .collect();
        let tokenizer = Tokenizer::new(FrequencyTable::new(counts), StopWords::english());
        let vectorizer = Vectorizer::from_artifact(VectorizerArtifact {
            vocabulary: [("win", 0), ("prize", 1), ("meeting", 2)]
                .into_iter()
                .map(|(t, i)| (t.to_string(), i))
                .collect(),
            idf: None,
            norm: None,
            binary: false,
            sublinear_tf: false,
        })
        .unwrap();
        let classifier = Classifier::from_artifact(
            ClassifierArtifact::MultinomialNb {
                classes: vec![0, 1],
                class_log_prior: vec![(0.7f64).ln(), (0.3f64).ln()],
                feature_log_prob: vec![
                    vec![(0.1f64).ln(), (0.1f64).ln(), (0.8f64).ln()],
                    vec![(0.45f64).ln(), (0.45f64).ln(), (0.1f64).ln()],
                ],
            },
            3,
        )
        .unwrap();
        SpamhamService::new(tokenizer, vectorizer, classifier)
    }

    #[test]
    fn empty_batch_is_empty() {
        let service = in_memory();
        assert!(service.classify::<String>(&[]).unwrap().is_empty());
    }

    #[test]
    fn labels_follow_input_order() {
        let service = in_memory();
        let labels = service
            .classify(&["WIN a prize", "team meeting", "win win prize"])
            .unwrap();
        assert_eq!(labels, vec![Label::Spam, Label::Ham, Label::Spam]);
    }

    #[test]
    fn loads_models_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let service = SpamhamService::load(&write_models(dir.path())).unwrap();

        let labels = service
            .classify(&["buy now cheap pills", "let's meet for lunch tomorrow"])
            .unwrap();
        assert_eq!(labels, vec![Label::Spam, Label::Ham]);
    }

    #[test]
    fn reloading_gives_identical_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_models(dir.path());
        let texts = ["cheap pills", "lunch", "rare words only", ""];

        let first = SpamhamService::load(&config).unwrap().classify(&texts).unwrap();
        let second = SpamhamService::load(&config).unwrap().classify(&texts).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), texts.len());
    }

    #[test]
    fn missing_artifact_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_models(dir.path());
        std::fs::remove_file(&config.vectorizer_path).unwrap();

        let err = SpamhamService::load(&config).unwrap_err();
        assert!(matches!(err, SpamhamError::Io { .. }));
    }

    #[test]
    fn classifier_must_match_vectorizer() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_models(dir.path());
        std::fs::write(
            &config.classifier_path,
            r#"{"kind": "linear", "classes": [0, 1], "coef": [[1.0, 2.0]], "intercept": [0.0]}"#,
        )
        .unwrap();

        let err = SpamhamService::load(&config).unwrap_err();
        assert!(matches!(err, SpamhamError::Artifact { .. }));
    }
}
