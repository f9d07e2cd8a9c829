use serde::{Deserialize, Serialize};

/// Classification outcome for a single message.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Ham,
}

impl Label {
    /// Classifier output 1 is spam, every other value is ham.
    pub fn from_prediction(prediction: i64) -> Self {
        if prediction == 1 {
            Label::Spam
        } else {
            Label::Ham
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
