//! Token filter applied to every message before vectorization.
//!
//! Text is lowercased and split into Penn Treebank style tokens: words,
//! numbers and each punctuation mark or symbol on its own, with contraction
//! suffixes (`n't`, `'s`, ...) split from their stem. A token survives only
//! when it is not an English stop word and its document frequency is above
//! the configured minimum.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{info, trace, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, SpamhamError};

const ENGLISH_STOP_WORDS: &str = include_str!("words/english");

const CONTRACTIONS: [&str; 7] = ["n't", "'s", "'re", "'ll", "'ve", "'d", "'m"];

/// Document frequency per token, as counted over the training corpus.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    pub fn new(counts: HashMap<String, u64>) -> Self {
        Self { counts }
    }

    /// Loads a JSON object mapping tokens to document frequencies.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| SpamhamError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let counts: HashMap<String, u64> =
            serde_json::from_slice(&content).map_err(|e| SpamhamError::artifact(path, e))?;

        let table = Self::new(counts);
        if table.is_empty() {
            warn!(path = %path.display(), "Frequency table is empty, every token will be dropped");
        }
        info!(path = %path.display(), tokens = table.len(), "Loaded frequency table");
        Ok(table)
    }

    /// Unseen tokens count as zero.
    pub fn get(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn english() -> Self {
        Self::from_list(ENGLISH_STOP_WORDS.lines())
    }

    pub fn from_list<'a, I>(words: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let words = words
            .into_iter()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::english()
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    frequencies: FrequencyTable,
    stop_words: StopWords,
    min_document_frequency: u64,
}

impl Tokenizer {
    pub fn new(frequencies: FrequencyTable, stop_words: StopWords) -> Self {
        Self {
            frequencies,
            stop_words,
            min_document_frequency: 5,
        }
    }

    pub fn with_min_document_frequency(mut self, min: u64) -> Self {
        self.min_document_frequency = min;
        self
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        split_words(&text.to_lowercase())
            .into_iter()
            .filter(|token| self.keep(token))
            .collect()
    }

    fn keep(&self, token: &str) -> bool {
        if self.stop_words.contains(token) {
            return false;
        }
        let frequency = self.frequencies.get(token);
        if frequency == 0 {
            trace!(token, "Token not in frequency table");
        }
        frequency > self.min_document_frequency
    }
}

/// Splits `text` the way the Penn Treebank word tokenizer does.
///
/// Every non-whitespace Unicode word-boundary segment is a token, so `£`,
/// `!` and `,` stand alone. Runs of periods collapse into one token (`...`),
/// double quotes become ``` `` ``` or `''` depending on whether they
/// open or close, and contraction suffixes are split off (`let's` gives
/// `let`, `'s`).
pub fn split_words(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut previous = "";

    for segment in text.split_word_bounds() {
        if segment.trim().is_empty() {
            previous = segment;
            continue;
        }

        match segment {
            "." if previous == "." => {
                if let Some(last) = tokens.last_mut() {
                    last.push('.');
                }
            }
            "\"" => {
                let opening = previous.is_empty()
                    || previous.trim().is_empty()
                    || matches!(previous, "(" | "[" | "{" | "<");
                tokens.push(if opening { "``" } else { "''" }.to_string());
            }
            _ => match split_contraction(segment) {
                Some((stem, suffix)) => {
                    tokens.push(stem.to_string());
                    tokens.push(suffix.to_string());
                }
                None => tokens.push(segment.to_string()),
            },
        }
        previous = segment;
    }

    tokens
}

fn split_contraction(word: &str) -> Option<(&str, &str)> {
    CONTRACTIONS.iter().find_map(|suffix| {
        word.strip_suffix(suffix)
            .filter(|stem| !stem.is_empty())
            .map(|stem| (stem, &word[stem.len()..]))
    })
}
