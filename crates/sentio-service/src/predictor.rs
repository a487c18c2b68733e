//! Text classifiers
//!
//! The service treats the model as opaque: anything implementing
//! [`Predictor`] can sit behind `PredictionService`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sentiment: Sentiment,
    /// Probability of the predicted label, in `[0.5, 1.0]`
    pub confidence: f64,
}

/// A sentiment model
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, text: &str) -> Prediction;
}

/// Bag-of-words naive Bayes classifier over lowercase word tokens
///
/// Trained in memory from labelled phrases. Unknown words contribute
/// nothing; text with no known words predicts from the class priors alone.
#[derive(Debug, Clone)]
pub struct LexiconPredictor {
    /// Per-token log-odds of positive over negative
    weights: HashMap<String, f64>,
    /// Prior log-odds of positive over negative
    bias: f64,
}

impl LexiconPredictor {
    /// Train from `(text, sentiment)` pairs with add-one smoothing
    pub fn train<'a>(examples: impl IntoIterator<Item = (&'a str, Sentiment)>) -> Self {
        let mut positive: HashMap<String, f64> = HashMap::new();
        let mut negative: HashMap<String, f64> = HashMap::new();
        let (mut positive_docs, mut negative_docs) = (0.0_f64, 0.0_f64);

        for (text, sentiment) in examples {
            let counts = match sentiment {
                Sentiment::Positive => {
                    positive_docs += 1.0;
                    &mut positive
                }
                Sentiment::Negative => {
                    negative_docs += 1.0;
                    &mut negative
                }
            };
            for token in tokenize(text) {
                *counts.entry(token).or_default() += 1.0;
            }
        }

        let mut vocabulary: Vec<&String> = positive.keys().chain(negative.keys()).collect();
        vocabulary.sort();
        vocabulary.dedup();
        let vocab_size = vocabulary.len() as f64;
        let positive_total: f64 = positive.values().sum();
        let negative_total: f64 = negative.values().sum();

        let weights = vocabulary
            .into_iter()
            .map(|token| {
                let p = (positive.get(token).copied().unwrap_or(0.0) + 1.0)
                    / (positive_total + vocab_size);
                let n = (negative.get(token).copied().unwrap_or(0.0) + 1.0)
                    / (negative_total + vocab_size);
                (token.clone(), (p / n).ln())
            })
            .collect();

        let bias = ((positive_docs + 1.0) / (negative_docs + 1.0)).ln();

        Self { weights, bias }
    }

    /// Classifier trained on the built-in phrase set
    pub fn seeded() -> Self {
        Self::train(SEED_EXAMPLES.iter().copied())
    }

    pub fn vocabulary_size(&self) -> usize {
        self.weights.len()
    }

    fn score(&self, text: &str) -> f64 {
        self.bias
            + tokenize(text)
                .filter_map(|token| self.weights.get(&token))
                .sum::<f64>()
    }
}

impl Default for LexiconPredictor {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Predictor for LexiconPredictor {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn predict(&self, text: &str) -> Prediction {
        let probability = 1.0 / (1.0 + (-self.score(text)).exp());
        if probability >= 0.5 {
            Prediction {
                sentiment: Sentiment::Positive,
                confidence: probability,
            }
        } else {
            Prediction {
                sentiment: Sentiment::Negative,
                confidence: 1.0 - probability,
            }
        }
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

const SEED_EXAMPLES: &[(&str, Sentiment)] = &[
    ("I love this product", Sentiment::Positive),
    ("This is amazing", Sentiment::Positive),
    ("Absolutely fantastic quality", Sentiment::Positive),
    ("Works great and arrived early", Sentiment::Positive),
    ("Best purchase I have made this year", Sentiment::Positive),
    ("Excellent service, very happy", Sentiment::Positive),
    ("I would happily recommend it", Sentiment::Positive),
    ("Wonderful experience from start to finish", Sentiment::Positive),
    ("Really good value for the price", Sentiment::Positive),
    ("Perfect, exactly what I needed", Sentiment::Positive),
    ("The support team was helpful and kind", Sentiment::Positive),
    ("Delighted with how well it works", Sentiment::Positive),
    ("Terrible experience", Sentiment::Negative),
    ("Waste of money", Sentiment::Negative),
    ("Broke after two days", Sentiment::Negative),
    ("I hate how slow it is", Sentiment::Negative),
    ("Awful quality, very disappointed", Sentiment::Negative),
    ("Worst purchase I have ever made", Sentiment::Negative),
    ("Do not buy this", Sentiment::Negative),
    ("The support team was rude and useless", Sentiment::Negative),
    ("It stopped working and nobody helped", Sentiment::Negative),
    ("Poor value, completely overpriced", Sentiment::Negative),
    ("Horrible, I want a refund", Sentiment::Negative),
    ("Bad experience, never again", Sentiment::Negative),
];
