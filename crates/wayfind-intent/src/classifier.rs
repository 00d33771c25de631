//! Zero-shot classifier adapter and its backends.

use crate::config::ClassifierConfig;
use crate::error::IntentError;
use crate::taxonomy::Intent;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One candidate label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Labels ranked by descending score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    ranked: Vec<LabelScore>,
}

impl Classification {
    /// Ranks `scores`, clamping each score into `[0, 1]`.
    ///
    /// The sort is stable, so equal scores keep their input order.
    pub fn from_scores(scores: impl IntoIterator<Item = LabelScore>) -> Self {
        let mut ranked: Vec<LabelScore> = scores
            .into_iter()
            .map(|s| LabelScore {
                score: if s.score.is_nan() { 0.0 } else { s.score.clamp(0.0, 1.0) },
                label: s.label,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { ranked }
    }

    pub fn top(&self) -> Option<&LabelScore> {
        self.ranked.first()
    }

    pub fn ranked(&self) -> &[LabelScore] {
        &self.ranked
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// A blocking text classifier scoring `text` against candidate `labels`.
///
/// Implementations may perform network or accelerator work; async callers
/// must not invoke [`IntentClassifier::classify`] directly on a runtime
/// worker (see [`crate::IntentResolver::resolve_blocking_offloaded`]).
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Classification, IntentError>;

    fn name(&self) -> &str;
}

fn validate_input(text: &str, labels: &[String]) -> Result<(), IntentError> {
    if text.trim().is_empty() {
        return Err(IntentError::EmptyInput);
    }
    if labels.is_empty() {
        return Err(IntentError::NoLabels);
    }
    Ok(())
}

/// Request body of the Hugging Face zero-shot pipeline.
#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
}

/// The inference API answers either in the legacy pipeline shape or as a
/// flat list of label/score pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Pipeline {
        labels: Vec<String>,
        scores: Vec<f64>,
    },
    Pairs(Vec<LabelScore>),
}

impl ZeroShotResponse {
    fn into_classification(self) -> Result<Classification, IntentError> {
        match self {
            Self::Pipeline { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(IntentError::Classifier(format!(
                        "label/score length mismatch: {} labels, {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                Ok(Classification::from_scores(
                    labels
                        .into_iter()
                        .zip(scores)
                        .map(|(label, score)| LabelScore { label, score }),
                ))
            }
            Self::Pairs(pairs) => Ok(Classification::from_scores(pairs)),
        }
    }
}

/// Zero-shot classifier backed by the Hugging Face inference API.
pub struct HuggingFaceClassifier {
    config: ClassifierConfig,
    // Built on first use: the blocking client must not be constructed on an
    // async runtime thread.
    client: OnceLock<reqwest::blocking::Client>,
}

impl std::fmt::Debug for HuggingFaceClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClassifier")
            .field("config", &self.config)
            .field("client_ready", &self.client.get().is_some())
            .finish()
    }
}

impl HuggingFaceClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, IntentError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| IntentError::Classifier(format!("failed to build HTTP client: {}", e)))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl IntentClassifier for HuggingFaceClassifier {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Classification, IntentError> {
        validate_input(text, labels)?;

        let body = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
                multi_label: self.config.multi_label,
            },
        };

        let mut request = self.client()?.post(self.config.model_url()).json(&body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| IntentError::Classifier(format!("inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(IntentError::Classifier(format!(
                "inference API returned {}: {}",
                status, detail
            )));
        }

        let parsed: ZeroShotResponse = response
            .json()
            .map_err(|e| IntentError::Classifier(format!("invalid inference response: {}", e)))?;
        let classification = parsed.into_classification()?;

        if classification.is_empty() {
            return Err(IntentError::Classifier(
                "inference response contained no labels".to_string(),
            ));
        }

        tracing::debug!(
            model = %self.config.model,
            top = classification.top().map(|s| s.label.as_str()).unwrap_or(""),
            "zero-shot classification complete"
        );
        Ok(classification)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

/// Offline classifier scoring labels by cue-phrase hits.
///
/// Each hit adds one point to its intent; every label also gets a small
/// smoothing prior, and the scores are normalized to sum to 1. Labels outside
/// the taxonomy only receive the prior.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    cues: Vec<(Intent, Vec<&'static str>)>,
}

const SMOOTHING: f64 = 0.1;

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        let cues = Intent::ALL
            .into_iter()
            .map(|intent| (intent, cue_phrases(intent).to_vec()))
            .collect();
        Self { cues }
    }

    fn hits(&self, intent: Intent, lowered: &str) -> usize {
        self.cues
            .iter()
            .find(|(i, _)| *i == intent)
            .map(|(_, phrases)| phrases.iter().filter(|p| lowered.contains(*p)).count())
            .unwrap_or(0)
    }
}

fn cue_phrases(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::NavigateToLocation => &[
            "take me",
            "go to",
            "navigate",
            "way to",
            "directions",
            "how do i get",
            "guide me",
            "bring me",
        ],
        Intent::FindNearestFacility => &["nearest", "closest", "near me", "nearby", "find a"],
        Intent::CurrentLocation => &["where am i", "my location", "current location", "where i am"],
        Intent::ChangeDestination => &[
            "change destination",
            "change my destination",
            "different destination",
            "instead",
        ],
        Intent::StartNavigation => &["start", "begin", "let's go", "lets go"],
        Intent::CancelNavigation => &["cancel", "stop", "abort", "never mind"],
        Intent::Help => &["help", "what can you do", "how does this work"],
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str, labels: &[String]) -> Result<Classification, IntentError> {
        validate_input(text, labels)?;
        let lowered = text.to_lowercase();

        let raw: Vec<(String, f64)> = labels
            .iter()
            .map(|label| {
                let hits = Intent::from_label(label)
                    .map(|intent| self.hits(intent, &lowered))
                    .unwrap_or(0);
                (label.clone(), hits as f64 + SMOOTHING)
            })
            .collect();
        let total: f64 = raw.iter().map(|(_, s)| s).sum();

        Ok(Classification::from_scores(
            raw.into_iter()
                .map(|(label, score)| LabelScore { label, score: score / total }),
        ))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
