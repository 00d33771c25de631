//! Intent resolution: classification plus slot filling.

use crate::classifier::{Classification, IntentClassifier};
use crate::error::IntentError;
use crate::taxonomy::{Action, Intent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Resolved intent returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Top-ranked label.
    pub intent: String,
    /// Score of the top-ranked label, in `[0, 1]`.
    pub confidence: f64,
    pub action: Action,
}

/// Resolves utterances against the fixed intent taxonomy.
pub struct IntentResolver {
    classifier: Arc<dyn IntentClassifier>,
    labels: Vec<String>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for IntentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentResolver")
            .field("classifier", &self.classifier.name())
            .field("labels", &self.labels)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl IntentResolver {
    pub fn new(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            classifier,
            labels: Intent::labels(),
            timeout: None,
        }
    }

    /// Bounds [`Self::resolve_blocking_offloaded`] by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classifies `text` and builds the matching action.
    ///
    /// Blocks for the duration of the classifier call.
    ///
    /// # Errors
    ///
    /// Returns the classifier's error, or [`IntentError::Classifier`] if it
    /// produced an empty ranking.
    pub fn resolve(&self, text: &str) -> Result<IntentResult, IntentError> {
        let classification = self.classifier.classify(text, &self.labels)?;
        Self::build_result(text, &classification)
    }

    fn build_result(text: &str, classification: &Classification) -> Result<IntentResult, IntentError> {
        let top = classification
            .top()
            .ok_or_else(|| IntentError::Classifier("classifier returned no labels".to_string()))?;

        let action = match Intent::from_label(&top.label) {
            Some(intent) => intent.action_for(text),
            None => {
                tracing::warn!(label = %top.label, "classifier returned a label outside the taxonomy");
                Action::Unknown {}
            }
        };

        Ok(IntentResult {
            intent: top.label.clone(),
            confidence: top.score,
            action,
        })
    }

    /// Runs [`Self::resolve`] on tokio's blocking pool.
    ///
    /// The calling task only awaits; the runtime worker stays free for other
    /// sessions. When a timeout is configured and elapses, the caller gets
    /// [`IntentError::Timeout`]; the blocking call itself runs to completion
    /// in the background.
    pub async fn resolve_blocking_offloaded(
        self: Arc<Self>,
        text: String,
    ) -> Result<IntentResult, IntentError> {
        let timeout = self.timeout;
        let task = tokio::task::spawn_blocking(move || self.resolve(&text));

        let joined = match timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| IntentError::Timeout(limit))?,
            None => task.await,
        };

        joined.map_err(|e| IntentError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{KeywordClassifier, LabelScore};

    /// Classifier that always ranks one fixed label first.
    struct Fixed(&'static str, f64);

    impl IntentClassifier for Fixed {
        fn classify(&self, _text: &str, labels: &[String]) -> Result<Classification, IntentError> {
            let rest = (1.0 - self.1) / labels.len() as f64;
            let mut scores: Vec<LabelScore> = labels
                .iter()
                .filter(|l| l.as_str() != self.0)
                .map(|l| LabelScore {
                    label: l.clone(),
                    score: rest,
                })
                .collect();
            scores.push(LabelScore {
                label: self.0.to_string(),
                score: self.1,
            });
            Ok(Classification::from_scores(scores))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Failing;

    impl IntentClassifier for Failing {
        fn classify(&self, _text: &str, _labels: &[String]) -> Result<Classification, IntentError> {
            Err(IntentError::Classifier("model unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn navigate_fills_destination() {
        let resolver = IntentResolver::new(Arc::new(Fixed("navigate to location", 0.9)));
        let result = resolver.resolve("I need the library please").unwrap();
        assert_eq!(result.intent, "navigate to location");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(
            result.action,
            Action::Navigate {
                destination: "library".to_string()
            }
        );
    }

    #[test]
    fn find_nearest_fills_facility() {
        let resolver = IntentResolver::new(Arc::new(Fixed("find nearest facility", 0.8)));
        let result = resolver.resolve("where is the nearest lab").unwrap();
        assert_eq!(
            result.action,
            Action::FindNearest {
                facility_type: "lab".to_string()
            }
        );
    }

    #[test]
    fn help_never_carries_params() {
        let resolver = IntentResolver::new(Arc::new(Fixed("help", 0.7)));
        let result = resolver.resolve("take me to room 101 library canteen").unwrap();
        assert_eq!(result.action, Action::ShowHelp {});
    }

    #[test]
    fn label_outside_taxonomy_is_unknown() {
        let resolver = IntentResolver::new(Arc::new(Fixed("order pizza", 0.99)));
        let result = resolver.resolve("pizza").unwrap();
        assert_eq!(result.intent, "order pizza");
        assert_eq!(result.action, Action::Unknown {});
    }

    #[test]
    fn keyword_results_stay_within_taxonomy() {
        let resolver = IntentResolver::new(Arc::new(KeywordClassifier::new()));
        for text in [
            "take me to room 101",
            "where is the nearest canteen",
            "asdf qwerty",
            "stop",
            "what can you do",
        ] {
            let result = resolver.resolve(text).unwrap();
            assert!(Intent::from_label(&result.intent).is_some(), "{}", result.intent);
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn classifier_failure_propagates() {
        let resolver = IntentResolver::new(Arc::new(Failing));
        assert!(matches!(
            resolver.resolve("help"),
            Err(IntentError::Classifier(_))
        ));
    }

    #[tokio::test]
    async fn offloaded_resolution_matches_inline() {
        let resolver = Arc::new(IntentResolver::new(Arc::new(KeywordClassifier::new())));
        let inline = resolver.resolve("take me to room 101").unwrap();
        let offloaded = resolver
            .clone()
            .resolve_blocking_offloaded("take me to room 101".to_string())
            .await
            .unwrap();
        assert_eq!(inline, offloaded);
    }

    struct Slow;

    impl IntentClassifier for Slow {
        fn classify(&self, _text: &str, _labels: &[String]) -> Result<Classification, IntentError> {
            std::thread::sleep(Duration::from_millis(500));
            Err(IntentError::Classifier("too late".to_string()))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn offloaded_resolution_times_out() {
        let resolver = Arc::new(
            IntentResolver::new(Arc::new(Slow)).with_timeout(Duration::from_millis(20)),
        );
        let err = resolver
            .resolve_blocking_offloaded("help".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, IntentError::Timeout(_)));
    }
}
