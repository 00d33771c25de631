//! Intent recognition for the Wayfind indoor-navigation assistant.
//!
//! Turns an utterance into one of a fixed set of navigation intents and a
//! structured [`Action`] the client can execute. Classification is delegated
//! to a pretrained zero-shot model behind the [`IntentClassifier`] trait;
//! slot filling is plain substring matching against a fixed vocabulary.
//!
//! Classifier calls block. Async callers go through
//! [`IntentResolver::resolve_blocking_offloaded`], which moves the call onto
//! tokio's blocking pool so one slow classification cannot stall other
//! sessions.

pub mod classifier;
pub mod config;
pub mod error;
pub mod resolve;
pub mod slots;
pub mod taxonomy;
pub mod transcribe;

pub use classifier::{
    Classification, HuggingFaceClassifier, IntentClassifier, KeywordClassifier, LabelScore,
};
pub use config::{ClassifierBackend, ClassifierConfig};
pub use error::IntentError;
pub use resolve::{IntentResolver, IntentResult};
pub use slots::{extract_facility_type, extract_location, FACILITY_TYPES, LOCATIONS};
pub use taxonomy::{Action, Intent};
pub use transcribe::{PlaceholderTranscriber, Transcriber, PLACEHOLDER_TRANSCRIPT};

use std::sync::Arc;

/// Builds the classifier backend selected by `config`.
pub fn build_classifier(config: &ClassifierConfig) -> Arc<dyn IntentClassifier> {
    match config.backend {
        ClassifierBackend::HuggingFace => Arc::new(HuggingFaceClassifier::new(config.clone())),
        ClassifierBackend::Keyword => Arc::new(KeywordClassifier::new()),
    }
}
