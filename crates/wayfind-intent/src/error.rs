use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("no candidate labels supplied")]
    NoLabels,

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("classification timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("classification worker failed: {0}")]
    Worker(String),

    #[error("transcription error: {0}")]
    Transcription(String),
}
