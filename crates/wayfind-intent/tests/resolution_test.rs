use std::sync::Arc;
use wayfind_intent::{
    build_classifier, extract_facility_type, extract_location, Action, ClassifierBackend,
    ClassifierConfig, Intent, IntentResolver, KeywordClassifier,
};

fn keyword_resolver() -> IntentResolver {
    IntentResolver::new(Arc::new(KeywordClassifier::new()))
}

#[test]
fn test_spoken_examples() {
    let resolver = keyword_resolver();

    let result = resolver.resolve("take me to room 101").unwrap();
    assert_eq!(
        result.action,
        Action::Navigate {
            destination: "room 101".to_string()
        }
    );

    let result = resolver.resolve("show me the way to the library").unwrap();
    assert_eq!(result.intent, "navigate to location");
    assert_eq!(
        result.action,
        Action::Navigate {
            destination: "library".to_string()
        }
    );

    let result = resolver.resolve("where is the nearest lab").unwrap();
    assert_eq!(
        result.action,
        Action::FindNearest {
            facility_type: "lab".to_string()
        }
    );
}

#[test]
fn test_navigate_without_known_location_has_empty_destination() {
    let result = keyword_resolver().resolve("take me to the gym").unwrap();
    assert_eq!(
        result.action,
        Action::Navigate {
            destination: String::new()
        }
    );
}

#[test]
fn test_extractors_public_examples() {
    assert_eq!(extract_location("go to the canteen now"), "canteen");
    assert_eq!(extract_facility_type("where is the nearest lab"), "lab");
    assert_eq!(extract_location("nowhere in particular"), "");
}

#[test]
fn test_every_intent_has_a_distinct_action_type() {
    let mut types: Vec<&str> = Intent::ALL.iter().map(|i| i.action_type()).collect();
    types.sort_unstable();
    types.dedup();
    assert_eq!(types.len(), Intent::ALL.len());
    assert!(!types.contains(&"UNKNOWN"));
}

#[test]
fn test_build_classifier_selects_backend() {
    let config = ClassifierConfig {
        backend: ClassifierBackend::Keyword,
        ..ClassifierConfig::default()
    };
    assert_eq!(build_classifier(&config).name(), "keyword");

    let config = ClassifierConfig::default();
    assert_eq!(build_classifier(&config).name(), "huggingface");
}

#[tokio::test]
async fn test_unreachable_inference_endpoint_is_an_adapter_error() {
    // Port 9 (discard) on localhost is not expected to serve HTTP.
    let config = ClassifierConfig {
        endpoint: "http://127.0.0.1:9/models".to_string(),
        timeout_secs: 2,
        ..ClassifierConfig::default()
    };
    let resolver = Arc::new(IntentResolver::new(build_classifier(&config)));

    let err = resolver
        .resolve_blocking_offloaded("take me to room 101".to_string())
        .await
        .unwrap_err();
    assert!(
        matches!(err, wayfind_intent::IntentError::Classifier(_)),
        "unexpected error: {err}"
    );
}
