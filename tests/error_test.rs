//! Tests for error types

use factorlab::Error;

#[test]
fn test_invalid_config_error() {
    let error = Error::InvalidConfig("no models configured".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid configuration"));
    assert!(error_str.contains("no models configured"));
    assert!(error_str.contains("Fix the experiment configuration"));
}

#[test]
fn test_invalid_design_error() {
    let error = Error::InvalidDesign("factor 'tone' has no levels".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Malformed design"));
    assert!(error_str.contains("tone"));
}

#[test]
fn test_provider_not_found_error() {
    let error = Error::ProviderNotFound {
        model: "large-1".to_string(),
        provider: "acme".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("No provider registered for 'acme'"));
    assert!(error_str.contains("large-1"));
    assert!(error_str.contains("Register a generator"));
}

#[test]
fn test_scoring_error() {
    let error = Error::Scoring {
        variable: "hits".to_string(),
        message: "keyword must not be empty".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Scoring failed for 'hits'"));
    assert!(error_str.contains("keyword must not be empty"));
}

#[test]
fn test_task_failed_error() {
    let error = Error::TaskFailed("task 3 panicked".to_string());
    assert!(format!("{error}").contains("Execution task failed"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    assert_eq!(format!("{error}"), "custom error message");
}

#[test]
fn test_error_debug_format() {
    let error = Error::InvalidConfig("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("InvalidConfig"));
}
