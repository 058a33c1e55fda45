//! Training outcome parsing and output-field extraction.
//!
//! The provider reports training completion both via webhook and via the
//! pull-based status query. Both carry the same `{status, output?, error?}`
//! shape; this module turns that into a [`TrainingOutcome`] the
//! reconciliation layer can apply with one transition function.
//!
//! The trainer's output schema has drifted across versions (the weights
//! URL and resulting version have shipped under several field names), so
//! extraction is an ordered list of candidate extractor functions tried
//! in sequence rather than a single hardcoded lookup.

use serde_json::Value;

/// A provider-reported training outcome, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// Training finished. `version` and `weights_url` are whatever the
    /// extractors could recover from the output payload.
    Succeeded {
        version: Option<String>,
        weights_url: Option<String>,
    },
    Failed {
        message: String,
    },
    Canceled {
        message: String,
    },
    /// Any non-terminal provider status. Applying this is a no-op.
    Pending,
}

/// An extractor pulls one candidate field out of a training output payload.
pub type OutputExtractor = fn(&Value) -> Option<String>;

/// Candidate extractors for the trained weights URL, tried in order.
pub const WEIGHTS_URL_EXTRACTORS: &[OutputExtractor] = &[
    // Current trainer: `output.weights`.
    |out| string_field(out, "weights"),
    // Older trainer builds: `output.weights_url`.
    |out| string_field(out, "weights_url"),
    // Some trainer versions nest the files: `output.files.weights`.
    |out| out.get("files").and_then(|f| string_field(f, "weights")),
];

/// Candidate extractors for the resulting model version, tried in order.
pub const VERSION_EXTRACTORS: &[OutputExtractor] = &[
    |out| string_field(out, "version"),
    |out| string_field(out, "model_version"),
];

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Apply an extractor list in order, accepting the first present value.
fn extract_first(output: &Value, extractors: &[OutputExtractor]) -> Option<String> {
    extractors.iter().find_map(|extract| extract(output))
}

/// Extract the weights URL from a training output payload, if present.
pub fn extract_weights_url(output: &Value) -> Option<String> {
    extract_first(output, WEIGHTS_URL_EXTRACTORS)
}

/// Extract the resulting model version from a training output payload.
pub fn extract_version(output: &Value) -> Option<String> {
    extract_first(output, VERSION_EXTRACTORS)
}

/// Normalize a provider `{status, output?, error?}` report into a
/// [`TrainingOutcome`].
pub fn parse_outcome(status: &str, output: Option<&Value>, error: Option<&str>) -> TrainingOutcome {
    match status {
        "succeeded" => TrainingOutcome::Succeeded {
            version: output.and_then(extract_version),
            weights_url: output.and_then(extract_weights_url),
        },
        "failed" => TrainingOutcome::Failed {
            message: error.unwrap_or("Training failed without error detail").to_string(),
        },
        "canceled" | "cancelled" => TrainingOutcome::Canceled {
            message: error.unwrap_or("Training canceled by provider").to_string(),
        },
        _ => TrainingOutcome::Pending,
    }
}
