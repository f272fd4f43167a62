//! Normalization of upstream job-status responses.
//!
//! The paid provider's status endpoints are loosely specified: depending on
//! the capability and API version, the outcome is reported as a numeric
//! success flag, a status string nested under `data`, a root-level status
//! string, or a bare boolean. Result URLs likewise appear in a nested
//! `response.resultUrls` array or in one of several scalar fields.
//!
//! Rather than one deeply nested conditional, the cascade is an ordered
//! slice of pure rules. Each rule pattern-matches one known shape and
//! returns `Some(Normalized)` when it recognizes the body; the first match
//! wins. A body no rule recognizes normalizes to `processing` and is logged
//! for diagnosis.

use crate::api::models::generations::GenerationStatus;
use serde_json::Value;

/// Canonical outcome of one status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub status: GenerationStatus,
    pub result_url: Option<String>,
}

impl Normalized {
    fn processing() -> Self {
        Self {
            status: GenerationStatus::Processing,
            result_url: None,
        }
    }

    fn failed() -> Self {
        Self {
            status: GenerationStatus::Failed,
            result_url: None,
        }
    }

    fn completed(result_url: Option<String>) -> Self {
        Self {
            status: GenerationStatus::Completed,
            result_url,
        }
    }
}

type Rule = fn(&Value) -> Option<Normalized>;

/// Priority order matters: the numeric flag is the documented format, the
/// nested status string the next most common, root-level shapes come from
/// older endpoint versions.
const RULES: &[Rule] = &[success_flag_rule, data_status_rule, root_status_rule, root_success_rule];

/// Scalar fallback fields checked under `data`, in priority order.
const DATA_URL_FIELDS: &[&str] = &["result_url", "resultUrl", "url", "result", "output_url", "outputUrl", "content"];

/// Scalar fallback fields checked at the root, in priority order.
const ROOT_URL_FIELDS: &[&str] = &["url", "result_url", "resultUrl", "result", "output_url", "outputUrl"];

/// Normalize an upstream status body into a canonical status and result URL.
pub fn normalize(body: &Value) -> Normalized {
    for rule in RULES {
        if let Some(normalized) = rule(body) {
            return normalized;
        }
    }

    tracing::warn!(body = %body, "unrecognized upstream status shape, treating as processing");
    Normalized::processing()
}

/// `{ data: { successFlag: 0 | 1 | 2, ... } }`, the documented format.
fn success_flag_rule(body: &Value) -> Option<Normalized> {
    let data = body.get("data")?;
    let flag = data.get("successFlag")?.as_i64()?;

    Some(match flag {
        1 => Normalized::completed(result_url_from(data, DATA_URL_FIELDS)),
        2 => Normalized::failed(),
        // 0 means processing; unknown flags are treated the same way
        _ => Normalized::processing(),
    })
}

/// `{ data: { status: "completed" | "failed" | ..., ... } }`
fn data_status_rule(body: &Value) -> Option<Normalized> {
    let data = body.get("data")?;
    let status = data.get("status")?.as_str()?;

    Some(match classify_status(status) {
        StatusClass::Completed => Normalized::completed(result_url_from(data, DATA_URL_FIELDS)),
        StatusClass::Failed => Normalized::failed(),
        StatusClass::Processing => Normalized::processing(),
    })
}

/// `{ status: "completed" | ..., url: ... }` with the status at the root.
fn root_status_rule(body: &Value) -> Option<Normalized> {
    let status = body.get("status")?.as_str()?;

    Some(match classify_status(status) {
        StatusClass::Completed => Normalized::completed(result_url_from(body, ROOT_URL_FIELDS)),
        StatusClass::Failed => Normalized::failed(),
        StatusClass::Processing => Normalized::processing(),
    })
}

/// `{ success: true | false, ... }`, a bare boolean outcome. On success the
/// root fields are preferred, with the `data` fields as a last resort.
fn root_success_rule(body: &Value) -> Option<Normalized> {
    let success = body.get("success")?.as_bool()?;

    if !success {
        return Some(Normalized::failed());
    }

    let url = result_url_from(body, ROOT_URL_FIELDS)
        .or_else(|| body.get("data").and_then(|data| result_url_from(data, DATA_URL_FIELDS)));
    Some(Normalized::completed(url))
}

enum StatusClass {
    Completed,
    Failed,
    Processing,
}

fn classify_status(status: &str) -> StatusClass {
    match status.to_ascii_lowercase().as_str() {
        "completed" | "succeeded" | "success" => StatusClass::Completed,
        "failed" | "error" => StatusClass::Failed,
        _ => StatusClass::Processing,
    }
}

/// Extract a result URL from `container`: the first element of a
/// `response.resultUrls` / `response.result_urls` array wins, then the
/// scalar fields in `fields` order.
fn result_url_from(container: &Value, fields: &[&str]) -> Option<String> {
    if let Some(response) = container.get("response") {
        for key in ["resultUrls", "result_urls"] {
            if let Some(first) = response.get(key).and_then(|v| v.as_array()).and_then(|a| a.first()) {
                if let Some(url) = first.as_str() {
                    return Some(url.to_string());
                }
            }
        }
    }

    fields
        .iter()
        .find_map(|key| container.get(key).and_then(|v| v.as_str()).map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_flag_completed_with_result_urls() {
        let body = json!({
            "code": 200,
            "data": {
                "taskId": "task-1",
                "successFlag": 1,
                "response": { "resultUrls": ["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"] }
            }
        });
        let normalized = normalize(&body);
        assert_eq!(normalized.status, GenerationStatus::Completed);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/a.png".to_string()));
    }

    #[test]
    fn test_success_flag_completed_snake_case_urls() {
        let body = json!({
            "data": {
                "successFlag": 1,
                "response": { "result_urls": ["https://cdn.example.com/snake.png"] }
            }
        });
        let normalized = normalize(&body);
        assert_eq!(normalized.status, GenerationStatus::Completed);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/snake.png".to_string()));
    }

    #[test]
    fn test_success_flag_failed_ignores_other_fields() {
        let body = json!({
            "data": {
                "successFlag": 2,
                "status": "completed",
                "response": { "resultUrls": ["https://cdn.example.com/a.png"] }
            }
        });
        let normalized = normalize(&body);
        assert_eq!(normalized.status, GenerationStatus::Failed);
        assert_eq!(normalized.result_url, None);
    }

    #[test]
    fn test_success_flag_zero_is_processing() {
        let body = json!({ "data": { "successFlag": 0 } });
        assert_eq!(normalize(&body), Normalized::processing());
    }

    #[test]
    fn test_success_flag_unknown_value_is_processing() {
        let body = json!({ "data": { "successFlag": 7 } });
        assert_eq!(normalize(&body), Normalized::processing());
    }

    #[test]
    fn test_scalar_fallback_chain_order() {
        // No resultUrls array; the first scalar field in chain order wins
        let body = json!({
            "data": {
                "successFlag": 1,
                "result": "https://cdn.example.com/result",
                "resultUrl": "https://cdn.example.com/resultUrl",
                "result_url": "https://cdn.example.com/result_url"
            }
        });
        let normalized = normalize(&body);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/result_url".to_string()));
    }

    #[test]
    fn test_empty_result_array_falls_back_to_scalars() {
        let body = json!({
            "data": {
                "successFlag": 1,
                "response": { "resultUrls": [] },
                "url": "https://cdn.example.com/fallback.png"
            }
        });
        let normalized = normalize(&body);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/fallback.png".to_string()));
    }

    #[test]
    fn test_data_status_string_variants() {
        for status in ["completed", "succeeded", "success", "SUCCESS"] {
            let body = json!({ "data": { "status": status, "result_url": "https://cdn.example.com/x" } });
            let normalized = normalize(&body);
            assert_eq!(normalized.status, GenerationStatus::Completed, "status {status}");
            assert_eq!(normalized.result_url, Some("https://cdn.example.com/x".to_string()));
        }

        for status in ["failed", "error", "FAILED"] {
            let body = json!({ "data": { "status": status } });
            assert_eq!(normalize(&body).status, GenerationStatus::Failed, "status {status}");
        }

        for status in ["pending", "generating", "queued"] {
            let body = json!({ "data": { "status": status } });
            assert_eq!(normalize(&body).status, GenerationStatus::Processing, "status {status}");
        }
    }

    #[test]
    fn test_root_status_with_root_url() {
        let body = json!({ "status": "succeeded", "url": "https://cdn.example.com/root.png" });
        let normalized = normalize(&body);
        assert_eq!(normalized.status, GenerationStatus::Completed);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/root.png".to_string()));
    }

    #[test]
    fn test_root_success_boolean() {
        let body = json!({ "success": true, "response": { "resultUrls": ["https://cdn.example.com/ok.png"] } });
        let normalized = normalize(&body);
        assert_eq!(normalized.status, GenerationStatus::Completed);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/ok.png".to_string()));

        let body = json!({ "success": false, "url": "https://cdn.example.com/ignored.png" });
        assert_eq!(normalize(&body), Normalized::failed());
    }

    #[test]
    fn test_root_success_falls_back_to_data_fields() {
        let body = json!({ "success": true, "data": { "output_url": "https://cdn.example.com/nested.png" } });
        let normalized = normalize(&body);
        assert_eq!(normalized.result_url, Some("https://cdn.example.com/nested.png".to_string()));
    }

    #[test]
    fn test_rule_priority_flag_over_status() {
        // successFlag says processing even though a status string says completed
        let body = json!({ "data": { "successFlag": 0, "status": "completed" } });
        assert_eq!(normalize(&body).status, GenerationStatus::Processing);
    }

    #[test]
    fn test_non_numeric_flag_falls_through_to_status() {
        let body = json!({ "data": { "successFlag": "yes", "status": "completed", "url": "https://cdn.example.com/y" } });
        let normalized = normalize(&body);
        assert_eq!(normalized.status, GenerationStatus::Completed);
    }

    #[test]
    fn test_unrecognized_shape_defaults_to_processing() {
        for body in [json!({}), json!({ "code": 500 }), json!({ "data": { "taskId": "t" } }), json!(null)] {
            assert_eq!(normalize(&body), Normalized::processing(), "body {body}");
        }
    }
}
