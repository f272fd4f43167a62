//! HTTP client for the paid generation API.
//!
//! The upstream exposes one create/status endpoint pair per capability, all
//! behind the same bearer token. Request parameters per kind are fixed:
//! images are generated at a 1:1 aspect ratio, videos at 16:9, text takes
//! the prompt alone.

use crate::api::models::generations::GenerationKind;
use crate::config::PaidProviderConfig;
use crate::providers::{ProviderError, Result};
use serde_json::{json, Value};
use tracing::instrument;
use url::Url;

#[derive(Debug, Clone)]
pub struct PaidClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

/// Create endpoint path for a paid generation kind.
pub fn create_path(kind: GenerationKind) -> Result<&'static str> {
    match kind {
        GenerationKind::Image => Ok("api/v1/gpt4o-image/generate"),
        GenerationKind::Video => Ok("api/v1/runway/generate"),
        GenerationKind::TextToPrompt => Ok("api/v1/generate/lyrics"),
        GenerationKind::FreeImage => Err(ProviderError::UnsupportedKind { kind }),
    }
}

/// Status endpoint path for a paid generation kind.
pub fn status_path(kind: GenerationKind) -> Result<&'static str> {
    match kind {
        GenerationKind::Image => Ok("api/v1/gpt4o-image/record-info"),
        GenerationKind::Video => Ok("api/v1/runway/record-detail"),
        GenerationKind::TextToPrompt => Ok("api/v1/generate/record-info"),
        GenerationKind::FreeImage => Err(ProviderError::UnsupportedKind { kind }),
    }
}

/// Request body for a create call, with the fixed per-kind parameters.
pub fn create_body(kind: GenerationKind, prompt: &str) -> Result<Value> {
    match kind {
        GenerationKind::Image => Ok(json!({ "prompt": prompt, "size": "1:1" })),
        GenerationKind::Video => Ok(json!({ "prompt": prompt, "aspect_ratio": "16:9" })),
        GenerationKind::TextToPrompt => Ok(json!({ "prompt": prompt })),
        GenerationKind::FreeImage => Err(ProviderError::UnsupportedKind { kind }),
    }
}

/// Extract the provider-assigned task id from a create response.
///
/// The documented location is `data.taskId`; some endpoint versions return
/// it at the root instead. Anything else means the job cannot be tracked.
pub fn extract_task_id(body: &Value) -> Option<String> {
    body.get("data")
        .and_then(|data| data.get("taskId"))
        .or_else(|| body.get("taskId"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Some create responses already carry the finished result (observed for
/// image and text). When present the job is stored as completed immediately
/// and never polled.
pub fn immediate_result(kind: GenerationKind, body: &Value) -> Option<String> {
    let data = body.get("data")?;
    let fields: &[&str] = match kind {
        GenerationKind::Image => &["result_url", "result"],
        GenerationKind::TextToPrompt => &["result", "content"],
        _ => return None,
    };

    fields
        .iter()
        .find_map(|key| data.get(key).and_then(|v| v.as_str()).map(|s| s.to_string()))
}

impl PaidClient {
    pub fn new(config: &PaidProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Submit a new generation job. Returns the raw JSON body; callers
    /// extract the task id with [`extract_task_id`].
    #[instrument(skip(self, prompt), fields(kind = %kind, prompt_len = prompt.len()), err)]
    pub async fn create_job(&self, kind: GenerationKind, prompt: &str) -> Result<Value> {
        let url = self.endpoint(create_path(kind)?)?;
        let body = create_body(kind, prompt)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::read_json(response).await
    }

    /// Poll the status of a previously created job.
    #[instrument(skip(self), fields(kind = %kind, external_job_id = %external_job_id), err)]
    pub async fn job_status(&self, kind: GenerationKind, external_job_id: &str) -> Result<Value> {
        let mut url = self.endpoint(status_path(kind)?)?;
        url.query_pairs_mut().append_pair("taskId", external_job_id);

        let response = self.http.get(url).bearer_auth(&self.api_key).send().await?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("response body is not JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_routing_per_kind() {
        assert_eq!(create_path(GenerationKind::Image).unwrap(), "api/v1/gpt4o-image/generate");
        assert_eq!(status_path(GenerationKind::Image).unwrap(), "api/v1/gpt4o-image/record-info");
        assert_eq!(create_path(GenerationKind::Video).unwrap(), "api/v1/runway/generate");
        assert_eq!(status_path(GenerationKind::Video).unwrap(), "api/v1/runway/record-detail");
        assert_eq!(create_path(GenerationKind::TextToPrompt).unwrap(), "api/v1/generate/lyrics");
        assert_eq!(status_path(GenerationKind::TextToPrompt).unwrap(), "api/v1/generate/record-info");

        assert!(matches!(
            create_path(GenerationKind::FreeImage),
            Err(ProviderError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn test_create_body_fixed_parameters() {
        let body = create_body(GenerationKind::Image, "a red fox").unwrap();
        assert_eq!(body, json!({ "prompt": "a red fox", "size": "1:1" }));

        let body = create_body(GenerationKind::Video, "waves").unwrap();
        assert_eq!(body, json!({ "prompt": "waves", "aspect_ratio": "16:9" }));

        let body = create_body(GenerationKind::TextToPrompt, "lyrics about rain").unwrap();
        assert_eq!(body, json!({ "prompt": "lyrics about rain" }));
    }

    #[test]
    fn test_extract_task_id_nested_and_root() {
        let nested = json!({ "code": 200, "data": { "taskId": "task-nested" } });
        assert_eq!(extract_task_id(&nested), Some("task-nested".to_string()));

        let root = json!({ "taskId": "task-root" });
        assert_eq!(extract_task_id(&root), Some("task-root".to_string()));

        // Nested location takes priority when both are present
        let both = json!({ "taskId": "root", "data": { "taskId": "nested" } });
        assert_eq!(extract_task_id(&both), Some("nested".to_string()));

        assert_eq!(extract_task_id(&json!({ "data": {} })), None);
        assert_eq!(extract_task_id(&json!({ "data": { "taskId": 42 } })), None);
    }

    #[test]
    fn test_immediate_result_per_kind() {
        let body = json!({ "data": { "taskId": "t", "result_url": "https://cdn.example.com/now.png" } });
        assert_eq!(
            immediate_result(GenerationKind::Image, &body),
            Some("https://cdn.example.com/now.png".to_string())
        );

        let body = json!({ "data": { "taskId": "t", "content": "a verse" } });
        assert_eq!(immediate_result(GenerationKind::TextToPrompt, &body), Some("a verse".to_string()));

        // Video jobs are always asynchronous
        let body = json!({ "data": { "taskId": "t", "result_url": "https://cdn.example.com/v.mp4" } });
        assert_eq!(immediate_result(GenerationKind::Video, &body), None);

        assert_eq!(immediate_result(GenerationKind::Image, &json!({ "data": { "taskId": "t" } })), None);
    }
}
