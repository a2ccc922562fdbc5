//! reqwest-backed implementation of [`TaskApi`].

use reqwest::{Method, RequestBuilder, StatusCode};
use tracing::{debug, info};

use super::wire::Envelope;
use super::{ApiError, ApiErrorCode, ApiResult, TaskApi, UpdateOutcome};
use crate::models::{NewTask, Task, TaskId, TaskPatch};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const VERSION_CONFLICT: &str = "VERSION_CONFLICT";

/// HTTP client for the task backend.
///
/// Routes: `POST /v1/tasks`, `PATCH /v1/tasks/{id}`, `DELETE /v1/tasks/{id}`,
/// and `GET /v1/tasks?owner={id}`.
#[derive(Clone)]
pub struct HttpTaskApi {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpTaskApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTaskApi")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> ApiResult<Self> {
        let base_url = normalize_endpoint(base_url.into())?;
        Ok(Self {
            base_url,
            access_token: normalize_text_option(access_token),
            client: reqwest::Client::builder().build()?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests will carry a bearer token.
    #[must_use]
    pub const fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<(StatusCode, String)> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

impl TaskApi for HttpTaskApi {
    async fn create_task(&self, draft: &NewTask) -> ApiResult<Task> {
        let draft = draft.clone().validated()?;
        let (status, body) = self
            .send(self.request(Method::POST, "/v1/tasks").json(&draft))
            .await?;
        if !status.is_success() {
            return Err(parse_api_error(status, &body));
        }
        let task = decode_task(&body)?;
        debug!(task_id = %task.id, "Created task");
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> ApiResult<UpdateOutcome> {
        let path = format!("/v1/tasks/{}", urlencoding::encode(id.as_str()));
        let (status, body) = self
            .send(self.request(Method::PATCH, &path).json(patch))
            .await?;
        decode_update(status, &body, patch)
    }

    async fn delete_task(&self, id: &TaskId) -> ApiResult<()> {
        let path = format!("/v1/tasks/{}", urlencoding::encode(id.as_str()));
        let (status, body) = self.send(self.request(Method::DELETE, &path)).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(parse_api_error(status, &body))
        }
    }

    async fn list_tasks(&self, owner_id: &str) -> ApiResult<Vec<Task>> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(ApiError::new(
                ApiErrorCode::Validation,
                "Owner identifier must not be empty",
            ));
        }
        let path = format!("/v1/tasks?owner={}", urlencoding::encode(owner_id));
        let (status, body) = self.send(self.request(Method::GET, &path)).await?;
        if !status.is_success() {
            return Err(parse_api_error(status, &body));
        }
        decode_tasks(&body)
    }
}

fn decode_envelope(body: &str) -> ApiResult<Envelope> {
    serde_json::from_str::<Envelope>(body).map_err(|error| {
        ApiError::new(
            ApiErrorCode::Server,
            format!("Malformed response: {error}"),
        )
    })
}

fn invalid_task(message: String) -> ApiError {
    ApiError::new(ApiErrorCode::Server, message)
}

fn decode_task(body: &str) -> ApiResult<Task> {
    let envelope = decode_envelope(body)?;
    if !envelope.success {
        return Err(envelope_error(&envelope));
    }
    envelope
        .task
        .ok_or_else(|| invalid_task("Response is missing the task".to_string()))?
        .try_into()
        .map_err(invalid_task)
}

fn decode_tasks(body: &str) -> ApiResult<Vec<Task>> {
    let envelope = decode_envelope(body)?;
    if !envelope.success {
        return Err(envelope_error(&envelope));
    }
    envelope
        .tasks
        .unwrap_or_default()
        .into_iter()
        .map(|wire| Task::try_from(wire).map_err(invalid_task))
        .collect()
}

/// Interpret an update response.
///
/// A version conflict arrives as `409` or as a failed envelope with
/// `errorCode: VERSION_CONFLICT`; either way it becomes
/// [`UpdateOutcome::Conflict`] carrying the rejected `patch`.
fn decode_update(status: StatusCode, body: &str, patch: &TaskPatch) -> ApiResult<UpdateOutcome> {
    let envelope = serde_json::from_str::<Envelope>(body).ok();
    let is_conflict = status == StatusCode::CONFLICT
        || envelope
            .as_ref()
            .and_then(|envelope| envelope.error_code.as_deref())
            .is_some_and(|code| code.eq_ignore_ascii_case(VERSION_CONFLICT));

    if is_conflict {
        let conflict = envelope
            .and_then(|envelope| envelope.conflict)
            .ok_or_else(|| {
                ApiError::new(
                    ApiErrorCode::Server,
                    "Version conflict response is missing the server task",
                )
            })?;
        let descriptor = conflict.into_descriptor(patch).map_err(invalid_task)?;
        info!(
            task_id = %descriptor.server_task.id,
            current_version = descriptor.current_version,
            expected_version = descriptor.expected_version,
            "Backend rejected update with a version conflict"
        );
        return Ok(UpdateOutcome::Conflict(Box::new(descriptor)));
    }

    if !status.is_success() {
        return Err(parse_api_error(status, body));
    }
    decode_task(body).map(UpdateOutcome::Updated)
}

fn envelope_error(envelope: &Envelope) -> ApiError {
    let code = envelope
        .error_code
        .as_deref()
        .map_or(ApiErrorCode::Server, ApiErrorCode::from_wire);
    let message = envelope
        .error_message()
        .unwrap_or_else(|| "Request failed".to_string());
    ApiError::new(code, message)
}

fn parse_api_error(status: StatusCode, body: &str) -> ApiError {
    let fallback_code = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiErrorCode::Validation,
        StatusCode::NOT_FOUND => ApiErrorCode::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiErrorCode::Unauthorized,
        _ => ApiErrorCode::Server,
    };

    if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
        if let Some(message) = envelope.error_message() {
            let code = envelope
                .error_code
                .as_deref()
                .map_or(fallback_code, ApiErrorCode::from_wire);
            return ApiError::new(code, format!("{message} ({})", status.as_u16()));
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        ApiError::new(fallback_code, format!("HTTP {}", status.as_u16()))
    } else {
        ApiError::new(fallback_code, format!("{trimmed} ({})", status.as_u16()))
    }
}

fn normalize_endpoint(raw: String) -> ApiResult<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        ApiError::new(ApiErrorCode::Validation, "API URL must not be empty")
    })?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(ApiError::new(
            ApiErrorCode::Validation,
            "API URL must include http:// or https://",
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::Priority;

    const SERVER_TASK: &str = r#"{
        "id": "t1", "title": "Take out trash", "assignedTo": "bob", "createdBy": "alice",
        "dueDate": "2030-06-01", "priority": "High", "version": 5,
        "lastModifiedBy": "bob", "createdAt": 1700000000000, "updatedAt": 1700000100000
    }"#;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_endpoint(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn debug_redacts_access_token() {
        let api = HttpTaskApi::new("https://api.example.com", Some("secret".to_string())).unwrap();
        let debug = format!("{api:?}");
        assert!(!debug.contains("secret"));
        assert!(api.has_access_token());
        assert!(!HttpTaskApi::new("https://api.example.com", Some("  ".to_string()))
            .unwrap()
            .has_access_token());
    }

    #[test]
    fn parse_api_error_prefers_envelope_message() {
        let error = parse_api_error(
            StatusCode::NOT_FOUND,
            r#"{"success": false, "error": "Task not found", "errorCode": "NOT_FOUND"}"#,
        );
        assert_eq!(error.code, ApiErrorCode::NotFound);
        assert_eq!(error.message, "Task not found (404)");

        let error = parse_api_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(error.code, ApiErrorCode::Server);
        assert_eq!(error.message, "HTTP 502");

        let error = parse_api_error(StatusCode::UNAUTHORIZED, "nope");
        assert_eq!(error.code, ApiErrorCode::Unauthorized);
    }

    #[test]
    fn decode_update_maps_version_conflict() {
        let body = format!(
            r#"{{"success": false, "errorCode": "VERSION_CONFLICT",
                "conflict": {{"currentVersion": 5, "expectedVersion": 3,
                              "lastModifiedBy": "bob", "lastModifiedByName": "Bob",
                              "serverTask": {SERVER_TASK}}}}}"#
        );
        let patch = TaskPatch {
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        }
        .with_version(3);

        let outcome = decode_update(StatusCode::CONFLICT, &body, &patch).unwrap();
        let UpdateOutcome::Conflict(conflict) = outcome else {
            panic!("expected conflict");
        };
        assert_eq!(conflict.current_version, 5);
        assert_eq!(conflict.expected_version, 3);
        assert_eq!(conflict.server_task.version, 5);
        assert_eq!(conflict.local_changes, patch);
        assert_eq!(conflict.modified_by_label(), "Bob");
    }

    #[test]
    fn decode_update_returns_updated_task() {
        let body = format!(r#"{{"success": true, "task": {SERVER_TASK}}}"#);
        let outcome = decode_update(StatusCode::OK, &body, &TaskPatch::default()).unwrap();
        let UpdateOutcome::Updated(task) = outcome else {
            panic!("expected update");
        };
        assert_eq!(task.id.as_str(), "t1");
        assert_eq!(task.last_modified_by.as_deref(), Some("bob"));
    }

    #[test]
    fn decode_tasks_reports_envelope_failure() {
        let error =
            decode_tasks(r#"{"success": false, "error": "denied", "errorCode": "UNAUTHORIZED"}"#)
                .unwrap_err();
        assert_eq!(error.code, ApiErrorCode::Unauthorized);
        assert_eq!(error.message, "denied");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_rejects_invalid_draft_without_network() {
        // Port 9 is discard; validation must fail before any request is made.
        let api = HttpTaskApi::new("http://127.0.0.1:9", None).unwrap();
        let draft = NewTask::new("", "alice", chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        let error = api.create_task(&draft).await.unwrap_err();
        assert_eq!(error.code, ApiErrorCode::Validation);
    }
}
