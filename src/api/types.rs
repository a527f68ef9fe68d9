use serde::Deserialize;
use serde_json::Value;

/// Workspace returned by /niuser/v1/workspaces
#[derive(Debug, Clone, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub default: bool,
}

fn default_enabled() -> bool {
    true
}

/// Workspaces list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacesResponse {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    pub total_count: Option<usize>,
}

/// Split of a bulk create/update/delete reply into its succeeded and failed parts
///
/// Bulk endpoints answer with pairs such as `createdComments`/`failedComments`
/// or `createdWorkItems`/`failedWorkItems`; a missing key means an empty list.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<Value>,
    pub failed: Vec<Value>,
}

impl BatchOutcome {
    pub fn from_response(response: &Value, succeeded_key: &str, failed_key: &str) -> Self {
        let list = |key: &str| {
            response
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        Self {
            succeeded: list(succeeded_key),
            failed: list(failed_key),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Extract the list stored under `key`, or an empty list
pub fn items(response: &Value, key: &str) -> Vec<Value> {
    response
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Continuation token of a paged response, if the server sent a usable one
pub fn continuation_token(response: &Value) -> Option<String> {
    response
        .get("continuationToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Total count reported by the server (`totalCount` or `count`)
pub fn total_count(response: &Value) -> Option<usize> {
    response
        .get("totalCount")
        .or_else(|| response.get("count"))
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_outcome() {
        let response = json!({
            "createdComments": [{"id": "C1"}],
            "failedComments": [{"message": "x"}, {"message": "y"}]
        });
        let outcome = BatchOutcome::from_response(&response, "createdComments", "failedComments");
        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.has_failures());

        let empty = BatchOutcome::from_response(&json!({}), "a", "b");
        assert!(empty.succeeded.is_empty());
        assert!(!empty.has_failures());
    }

    #[test]
    fn test_continuation_token_ignores_empty() {
        assert_eq!(continuation_token(&json!({"continuationToken": "abc"})), Some("abc".to_string()));
        assert_eq!(continuation_token(&json!({"continuationToken": ""})), None);
        assert_eq!(continuation_token(&json!({"continuationToken": null})), None);
    }

    #[test]
    fn test_total_count_variants() {
        assert_eq!(total_count(&json!({"totalCount": 7})), Some(7));
        assert_eq!(total_count(&json!({"count": 3})), Some(3));
        assert_eq!(total_count(&json!({})), None);
    }

    #[test]
    fn test_workspace_defaults() {
        let parsed: WorkspacesResponse =
            serde_json::from_value(json!({"workspaces": [{"id": "w1", "name": "Default"}]})).unwrap();
        assert!(parsed.workspaces[0].enabled);
        assert_eq!(parsed.total_count, None);
    }
}
