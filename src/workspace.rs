//! Workspace name/id resolution

use crate::api::types::{Workspace, WorkspacesResponse};
use crate::api::ApiClient;
use crate::error::Result;
use std::collections::HashMap;

pub const WORKSPACES_PATH: &str = "/niuser/v1/workspaces";

/// Largest page the workspace endpoint hands out
const WORKSPACE_TAKE: usize = 1000;

/// Lookup table between workspace ids and names
#[derive(Debug, Default, Clone)]
pub struct WorkspaceMap {
    names_by_id: HashMap<String, String>,
}

impl WorkspaceMap {
    pub fn from_workspaces(workspaces: &[Workspace]) -> Self {
        let names_by_id = workspaces
            .iter()
            .map(|ws| (ws.id.clone(), ws.name.clone()))
            .collect();
        Self { names_by_id }
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names_by_id.get(id).map(String::as_str)
    }

    /// Name for display, falling back to the id itself
    pub fn display(&self, id: &str) -> String {
        self.name_of(id).unwrap_or(id).to_string()
    }

    /// Turn a workspace name into its id
    ///
    /// Names match case-insensitively. Anything that is not a known name is
    /// returned unchanged and treated as an id by the server.
    pub fn resolve(&self, name_or_id: &str) -> String {
        if self.names_by_id.contains_key(name_or_id) {
            return name_or_id.to_string();
        }
        self.names_by_id
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(name_or_id))
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| name_or_id.to_string())
    }
}

/// Fetch every workspace visible to the caller, one `skip`/`take` page at a time
pub async fn fetch_workspaces(client: &ApiClient) -> Result<Vec<Workspace>> {
    let mut all: Vec<Workspace> = Vec::new();
    loop {
        let value = client
            .get_json(
                WORKSPACES_PATH,
                &[
                    ("take", WORKSPACE_TAKE.to_string()),
                    ("skip", all.len().to_string()),
                ],
            )
            .await?;
        let page: WorkspacesResponse = serde_json::from_value(value)?;
        let fetched = page.workspaces.len();
        all.extend(page.workspaces);

        let remaining = page.total_count.is_some_and(|total| total > all.len());
        if fetched == 0 || fetched < WORKSPACE_TAKE || !remaining {
            break;
        }
        tracing::debug!("fetched {} workspaces, requesting more", all.len());
    }
    Ok(all)
}

/// Build the lookup table, degrading to an empty one when workspaces can't be listed
pub async fn load_map(client: &ApiClient) -> WorkspaceMap {
    match fetch_workspaces(client).await {
        Ok(workspaces) => WorkspaceMap::from_workspaces(&workspaces),
        Err(e) => {
            tracing::warn!("could not list workspaces, names will show as ids: {}", e);
            WorkspaceMap::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use std::time::Duration;

    fn map() -> WorkspaceMap {
        WorkspaceMap::from_workspaces(&[
            Workspace {
                id: "846e294a".into(),
                name: "Default".into(),
                enabled: true,
                default: true,
            },
            Workspace {
                id: "a1b2".into(),
                name: "Lab A".into(),
                enabled: true,
                default: false,
            },
        ])
    }

    #[test]
    fn test_resolve_name_case_insensitive() {
        assert_eq!(map().resolve("lab a"), "a1b2");
        assert_eq!(map().resolve("Default"), "846e294a");
    }

    #[test]
    fn test_resolve_id_and_unknown_pass_through() {
        assert_eq!(map().resolve("a1b2"), "a1b2");
        assert_eq!(map().resolve("ws1"), "ws1");
    }

    fn workspace_page(start: usize, count: usize) -> serde_json::Value {
        let workspaces: Vec<serde_json::Value> = (start..start + count)
            .map(|i| serde_json::json!({"id": format!("w{}", i), "name": format!("WS {}", i)}))
            .collect();
        serde_json::json!({"workspaces": workspaces, "totalCount": WORKSPACE_TAKE + 2})
    }

    #[tokio::test]
    async fn test_fetch_pages_past_first_thousand() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method("GET").path(WORKSPACES_PATH).query_param("skip", "0");
                then.status(200).json_body(workspace_page(0, WORKSPACE_TAKE));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method("GET")
                    .path(WORKSPACES_PATH)
                    .query_param("skip", WORKSPACE_TAKE.to_string());
                then.status(200).json_body(workspace_page(WORKSPACE_TAKE, 2));
            })
            .await;

        let client = ApiClient::new(&server.base_url(), "test-key", Duration::from_secs(5)).unwrap();
        let workspaces = fetch_workspaces(&client).await.unwrap();
        assert_eq!(workspaces.len(), WORKSPACE_TAKE + 2);
        assert_eq!(workspaces.last().unwrap().id, format!("w{}", WORKSPACE_TAKE + 1));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[test]
    fn test_display_falls_back_to_id() {
        assert_eq!(map().display("a1b2"), "Lab A");
        assert_eq!(map().display("zzz"), "zzz");
    }
}
