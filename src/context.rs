//! Per-invocation state shared by every resource command

use crate::api::ApiClient;
use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;
use crate::response::{ListOptions, Prompt};
use crate::workspace::{self, WorkspaceMap};
use std::time::Duration;
use tokio::sync::OnceCell;

pub struct Ctx {
    pub client: ApiClient,
    pub config: Config,
    prompt: Box<dyn Prompt>,
    workspaces: OnceCell<WorkspaceMap>,
}

impl Ctx {
    pub fn new(credentials: Credentials, config: Config, prompt: Box<dyn Prompt>) -> Result<Self> {
        let client = ApiClient::new(
            &credentials.api_url,
            &credentials.api_key,
            Duration::from_secs(config.timeout_secs.max(1)),
        )?;
        Ok(Self {
            client,
            config,
            prompt,
            workspaces: OnceCell::new(),
        })
    }

    pub fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    /// Workspace id/name table, fetched once per run
    pub async fn workspaces(&self) -> &WorkspaceMap {
        self.workspaces
            .get_or_init(|| workspace::load_map(&self.client))
            .await
    }

    /// Map a workspace name to its id; ids and unknown values pass through
    pub async fn resolve_workspace(&self, name_or_id: &str) -> String {
        self.workspaces().await.resolve(name_or_id)
    }

    /// Resolve an optional `--workspace`, falling back to the configured default
    pub async fn workspace_filter(&self, workspace: Option<&str>) -> Option<String> {
        let chosen = workspace
            .map(str::to_string)
            .or_else(|| self.config.default_workspace.clone())?;
        Some(self.resolve_workspace(&chosen).await)
    }

    /// Like `workspace_filter`, for commands that cannot run without one
    pub async fn require_workspace(&self, workspace: Option<&str>) -> Result<String> {
        self.workspace_filter(workspace)
            .await
            .ok_or_else(|| CliError::invalid("--workspace is required (or set default_workspace)"))
    }

    /// Refuse mutating commands in readonly mode
    pub fn ensure_writable(&self, action: &str) -> Result<()> {
        if self.config.readonly {
            return Err(CliError::Readonly(action.to_string()));
        }
        Ok(())
    }

    /// Ask before a destructive action unless `--yes` was given
    pub fn confirm(&self, question: &str, assume_yes: bool) -> Result<()> {
        if assume_yes || self.prompt.confirm(question, false) {
            return Ok(());
        }
        Err(CliError::invalid("cancelled (pass --yes to skip confirmation)"))
    }

    /// Page size from `--take`, or the configured default
    pub fn list_options(&self, format: OutputFormat, take: Option<usize>) -> Result<ListOptions> {
        ListOptions::new(format, take.unwrap_or(self.config.page_size))
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::response::AlwaysYes;

    /// Context pointed at a mock server, answering yes to every question
    pub fn ctx(base_url: &str) -> Ctx {
        ctx_with(base_url, Config::default())
    }

    pub fn ctx_with(base_url: &str, config: Config) -> Ctx {
        let credentials = Credentials {
            api_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            web_url: None,
        };
        Ctx::new(credentials, config, Box::new(AlwaysYes)).unwrap()
    }
}
