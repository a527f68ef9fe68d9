use crate::api::segment;
use crate::api::types::{continuation_token, items, total_count};
use crate::cli::NotebookCommands;
use crate::commands::{and_filters, quote, save_download, transfer_spinner};
use crate::context::Ctx;
use crate::error::{CliError, Result};
use crate::format::{text, ResourceKind};
use crate::output;
use crate::response::{render_paged, render_record, Cursor, Page};
use reqwest::multipart::{Form, Part};
use serde_json::json;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const NOTEBOOK_PATH: &str = "/ninotebook/v1/notebook";
const QUERY_PATH: &str = "/ninotebook/v1/notebook/query";

pub async fn run(command: NotebookCommands, ctx: &Ctx) -> Result<()> {
    match command {
        NotebookCommands::List {
            workspace,
            name,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut clauses = Vec::new();
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                clauses.push(format!("workspace = {}", quote(&ws)));
            }
            if let Some(name) = name {
                clauses.push(format!("name.Contains({})", quote(&name)));
            }
            let filter = and_filters(clauses);
            render_paged(
                &mut io::stdout(),
                ResourceKind::Notebook,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let mut body = json!({ "take": take });
                    if let Some(filter) = &filter {
                        body["filter"] = json!(filter);
                    }
                    if let Some(token) = Cursor::token(&cursor) {
                        body["continuationToken"] = json!(token);
                    }
                    async move {
                        let response = ctx.client.post_json(QUERY_PATH, &body).await?;
                        Ok(Page::from_token(
                            items(&response, "notebooks"),
                            continuation_token(&response),
                            total_count(&response),
                        ))
                    }
                },
            )
            .await
        }
        NotebookCommands::Get { id, format } => {
            let record = ctx.client.get_json(&notebook_path(&id), &[]).await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::Notebook,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        NotebookCommands::Create {
            file,
            name,
            workspace,
        } => create(ctx, &file, name, workspace.as_deref()).await,
        NotebookCommands::Download { id, output } => download(ctx, &id, output).await,
        NotebookCommands::Delete { id, yes } => {
            ctx.ensure_writable("delete notebooks")?;
            ctx.confirm(&format!("Delete notebook {}?", id), yes.yes)?;
            ctx.client.delete(&notebook_path(&id)).await?;
            output::print_success(&format!("Deleted notebook: {}", id));
            Ok(())
        }
    }
}

fn notebook_path(id: &str) -> String {
    format!("{}/{}", NOTEBOOK_PATH, segment(id))
}

/// Name to store a notebook under when none is given
fn default_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "notebook.ipynb".to_string())
}

async fn create(ctx: &Ctx, file: &Path, name: Option<String>, workspace: Option<&str>) -> Result<()> {
    ctx.ensure_writable("create notebooks")?;
    let content = fs::read(file)
        .map_err(|e| CliError::invalid(format!("cannot read {}: {}", file.display(), e)))?;
    serde_json::from_slice::<serde_json::Value>(&content).map_err(|e| {
        CliError::invalid(format!("{} is not a valid notebook: {}", file.display(), e))
    })?;

    let name = name.unwrap_or_else(|| default_name(file));
    let mut metadata = json!({ "name": name, "properties": {} });
    if let Some(ws) = ctx.workspace_filter(workspace).await {
        metadata["workspace"] = json!(ws);
    }

    let form = Form::new()
        .part(
            "metadata",
            Part::text(metadata.to_string()).mime_str("application/json")?,
        )
        .part(
            "content",
            Part::bytes(content)
                .file_name(name.clone())
                .mime_str("application/octet-stream")?,
        );

    let spinner = transfer_spinner(&format!("Uploading {}", name))?;
    let created = ctx.client.post_multipart(NOTEBOOK_PATH, &[], form).await;
    spinner.finish_and_clear();
    let created = created?;

    let id = text(&created, "id").unwrap_or_else(|| "(unknown id)".to_string());
    output::print_success(&format!("Created notebook {}: {}", name, id));
    Ok(())
}

async fn download(ctx: &Ctx, id: &str, output_path: Option<PathBuf>) -> Result<()> {
    let path = match output_path {
        Some(path) => path,
        None => {
            let metadata = ctx.client.get_json(&notebook_path(id), &[]).await?;
            let name = text(&metadata, "name").unwrap_or_else(|| id.to_string());
            PathBuf::from(if name.ends_with(".ipynb") {
                name
            } else {
                format!("{}.ipynb", name)
            })
        }
    };

    let spinner = transfer_spinner(&format!("Downloading notebook {}", id))?;
    let content = ctx
        .client
        .download(&format!("{}/content", notebook_path(id)))
        .await;
    spinner.finish_and_clear();
    save_download(&path, &content?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::ctx;
    use httpmock::MockServer;

    #[test]
    fn test_default_name() {
        assert_eq!(default_name(Path::new("/tmp/analysis.ipynb")), "analysis.ipynb");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_notebook_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.ipynb");
        fs::write(&file, "not a notebook").unwrap();

        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method("POST").path(NOTEBOOK_PATH);
                then.status(201).json_body(json!({"id": "nb1"}));
            })
            .await;

        let err = create(&ctx(&server.base_url()), &file, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code().code(), 2);
        assert_eq!(upload.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_create_uploads_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.ipynb");
        fs::write(&file, r#"{"cells": [], "nbformat": 4}"#).unwrap();

        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path(NOTEBOOK_PATH)
                    .body_contains("name=\"metadata\"")
                    .body_contains("report.ipynb");
                then.status(201).json_body(json!({"id": "nb1"}));
            })
            .await;

        create(&ctx(&server.base_url()), &file, None, None).await.unwrap();
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_writes_content() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/ninotebook/v1/notebook/nb1/content");
                then.status(200).body("{\"cells\": []}");
            })
            .await;

        let target = dir.path().join("copy.ipynb");
        download(&ctx(&server.base_url()), "nb1", Some(target.clone()))
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(target).unwrap(), "{\"cells\": []}");
    }
}
