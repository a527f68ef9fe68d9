use crate::api::segment;
use crate::api::types::{items, total_count};
use crate::cli::FileCommands;
use crate::commands::{and_filters, quote, save_download, transfer_spinner};
use crate::context::Ctx;
use crate::error::{CliError, Result};
use crate::format::{format_bytes, text, ResourceKind};
use crate::output;
use crate::response::{render_paged, render_record, Cursor, Page};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SERVICE_GROUP: &str = "/nifile/v1/service-groups/Default";

fn endpoint(rest: &str) -> String {
    format!("{}/{}", SERVICE_GROUP, rest)
}

fn file_path(id: &str) -> String {
    endpoint(&format!("files/{}", segment(id)))
}

pub async fn run(command: FileCommands, ctx: &Ctx) -> Result<()> {
    match command {
        FileCommands::List {
            workspace,
            name,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut clauses = Vec::new();
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                clauses.push(format!("workspace == {}", quote(&ws)));
            }
            if let Some(name) = name {
                clauses.push(format!("name.Contains({})", quote(&name)));
            }
            let filter = and_filters(clauses);
            let query_path = endpoint("query-files");
            render_paged(
                &mut io::stdout(),
                ResourceKind::File,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let skip = Cursor::skip(&cursor);
                    let body = query_body(filter.as_deref(), skip, take);
                    let path = query_path.clone();
                    async move {
                        let response = ctx.client.post_json(&path, &body).await?;
                        Ok(Page::from_skip(
                            items(&response, "availableFiles"),
                            skip,
                            take,
                            total_count(&response),
                        ))
                    }
                },
            )
            .await
        }
        FileCommands::Get { id, format } => {
            let record = find(ctx, &id).await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::File,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        FileCommands::Upload { path, workspace } => upload(ctx, &path, workspace.as_deref()).await,
        FileCommands::Download { id, output } => download(ctx, &id, output).await,
        FileCommands::Delete { id, yes } => {
            ctx.ensure_writable("delete files")?;
            ctx.confirm(&format!("Delete file {}?", id), yes.yes)?;
            ctx.client.delete(&file_path(&id)).await?;
            output::print_success(&format!("Deleted file: {}", id));
            Ok(())
        }
    }
}

fn query_body(filter: Option<&str>, skip: usize, take: usize) -> Value {
    let mut body = json!({
        "skip": skip,
        "take": take,
        "orderBy": "created",
        "orderByDescending": true,
    });
    if let Some(filter) = filter {
        body["filter"] = json!(filter);
    }
    body
}

/// Metadata of a single file
async fn find(ctx: &Ctx, id: &str) -> Result<Value> {
    let body = query_body(Some(&format!("id == {}", quote(id))), 0, 1);
    let response = ctx.client.post_json(&endpoint("query-files"), &body).await?;
    items(&response, "availableFiles")
        .into_iter()
        .next()
        .ok_or_else(|| CliError::not_found(format!("File '{}' not found", id)))
}

/// Id of an uploaded file from the `uri` the service answers with
fn uploaded_id(response: &Value) -> Option<String> {
    text(response, "id").or_else(|| {
        text(response, "uri").and_then(|uri| {
            uri.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    })
}

async fn upload(ctx: &Ctx, path: &Path, workspace: Option<&str>) -> Result<()> {
    ctx.ensure_writable("upload files")?;
    let content = fs::read(path)
        .map_err(|e| CliError::invalid(format!("cannot read {}: {}", path.display(), e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::invalid(format!("{} is not a file", path.display())))?;
    let size = content.len() as u64;

    let mut query = Vec::new();
    if let Some(ws) = ctx.workspace_filter(workspace).await {
        query.push(("workspace", ws));
    }
    let form = Form::new().part(
        "file",
        Part::bytes(content)
            .file_name(name.clone())
            .mime_str("application/octet-stream")?,
    );

    let spinner = transfer_spinner(&format!("Uploading {} ({})", name, format_bytes(size)))?;
    let response = ctx
        .client
        .post_multipart(&endpoint("upload-files"), &query, form)
        .await;
    spinner.finish_and_clear();
    let response = response?;

    let id = uploaded_id(&response).unwrap_or_else(|| "(unknown id)".to_string());
    output::print_success(&format!("Uploaded {}: {}", name, id));
    Ok(())
}

async fn download(ctx: &Ctx, id: &str, output_path: Option<PathBuf>) -> Result<()> {
    let path = match output_path {
        Some(path) => path,
        None => {
            let metadata = find(ctx, id).await?;
            let name = text(&metadata, "properties.Name").unwrap_or_else(|| id.to_string());
            // Keep only the final component of a stored name
            PathBuf::from(
                Path::new(&name)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.to_string()),
            )
        }
    };

    let spinner = transfer_spinner(&format!("Downloading file {}", id))?;
    let content = ctx
        .client
        .download(&format!("{}/data", file_path(id)))
        .await;
    spinner.finish_and_clear();
    save_download(&path, &content?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::ctx;
    use crate::error::ExitCode;
    use httpmock::MockServer;

    #[test]
    fn test_uploaded_id() {
        assert_eq!(
            uploaded_id(&json!({"uri": "/nifile/v1/service-groups/Default/files/abc123"})),
            Some("abc123".to_string())
        );
        assert_eq!(uploaded_id(&json!({"id": "x"})), Some("x".to_string()));
        assert_eq!(uploaded_id(&json!({})), None);
    }

    #[test]
    fn test_query_body() {
        let body = query_body(Some("id == \"f\""), 10, 5);
        assert_eq!(body["skip"], 10);
        assert_eq!(body["take"], 5);
        assert_eq!(body["filter"], "id == \"f\"");
    }

    #[tokio::test]
    async fn test_upload_sends_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.csv");
        fs::write(&local, "a,b\n1,2\n").unwrap();

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/nifile/v1/service-groups/Default/upload-files")
                    .query_param("workspace", "ws-1")
                    .body_contains("data.csv");
                then.status(201)
                    .json_body(json!({"uri": "/nifile/v1/service-groups/Default/files/f-1"}));
            })
            .await;

        upload(&ctx(&server.base_url()), &local, Some("ws-1")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_uses_stored_name() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/nifile/v1/service-groups/Default/query-files");
                then.status(200).json_body(json!({
                    "availableFiles": [{"id": "f-1", "properties": {"Name": "results.csv"}}],
                    "totalCount": 1
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/nifile/v1/service-groups/Default/files/f-1/data");
                then.status(200).body("x,y\n");
            })
            .await;

        let target = dir.path().join("renamed.csv");
        download(&ctx(&server.base_url()), "f-1", Some(target.clone()))
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "x,y\n");

        let metadata = find(&ctx(&server.base_url()), "f-1").await.unwrap();
        assert_eq!(text(&metadata, "properties.Name").unwrap(), "results.csv");
    }

    #[tokio::test]
    async fn test_get_missing_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/nifile/v1/service-groups/Default/query-files");
                then.status(200).json_body(json!({"availableFiles": [], "totalCount": 0}));
            })
            .await;

        let err = find(&ctx(&server.base_url()), "gone").await.unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::NotFound);
    }
}
