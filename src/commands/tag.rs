use crate::api::types::{continuation_token, items, total_count};
use crate::api::{segment, ErrorHandling};
use crate::cli::{TagCommands, TagType};
use crate::commands::quote;
use crate::context::Ctx;
use crate::error::{ApiError, CliError, Result};
use crate::format::{text, ResourceKind};
use crate::output;
use crate::response::{render_paged, render_record, Cursor, Page};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::io;

const TAGS_PATH: &str = "/nitag/v2/tags";
const QUERY_PATH: &str = "/nitag/v2/query-tags-with-values";

fn tag_path(workspace: &str, path: &str) -> String {
    format!("{}/{}/{}", TAGS_PATH, segment(workspace), segment(path))
}

fn value_path(workspace: &str, path: &str) -> String {
    format!("{}/values/current", tag_path(workspace, path))
}

pub async fn run(command: TagCommands, ctx: &Ctx) -> Result<()> {
    match command {
        TagCommands::List {
            workspace,
            path,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let workspace = ctx.workspace_filter(workspace.as_deref()).await;
            render_paged(
                &mut io::stdout(),
                ResourceKind::Tag,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let body = query_body(
                        workspace.as_deref(),
                        path.as_deref(),
                        take,
                        Cursor::token(&cursor),
                    );
                    async move {
                        let response = ctx.client.post_json(QUERY_PATH, &body).await?;
                        Ok(Page::from_token(
                            items(&response, "tagsWithValues"),
                            continuation_token(&response),
                            total_count(&response),
                        ))
                    }
                },
            )
            .await
        }
        TagCommands::Get {
            path,
            workspace,
            format,
        } => {
            let workspace = ctx.require_workspace(workspace.as_deref()).await?;
            let record = fetch_with_value(ctx, &workspace, &path).await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::Tag,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        TagCommands::Create {
            path,
            tag_type,
            workspace,
            keywords,
            collect_aggregates,
        } => {
            ctx.ensure_writable("create tags")?;
            let workspace = ctx.require_workspace(workspace.as_deref()).await?;
            let body = json!({
                "type": tag_type.wire_name(),
                "path": path,
                "workspace": workspace,
                "keywords": keywords,
                "collectAggregates": collect_aggregates,
                "properties": {},
            });
            ctx.client.post_json(TAGS_PATH, &body).await?;
            output::print_success(&format!("Created tag: {}", path));
            Ok(())
        }
        TagCommands::SetValue {
            path,
            value,
            workspace,
        } => set_value(ctx, &path, &value, workspace.as_deref()).await,
        TagCommands::Delete {
            path,
            workspace,
            yes,
        } => {
            ctx.ensure_writable("delete tags")?;
            let workspace = ctx.require_workspace(workspace.as_deref()).await?;
            ctx.confirm(&format!("Delete tag {}?", path), yes.yes)?;
            ctx.client.delete(&tag_path(&workspace, &path)).await?;
            output::print_success(&format!("Deleted tag: {}", path));
            Ok(())
        }
    }
}

fn query_body(workspace: Option<&str>, path: Option<&str>, take: usize, token: Option<String>) -> Value {
    let mut body = json!({ "take": take });
    if let Some(workspace) = workspace {
        body["workspaces"] = json!([workspace]);
    }
    if let Some(path) = path {
        body["filter"] = json!(format!("path = {}", quote(path)));
    }
    if let Some(token) = token {
        body["continuationToken"] = json!(token);
    }
    body
}

/// Tag metadata together with its current value, shaped like a list entry
async fn fetch_with_value(ctx: &Ctx, workspace: &str, path: &str) -> Result<Value> {
    let tag = ctx.client.get_json(&tag_path(workspace, path), &[]).await?;
    // A tag that was never written has no current value
    let response = ctx
        .client
        .execute(
            Method::GET,
            &value_path(workspace, path),
            &[],
            None,
            ErrorHandling::Passthrough,
        )
        .await?;
    let status = response.status();
    let current = if status.is_success() {
        crate::api::client::read_json(response).await?
    } else if status == StatusCode::NOT_FOUND {
        tracing::debug!("tag has no current value");
        Value::Null
    } else {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_body(status, body).into());
    };
    Ok(json!({ "tag": tag, "current": current }))
}

/// Check `raw` against the tag's data type and turn it into the wire string
fn coerce_value(tag_type: &str, raw: &str) -> Result<String> {
    let raw = raw.trim();
    let bad = || CliError::invalid(format!("'{}' is not a valid {} value", raw, tag_type));
    match tag_type {
        "INT" => raw.parse::<i32>().map(|v| v.to_string()).map_err(|_| bad()),
        "U_INT64" => raw.parse::<u64>().map(|v| v.to_string()).map_err(|_| bad()),
        "DOUBLE" => raw.parse::<f64>().map(|_| raw.to_string()).map_err(|_| bad()),
        "BOOLEAN" => match raw.to_lowercase().as_str() {
            "true" | "1" => Ok("True".to_string()),
            "false" | "0" => Ok("False".to_string()),
            _ => Err(bad()),
        },
        "DATE_TIME" => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|_| raw.to_string())
            .map_err(|_| bad()),
        _ => Ok(raw.to_string()),
    }
}

async fn set_value(ctx: &Ctx, path: &str, value: &str, workspace: Option<&str>) -> Result<()> {
    ctx.ensure_writable("write tag values")?;
    let workspace = ctx.require_workspace(workspace).await?;
    let tag = ctx.client.get_json(&tag_path(&workspace, path), &[]).await?;
    let tag_type = text(&tag, "type").unwrap_or_else(|| TagType::String.wire_name().to_string());
    let value = coerce_value(&tag_type, value)?;

    ctx.client
        .put_json(
            &value_path(&workspace, path),
            &json!({ "value": { "type": tag_type, "value": value } }),
        )
        .await?;
    output::print_success(&format!("Set {} = {}", path, value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::ctx;
    use crate::error::ExitCode;
    use httpmock::MockServer;

    #[test]
    fn test_tag_path_is_encoded() {
        assert_eq!(
            tag_path("ws 1", "Line1/Temp Sensor"),
            "/nitag/v2/tags/ws%201/Line1%2FTemp%20Sensor"
        );
        assert!(value_path("w", "a.b").ends_with("/w/a.b/values/current"));
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("INT", " 42 ").unwrap(), "42");
        assert_eq!(coerce_value("BOOLEAN", "TRUE").unwrap(), "True");
        assert_eq!(coerce_value("STRING", "hello").unwrap(), "hello");
        assert_eq!(coerce_value("DOUBLE", "1.5").unwrap(), "1.5");
        assert_eq!(
            coerce_value("INT", "4.2").unwrap_err().exit_code(),
            ExitCode::InvalidInput
        );
        assert!(coerce_value("U_INT64", "-1").is_err());
    }

    #[test]
    fn test_query_body() {
        let body = query_body(Some("w1"), Some("Line1.*"), 10, None);
        assert_eq!(body["workspaces"], json!(["w1"]));
        assert_eq!(body["filter"], "path = \"Line1.*\"");
    }

    #[tokio::test]
    async fn test_set_value_uses_tag_type() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/nitag/v2/tags/w1/Line1.Temp");
                then.status(200)
                    .json_body(json!({"path": "Line1.Temp", "type": "DOUBLE", "workspace": "w1"}));
            })
            .await;
        let put = server
            .mock_async(|when, then| {
                when.method("PUT")
                    .path("/nitag/v2/tags/w1/Line1.Temp/values/current")
                    .json_body(json!({"value": {"type": "DOUBLE", "value": "21.5"}}));
                then.status(200);
            })
            .await;

        set_value(&ctx(&server.base_url()), "Line1.Temp", "21.5", Some("w1"))
            .await
            .unwrap();
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_without_current_value() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/nitag/v2/tags/w1/fresh");
                then.status(200).json_body(json!({"path": "fresh", "type": "INT"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/nitag/v2/tags/w1/fresh/values/current");
                then.status(404);
            })
            .await;

        let record = fetch_with_value(&ctx(&server.base_url()), "w1", "fresh")
            .await
            .unwrap();
        assert_eq!(record["tag"]["type"], "INT");
        assert!(record["current"].is_null());
    }

    #[tokio::test]
    async fn test_get_surfaces_current_value_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/nitag/v2/tags/w1/t");
                then.status(200).json_body(json!({"path": "t", "type": "DOUBLE"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/nitag/v2/tags/w1/t/values/current");
                then.status(500).body("internal error");
            })
            .await;

        let err = fetch_with_value(&ctx(&server.base_url()), "w1", "t")
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
        assert!(err.to_string().contains("internal error"));
    }
}
