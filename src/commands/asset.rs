use crate::api::segment;
use crate::api::types::{items, total_count, BatchOutcome};
use crate::cli::AssetCommands;
use crate::commands::{and_filters, quote, report_batch, report_deleted};
use crate::context::Ctx;
use crate::error::{validate_batch, CliError, Result};
use crate::format::ResourceKind;
use crate::response::{render_list, render_paged, render_record, Cursor, Page};
use serde_json::{json, Value};
use std::io;

const ASSETS_PATH: &str = "/niapm/v1/assets";
const QUERY_PATH: &str = "/niapm/v1/query-assets";
const UPDATE_PATH: &str = "/niapm/v1/update-assets";
const DELETE_PATH: &str = "/niapm/v1/delete-assets";

/// Search criteria for `asset list`
#[derive(Debug, Default)]
struct AssetFilter {
    filter: Option<String>,
    model: Option<String>,
    serial_number: Option<String>,
    vendor: Option<String>,
    workspace: Option<String>,
}

impl AssetFilter {
    fn to_linq(&self) -> Option<String> {
        let mut clauses: Vec<String> = self.filter.iter().cloned().collect();
        if let Some(model) = &self.model {
            clauses.push(format!("ModelName.Contains({})", quote(model)));
        }
        if let Some(serial) = &self.serial_number {
            clauses.push(format!("SerialNumber == {}", quote(serial)));
        }
        if let Some(vendor) = &self.vendor {
            clauses.push(format!("VendorName == {}", quote(vendor)));
        }
        if let Some(workspace) = &self.workspace {
            clauses.push(format!("Workspace == {}", quote(workspace)));
        }
        and_filters(clauses)
    }
}

pub async fn run(command: AssetCommands, ctx: &Ctx) -> Result<()> {
    match command {
        AssetCommands::List {
            filter,
            model,
            serial_number,
            vendor,
            workspace,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let criteria = AssetFilter {
                filter,
                model,
                serial_number,
                vendor,
                workspace: ctx.workspace_filter(workspace.as_deref()).await,
            };
            let filter = criteria.to_linq();
            render_paged(
                &mut io::stdout(),
                ResourceKind::Asset,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let skip = Cursor::skip(&cursor);
                    let mut body = json!({ "take": take, "skip": skip, "returnCount": true });
                    if let Some(filter) = &filter {
                        body["filter"] = json!(filter);
                    }
                    async move {
                        let response = ctx.client.post_json(QUERY_PATH, &body).await?;
                        Ok(Page::from_skip(
                            items(&response, "assets"),
                            skip,
                            take,
                            total_count(&response),
                        ))
                    }
                },
            )
            .await
        }
        AssetCommands::Get { id, format } => {
            let record = ctx
                .client
                .get_json(&format!("{}/{}", ASSETS_PATH, segment(&id)), &[])
                .await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::Asset,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        AssetCommands::Create {
            name,
            model_name,
            serial_number,
            vendor_name,
            part_number,
            workspace,
        } => {
            ctx.ensure_writable("create assets")?;
            let mut asset = json!({ "name": name });
            set_opt(&mut asset, "modelName", model_name);
            set_opt(&mut asset, "serialNumber", serial_number);
            set_opt(&mut asset, "vendorName", vendor_name);
            set_opt(&mut asset, "partNumber", part_number);
            set_opt(&mut asset, "workspace", ctx.workspace_filter(workspace.as_deref()).await);

            let response = ctx
                .client
                .post_json(ASSETS_PATH, &json!({ "assets": [asset] }))
                .await?;
            let outcome = BatchOutcome::from_response(&response, "assets", "failed");
            report_batch(&outcome, "Created", ResourceKind::Asset)
        }
        AssetCommands::Update {
            id,
            name,
            serial_number,
            model_name,
        } => {
            ctx.ensure_writable("update assets")?;
            let mut asset = json!({ "id": id });
            set_opt(&mut asset, "name", name);
            set_opt(&mut asset, "serialNumber", serial_number);
            set_opt(&mut asset, "modelName", model_name);
            if asset.as_object().map_or(0, |a| a.len()) == 1 {
                return Err(CliError::invalid("nothing to update"));
            }
            let response = ctx
                .client
                .post_json(UPDATE_PATH, &json!({ "assets": [asset] }))
                .await?;
            let outcome = BatchOutcome::from_response(&response, "assets", "failed");
            report_batch(&outcome, "Updated", ResourceKind::Asset)
        }
        AssetCommands::Delete { ids, yes } => delete(ctx, &ids, yes.yes).await,
        AssetCommands::Calibration { id, list } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let response = ctx
                .client
                .get_json(
                    &format!("{}/{}/history/calibration", ASSETS_PATH, segment(&id)),
                    &[],
                )
                .await?;
            render_list(
                &mut io::stdout(),
                ResourceKind::Calibration,
                &items(&response, "calibrationHistory"),
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
            )
        }
    }
}

fn set_opt(target: &mut Value, key: &str, value: Option<String>) {
    if let Some(value) = value {
        target[key] = json!(value);
    }
}

async fn delete(ctx: &Ctx, ids: &[String], yes: bool) -> Result<()> {
    ctx.ensure_writable("delete assets")?;
    validate_batch(ids, "asset")?;
    ctx.confirm(&format!("Delete {} asset(s)?", ids.len()), yes)?;
    let response = ctx
        .client
        .post_json(DELETE_PATH, &json!({ "ids": ids }))
        .await?;
    let outcome = BatchOutcome::from_response(&response, "ids", "failed");
    report_deleted(&outcome, ids.len(), ResourceKind::Asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::ctx;
    use crate::error::ExitCode;
    use httpmock::MockServer;

    #[test]
    fn test_filter_to_linq() {
        assert_eq!(AssetFilter::default().to_linq(), None);
        let criteria = AssetFilter {
            model: Some("5160".into()),
            workspace: Some("w1".into()),
            ..AssetFilter::default()
        };
        assert_eq!(
            criteria.to_linq().unwrap(),
            "(ModelName.Contains(\"5160\")) && (Workspace == \"w1\")"
        );
    }

    #[tokio::test]
    async fn test_delete_reports_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path(DELETE_PATH).json_body(json!({"ids": ["a1", "a2"]}));
                then.status(200).json_body(json!({
                    "ids": ["a1"],
                    "failed": ["a2"]
                }));
            })
            .await;

        let ids = vec!["a1".to_string(), "a2".to_string()];
        let err = delete(&ctx(&server.base_url()), &ids, true).await.unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
        assert!(err.to_string().contains("1 of 2 assets failed"));
    }

    #[tokio::test]
    async fn test_delete_with_empty_reply_succeeds() {
        let server = MockServer::start_async().await;
        let delete_mock = server
            .mock_async(|when, then| {
                when.method("POST").path(DELETE_PATH).json_body(json!({"ids": ["a1"]}));
                then.status(204);
            })
            .await;

        let ids = vec!["a1".to_string()];
        delete(&ctx(&server.base_url()), &ids, true).await.unwrap();
        delete_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_missing_asset_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/niapm/v1/assets/nope");
                then.status(404)
                    .json_body(json!({"error": {"code": -255134, "message": "Asset not found"}}));
            })
            .await;

        let err = run(
            AssetCommands::Get {
                id: "nope".into(),
                format: crate::cli::FormatArg {
                    format: crate::output::OutputFormat::Json,
                },
            },
            &ctx(&server.base_url()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::NotFound);
    }
}
