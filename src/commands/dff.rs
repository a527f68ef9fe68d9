use crate::api::types::{continuation_token, items, BatchOutcome};
use crate::cli::DffCommands;
use crate::commands::{read_json_file, report_batch, report_deleted};
use crate::context::Ctx;
use crate::error::{validate_batch, CliError, Result};
use crate::format::ResourceKind;
use crate::output;
use crate::response::{render_paged, render_record, Cursor, Page};
use serde_json::{json, Value};
use std::io;

const CONFIGURATIONS_PATH: &str = "/nidynamicformfields/v1/configurations";
const RESOLVED_PATH: &str = "/nidynamicformfields/v1/resolved-configuration";
const DELETE_PATH: &str = "/nidynamicformfields/v1/delete";

pub async fn run(command: DffCommands, ctx: &Ctx) -> Result<()> {
    match command {
        DffCommands::List { workspace, list } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let workspace = ctx.workspace_filter(workspace.as_deref()).await;
            render_paged(
                &mut io::stdout(),
                ResourceKind::DffConfiguration,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let mut query = vec![("take", take.to_string())];
                    if let Some(ws) = &workspace {
                        query.push(("workspace", ws.clone()));
                    }
                    if let Some(token) = Cursor::token(&cursor) {
                        query.push(("continuationToken", token));
                    }
                    async move {
                        let response = ctx.client.get_json(CONFIGURATIONS_PATH, &query).await?;
                        Ok(Page::from_token(
                            items(&response, "configurations"),
                            continuation_token(&response),
                            None,
                        ))
                    }
                },
            )
            .await
        }
        DffCommands::Get { id, format } => {
            let response = ctx
                .client
                .get_json(RESOLVED_PATH, &[("configurationId", id)])
                .await?;
            // Resolved replies wrap the configuration next to its groups and fields
            let record = match response.get("configuration") {
                Some(configuration) if format.format == output::OutputFormat::Table => {
                    configuration.clone()
                }
                _ => response,
            };
            render_record(
                &mut io::stdout(),
                ResourceKind::DffConfiguration,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        DffCommands::Create { file } => {
            ctx.ensure_writable("create form field configurations")?;
            let body = creation_body(read_json_file(&file)?)?;
            let response = ctx.client.post_json(CONFIGURATIONS_PATH, &body).await?;
            let outcome =
                BatchOutcome::from_response(&response, "configurations", "failedConfigurations");
            report_batch(&outcome, "Created", ResourceKind::DffConfiguration)
        }
        DffCommands::Delete { ids, yes } => {
            ctx.ensure_writable("delete form field configurations")?;
            validate_batch(&ids, "configuration")?;
            ctx.confirm(&format!("Delete {} configuration(s)?", ids.len()), yes.yes)?;
            let response = ctx
                .client
                .post_json(DELETE_PATH, &json!({ "configurationIds": ids }))
                .await?;
            let outcome = BatchOutcome::from_response(
                &response,
                "deletedConfigurationIds",
                "failedConfigurationIds",
            );
            report_deleted(&outcome, ids.len(), ResourceKind::DffConfiguration)
        }
    }
}

/// Accept either a full request body or a bare list of configurations
fn creation_body(document: Value) -> Result<Value> {
    if document.get("configurations").is_some() {
        return Ok(document);
    }
    match document {
        Value::Array(configurations) => Ok(json!({ "configurations": configurations })),
        Value::Object(_) => Ok(json!({ "configurations": [document] })),
        _ => Err(CliError::invalid(
            "expected a configuration object or a list of configurations",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::ctx;
    use httpmock::MockServer;

    #[test]
    fn test_creation_body_shapes() {
        let single = creation_body(json!({"name": "Cal", "key": "cal"})).unwrap();
        assert_eq!(single["configurations"][0]["key"], "cal");

        let list = creation_body(json!([{"key": "a"}, {"key": "b"}])).unwrap();
        assert_eq!(list["configurations"].as_array().unwrap().len(), 2);

        let full = json!({"configurations": [], "groups": [], "fields": []});
        assert_eq!(creation_body(full.clone()).unwrap(), full);

        assert!(creation_body(json!("nope")).is_err());
    }

    #[tokio::test]
    async fn test_delete_sends_configuration_ids() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path(DELETE_PATH)
                    .json_body(json!({"configurationIds": ["c1"]}));
                then.status(204);
            })
            .await;

        run(
            DffCommands::Delete {
                ids: vec!["c1".into()],
                yes: crate::cli::YesArg { yes: true },
            },
            &ctx(&server.base_url()),
        )
        .await
        .unwrap();
        mock.assert_async().await;
    }
}
