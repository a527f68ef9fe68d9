use crate::api::segment;
use crate::api::types::{continuation_token, items, total_count, BatchOutcome};
use crate::cli::WorkitemCommands;
use crate::commands::{and_filters, quote, report_batch, report_deleted};
use crate::context::Ctx;
use crate::error::{validate_batch, CliError, Result};
use crate::format::ResourceKind;
use crate::response::{render_paged, render_record, Cursor, Page};
use serde_json::{json, Map, Value};
use std::io;

const WORKITEMS_PATH: &str = "/niworkorder/v1/workitems";
const QUERY_PATH: &str = "/niworkorder/v1/query-workitems";
const UPDATE_PATH: &str = "/niworkorder/v1/update-workitems";
const DELETE_PATH: &str = "/niworkorder/v1/delete-workitems";

pub async fn run(command: WorkitemCommands, ctx: &Ctx) -> Result<()> {
    match command {
        WorkitemCommands::List {
            filter,
            state,
            item_type,
            workspace,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut clauses: Vec<String> = filter.into_iter().collect();
            if let Some(state) = state {
                clauses.push(format!("state == {}", quote(&state.to_uppercase())));
            }
            if let Some(item_type) = item_type {
                clauses.push(format!("type == {}", quote(&item_type)));
            }
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                clauses.push(format!("workspace == {}", quote(&ws)));
            }
            let filter = and_filters(clauses);
            render_paged(
                &mut io::stdout(),
                ResourceKind::WorkItem,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let mut body = json!({ "take": take, "returnCount": true });
                    if let Some(filter) = &filter {
                        body["filter"] = json!(filter);
                    }
                    if let Some(token) = Cursor::token(&cursor) {
                        body["continuationToken"] = json!(token);
                    }
                    async move {
                        let response = ctx.client.post_json(QUERY_PATH, &body).await?;
                        Ok(Page::from_token(
                            items(&response, "workItems"),
                            continuation_token(&response),
                            total_count(&response),
                        ))
                    }
                },
            )
            .await
        }
        WorkitemCommands::Get { id, format } => {
            let record = ctx
                .client
                .get_json(&format!("{}/{}", WORKITEMS_PATH, segment(&id)), &[])
                .await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::WorkItem,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        WorkitemCommands::Create {
            name,
            item_type,
            state,
            part_number,
            description,
            assigned_to,
            workspace,
        } => {
            ctx.ensure_writable("create work items")?;
            let mut item = Map::new();
            item.insert("name".into(), json!(name));
            item.insert("type".into(), json!(item_type));
            item.insert("state".into(), json!(state.to_uppercase()));
            insert_opt(&mut item, "partNumber", part_number);
            insert_opt(&mut item, "description", description);
            insert_opt(&mut item, "assignedTo", assigned_to);
            insert_opt(&mut item, "workspace", ctx.workspace_filter(workspace.as_deref()).await);

            let response = ctx
                .client
                .post_json(WORKITEMS_PATH, &json!({ "workItems": [item] }))
                .await?;
            let outcome = BatchOutcome::from_response(&response, "createdWorkItems", "failedWorkItems");
            report_batch(&outcome, "Created", ResourceKind::WorkItem)
        }
        WorkitemCommands::Update {
            id,
            name,
            state,
            description,
            assigned_to,
        } => {
            ctx.ensure_writable("update work items")?;
            let item = update_body(&id, name, state, description, assigned_to)?;
            let response = ctx
                .client
                .post_json(UPDATE_PATH, &json!({ "workItems": [item] }))
                .await?;
            let outcome = BatchOutcome::from_response(&response, "updatedWorkItems", "failedWorkItems");
            report_batch(&outcome, "Updated", ResourceKind::WorkItem)
        }
        WorkitemCommands::Delete { ids, yes } => {
            ctx.ensure_writable("delete work items")?;
            validate_batch(&ids, "work item")?;
            ctx.confirm(&format!("Delete {} work item(s)?", ids.len()), yes.yes)?;
            let response = ctx
                .client
                .post_json(DELETE_PATH, &json!({ "ids": ids }))
                .await?;
            let outcome =
                BatchOutcome::from_response(&response, "deletedWorkItemIds", "failedWorkItemIds");
            report_deleted(&outcome, ids.len(), ResourceKind::WorkItem)
        }
    }
}

fn insert_opt(item: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        item.insert(key.to_string(), json!(value));
    }
}

fn update_body(
    id: &str,
    name: Option<String>,
    state: Option<String>,
    description: Option<String>,
    assigned_to: Option<String>,
) -> Result<Value> {
    let mut item = Map::new();
    insert_opt(&mut item, "name", name);
    insert_opt(&mut item, "state", state.map(|s| s.to_uppercase()));
    insert_opt(&mut item, "description", description);
    insert_opt(&mut item, "assignedTo", assigned_to);
    if item.is_empty() {
        return Err(CliError::invalid("nothing to update"));
    }
    item.insert("id".into(), json!(id));
    Ok(Value::Object(item))
}
