use crate::api::types::{items, total_count, BatchOutcome};
use crate::cli::SystemCommands;
use crate::commands::{and_filters, quote, report_batch};
use crate::context::Ctx;
use crate::error::{validate_batch, CliError, Result};
use crate::format::ResourceKind;
use crate::output;
use crate::response::{render_paged, render_record, Cursor, Page};
use serde_json::{json, Value};
use std::io;

const QUERY_PATH: &str = "/nisysmgmt/v1/query-systems";
const REMOVE_PATH: &str = "/nisysmgmt/v1/remove-systems";

/// Fields fetched for list output
const LIST_PROJECTION: &str = "new(id, alias, workspace, connected, grains.data.kernel as kernel, lastUpdatedTimestamp)";

pub async fn run(command: SystemCommands, ctx: &Ctx) -> Result<()> {
    match command {
        SystemCommands::List {
            alias,
            state,
            workspace,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut clauses = Vec::new();
            if let Some(alias) = alias {
                clauses.push(format!("alias.Contains({})", quote(&alias)));
            }
            if let Some(state) = state {
                clauses.push(format!("connected.data.state == {}", quote(&state.to_uppercase())));
            }
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                clauses.push(format!("workspace == {}", quote(&ws)));
            }
            let filter = and_filters(clauses);
            render_paged(
                &mut io::stdout(),
                ResourceKind::System,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let skip = Cursor::skip(&cursor);
                    let body = query_body(filter.as_deref(), skip, take, Some(LIST_PROJECTION));
                    async move {
                        let response = ctx.client.post_json(QUERY_PATH, &body).await?;
                        Ok(Page::from_skip(
                            items(&response, "data"),
                            skip,
                            take,
                            total_count(&response),
                        ))
                    }
                },
            )
            .await
        }
        SystemCommands::Get { id, format } => {
            let body = query_body(Some(&format!("id == {}", quote(&id))), 0, 1, None);
            let response = ctx.client.post_json(QUERY_PATH, &body).await?;
            let record = items(&response, "data")
                .into_iter()
                .next()
                .ok_or_else(|| CliError::not_found(format!("System '{}' not found", id)))?;
            render_record(
                &mut io::stdout(),
                ResourceKind::System,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        SystemCommands::Remove { ids, force, yes } => remove(ctx, &ids, force, yes.yes).await,
    }
}

fn query_body(filter: Option<&str>, skip: usize, take: usize, projection: Option<&str>) -> Value {
    let mut body = json!({ "skip": skip, "take": take });
    if let Some(filter) = filter {
        body["filter"] = json!(filter);
    }
    if let Some(projection) = projection {
        body["projection"] = json!(projection);
    }
    body
}

async fn remove(ctx: &Ctx, ids: &[String], force: bool, yes: bool) -> Result<()> {
    ctx.ensure_writable("remove systems")?;
    validate_batch(ids, "system")?;
    ctx.confirm(&format!("Remove {} system(s)?", ids.len()), yes)?;

    let response = ctx
        .client
        .post_json(REMOVE_PATH, &json!({ "tgts": ids, "force": force }))
        .await?;
    let outcome = BatchOutcome::from_response(&response, "removedIds", "failedIds");
    if outcome.succeeded.is_empty() && !outcome.has_failures() {
        output::print_success(&format!("Requested removal of {} system(s)", ids.len()));
        return Ok(());
    }
    report_batch(&outcome, "Removed", ResourceKind::System)
}
