use crate::api::segment;
use crate::api::types::{continuation_token, items, total_count, BatchOutcome};
use crate::cli::{ProductCommands, ResultCommands, TestmonitorCommands};
use crate::commands::{and_filters, quote, report_deleted};
use crate::context::Ctx;
use crate::error::{validate_batch, Result};
use crate::format::ResourceKind;
use crate::output::OutputFormat;
use crate::response::{render_paged, render_record, Cursor, ListOptions, Page};
use serde_json::{json, Value};
use std::io;

const RESULTS_QUERY_PATH: &str = "/nitestmonitor/v2/query-results";
const RESULTS_PATH: &str = "/nitestmonitor/v2/results";
const RESULTS_DELETE_PATH: &str = "/nitestmonitor/v2/delete-results";
const PRODUCTS_QUERY_PATH: &str = "/nitestmonitor/v2/query-products";
const PRODUCTS_PATH: &str = "/nitestmonitor/v2/products";

pub async fn run(command: TestmonitorCommands, ctx: &Ctx) -> Result<()> {
    match command {
        TestmonitorCommands::Result { command } => run_result(command, ctx).await,
        TestmonitorCommands::Product { command } => run_product(command, ctx).await,
    }
}

async fn run_result(command: ResultCommands, ctx: &Ctx) -> Result<()> {
    match command {
        ResultCommands::List {
            filter,
            status,
            program_name,
            part_number,
            serial_number,
            workspace,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut clauses: Vec<String> = filter.into_iter().collect();
            if let Some(status) = status {
                clauses.push(format!("status.statusType == {}", quote(&status.to_uppercase())));
            }
            for (field, value) in [
                ("programName", program_name),
                ("partNumber", part_number),
                ("serialNumber", serial_number),
            ] {
                if let Some(value) = value {
                    clauses.push(format!("{} == {}", field, quote(&value)));
                }
            }
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                clauses.push(format!("workspace == {}", quote(&ws)));
            }
            let body = json!({ "orderBy": "STARTED_AT", "descending": true });
            query(
                ctx,
                ResourceKind::TestResult,
                &opts,
                RESULTS_QUERY_PATH,
                "results",
                and_filters(clauses),
                body,
            )
            .await
        }
        ResultCommands::Get { id, format } => {
            get(ctx, ResourceKind::TestResult, RESULTS_PATH, &id, format.format).await
        }
        ResultCommands::Delete { ids, yes } => {
            ctx.ensure_writable("delete test results")?;
            validate_batch(&ids, "result")?;
            ctx.confirm(&format!("Delete {} test result(s)?", ids.len()), yes.yes)?;
            let response = ctx
                .client
                .post_json(RESULTS_DELETE_PATH, &json!({ "ids": ids }))
                .await?;
            let outcome = BatchOutcome::from_response(&response, "deletedResultIds", "failedResultIds");
            report_deleted(&outcome, ids.len(), ResourceKind::TestResult)
        }
    }
}

async fn run_product(command: ProductCommands, ctx: &Ctx) -> Result<()> {
    match command {
        ProductCommands::List {
            filter,
            part_number,
            family,
            workspace,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut clauses: Vec<String> = filter.into_iter().collect();
            if let Some(part) = part_number {
                clauses.push(format!("partNumber == {}", quote(&part)));
            }
            if let Some(family) = family {
                clauses.push(format!("family == {}", quote(&family)));
            }
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                clauses.push(format!("workspace == {}", quote(&ws)));
            }
            let body = json!({ "orderBy": "UPDATED_AT", "descending": true });
            query(
                ctx,
                ResourceKind::Product,
                &opts,
                PRODUCTS_QUERY_PATH,
                "products",
                and_filters(clauses),
                body,
            )
            .await
        }
        ProductCommands::Get { id, format } => {
            get(ctx, ResourceKind::Product, PRODUCTS_PATH, &id, format.format).await
        }
    }
}

/// Continuation-token query shared by results and products
async fn query(
    ctx: &Ctx,
    kind: ResourceKind,
    opts: &ListOptions,
    path: &str,
    key: &str,
    filter: Option<String>,
    base: Value,
) -> Result<()> {
    render_paged(
        &mut io::stdout(),
        kind,
        opts,
        ctx.workspaces().await,
        ctx.prompt(),
        |cursor, take| {
            let body = page_body(&base, filter.as_deref(), take, Cursor::token(&cursor));
            async move {
                let response = ctx.client.post_json(path, &body).await?;
                Ok(Page::from_token(
                    items(&response, key),
                    continuation_token(&response),
                    total_count(&response),
                ))
            }
        },
    )
    .await
}

fn page_body(base: &Value, filter: Option<&str>, take: usize, token: Option<String>) -> Value {
    let mut body = base.clone();
    body["take"] = json!(take);
    body["returnCount"] = json!(true);
    if let Some(filter) = filter {
        body["filter"] = json!(filter);
    }
    if let Some(token) = token {
        body["continuationToken"] = json!(token);
    }
    body
}

async fn get(ctx: &Ctx, kind: ResourceKind, base: &str, id: &str, format: OutputFormat) -> Result<()> {
    let record = ctx
        .client
        .get_json(&format!("{}/{}", base, segment(id)), &[])
        .await?;
    render_record(&mut io::stdout(), kind, &record, format, ctx.workspaces().await)
}
