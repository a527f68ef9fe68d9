use crate::api::segment;
use crate::api::types::Workspace;
use crate::cli::WorkspaceCommands;
use crate::context::Ctx;
use crate::error::{CliError, Result};
use crate::format::ResourceKind;
use crate::output::{self, OutputFormat};
use crate::response::{render_list, render_record};
use crate::workspace::{fetch_workspaces, WORKSPACES_PATH};
use serde_json::{json, Value};
use std::io;

pub async fn run(command: WorkspaceCommands, ctx: &Ctx) -> Result<()> {
    match command {
        WorkspaceCommands::List {
            include_disabled,
            name,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let workspaces = fetch_workspaces(&ctx.client).await?;
            let items = filter_workspaces(&workspaces, include_disabled, name.as_deref());
            render_list(
                &mut io::stdout(),
                ResourceKind::Workspace,
                &items,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
            )
        }
        WorkspaceCommands::Get { id, name, format } => get(ctx, id, name, format.format).await,
        WorkspaceCommands::Create { name } => create(ctx, &name).await,
        WorkspaceCommands::Update { id, name } => {
            ctx.ensure_writable("update workspaces")?;
            let existing = find(ctx, &id).await?;
            put(ctx, &existing.id, &name, existing.enabled).await?;
            output::print_success(&format!("Renamed workspace {} to {}", existing.id, name));
            Ok(())
        }
        WorkspaceCommands::Disable { id } => set_enabled(ctx, &id, false).await,
        WorkspaceCommands::Enable { id } => set_enabled(ctx, &id, true).await,
    }
}

fn to_record(ws: &Workspace) -> Value {
    json!({
        "id": ws.id,
        "name": ws.name,
        "enabled": ws.enabled,
        "default": ws.default,
    })
}

fn filter_workspaces(workspaces: &[Workspace], include_disabled: bool, name: Option<&str>) -> Vec<Value> {
    let needle = name.map(str::to_lowercase);
    workspaces
        .iter()
        .filter(|ws| include_disabled || ws.enabled)
        .filter(|ws| match &needle {
            Some(n) => ws.name.to_lowercase().contains(n),
            None => true,
        })
        .map(to_record)
        .collect()
}

/// Look a workspace up by id among all visible workspaces
async fn find(ctx: &Ctx, id: &str) -> Result<Workspace> {
    fetch_workspaces(&ctx.client)
        .await?
        .into_iter()
        .find(|ws| ws.id == id)
        .ok_or_else(|| CliError::not_found(format!("Workspace '{}' not found", id)))
}

async fn get(ctx: &Ctx, id: Option<String>, name: Option<String>, format: OutputFormat) -> Result<()> {
    let record = match (id, name) {
        (Some(id), _) => {
            ctx.client
                .get_json(&format!("{}/{}", WORKSPACES_PATH, segment(&id)), &[])
                .await?
        }
        (None, Some(name)) => {
            let workspaces = fetch_workspaces(&ctx.client).await?;
            let found = workspaces
                .iter()
                .find(|ws| ws.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| CliError::not_found(format!("Workspace '{}' not found", name)))?;
            to_record(found)
        }
        (None, None) => return Err(CliError::invalid("--id or --name is required")),
    };
    render_record(
        &mut io::stdout(),
        ResourceKind::Workspace,
        &record,
        format,
        ctx.workspaces().await,
    )
}

async fn create(ctx: &Ctx, name: &str) -> Result<()> {
    ctx.ensure_writable("create workspaces")?;
    if name.trim().is_empty() {
        return Err(CliError::invalid("workspace name cannot be empty"));
    }
    let created = ctx
        .client
        .post_json(WORKSPACES_PATH, &json!({ "name": name }))
        .await?;
    let id = crate::format::text(&created, "id").unwrap_or_else(|| "(unknown id)".to_string());
    output::print_success(&format!("Created workspace {} ({})", name, id));
    Ok(())
}

async fn put(ctx: &Ctx, id: &str, name: &str, enabled: bool) -> Result<()> {
    ctx.client
        .put_json(
            &format!("{}/{}", WORKSPACES_PATH, segment(id)),
            &json!({ "name": name, "enabled": enabled }),
        )
        .await?;
    Ok(())
}

async fn set_enabled(ctx: &Ctx, id: &str, enabled: bool) -> Result<()> {
    let verb = if enabled { "enable" } else { "disable" };
    ctx.ensure_writable(&format!("{} workspaces", verb))?;
    let existing = find(ctx, id).await?;
    if existing.enabled == enabled {
        output::print_info(&format!("Workspace {} is already {}d", existing.name, verb));
        return Ok(());
    }
    put(ctx, &existing.id, &existing.name, enabled).await?;
    output::print_success(&format!("Workspace {} ({}) {}d", existing.name, existing.id, verb));
    Ok(())
}
