use crate::api::segment;
use crate::api::types::items;
use crate::cli::RoutineCommands;
use crate::commands::read_json_file;
use crate::context::Ctx;
use crate::error::{CliError, Result};
use crate::format::{text, ResourceKind};
use crate::output;
use crate::response::{render_list, render_record};
use serde_json::json;
use std::io;
use std::path::Path;

const ROUTINES_PATH: &str = "/niroutine/v2/routines";

fn routine_path(id: &str) -> String {
    format!("{}/{}", ROUTINES_PATH, segment(id))
}

pub async fn run(command: RoutineCommands, ctx: &Ctx) -> Result<()> {
    match command {
        RoutineCommands::List {
            workspace,
            enabled,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut query = Vec::new();
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                query.push(("workspace", ws));
            }
            if enabled {
                query.push(("enabled", "true".to_string()));
            }
            let response = ctx.client.get_json(ROUTINES_PATH, &query).await?;
            render_list(
                &mut io::stdout(),
                ResourceKind::Routine,
                &items(&response, "routines"),
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
            )
        }
        RoutineCommands::Get { id, format } => {
            let record = ctx.client.get_json(&routine_path(&id), &[]).await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::Routine,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        RoutineCommands::Create { file, workspace } => {
            create(ctx, &file, workspace.as_deref()).await
        }
        RoutineCommands::Enable { id } => set_enabled(ctx, &id, true).await,
        RoutineCommands::Disable { id } => set_enabled(ctx, &id, false).await,
        RoutineCommands::Delete { id, yes } => {
            ctx.ensure_writable("delete routines")?;
            ctx.confirm(&format!("Delete routine {}?", id), yes.yes)?;
            ctx.client.delete(&routine_path(&id)).await?;
            output::print_success(&format!("Deleted routine: {}", id));
            Ok(())
        }
    }
}

async fn create(ctx: &Ctx, file: &Path, workspace: Option<&str>) -> Result<()> {
    ctx.ensure_writable("create routines")?;
    let mut definition = read_json_file(file)?;
    if !definition.is_object() {
        return Err(CliError::invalid("routine definition must be a JSON object"));
    }
    if text(&definition, "name").is_none() {
        return Err(CliError::invalid("routine definition needs a name"));
    }
    if let Some(ws) = ctx.workspace_filter(workspace).await {
        definition["workspace"] = json!(ws);
    }

    let created = ctx.client.post_json(ROUTINES_PATH, &definition).await?;
    let id = text(&created, "id").unwrap_or_else(|| "(unknown id)".to_string());
    output::print_success(&format!("Created routine: {}", id));
    Ok(())
}

async fn set_enabled(ctx: &Ctx, id: &str, enabled: bool) -> Result<()> {
    let verb = if enabled { "enable" } else { "disable" };
    ctx.ensure_writable(&format!("{} routines", verb))?;
    ctx.client
        .patch_json(&routine_path(id), &json!({ "enabled": enabled }))
        .await?;
    output::print_success(&format!("Routine {} {}d", id, verb));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::ctx;
    use httpmock::MockServer;
    use std::fs;

    #[tokio::test]
    async fn test_enable_patches_routine() {
        let server = MockServer::start_async().await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH")
                    .path("/niroutine/v2/routines/r1")
                    .json_body(json!({"enabled": true}));
                then.status(204);
            })
            .await;

        set_enabled(&ctx(&server.base_url()), "r1", true).await.unwrap();
        patch.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_applies_workspace_override() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routine.json");
        fs::write(
            &file,
            r#"{"name": "Notify", "event": {"type": "WORKITEM_CHANGED"}, "actions": []}"#,
        )
        .unwrap();

        let server = MockServer::start_async().await;
        let post = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path(ROUTINES_PATH)
                    .json_body_partial(r#"{"name": "Notify", "workspace": "ws-9"}"#);
                then.status(201).json_body(json!({"id": "r9"}));
            })
            .await;

        create(&ctx(&server.base_url()), &file, Some("ws-9")).await.unwrap();
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routine.json");
        fs::write(&file, r#"{"actions": []}"#).unwrap();

        let err = create(&ctx("http://127.0.0.1:9"), &file, None).await.unwrap_err();
        assert_eq!(err.exit_code().code(), 2);
    }
}
