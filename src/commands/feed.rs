use crate::api::segment;
use crate::api::types::items;
use crate::cli::FeedCommands;
use crate::context::Ctx;
use crate::error::{CliError, Result};
use crate::format::{text, ResourceKind};
use crate::output;
use crate::response::{render_list, render_record};
use serde_json::json;
use std::io;

const FEEDS_PATH: &str = "/nifeed/v1/feeds";

fn feed_path(id: &str) -> String {
    format!("{}/{}", FEEDS_PATH, segment(id))
}

pub async fn run(command: FeedCommands, ctx: &Ctx) -> Result<()> {
    match command {
        FeedCommands::List {
            workspace,
            platform,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let mut query = Vec::new();
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                query.push(("workspace", ws));
            }
            if let Some(platform) = platform {
                query.push(("platform", platform.wire_name().to_string()));
            }
            let response = ctx.client.get_json(FEEDS_PATH, &query).await?;
            render_list(
                &mut io::stdout(),
                ResourceKind::Feed,
                &items(&response, "feeds"),
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
            )
        }
        FeedCommands::Get { id, format } => {
            let record = ctx.client.get_json(&feed_path(&id), &[]).await?;
            render_record(
                &mut io::stdout(),
                ResourceKind::Feed,
                &record,
                format.format,
                ctx.workspaces().await,
            )
        }
        FeedCommands::Create {
            name,
            platform,
            description,
            workspace,
        } => {
            ctx.ensure_writable("create feeds")?;
            if name.trim().is_empty() {
                return Err(CliError::invalid("feed name cannot be empty"));
            }
            let mut body = json!({ "name": name, "platform": platform.wire_name() });
            if let Some(description) = description {
                body["description"] = json!(description);
            }
            if let Some(ws) = ctx.workspace_filter(workspace.as_deref()).await {
                body["workspace"] = json!(ws);
            }
            let created = ctx.client.post_json(FEEDS_PATH, &body).await?;
            let id = text(&created, "id").unwrap_or_else(|| "(unknown id)".to_string());
            output::print_success(&format!("Created feed {}: {}", name, id));
            Ok(())
        }
        FeedCommands::Delete { id, yes } => {
            ctx.ensure_writable("delete feeds")?;
            ctx.confirm(&format!("Delete feed {} and all its packages?", id), yes.yes)?;
            ctx.client.delete(&feed_path(&id)).await?;
            output::print_success(&format!("Deleted feed: {}", id));
            Ok(())
        }
        FeedCommands::Packages { id, list } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let response = ctx
                .client
                .get_json(&format!("{}/packages", feed_path(&id)), &[])
                .await?;
            render_list(
                &mut io::stdout(),
                ResourceKind::Package,
                &items(&response, "packages"),
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
            )
        }
    }
}
