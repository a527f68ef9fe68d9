use crate::api::segment;
use crate::api::types::{continuation_token, items, total_count};
use crate::cli::UserCommands;
use crate::commands::{and_filters, quote};
use crate::context::Ctx;
use crate::error::{CliError, Result};
use crate::format::{text, ResourceKind};
use crate::output::{self, OutputFormat};
use crate::response::{render_paged, render_record, Cursor, Page};
use serde_json::{json, Map, Value};
use std::io;

const USERS_PATH: &str = "/niuser/v1/users";
const QUERY_PATH: &str = "/niuser/v1/users/query";

pub async fn run(command: UserCommands, ctx: &Ctx) -> Result<()> {
    match command {
        UserCommands::List {
            filter,
            email,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let filter = and_filters(
                filter
                    .into_iter()
                    .chain(email.map(|e| format!("email == {}", quote(&e))))
                    .collect(),
            );
            render_paged(
                &mut io::stdout(),
                ResourceKind::User,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
                |cursor, take| {
                    let body = query_body(filter.as_deref(), take, Cursor::token(&cursor));
                    async move { query_page(ctx, &body).await }
                },
            )
            .await
        }
        UserCommands::Get { id, email, format } => get(ctx, id, email, format.format).await,
        UserCommands::Create {
            first_name,
            last_name,
            email,
            login,
        } => {
            ctx.ensure_writable("create users")?;
            let body = json!({
                "firstName": first_name,
                "lastName": last_name,
                "email": email,
                "login": login.unwrap_or_else(|| email.clone()),
            });
            let created = ctx.client.post_json(USERS_PATH, &body).await?;
            let id = text(&created, "id").unwrap_or_else(|| "(unknown id)".to_string());
            output::print_success(&format!("Created user {} {}: {}", first_name, last_name, id));
            Ok(())
        }
        UserCommands::Update {
            id,
            first_name,
            last_name,
            email,
        } => update(ctx, &id, first_name, last_name, email).await,
        UserCommands::Delete { id, yes } => {
            ctx.ensure_writable("delete users")?;
            ctx.confirm(&format!("Delete user {}?", id), yes.yes)?;
            ctx.client
                .delete(&format!("{}/{}", USERS_PATH, segment(&id)))
                .await?;
            output::print_success(&format!("Deleted user: {}", id));
            Ok(())
        }
    }
}

fn query_body(filter: Option<&str>, take: usize, token: Option<String>) -> Value {
    let mut body = json!({ "take": take });
    if let Some(filter) = filter {
        body["filter"] = json!(filter);
    }
    if let Some(token) = token {
        body["continuationToken"] = json!(token);
    }
    body
}

async fn query_page(ctx: &Ctx, body: &Value) -> Result<Page> {
    let response = ctx.client.post_json(QUERY_PATH, body).await?;
    Ok(Page::from_token(
        items(&response, "users"),
        continuation_token(&response),
        total_count(&response),
    ))
}

async fn get(ctx: &Ctx, id: Option<String>, email: Option<String>, format: OutputFormat) -> Result<()> {
    let record = match (id, email) {
        (Some(id), _) => {
            ctx.client
                .get_json(&format!("{}/{}", USERS_PATH, segment(&id)), &[])
                .await?
        }
        (None, Some(email)) => {
            let body = query_body(Some(&format!("email == {}", quote(&email))), 1, None);
            query_page(ctx, &body)
                .await?
                .items
                .into_iter()
                .next()
                .ok_or_else(|| CliError::not_found(format!("No user with email '{}'", email)))?
        }
        (None, None) => return Err(CliError::invalid("--id or --email is required")),
    };
    render_record(
        &mut io::stdout(),
        ResourceKind::User,
        &record,
        format,
        ctx.workspaces().await,
    )
}

/// Overlay the given fields on the current user and write it back
async fn update(
    ctx: &Ctx,
    id: &str,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
) -> Result<()> {
    ctx.ensure_writable("update users")?;
    let changes: Vec<(&str, String)> = [
        ("firstName", first_name),
        ("lastName", last_name),
        ("email", email),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key, v)))
    .collect();
    if changes.is_empty() {
        return Err(CliError::invalid("nothing to update"));
    }

    let path = format!("{}/{}", USERS_PATH, segment(id));
    let current = ctx.client.get_json(&path, &[]).await?;
    let mut user: Map<String, Value> = match current {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in changes {
        user.insert(key.to_string(), Value::String(value));
    }
    ctx.client.put_json(&path, &Value::Object(user)).await?;
    output::print_success(&format!("Updated user: {}", id));
    Ok(())
}
