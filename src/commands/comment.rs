use crate::api::segment;
use crate::api::types::{items, BatchOutcome};
use crate::cli::CommentCommands;
use crate::commands::{report_batch, report_deleted};
use crate::context::Ctx;
use crate::error::{validate_batch, CliError, Result};
use crate::format::ResourceKind;
use crate::output;
use crate::response::render_list;
use serde_json::json;
use std::io;

const COMMENTS_PATH: &str = "/nicomments/v1/comments";
const DELETE_PATH: &str = "/nicomments/v1/delete-comments";

pub async fn run(command: CommentCommands, ctx: &Ctx) -> Result<()> {
    match command {
        CommentCommands::List {
            resource_type,
            resource_id,
            list,
        } => {
            let opts = ctx.list_options(list.format, list.take)?;
            let response = ctx
                .client
                .get_json(
                    COMMENTS_PATH,
                    &[("ResourceType", resource_type), ("ResourceId", resource_id)],
                )
                .await?;
            let comments = items(&response, "comments");
            render_list(
                &mut io::stdout(),
                ResourceKind::Comment,
                &comments,
                &opts,
                ctx.workspaces().await,
                ctx.prompt(),
            )
        }
        CommentCommands::Add {
            resource_type,
            resource_id,
            workspace,
            message,
            mentions,
        } => add(ctx, &resource_type, &resource_id, &workspace, &message, &mentions).await,
        CommentCommands::Update { id, message } => {
            ctx.ensure_writable("update comments")?;
            ctx.client
                .patch_json(
                    &format!("{}/{}", COMMENTS_PATH, segment(&id)),
                    &json!({ "message": message }),
                )
                .await?;
            output::print_success(&format!("Updated comment: {}", id));
            Ok(())
        }
        CommentCommands::Delete { ids, yes } => delete(ctx, &ids, yes.yes).await,
    }
}

async fn add(
    ctx: &Ctx,
    resource_type: &str,
    resource_id: &str,
    workspace: &str,
    message: &str,
    mentions: &[String],
) -> Result<()> {
    ctx.ensure_writable("add comments")?;
    if message.trim().is_empty() {
        return Err(CliError::invalid("comment message cannot be empty"));
    }
    if ResourceKind::lookup(resource_type).is_none() {
        tracing::warn!("'{}' is not a known resource type", resource_type);
    }
    let workspace = ctx.resolve_workspace(workspace).await;
    let body = json!({
        "comments": [{
            "resourceType": resource_type,
            "resourceId": resource_id,
            "workspace": workspace,
            "message": message,
            "mentionedUsers": mentions,
        }]
    });
    let response = ctx.client.post_json(COMMENTS_PATH, &body).await?;
    let outcome = BatchOutcome::from_response(&response, "createdComments", "failedComments");
    report_batch(&outcome, "Added", ResourceKind::Comment)
}

async fn delete(ctx: &Ctx, ids: &[String], yes: bool) -> Result<()> {
    ctx.ensure_writable("delete comments")?;
    validate_batch(ids, "comment")?;
    ctx.confirm(&format!("Delete {} comment(s)?", ids.len()), yes)?;

    let response = ctx
        .client
        .post_json(DELETE_PATH, &json!({ "ids": ids }))
        .await?;
    let outcome = BatchOutcome::from_response(&response, "deletedCommentIds", "failedCommentIds");
    report_deleted(&outcome, ids.len(), ResourceKind::Comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::testing::{ctx, ctx_with};
    use crate::error::ExitCode;
    use httpmock::MockServer;

    #[tokio::test]
    async fn test_add_posts_comment() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path(COMMENTS_PATH)
                    .header("x-ni-api-key", "test-key")
                    .json_body_partial(
                        r#"{"comments":[{"resourceType":"niapm:Asset","resourceId":"a1","message":"hi"}]}"#,
                    );
                then.status(201).json_body(json!({"createdComments": [{"id": "C1"}]}));
            })
            .await;

        add(&ctx(&server.base_url()), "niapm:Asset", "a1", "ws1", "hi", &[])
            .await
            .unwrap();
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_partial_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path(COMMENTS_PATH);
                then.status(200).json_body(json!({
                    "createdComments": [],
                    "failedComments": [{"error": {"message": "resource not found"}}]
                }));
            })
            .await;

        let err = add(&ctx(&server.base_url()), "niapm:Asset", "a1", "ws1", "hi", &[])
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
    }

    #[tokio::test]
    async fn test_delete_rejects_oversized_batch_without_request() {
        let server = MockServer::start_async().await;
        let delete_mock = server
            .mock_async(|when, then| {
                when.method("POST").path(DELETE_PATH);
                then.status(204);
            })
            .await;

        let ids: Vec<String> = (0..1001).map(|i| format!("c{}", i)).collect();
        let err = delete(&ctx(&server.base_url()), &ids, true).await.unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);
        assert_eq!(delete_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_delete_sends_ids() {
        let server = MockServer::start_async().await;
        let delete_mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path(DELETE_PATH)
                    .json_body(json!({"ids": ["c1", "c2"]}));
                then.status(204);
            })
            .await;

        let ids = vec!["c1".to_string(), "c2".to_string()];
        delete(&ctx(&server.base_url()), &ids, true).await.unwrap();
        delete_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_readonly_blocks_add() {
        let server = MockServer::start_async().await;
        let config = Config {
            readonly: true,
            ..Config::default()
        };
        let err = add(&ctx_with(&server.base_url(), config), "t", "i", "w", "m", &[])
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::Readonly);
    }
}
