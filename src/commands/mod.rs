pub mod asset;
pub mod auth;
pub mod comment;
pub mod config;
pub mod dff;
pub mod feed;
pub mod file;
pub mod notebook;
pub mod routine;
pub mod system;
pub mod tag;
pub mod testmonitor;
pub mod user;
pub mod workitem;
pub mod workspace;

use crate::api::types::BatchOutcome;
use crate::error::{CliError, Result};
use crate::format::{format_bytes, text, ResourceKind};
use crate::output;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;

/// Quote a value for a Dynamic LINQ filter
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Join filter clauses with `&&`, or `None` when there are none
pub fn and_filters(clauses: Vec<String>) -> Option<String> {
    let clauses: Vec<String> = clauses.into_iter().filter(|c| !c.trim().is_empty()).collect();
    if clauses.is_empty() {
        None
    } else if clauses.len() == 1 {
        clauses.into_iter().next()
    } else {
        Some(
            clauses
                .iter()
                .map(|c| format!("({})", c))
                .collect::<Vec<_>>()
                .join(" && "),
        )
    }
}

/// Read a JSON document from disk
pub fn read_json_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::invalid(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::invalid(format!("{} is not valid JSON: {}", path.display(), e)))
}

/// Spinner on stderr for uploads and downloads; hidden when not a terminal
pub fn transfer_spinner(message: &str) -> Result<ProgressBar> {
    if !io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map_err(anyhow::Error::from)?,
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Write downloaded bytes to `path` and report the size
pub fn save_download(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    output::print_success(&format!(
        "Saved {} ({})",
        path.display(),
        format_bytes(bytes.len() as u64)
    ));
    Ok(())
}

fn failure_reason(item: &Value) -> String {
    text(item, "error.message")
        .or_else(|| text(item, "message"))
        .or_else(|| text(item, "id"))
        .unwrap_or_else(|| item.to_string())
}

/// Print the result of a bulk call and fail if anything was rejected
///
/// Succeeded items are listed by id; each failure is printed as a warning
/// and the whole command ends with `PartialFailure`.
pub fn report_batch(outcome: &BatchOutcome, verb: &str, kind: ResourceKind) -> Result<()> {
    for item in &outcome.succeeded {
        let id = match item {
            Value::String(id) => id.clone(),
            other => text(other, "id").unwrap_or_else(|| "(no id)".to_string()),
        };
        output::print_success(&format!("{} {}: {}", verb, kind.noun(), id));
    }
    for item in &outcome.failed {
        output::print_warning(&format!("Failed: {}", failure_reason(item)));
    }
    if outcome.has_failures() {
        return Err(CliError::PartialFailure {
            succeeded: outcome.succeeded.len(),
            failed: outcome.failed.len(),
            what: kind.plural(),
        });
    }
    Ok(())
}

/// Success line for a bulk delete whose reply lists nothing (204 or `{}`)
fn all_deleted_message(
    outcome: &BatchOutcome,
    requested: usize,
    kind: ResourceKind,
) -> Option<String> {
    (outcome.succeeded.is_empty() && !outcome.has_failures())
        .then(|| format!("Deleted {} {}(s)", requested, kind.noun()))
}

/// Report a bulk delete; an empty reply means every requested id was deleted
pub fn report_deleted(outcome: &BatchOutcome, requested: usize, kind: ResourceKind) -> Result<()> {
    match all_deleted_message(outcome, requested, kind) {
        Some(message) => {
            output::print_success(&message);
            Ok(())
        }
        None => report_batch(outcome, "Deleted", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("abc"), "\"abc\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_and_filters() {
        assert_eq!(and_filters(vec![]), None);
        assert_eq!(and_filters(vec!["a == 1".into()]), Some("a == 1".into()));
        assert_eq!(
            and_filters(vec!["a == 1".into(), " ".into(), "b == 2".into()]),
            Some("(a == 1) && (b == 2)".into())
        );
    }

    #[test]
    fn test_report_batch_partial_failure() {
        let outcome = BatchOutcome::from_response(
            &json!({
                "createdComments": [{"id": "C1"}],
                "failedComments": [{"error": {"message": "no access"}}]
            }),
            "createdComments",
            "failedComments",
        );
        let err = report_batch(&outcome, "Added", ResourceKind::Comment).unwrap_err();
        assert_eq!(err.exit_code().code(), 1);
        assert!(err.to_string().contains("1 of 2 comments failed"));
    }

    #[test]
    fn test_empty_delete_reply_counts_requested_ids() {
        let empty = BatchOutcome::from_response(&Value::Null, "ids", "failed");
        assert_eq!(
            all_deleted_message(&empty, 2, ResourceKind::Asset).as_deref(),
            Some("Deleted 2 asset(s)")
        );
        assert!(report_deleted(&empty, 2, ResourceKind::Asset).is_ok());

        let listed = BatchOutcome::from_response(&json!({"ids": ["a1"]}), "ids", "failed");
        assert_eq!(all_deleted_message(&listed, 1, ResourceKind::Asset), None);
    }

    #[test]
    fn test_failure_reason_fallbacks() {
        assert_eq!(failure_reason(&json!({"error": {"message": "boom"}})), "boom");
        assert_eq!(failure_reason(&json!({"id": "x"})), "x");
    }

    #[test]
    fn test_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        fs::write(&path, r#"{"configurations": []}"#).unwrap();
        assert!(read_json_file(&path).unwrap()["configurations"].is_array());

        fs::write(&path, "not json").unwrap();
        assert_eq!(read_json_file(&path).unwrap_err().exit_code().code(), 2);
    }

    #[test]
    fn test_save_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        save_download(&path, b"abc").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }
}
