//! Row formatters for each resource kind and the value transforms they share

use crate::workspace::WorkspaceMap;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Every resource the CLI can render as a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Workspace,
    User,
    Comment,
    Asset,
    Calibration,
    System,
    Tag,
    TestResult,
    Product,
    WorkItem,
    Notebook,
    Routine,
    Feed,
    Package,
    DffConfiguration,
    File,
}

impl ResourceKind {
    #[cfg(test)]
    pub const ALL: [ResourceKind; 16] = [
        ResourceKind::Workspace,
        ResourceKind::User,
        ResourceKind::Comment,
        ResourceKind::Asset,
        ResourceKind::Calibration,
        ResourceKind::System,
        ResourceKind::Tag,
        ResourceKind::TestResult,
        ResourceKind::Product,
        ResourceKind::WorkItem,
        ResourceKind::Notebook,
        ResourceKind::Routine,
        ResourceKind::Feed,
        ResourceKind::Package,
        ResourceKind::DffConfiguration,
        ResourceKind::File,
    ];

    /// Case-insensitive lookup by name
    ///
    /// Accepts singular and plural forms, hyphens or underscores, and
    /// service-qualified names such as `niapm:Asset`.
    pub fn lookup(name: &str) -> Option<Self> {
        let unqualified = name.rsplit(':').next().unwrap_or(name);
        let key: String = unqualified
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        let kind = match key.as_str() {
            "workspace" | "workspaces" => ResourceKind::Workspace,
            "user" | "users" => ResourceKind::User,
            "comment" | "comments" => ResourceKind::Comment,
            "asset" | "assets" => ResourceKind::Asset,
            "calibration" | "calibrations" => ResourceKind::Calibration,
            "system" | "systems" => ResourceKind::System,
            "tag" | "tags" => ResourceKind::Tag,
            "testresult" | "testresults" | "result" | "results" => ResourceKind::TestResult,
            "product" | "products" => ResourceKind::Product,
            "workitem" | "workitems" => ResourceKind::WorkItem,
            "notebook" | "notebooks" => ResourceKind::Notebook,
            "routine" | "routines" => ResourceKind::Routine,
            "feed" | "feeds" => ResourceKind::Feed,
            "package" | "packages" => ResourceKind::Package,
            "dff" | "dffconfiguration" | "dffconfigurations" | "configuration"
            | "configurations" => ResourceKind::DffConfiguration,
            "file" | "files" => ResourceKind::File,
            _ => return None,
        };
        Some(kind)
    }

    /// Singular display noun
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "workspace",
            ResourceKind::User => "user",
            ResourceKind::Comment => "comment",
            ResourceKind::Asset => "asset",
            ResourceKind::Calibration => "calibration entry",
            ResourceKind::System => "system",
            ResourceKind::Tag => "tag",
            ResourceKind::TestResult => "test result",
            ResourceKind::Product => "product",
            ResourceKind::WorkItem => "work item",
            ResourceKind::Notebook => "notebook",
            ResourceKind::Routine => "routine",
            ResourceKind::Feed => "feed",
            ResourceKind::Package => "package",
            ResourceKind::DffConfiguration => "configuration",
            ResourceKind::File => "file",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "workspaces",
            ResourceKind::User => "users",
            ResourceKind::Comment => "comments",
            ResourceKind::Asset => "assets",
            ResourceKind::Calibration => "calibration entries",
            ResourceKind::System => "systems",
            ResourceKind::Tag => "tags",
            ResourceKind::TestResult => "test results",
            ResourceKind::Product => "products",
            ResourceKind::WorkItem => "work items",
            ResourceKind::Notebook => "notebooks",
            ResourceKind::Routine => "routines",
            ResourceKind::Feed => "feeds",
            ResourceKind::Package => "packages",
            ResourceKind::DffConfiguration => "configurations",
            ResourceKind::File => "files",
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Workspace => &["Name", "ID", "Enabled", "Default"],
            ResourceKind::User => &["First Name", "Last Name", "Email", "Type", "ID"],
            ResourceKind::Comment => &["ID", "Author", "Created", "Message", "Workspace"],
            ResourceKind::Asset => &[
                "Name",
                "Model",
                "Serial Number",
                "Vendor",
                "Bus Type",
                "Workspace",
                "ID",
            ],
            ResourceKind::Calibration => &["Date", "Entry Type", "Next Due", "Operator", "Comments"],
            ResourceKind::System => &["Alias", "State", "OS", "Last Seen", "Workspace", "ID"],
            ResourceKind::Tag => &["Path", "Type", "Value", "Last Updated", "Workspace"],
            ResourceKind::TestResult => &[
                "Status",
                "Program",
                "Part Number",
                "Serial Number",
                "Started",
                "Duration",
                "ID",
            ],
            ResourceKind::Product => &["Part Number", "Name", "Family", "Updated", "ID"],
            ResourceKind::WorkItem => &[
                "Name",
                "Type",
                "State",
                "Part Number",
                "Assigned To",
                "Workspace",
                "ID",
            ],
            ResourceKind::Notebook => &["Name", "Workspace", "Updated", "ID"],
            ResourceKind::Routine => &["Name", "Enabled", "Event Type", "Workspace", "ID"],
            ResourceKind::Feed => &["Name", "Platform", "Workspace", "Updated", "ID"],
            ResourceKind::Package => &["Name", "Version", "Architecture", "Size", "ID"],
            ResourceKind::DffConfiguration => &["Name", "Key", "Resource Type", "Workspace", "ID"],
            ResourceKind::File => &["Name", "Size", "Created", "Workspace", "ID"],
        }
    }

    /// Format one record into display cells, one per header
    pub fn row(&self, record: &Value, workspaces: &WorkspaceMap) -> Vec<String> {
        let ws = |path: &str| {
            text(record, path)
                .map(|id| workspaces.display(&id))
                .unwrap_or_else(|| "N/A".to_string())
        };
        let id = || or(text(record, "id"), "N/A");

        match self {
            ResourceKind::Workspace => vec![
                or(text(record, "name"), "Unknown"),
                id(),
                yes_no(record, "enabled"),
                yes_no(record, "default"),
            ],
            ResourceKind::User => vec![
                or(text(record, "firstName"), "N/A"),
                or(text(record, "lastName"), "N/A"),
                or(text(record, "email"), "N/A"),
                or(text(record, "type"), "user"),
                id(),
            ],
            ResourceKind::Comment => vec![
                id(),
                or(text(record, "createdBy"), "Unknown"),
                format_timestamp(text(record, "createdAt").as_deref()),
                or(text(record, "message"), ""),
                ws("workspace"),
            ],
            ResourceKind::Asset => vec![
                or(text(record, "name"), "Unknown"),
                or(text(record, "modelName"), "N/A"),
                or(text(record, "serialNumber"), "N/A"),
                or(text(record, "vendorName"), "N/A"),
                or(text(record, "busType"), "N/A"),
                ws("workspace"),
                id(),
            ],
            ResourceKind::Calibration => vec![
                format_timestamp(text(record, "date").as_deref()),
                or(text(record, "entryType"), "Unknown"),
                format_timestamp(text(record, "resolvedDueDate").as_deref()),
                or(text(record, "operatorDisplayName"), "N/A"),
                or(text(record, "comments"), ""),
            ],
            ResourceKind::System => vec![
                or(text(record, "alias"), "Unknown"),
                or(
                    first_text(record, &["connected.data.state", "connected"]),
                    "Unknown",
                ),
                or(
                    first_text(record, &["grains.data.kernel", "kernel"]),
                    "N/A",
                ),
                match text(record, "lastUpdatedTimestamp") {
                    Some(ts) => format_relative(&ts, Utc::now()),
                    None => "N/A".to_string(),
                },
                ws("workspace"),
                id(),
            ],
            ResourceKind::Tag => vec![
                or(first_text(record, &["tag.path", "path"]), "Unknown"),
                or(first_text(record, &["tag.type", "type"]), "Unknown"),
                or(first_text(record, &["current.value.value", "value"]), "N/A"),
                match text(record, "current.timestamp") {
                    Some(ts) => format_relative(&ts, Utc::now()),
                    None => "N/A".to_string(),
                },
                match first_text(record, &["tag.workspace", "workspace"]) {
                    Some(id) => workspaces.display(&id),
                    None => "N/A".to_string(),
                },
            ],
            ResourceKind::TestResult => vec![
                or(text(record, "status.statusType"), "Unknown"),
                or(text(record, "programName"), "N/A"),
                or(text(record, "partNumber"), "N/A"),
                or(text(record, "serialNumber"), "N/A"),
                format_timestamp(text(record, "startedAt").as_deref()),
                number(record, "totalTimeInSeconds")
                    .map(format_duration)
                    .unwrap_or_else(|| "N/A".to_string()),
                id(),
            ],
            ResourceKind::Product => vec![
                or(text(record, "partNumber"), "N/A"),
                or(text(record, "name"), "Unknown"),
                or(text(record, "family"), "N/A"),
                format_timestamp(text(record, "updatedAt").as_deref()),
                id(),
            ],
            ResourceKind::WorkItem => vec![
                or(text(record, "name"), "Unknown"),
                or(text(record, "type"), "N/A"),
                or(text(record, "state"), "Unknown"),
                or(text(record, "partNumber"), "N/A"),
                or(text(record, "assignedTo"), "Unassigned"),
                ws("workspace"),
                id(),
            ],
            ResourceKind::Notebook => vec![
                or(text(record, "name"), "Unknown"),
                ws("workspace"),
                format_timestamp(
                    first_text(record, &["lastUpdatedTimestamp", "updatedAt"]).as_deref(),
                ),
                id(),
            ],
            ResourceKind::Routine => vec![
                or(text(record, "name"), "Unknown"),
                yes_no(record, "enabled"),
                or(text(record, "event.type"), "N/A"),
                ws("workspace"),
                id(),
            ],
            ResourceKind::Feed => vec![
                or(text(record, "name"), "Unknown"),
                or(text(record, "platform"), "N/A"),
                ws("workspace"),
                format_timestamp(
                    first_text(record, &["updatedAt", "lastUpdatedTimestamp"]).as_deref(),
                ),
                id(),
            ],
            ResourceKind::Package => vec![
                or(
                    first_text(record, &["metadata.packageName", "fileName"]),
                    "Unknown",
                ),
                or(text(record, "metadata.version"), "N/A"),
                or(text(record, "metadata.architecture"), "N/A"),
                number(record, "metadata.size")
                    .map(|n| format_bytes(n as u64))
                    .unwrap_or_else(|| "N/A".to_string()),
                id(),
            ],
            ResourceKind::DffConfiguration => vec![
                or(text(record, "name"), "Unknown"),
                or(text(record, "key"), "N/A"),
                or(text(record, "resourceType"), "N/A"),
                ws("workspace"),
                id(),
            ],
            ResourceKind::File => vec![
                or(first_text(record, &["properties.Name", "name"]), "Unknown"),
                number(record, "size")
                    .map(|n| format_bytes(n as u64))
                    .unwrap_or_else(|| "N/A".to_string()),
                format_timestamp(text(record, "created").as_deref()),
                ws("workspace"),
                id(),
            ],
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.noun())
    }
}

/// Value at a dotted path rendered as text; objects and arrays are skipped
pub fn text(record: &Value, path: &str) -> Option<String> {
    match lookup(record, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_text(record: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| text(record, path))
}

/// Numeric value at a dotted path, accepting numeric strings
pub fn number(record: &Value, path: &str) -> Option<f64> {
    match lookup(record, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

fn or(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_string())
}

fn yes_no(record: &Value, path: &str) -> String {
    match lookup(record, path).and_then(Value::as_bool) {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => "Unknown".to_string(),
    }
}

/// Human-readable byte count using binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Duration in seconds as `Xh Ym`, `Ym Zs` or `Z.ZZs`
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.floor() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, whole % 60)
    } else {
        format!("{:.2}s", seconds)
    }
}

/// RFC 3339 timestamp as `YYYY-MM-DD HH:MM:SS` (UTC)
///
/// Unparseable values are shown as given; missing values as `N/A`.
pub fn format_timestamp(value: Option<&str>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed
                .with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            Err(_) => raw.to_string(),
        },
    }
}

/// Timestamp relative to `now`, falling back to the absolute form after 30 days
pub fn format_relative(value: &str, now: DateTime<Utc>) -> String {
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(_) => return value.to_string(),
    };
    let elapsed = now.signed_duration_since(parsed);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };

    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_hours() < 24 {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed.num_days() <= 30 {
        plural(elapsed.num_days(), "day")
    } else {
        format_timestamp(Some(value))
    }
}
