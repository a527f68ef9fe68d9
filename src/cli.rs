use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slcli")]
#[command(author, version, about = "SystemLink CLI - Query and manage assets, systems, tags, test results and more")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Never read or write the system keychain
    #[arg(long, global = true)]
    pub no_keychain: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage authentication
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// View and change CLI settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage comments on resources
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Manage assets
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },

    /// Manage systems
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Manage tags and tag values
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Query test results and products
    Testmonitor {
        #[command(subcommand)]
        command: TestmonitorCommands,
    },

    /// Manage work items
    Workitem {
        #[command(subcommand)]
        command: WorkitemCommands,
    },

    /// Manage Jupyter notebooks
    Notebook {
        #[command(subcommand)]
        command: NotebookCommands,
    },

    /// Manage routines
    Routine {
        #[command(subcommand)]
        command: RoutineCommands,
    },

    /// Manage package feeds
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },

    /// Manage dynamic form field configurations
    Dff {
        #[command(subcommand)]
        command: DffCommands,
    },

    /// Manage files
    File {
        #[command(subcommand)]
        command: FileCommands,
    },
}

/// Output format for a single record
#[derive(Args, Debug, Clone, Copy)]
pub struct FormatArg {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Page size and output format for list commands
#[derive(Args, Debug, Clone, Copy)]
pub struct ListArgs {
    /// Items per page (defaults to the configured page size)
    #[arg(short, long)]
    pub take: Option<usize>,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Skip the confirmation prompt
#[derive(Args, Debug, Clone, Copy)]
pub struct YesArg {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

// Auth subcommands
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in with a server URL and API key
    Login {
        /// API server URL (e.g. https://myserver-api.example.com)
        #[arg(long)]
        url: Option<String>,
        /// API key
        #[arg(long)]
        api_key: Option<String>,
        /// Web UI URL, if it cannot be derived from the API URL
        #[arg(long)]
        web_url: Option<String>,
        /// Store credentials in the config file instead of the keychain
        #[arg(long)]
        config_file: bool,
    },
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Print the config file location
    Path,
    /// Print one setting
    Get {
        /// Setting name (e.g. page_size)
        key: String,
    },
    /// Change one setting
    Set {
        /// Setting name (e.g. readonly)
        key: String,
        /// New value
        value: Option<String>,
        /// Clear the setting instead
        #[arg(long)]
        unset: bool,
    },
}

// Workspace subcommands
#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// List workspaces
    List {
        /// Include disabled workspaces
        #[arg(long)]
        include_disabled: bool,
        /// Only workspaces whose name contains this text
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one workspace
    Get {
        /// Workspace ID
        #[arg(long, required_unless_present = "name", conflicts_with = "name")]
        id: Option<String>,
        /// Workspace name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create a workspace
    Create {
        /// Workspace name
        #[arg(long)]
        name: String,
    },
    /// Rename a workspace
    Update {
        /// Workspace ID
        #[arg(long)]
        id: String,
        /// New name
        #[arg(long)]
        name: String,
    },
    /// Disable a workspace
    Disable {
        /// Workspace ID
        #[arg(long)]
        id: String,
    },
    /// Re-enable a disabled workspace
    Enable {
        /// Workspace ID
        #[arg(long)]
        id: String,
    },
}

// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    List {
        /// Dynamic LINQ filter (e.g. 'firstName.StartsWith("A")')
        #[arg(long)]
        filter: Option<String>,
        /// Only users with this email
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one user
    Get {
        /// User ID
        #[arg(long, required_unless_present = "email", conflicts_with = "email")]
        id: Option<String>,
        /// User email
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create a user
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Login name, if different from the email
        #[arg(long)]
        login: Option<String>,
    },
    /// Update a user
    Update {
        /// User ID
        #[arg(long)]
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Delete a user
    Delete {
        /// User ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        yes: YesArg,
    },
}

// Comment subcommands
#[derive(Subcommand)]
pub enum CommentCommands {
    /// List comments on a resource
    List {
        /// Resource type (e.g. niapm:Asset, nitestmonitor:Result)
        #[arg(short = 'r', long)]
        resource_type: String,
        /// Resource ID
        #[arg(short = 'i', long)]
        resource_id: String,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Add a comment to a resource
    Add {
        /// Resource type (e.g. niapm:Asset)
        #[arg(short = 'r', long)]
        resource_type: String,
        /// Resource ID
        #[arg(short = 'i', long)]
        resource_id: String,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: String,
        /// Comment text
        #[arg(short, long)]
        message: String,
        /// User IDs to mention (repeatable)
        #[arg(long = "mention")]
        mentions: Vec<String>,
    },
    /// Edit a comment
    Update {
        /// Comment ID
        #[arg(long)]
        id: String,
        /// New comment text
        #[arg(short, long)]
        message: String,
    },
    /// Delete comments
    Delete {
        /// Comment IDs
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        yes: YesArg,
    },
}

// Asset subcommands
#[derive(Subcommand)]
pub enum AssetCommands {
    /// List assets
    List {
        /// Dynamic LINQ filter (e.g. 'BusType == "PCI_PXI"')
        #[arg(long)]
        filter: Option<String>,
        /// Only assets whose model name contains this text
        #[arg(long)]
        model: Option<String>,
        /// Only assets with this serial number
        #[arg(long)]
        serial_number: Option<String>,
        /// Only assets from this vendor
        #[arg(long)]
        vendor: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one asset
    Get {
        /// Asset ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create an asset
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        model_name: Option<String>,
        #[arg(long)]
        serial_number: Option<String>,
        #[arg(long)]
        vendor_name: Option<String>,
        #[arg(long)]
        part_number: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Update an asset
    Update {
        /// Asset ID
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        serial_number: Option<String>,
        #[arg(long)]
        model_name: Option<String>,
    },
    /// Delete assets
    Delete {
        /// Asset IDs
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        yes: YesArg,
    },
    /// Show calibration history of an asset
    Calibration {
        /// Asset ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        list: ListArgs,
    },
}

// System subcommands
#[derive(Subcommand)]
pub enum SystemCommands {
    /// List managed systems
    List {
        /// Only systems whose alias contains this text
        #[arg(long)]
        alias: Option<String>,
        /// Connection state (e.g. CONNECTED, DISCONNECTED)
        #[arg(long)]
        state: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one system
    Get {
        /// System ID (minion ID)
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Unregister systems
    Remove {
        /// System IDs
        #[arg(required = true)]
        ids: Vec<String>,
        /// Remove even if the system cannot be reached
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        yes: YesArg,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum TagType {
    Double,
    Int,
    String,
    Bool,
    UInt64,
    DateTime,
}

impl TagType {
    /// Name used by the tag service
    pub fn wire_name(&self) -> &'static str {
        match self {
            TagType::Double => "DOUBLE",
            TagType::Int => "INT",
            TagType::String => "STRING",
            TagType::Bool => "BOOLEAN",
            TagType::UInt64 => "U_INT64",
            TagType::DateTime => "DATE_TIME",
        }
    }
}

// Tag subcommands
#[derive(Subcommand)]
pub enum TagCommands {
    /// List tags with their current values
    List {
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        /// Path pattern (e.g. 'Line1.*')
        #[arg(long)]
        path: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show a tag and its current value
    Get {
        /// Tag path
        #[arg(long)]
        path: String,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create a tag
    Create {
        /// Tag path
        #[arg(long)]
        path: String,
        /// Data type
        #[arg(long = "type", value_enum)]
        tag_type: TagType,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        /// Keywords (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Keep min/max/mean aggregates
        #[arg(long)]
        collect_aggregates: bool,
    },
    /// Write the current value of a tag
    SetValue {
        /// Tag path
        #[arg(long)]
        path: String,
        /// New value
        #[arg(long)]
        value: String,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Delete a tag
    Delete {
        /// Tag path
        #[arg(long)]
        path: String,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        yes: YesArg,
    },
}

// Test Monitor subcommands
#[derive(Subcommand)]
pub enum TestmonitorCommands {
    /// Test results
    Result {
        #[command(subcommand)]
        command: ResultCommands,
    },
    /// Products
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
}

#[derive(Subcommand)]
pub enum ResultCommands {
    /// List test results
    List {
        /// Dynamic LINQ filter
        #[arg(long)]
        filter: Option<String>,
        /// Status (e.g. PASSED, FAILED)
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        program_name: Option<String>,
        #[arg(long)]
        part_number: Option<String>,
        #[arg(long)]
        serial_number: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one test result
    Get {
        /// Result ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Delete test results
    Delete {
        /// Result IDs
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        yes: YesArg,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List products
    List {
        /// Dynamic LINQ filter
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        part_number: Option<String>,
        #[arg(long)]
        family: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one product
    Get {
        /// Product ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
}

// Work item subcommands
#[derive(Subcommand)]
pub enum WorkitemCommands {
    /// List work items
    List {
        /// Dynamic LINQ filter
        #[arg(long)]
        filter: Option<String>,
        /// State (e.g. NEW, IN_PROGRESS, CLOSED)
        #[arg(long)]
        state: Option<String>,
        /// Work item type (e.g. testplan)
        #[arg(long = "type")]
        item_type: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one work item
    Get {
        /// Work item ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create a work item
    Create {
        #[arg(long)]
        name: String,
        /// Work item type
        #[arg(long = "type", default_value = "testplan")]
        item_type: String,
        #[arg(long, default_value = "NEW")]
        state: String,
        #[arg(long)]
        part_number: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// User ID of the assignee
        #[arg(long)]
        assigned_to: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Update a work item
    Update {
        /// Work item ID
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assigned_to: Option<String>,
    },
    /// Delete work items
    Delete {
        /// Work item IDs
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        yes: YesArg,
    },
}

// Notebook subcommands
#[derive(Subcommand)]
pub enum NotebookCommands {
    /// List notebooks
    List {
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        /// Only notebooks whose name contains this text
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show notebook metadata
    Get {
        /// Notebook ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Upload a notebook
    Create {
        /// Path to the .ipynb file
        file: PathBuf,
        /// Notebook name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Download notebook content
    Download {
        /// Notebook ID
        #[arg(long)]
        id: String,
        /// Output path (defaults to <name>.ipynb)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a notebook
    Delete {
        /// Notebook ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        yes: YesArg,
    },
}

// Routine subcommands
#[derive(Subcommand)]
pub enum RoutineCommands {
    /// List routines
    List {
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        /// Only enabled routines
        #[arg(long)]
        enabled: bool,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one routine
    Get {
        /// Routine ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create a routine from a JSON definition
    Create {
        /// Path to the routine definition (JSON)
        file: PathBuf,
        /// Workspace name or ID (overrides the definition)
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Enable a routine
    Enable {
        /// Routine ID
        #[arg(long)]
        id: String,
    },
    /// Disable a routine
    Disable {
        /// Routine ID
        #[arg(long)]
        id: String,
    },
    /// Delete a routine
    Delete {
        /// Routine ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        yes: YesArg,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FeedPlatform {
    Windows,
    NiLinuxRt,
}

impl FeedPlatform {
    pub fn wire_name(&self) -> &'static str {
        match self {
            FeedPlatform::Windows => "WINDOWS",
            FeedPlatform::NiLinuxRt => "NI_LINUX_RT",
        }
    }
}

// Feed subcommands
#[derive(Subcommand)]
pub enum FeedCommands {
    /// List package feeds
    List {
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        /// Only feeds for this platform
        #[arg(long, value_enum)]
        platform: Option<FeedPlatform>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one feed
    Get {
        /// Feed ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create a feed
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        platform: FeedPlatform,
        #[arg(long)]
        description: Option<String>,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Delete a feed
    Delete {
        /// Feed ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        yes: YesArg,
    },
    /// List packages in a feed
    Packages {
        /// Feed ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        list: ListArgs,
    },
}

// Dynamic form field subcommands
#[derive(Subcommand)]
pub enum DffCommands {
    /// List configurations
    List {
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show a configuration with its groups and fields resolved
    Get {
        /// Configuration ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Create configurations, groups and fields from a JSON file
    Create {
        /// Path to the request body (JSON)
        file: PathBuf,
    },
    /// Delete configurations
    Delete {
        /// Configuration IDs
        #[arg(required = true)]
        ids: Vec<String>,
        #[command(flatten)]
        yes: YesArg,
    },
}

// File subcommands
#[derive(Subcommand)]
pub enum FileCommands {
    /// List files
    List {
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
        /// Only files whose name contains this text
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show file metadata
    Get {
        /// File ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        format: FormatArg,
    },
    /// Upload a file
    Upload {
        /// Local file to upload
        path: PathBuf,
        /// Workspace name or ID
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Download a file
    Download {
        /// File ID
        #[arg(long)]
        id: String,
        /// Output path (defaults to the stored file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a file
    Delete {
        /// File ID
        #[arg(long)]
        id: String,
        #[command(flatten)]
        yes: YesArg,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_comment_add_short_flags() {
        let cli = Cli::try_parse_from([
            "slcli", "comment", "add", "-r", "niapm:Asset", "-i", "A1", "-w", "ws1", "-m", "hello",
        ])
        .unwrap();
        match cli.command {
            Commands::Comment {
                command:
                    CommentCommands::Add {
                        resource_type,
                        resource_id,
                        workspace,
                        message,
                        mentions,
                    },
            } => {
                assert_eq!(resource_type, "niapm:Asset");
                assert_eq!(resource_id, "A1");
                assert_eq!(workspace, "ws1");
                assert_eq!(message, "hello");
                assert!(mentions.is_empty());
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_list_args_defaults() {
        let cli = Cli::try_parse_from(["slcli", "asset", "list", "-f", "json"]).unwrap();
        match cli.command {
            Commands::Asset {
                command: AssetCommands::List { list, .. },
            } => {
                assert_eq!(list.format, OutputFormat::Json);
                assert_eq!(list.take, None);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_workspace_get_requires_id_or_name() {
        assert!(Cli::try_parse_from(["slcli", "workspace", "get"]).is_err());
        assert!(Cli::try_parse_from(["slcli", "workspace", "get", "--name", "Default"]).is_ok());
    }
}
