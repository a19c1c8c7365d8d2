//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums. No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::GlobalArgs;

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "hatch",
    bin_name = "hatch",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{1f423} Project scaffolding from remote templates",
    long_about = "Hatch creates projects and components from remote templates \
                  and runs versioned plugin commands from a local cache.",
    after_help = "EXAMPLES:\n\
        \x20 hatch init my-app --template @acme/vue-starter\n\
        \x20 hatch init Button --kind component\n\
        \x20 hatch add date-picker src/widgets\n\
        \x20 hatch lint --fix\n\
        \x20 hatch completions bash > /usr/share/bash-completion/completions/hatch",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a project or component from a template.
    #[command(
        about = "Create a project or component from a template",
        after_help = "EXAMPLES:\n\
            \x20 hatch init my-app\n\
            \x20 hatch init my-app --template @acme/vue-starter --version 0.1.0\n\
            \x20 hatch init my-app --force           # empty a non-empty directory first\n\
            \x20 hatch init Button --kind component  # render into the current directory"
    )]
    Init(InitArgs),

    /// Add a component template to the current project.
    #[command(
        about = "Add a component to the current project",
        after_help = "EXAMPLES:\n\
            \x20 hatch add date-picker              # into src/components/date-picker\n\
            \x20 hatch add date-picker src/widgets  # into src/widgets/date-picker"
    )]
    Add(AddArgs),

    /// List available templates.
    #[command(
        visible_alias = "ls",
        about = "List available templates",
        after_help = "EXAMPLES:\n\
            \x20 hatch list\n\
            \x20 hatch list --kind component\n\
            \x20 hatch list --format json"
    )]
    List(ListArgs),

    /// Manage the user environment file and configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 hatch config get BASE_URL\n\
            \x20 hatch config set BASE_URL https://templates.example.com\n\
            \x20 hatch config list\n\
            \x20 hatch config reset"
    )]
    Config(ConfigCommands),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 hatch completions bash > ~/.local/share/bash-completion/completions/hatch\n\
            \x20 hatch completions zsh  > ~/.zfunc/_hatch\n\
            \x20 hatch completions fish > ~/.config/fish/completions/hatch.fish"
    )]
    Completions(CompletionsArgs),

    /// Any other command is looked up in the plugin table.
    #[command(external_subcommand)]
    Plugin(Vec<String>),
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `hatch init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Project (or component) name.
    #[arg(value_name = "NAME", help = "Project or component name")]
    pub name: String,

    /// What to create.
    #[arg(
        short = 'k',
        long = "kind",
        value_enum,
        default_value = "project",
        help = "Create a project or a component"
    )]
    pub kind: Kind,

    /// Template name or package/locator from the catalog.
    #[arg(
        short = 't',
        long = "template",
        value_name = "TEMPLATE",
        help = "Template to use (see `hatch list`)"
    )]
    pub template: Option<String>,

    /// Initial version.
    #[arg(
        long = "version",
        value_name = "SEMVER",
        default_value = "1.0.0",
        help = "Initial project version"
    )]
    pub version: String,

    /// Description made available to the template.
    #[arg(long = "description", value_name = "TEXT")]
    pub description: Option<String>,

    /// Empty a non-empty target directory first (destructive).
    #[arg(short = 'f', long = "force", help = "Empty the target directory first")]
    pub force: bool,
}

// ── add ───────────────────────────────────────────────────────────────────────

/// Arguments for `hatch add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Component template name.
    #[arg(value_name = "COMPONENT", help = "Component template name")]
    pub name: String,

    /// Directory the component directory is created in.
    #[arg(
        value_name = "PATH",
        help = "Parent directory (default: src/components)"
    )]
    pub path: Option<PathBuf>,
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `hatch list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Which templates to list.
    #[arg(
        short = 'k',
        long = "kind",
        value_enum,
        default_value = "project",
        help = "Filter by kind"
    )]
    pub kind: Kind,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One name per line.
    List,
    /// JSON array.
    Json,
}

/// Project or component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Kind {
    Project,
    Component,
}

impl From<Kind> for hatch_core::domain::ProjectKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Project => Self::Project,
            Kind::Component => Self::Component,
        }
    }
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `hatch completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `hatch config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one variable of the environment file, or all of them.
    Get {
        /// Variable name, e.g. `BASE_URL`.
        key: Option<String>,
    },
    /// Set a variable in the environment file.
    Set {
        /// One of BASE_URL, PROJECT_TEMPLATE, COMPONENT_TEMPLATE, REGISTRY_URL.
        key: String,
        /// New value.
        value: String,
    },
    /// Print every variable of the environment file.
    List,
    /// Restore the environment file to its defaults.
    Reset,
    /// Print the paths of the environment file and the configuration file.
    Path,
    /// Print the effective configuration as TOML.
    Show,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
}

// ── tests ─────────────────────────────────────────────────────────────────────
