use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tt", about = concat!("tasktree v", env!("CARGO_PKG_VERSION"), " - hierarchical task outlines"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tasktree project in the current directory
    Init(InitArgs),
    /// List projects
    Projects,
    /// Project management
    Project(ProjectCmd),
    /// Show a project's task outline
    List(ListArgs),
    /// Show task details
    Show(ShowArgs),
    /// Add a task
    Add(AddArgs),
    /// Mark tasks and their subtasks done
    Done(IdsArgs),
    /// Mark tasks and their subtasks not done
    Undone(IdsArgs),
    /// Delete tasks together with their subtasks
    Rm(IdsArgs),
    /// Collapse or expand a task in the outline
    Collapse(CollapseArgs),
    /// Copy tasks (with subtasks) and paste them elsewhere
    Cp(CpArgs),
    /// Validate the task forest
    Check(CheckArgs),
    /// Replay a key script against the outline and save the result
    Keys(KeysArgs),
}

// ---------------------------------------------------------------------------
// Init / projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Create a first project: --project <ID> "name"
    #[arg(long, num_args = 2, value_names = ["ID", "NAME"])]
    pub project: Option<Vec<String>>,
    /// Reinitialize even if .tasktree/ already exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add a project
    Add {
        /// Project ID
        id: String,
        /// Display name
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Project to list (default: first project)
    #[arg(long)]
    pub project: Option<String>,
    /// Include completed tasks and collapsed subtrees
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Rewrite levels from the parent chain
    #[arg(long)]
    pub fix: bool,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task name
    pub name: String,
    /// Parent task ID (default: top level)
    #[arg(long)]
    pub parent: Option<String>,
    /// Project for a top-level task (default: parent's project, else first project)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct IdsArgs {
    /// Task IDs
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct CollapseArgs {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
#[command(group(clap::ArgGroup::new("dest").required(true).args(["into", "root"])))]
pub struct CpArgs {
    /// Task IDs to copy
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// Paste under this task
    #[arg(long)]
    pub into: Option<String>,
    /// Paste at the top level
    #[arg(long)]
    pub root: bool,
    /// Target project for --root (default: first project)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct KeysArgs {
    /// Keys such as `down S-down C-c enter "New task"`
    pub script: String,
    /// Project to start in (default: first project)
    #[arg(long)]
    pub project: Option<String>,
}
