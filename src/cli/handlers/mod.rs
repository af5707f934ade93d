mod init;
pub use init::cmd_init;

use std::path::PathBuf;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::logging;
use crate::io::store::{self, JsonFileStore, TaskStore};
use crate::model::config::Config;
use crate::model::project::{Project, TaskSet};
use crate::model::task::{Task, find_task};
use crate::ops::cascade::{delete_subtrees, set_completion_cascading_many};
use crate::ops::changes::{ChangeSet, diff};
use crate::ops::check::{self, CheckError, CheckWarning};
use crate::ops::clipboard::{PasteOptions, PasteTarget, capture, paste};
use crate::ops::linearize::linearize;
use crate::ops::relations::build_relation_map;
use crate::ops::task_ops::{self, TaskError};
use crate::ops::visibility::{RowFilter, visible_rows};
use crate::ui::input::parse_key_script;
use crate::ui::session::{Effect, Session};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs: the opened store, config and output mode.
struct Ctx {
    store: JsonFileStore,
    config: Config,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let start = resolve_start(cli.project_dir.as_deref())?;
    let root = store::discover_root(&start)?;
    let config = config_io::read_config(&root)?;
    logging::init_logging(&config);
    tracing::debug!(root = %root.display(), "opened project");

    let mut ctx = Ctx {
        store: JsonFileStore::open(&root)?,
        config,
        json: cli.json,
    };

    match cli.command {
        // Init is handled in main.rs before project discovery
        Commands::Init(args) => cmd_init(args, cli.project_dir.as_deref()),

        // Read commands
        Commands::Projects => cmd_projects(&ctx),
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Check(args) => cmd_check(&mut ctx, args),

        // Write commands
        Commands::Project(cmd) => match cmd.action {
            ProjectAction::Add { id, name } => cmd_project_add(&mut ctx, id, name),
        },
        Commands::Add(args) => cmd_add(&mut ctx, args),
        Commands::Done(args) => cmd_set_completed(&mut ctx, args, true),
        Commands::Undone(args) => cmd_set_completed(&mut ctx, args, false),
        Commands::Rm(args) => cmd_rm(&mut ctx, args),
        Commands::Collapse(args) => cmd_collapse(&mut ctx, args),
        Commands::Cp(args) => cmd_cp(&mut ctx, args),
        Commands::Keys(args) => cmd_keys(&mut ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_start(project_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match project_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

/// The requested project, or the first one when none is named.
fn resolve_project<'a>(set: &'a TaskSet, requested: Option<&str>) -> Result<&'a Project, String> {
    match requested {
        Some(id) => set.project(id).ok_or_else(|| format!("project not found: {}", id)),
        None => set
            .projects
            .first()
            .ok_or_else(|| "no projects yet (try `tt project add <ID> <NAME>`)".to_string()),
    }
}

/// Fail on the first ID that isn't in the collection
fn require_tasks(tasks: &[Task], ids: &[String]) -> Result<(), TaskError> {
    match ids.iter().find(|id| find_task(tasks, id).is_none()) {
        Some(missing) => Err(TaskError::NotFound(missing.clone())),
        None => Ok(()),
    }
}

fn commit(ctx: &mut Ctx, changes: &ChangeSet) -> CmdResult {
    ctx.store.commit(changes)?;
    Ok(())
}

fn print_changes(ctx: &Ctx, changes: &ChangeSet) -> CmdResult {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(changes)?);
    }
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_projects(ctx: &Ctx) -> CmdResult {
    let set = ctx.store.load()?;
    let rows: Vec<ProjectJson> = set
        .projects
        .iter()
        .map(|p| {
            let tasks: Vec<&Task> = set.tasks.iter().filter(|t| t.project_id == p.id).collect();
            ProjectJson {
                id: p.id.clone(),
                name: p.name.clone(),
                tasks: tasks.len(),
                completed: tasks.iter().filter(|t| t.completed).count(),
            }
        })
        .collect();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("No projects yet.");
    } else {
        for p in &rows {
            println!("{}  {}  ({}/{} done)", p.id, p.name, p.completed, p.tasks);
        }
    }
    Ok(())
}

fn cmd_list(ctx: &Ctx, args: ListArgs) -> CmdResult {
    let set = ctx.store.load()?;
    let project = resolve_project(&set, args.project.as_deref())?;
    let relations = build_relation_map(&set.tasks);
    let outline = linearize(&set.tasks, &relations);
    let filter = RowFilter {
        project_id: Some(project.id.as_str()),
        show_completed: args.all || ctx.config.view.show_completed,
        expand_all: args.all,
    };
    let rows = visible_rows(&outline, &relations, &filter);

    if ctx.json {
        let json = OutlineJson {
            project: project.id.clone(),
            rows: rows
                .iter()
                .map(|t| row_to_json(t, &relations, &outline.orphans, None))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if rows.is_empty() {
        println!("No tasks in {}.", project.name);
    } else {
        print!("{}", format_outline(&rows, &relations, &outline.orphans, None));
    }
    Ok(())
}

fn cmd_show(ctx: &Ctx, args: ShowArgs) -> CmdResult {
    let set = ctx.store.load()?;
    let task = find_task(&set.tasks, &args.id).ok_or_else(|| TaskError::NotFound(args.id.clone()))?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        let relations = build_relation_map(&set.tasks);
        print!("{}", format_task_detail(task, &relations));
    }
    Ok(())
}

fn cmd_check(ctx: &mut Ctx, args: CheckArgs) -> CmdResult {
    let set = ctx.store.load()?;
    let mut tasks = set.tasks.clone();
    let mut fixed = 0;
    if args.fix {
        let relations = build_relation_map(&tasks);
        let changed = check::normalize_levels(&mut tasks, &relations);
        fixed = changed.len();
        commit(ctx, &diff(&set.tasks, &tasks))?;
    }
    let result = check::check_tasks(&tasks);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if fixed > 0 {
        println!("Fixed {} level{}", fixed, plural(fixed));
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            match err {
                CheckError::DuplicateId { task_id, count } => {
                    println!("  {} is used by {} tasks", task_id, count);
                }
                CheckError::DanglingParent { task_id, parent_id } => {
                    println!("  {} has missing parent: {}", task_id, parent_id);
                }
                CheckError::ParentCycle { task_id } => {
                    println!("  {} is part of a parent cycle", task_id);
                }
                CheckError::CrossProjectParent {
                    task_id,
                    project_id,
                    parent_project_id,
                } => {
                    println!(
                        "  {} ({}) has a parent in project {}",
                        task_id, project_id, parent_project_id
                    );
                }
            }
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            println!();
        }
        println!("Warnings:");
        for warn in &result.warnings {
            match warn {
                CheckWarning::LevelMismatch {
                    task_id,
                    level,
                    expected,
                } => {
                    println!("  {} has level {}, expected {} (fix with --fix)", task_id, level, expected);
                }
                CheckWarning::CompletionDateMismatch { task_id, completed } => {
                    if *completed {
                        println!("  {} is completed but has no completion date", task_id);
                    } else {
                        println!("  {} is not completed but has a completion date", task_id);
                    }
                }
            }
        }
    }
    if result.valid {
        println!("✓ task forest is valid");
    } else {
        println!("✗ task forest has errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_project_add(ctx: &mut Ctx, id: String, name: String) -> CmdResult {
    init::validate_project_id(&id)?;
    ctx.store.add_project(Project::new(id.clone(), name.clone()))?;
    if ctx.json {
        println!("{}", serde_json::json!({ "id": id, "name": name }));
    } else {
        println!("Added project {} ({})", id, name);
    }
    Ok(())
}

fn cmd_add(ctx: &mut Ctx, args: AddArgs) -> CmdResult {
    let set = ctx.store.load()?;
    let project_id = match (&args.parent, &args.project) {
        (Some(parent), None) => find_task(&set.tasks, parent)
            .ok_or_else(|| TaskError::NotFound(parent.clone()))?
            .project_id
            .clone(),
        (_, requested) => resolve_project(&set, requested.as_deref())?.id.clone(),
    };

    let mut tasks = set.tasks.clone();
    let id = task_ops::add_task(
        &mut tasks,
        &project_id,
        args.parent.as_deref(),
        &args.name,
        &ctx.config.ids.prefix,
    )?;
    let changes = diff(&set.tasks, &tasks);
    commit(ctx, &changes)?;

    if ctx.json {
        print_changes(ctx, &changes)?;
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_set_completed(ctx: &mut Ctx, args: IdsArgs, completed: bool) -> CmdResult {
    let set = ctx.store.load()?;
    require_tasks(&set.tasks, &args.ids)?;
    let relations = build_relation_map(&set.tasks);
    let result = set_completion_cascading_many(&set.tasks, &relations, &args.ids, completed);
    let changes = diff(&set.tasks, &result.tasks);
    commit(ctx, &changes)?;

    if ctx.json {
        print_changes(ctx, &changes)?;
    } else {
        let n = result.affected.len();
        let state = if completed { "done" } else { "not done" };
        println!("Marked {} task{} {}", n, plural(n), state);
    }
    Ok(())
}

fn cmd_rm(ctx: &mut Ctx, args: IdsArgs) -> CmdResult {
    let set = ctx.store.load()?;
    require_tasks(&set.tasks, &args.ids)?;
    let relations = build_relation_map(&set.tasks);
    let result = delete_subtrees(&set.tasks, &relations, &args.ids);
    let changes = diff(&set.tasks, &result.tasks);
    commit(ctx, &changes)?;

    if ctx.json {
        print_changes(ctx, &changes)?;
    } else {
        let n = result.affected.len();
        println!("Deleted {} task{}", n, plural(n));
    }
    Ok(())
}

fn cmd_collapse(ctx: &mut Ctx, args: CollapseArgs) -> CmdResult {
    let set = ctx.store.load()?;
    require_tasks(&set.tasks, std::slice::from_ref(&args.id))?;
    let relations = build_relation_map(&set.tasks);
    let mut tasks = set.tasks.clone();
    if !task_ops::toggle_collapse(&mut tasks, &relations, &args.id) {
        return Err(format!("{} has no subtasks to collapse", args.id).into());
    }
    let changes = diff(&set.tasks, &tasks);
    commit(ctx, &changes)?;

    if ctx.json {
        print_changes(ctx, &changes)?;
    } else {
        let collapsed = find_task(&tasks, &args.id).is_some_and(|t| t.collapsed);
        println!("{} {}", if collapsed { "Collapsed" } else { "Expanded" }, args.id);
    }
    Ok(())
}

fn cmd_cp(ctx: &mut Ctx, args: CpArgs) -> CmdResult {
    let set = ctx.store.load()?;
    require_tasks(&set.tasks, &args.ids)?;
    let relations = build_relation_map(&set.tasks);
    let buffer = capture(&set.tasks, &relations, &args.ids);

    let target = match &args.into {
        Some(parent) => {
            let parent = find_task(&set.tasks, parent).ok_or_else(|| TaskError::NotFound(parent.clone()))?;
            PasteTarget::into_task(parent)
        }
        None => PasteTarget::root(resolve_project(&set, args.project.as_deref())?.id.clone()),
    };
    let options = PasteOptions {
        copy_suffix: &ctx.config.paste.copy_suffix,
        id_prefix: &ctx.config.ids.prefix,
    };
    let pasted = paste(&buffer, &target, &set.tasks, &options)?;

    let mut tasks = set.tasks.clone();
    tasks.extend(pasted);
    let changes = diff(&set.tasks, &tasks);
    commit(ctx, &changes)?;

    if ctx.json {
        print_changes(ctx, &changes)?;
    } else {
        let n = changes.created.len();
        println!("Pasted {} task{}", n, plural(n));
        for task in changes.created.iter().filter(|t| t.parent_id == target.parent_id) {
            println!("  {} {}", task.id, task.name);
        }
    }
    Ok(())
}

/// Replay a key script through a session, commit whatever it changed and
/// print the resulting outline with selection markers.
fn cmd_keys(ctx: &mut Ctx, args: KeysArgs) -> CmdResult {
    let steps = parse_key_script(&args.script)?;
    let set = ctx.store.load()?;
    let mut session = Session::new(set, ctx.config.clone());
    if let Some(project) = &args.project
        && !session.select_project(project)
    {
        return Err(format!("project not found: {}", project).into());
    }

    let mut changes = ChangeSet::default();
    let mut rejected = Vec::new();
    for step in &steps {
        match session.replay(step) {
            Effect::Changed(c) => changes.merge(c),
            Effect::Rejected(reason) => {
                tracing::warn!(%reason, "key rejected");
                rejected.push(reason);
            }
            Effect::Copied(_) | Effect::None => {}
        }
    }
    commit(ctx, &changes)?;

    let rows = session.rows();
    let relations = session.relations();
    let outline = linearize(session.tasks(), relations);
    let selection = session.selection();

    if ctx.json {
        let json = KeysJson {
            area: session.area(),
            primary: selection.primary().map(str::to_string),
            selected: selection.selected().iter().cloned().collect(),
            clipboard: session.clipboard().len(),
            created: changes.created.len(),
            updated: changes.updated.len(),
            deleted: changes.deleted.len(),
            rejected,
            outline: OutlineJson {
                project: session.current_project().map(|p| p.id.clone()).unwrap_or_default(),
                rows: rows
                    .iter()
                    .map(|t| row_to_json(t, relations, &outline.orphans, Some(selection)))
                    .collect(),
            },
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", format_outline(&rows, relations, &outline.orphans, Some(selection)));
        for reason in &rejected {
            eprintln!("rejected: {}", reason);
        }
    }
    Ok(())
}
