use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::store;
use crate::model::project::Project;

/// Validate that a project ID is non-empty and free of whitespace.
pub(super) fn validate_project_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("project id cannot be empty".to_string());
    }
    if id.chars().any(char::is_whitespace) {
        return Err(format!("project id '{}' cannot contain whitespace", id));
    }
    Ok(())
}

pub fn cmd_init(args: InitArgs, project_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match project_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&root)?;

    let mut store = store::init_project(&root, args.force)?;
    println!("Initialized tasktree project in {}", root.display());

    if let Some(pair) = &args.project
        && let [id, name] = pair.as_slice()
    {
        validate_project_id(id)?;
        store.add_project(Project::new(id.clone(), name.clone()))?;
        println!("Added project {} ({})", id, name);
    }
    Ok(())
}
