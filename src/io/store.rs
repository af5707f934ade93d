use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::project::{Project, TaskSet};
use crate::ops::changes::ChangeSet;

/// Directory holding the store and config, relative to the project root
pub const DATA_DIR: &str = ".tasktree";
const TASKS_FILE: &str = "tasks.json";
const CONFIG_FILE: &str = "config.toml";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not a tasktree project: no .tasktree/ directory found")]
    NotAProject,
    #[error(".tasktree/ already exists in {} (use --force to reinitialize)", .0.display())]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse task store: {0}")]
    Json(#[from] serde_json::Error),
    #[error("project already exists: {0}")]
    DuplicateProject(String),
}

/// Persistence collaborator. The engine hands it explicit change sets and
/// never writes on its own.
pub trait TaskStore {
    fn load(&self) -> Result<TaskSet, StoreError>;
    fn commit(&mut self, changes: &ChangeSet) -> Result<(), StoreError>;
}

/// Apply a change set to a loaded collection: updates replace in place,
/// creations append, deletions remove.
pub fn apply_changes(set: &mut TaskSet, changes: &ChangeSet) {
    set.tasks.retain(|t| !changes.deleted.contains(&t.id));
    for task in &changes.updated {
        match set.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task.clone(),
            None => set.tasks.push(task.clone()),
        }
    }
    for task in &changes.created {
        set.tasks.retain(|t| t.id != task.id);
        set.tasks.push(task.clone());
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// `{ projects, tasks }` in `.tasktree/tasks.json`, rewritten atomically on
/// every commit.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open the store of the project rooted at `root`
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        if !root.join(DATA_DIR).is_dir() {
            return Err(StoreError::NotAProject);
        }
        Ok(JsonFileStore {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir().join(TASKS_FILE)
    }

    /// Replace the whole document
    pub fn save(&self, set: &TaskSet) -> Result<(), StoreError> {
        let path = self.tasks_path();
        let mut json = serde_json::to_vec_pretty(set)?;
        json.push(b'\n');
        atomic_write(&path, &json).map_err(|e| StoreError::WriteError { path, source: e })
    }

    pub fn add_project(&mut self, project: Project) -> Result<(), StoreError> {
        let mut set = self.load()?;
        if set.project(&project.id).is_some() {
            return Err(StoreError::DuplicateProject(project.id));
        }
        tracing::info!(id = %project.id, "added project");
        set.projects.push(project);
        self.save(&set)
    }
}

impl TaskStore for JsonFileStore {
    fn load(&self) -> Result<TaskSet, StoreError> {
        let path = self.tasks_path();
        if !path.exists() {
            return Ok(TaskSet::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        let set: TaskSet = serde_json::from_str(&text)?;
        tracing::debug!(
            projects = set.projects.len(),
            tasks = set.tasks.len(),
            "loaded task store"
        );
        Ok(set)
    }

    fn commit(&mut self, changes: &ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut set = self.load()?;
        apply_changes(&mut set, changes);
        self.save(&set)?;
        tracing::info!(
            created = changes.created.len(),
            updated = changes.updated.len(),
            deleted = changes.deleted.len(),
            "committed changes"
        );
        Ok(())
    }
}

/// In-memory store, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    set: TaskSet,
    commits: usize,
}

impl MemoryStore {
    pub fn new(set: TaskSet) -> Self {
        MemoryStore { set, commits: 0 }
    }

    /// Number of non-empty commits received
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Result<TaskSet, StoreError> {
        Ok(self.set.clone())
    }

    fn commit(&mut self, changes: &ChangeSet) -> Result<(), StoreError> {
        if !changes.is_empty() {
            apply_changes(&mut self.set, changes);
            self.commits += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Discovery and init
// ---------------------------------------------------------------------------

/// Find the project root by walking up from `start`, looking for a
/// `.tasktree/` subdirectory.
pub fn discover_root(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(DATA_DIR).is_dir() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(StoreError::NotAProject);
        }
    }
}

/// Create `.tasktree/` with an empty store and a default config. With
/// `force`, missing files are recreated and existing ones are left alone.
pub fn init_project(root: &Path, force: bool) -> Result<JsonFileStore, StoreError> {
    let data_dir = root.join(DATA_DIR);
    if data_dir.is_dir() && !force {
        return Err(StoreError::AlreadyInitialized(root.to_path_buf()));
    }
    fs::create_dir_all(&data_dir).map_err(|e| StoreError::WriteError {
        path: data_dir.clone(),
        source: e,
    })?;

    let config_path = data_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        atomic_write(&config_path, DEFAULT_CONFIG.as_bytes()).map_err(|e| StoreError::WriteError {
            path: config_path.clone(),
            source: e,
        })?;
    }

    let store = JsonFileStore {
        root: root.to_path_buf(),
    };
    if !store.tasks_path().exists() {
        store.save(&TaskSet::default())?;
    }
    tracing::info!(root = %root.display(), "initialized project");
    Ok(store)
}

const DEFAULT_CONFIG: &str = r#"[paste]
copy_suffix = " (copy)"

[view]
show_completed = true
detail_pane = true

[ids]
prefix = "t"

# [log]
# filter = "tasktree=debug"
"#;

/// Write to a temp file in the same directory, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
