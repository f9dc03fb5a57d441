use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use git2::{IndexAddOption, Repository, Signature};
use tracing::debug;

use crate::error::AppError;

/// Commits the trip data directory after each write so the ledger keeps a history.
#[derive(Clone)]
pub struct GitService {
    repo_root: Arc<PathBuf>,
    tracked: Arc<String>,
}

impl GitService {
    pub fn new(root: PathBuf, data_root: &Path) -> Self {
        let tracked = data_root
            .strip_prefix(&root)
            .unwrap_or(data_root)
            .to_string_lossy()
            .into_owned();
        Self {
            repo_root: Arc::new(root),
            tracked: Arc::new(tracked),
        }
    }

    fn root(&self) -> &Path {
        &self.repo_root
    }

    pub fn init_repo_if_needed(&self) -> Result<(), AppError> {
        if self.root().join(".git").exists() {
            return Ok(());
        }

        Repository::init(self.root())?;
        Ok(())
    }

    /// Returns `false` when nothing changed since the last commit.
    pub fn commit_data_changes(&self, message: &str) -> Result<bool, AppError> {
        let repo = Repository::discover(self.root())?;
        let mut index = repo.index()?;
        index.add_all([self.tracked.as_str()].iter(), IndexAddOption::DEFAULT, None)?;
        if index.is_empty() {
            return Ok(false);
        }
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| repo.find_commit(oid).ok());

        if parent.as_ref().map(|commit| commit.tree_id()) == Some(tree_id) {
            debug!("trip data unchanged, skipping commit");
            return Ok(false);
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = Signature::now("ambulance-ledger", "ledger@local")?;
        let parent_refs = parent.iter().collect::<Vec<_>>();
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )?;

        Ok(true)
    }
}
