use std::path::PathBuf;

/// How an [`Engine`](crate::Engine) opens its store and treats stale postings.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// On-disk location; `None` opens a temporary store.
    pub path: Option<PathBuf>,
    /// Re-index a document after every `update`.
    pub reindex_on_update: bool,
    /// Remove a document's postings when it is deleted.
    pub purge_on_delete: bool,
}

impl EngineConfig {
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), ..Self::default() }
    }

    pub fn temporary() -> Self {
        Self::default()
    }

    pub fn reindex_on_update(mut self, enabled: bool) -> Self {
        self.reindex_on_update = enabled;
        self
    }

    pub fn purge_on_delete(mut self, enabled: bool) -> Self {
        self.purge_on_delete = enabled;
        self
    }
}
