use serde::{Deserialize, Serialize};

use crate::core::{ROOT_PATH, View};

/// Engine configuration.
///
/// Can be built in code with the builder-style setters or deserialized from
/// the host's settings JSON (missing keys take their defaults).
///
/// ```
/// use dashfm_engine::{FileManagerConfig, View};
/// let cfg = FileManagerConfig::new()
///     .initial_view(View::Trash)
///     .max_concurrent_uploads(Some(4));
/// assert_eq!(cfg.initial_view, View::Trash);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileManagerConfig {
    /// View loaded by [`FileManager::mount`](crate::FileManager::mount).
    pub initial_view: View,
    /// Directory a failed browse falls back to, and the upper bound of `go_up`.
    pub root_path: String,
    /// Mark the shared-with-me list as viewed whenever it is fetched.
    pub mark_shared_viewed: bool,
    /// Upper bound on simultaneous upload requests (`None` = all at once).
    pub max_concurrent_uploads: Option<usize>,
}

impl Default for FileManagerConfig {
    fn default() -> Self {
        Self {
            initial_view: View::root(),
            root_path: ROOT_PATH.to_owned(),
            mark_shared_viewed: true,
            max_concurrent_uploads: None,
        }
    }
}

impl FileManagerConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the view loaded on mount.
    pub fn initial_view(mut self, view: View) -> Self {
        self.initial_view = view;
        self
    }

    /// Set the fallback/root directory.
    pub fn root_path(mut self, path: impl Into<String>) -> Self {
        self.root_path = path.into();
        self
    }

    /// Enable or disable the shared-with-me "last viewed" update.
    pub fn mark_shared_viewed(mut self, yes: bool) -> Self {
        self.mark_shared_viewed = yes;
        self
    }

    /// Bound the number of simultaneous uploads.
    pub fn max_concurrent_uploads(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_uploads = limit;
        self
    }
}
