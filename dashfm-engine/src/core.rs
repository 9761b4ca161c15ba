use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths;

/// Root directory of the browsable tree.
pub const ROOT_PATH: &str = "/";

/// Route string of the trash view.
pub const TRASH_ROUTE: &str = "trash";
/// Route string of the shared-with-me view.
pub const SHARED_WITH_ME_ROUTE: &str = "shared-with-me";
/// Route string of the my-shares view.
pub const MY_SHARES_ROUTE: &str = "my-shares";

/// The listing mode currently shown by the file manager.
///
/// Exactly one view is active at a time. Views round-trip through the host's
/// route strings (`"trash"`, `"shared-with-me"`, `"my-shares"`, anything else
/// being a browse path), which is also their serialized form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum View {
    /// Normal directory browsing at a path.
    Browse(String),
    /// The user's trash.
    Trash,
    /// Items other users shared with the current user.
    SharedWithMe,
    /// Items the current user shared with others.
    MyShares,
}

impl View {
    /// Browse view at [`ROOT_PATH`].
    pub fn root() -> Self {
        Self::Browse(ROOT_PATH.to_owned())
    }

    /// Parse a route string.
    pub fn from_route(route: &str) -> Self {
        match route {
            TRASH_ROUTE => Self::Trash,
            SHARED_WITH_ME_ROUTE => Self::SharedWithMe,
            MY_SHARES_ROUTE => Self::MyShares,
            "" => Self::root(),
            path => Self::Browse(path.to_owned()),
        }
    }

    /// Route string for this view.
    pub fn as_route(&self) -> &str {
        match self {
            Self::Browse(path) => path,
            Self::Trash => TRASH_ROUTE,
            Self::SharedWithMe => SHARED_WITH_ME_ROUTE,
            Self::MyShares => MY_SHARES_ROUTE,
        }
    }

    /// Directory path when this is a browse view.
    pub fn browse_path(&self) -> Option<&str> {
        match self {
            Self::Browse(path) => Some(path),
            _ => None,
        }
    }

    /// Whether the view is a real directory that accepts paste, drops, uploads and creation.
    pub fn is_browsable(&self) -> bool {
        matches!(self, Self::Browse(_))
    }

    /// Whether the view lists share records rather than files.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::SharedWithMe | Self::MyShares)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::root()
    }
}

impl From<String> for View {
    fn from(value: String) -> Self {
        Self::from_route(&value)
    }
}

impl From<View> for String {
    fn from(value: View) -> Self {
        match value {
            View::Browse(path) => path,
            other => other.as_route().to_owned(),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_route())
    }
}

/// Whether an item is a regular file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Regular file.
    File,
    /// Directory.
    Dir,
}

impl ItemKind {
    /// Wire name (`"file"` / `"dir"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a listing, as returned by the file service.
///
/// Which fields are populated depends on the view the item was listed in:
/// trash entries carry `trashed_name` (and may lack a usable `path`), shared
/// entries carry the share record `id` plus `sharer_name`/`recipient_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Display name.
    pub name: String,
    /// Path relative to the owner's home.
    #[serde(default)]
    pub path: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// ISO-8601 modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    /// Name of the entry inside the trash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trashed_name: Option<String>,
    /// Where a trashed entry is restored to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    /// ISO-8601 time the entry was trashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    /// Share record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// User who shared the item (shared-with-me).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharer_name: Option<String>,
    /// User the item is shared with (my-shares).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
}

impl Item {
    /// Create an item with only the common fields set.
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            size: None,
            modified_at: None,
            trashed_name: None,
            original_path: None,
            deleted_at: None,
            id: None,
            sharer_name: None,
            recipient_name: None,
        }
    }

    /// A file item whose name is the last path segment.
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = paths::file_name(&path).to_owned();
        Self::new(name, path, ItemKind::File)
    }

    /// A directory item whose name is the last path segment.
    pub fn dir(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = paths::file_name(&path).to_owned();
        Self::new(name, path, ItemKind::Dir)
    }

    /// Set the trash entry name.
    pub fn with_trashed_name(mut self, trashed_name: impl Into<String>) -> Self {
        self.trashed_name = Some(trashed_name.into());
        self
    }

    /// Set the share record id.
    pub fn with_share_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Whether the item is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == ItemKind::Dir
    }
}

/// View-specific identity of an item (path, trashed name or share id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an identifier string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keyboard modifier keys held during a click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl (or Cmd) key held.
    pub ctrl: bool,
    /// Shift key held.
    pub shift: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
    };
    /// Ctrl only.
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
    };
    /// Shift only.
    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
    };
}

/// Sort keys for the visible listing
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Sort by name
    #[default]
    Name,
    /// Sort by size
    Size,
    /// Sort by modification (or deletion, in trash) time
    Modified,
}

/// Errors returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileManagerError {
    /// The file service rejected the request; carries the user-facing message.
    #[error("{0}")]
    Service(String),
    /// Some uploads of a batch failed.
    #[error("{failed} of {total} upload(s) failed")]
    Upload {
        /// Number of failed uploads.
        failed: usize,
        /// Number of uploads attempted.
        total: usize,
    },
    /// Paste target is not a browsable directory.
    #[error("Cannot paste into this view.")]
    PasteNotAllowed,
    /// Operation is not offered in the active view.
    #[error("operation not available in the {0} view")]
    NotAllowedInView(String),
    /// Input rejected before reaching the service.
    #[error("{0}")]
    InvalidInput(String),
    /// The user declined a confirmation prompt.
    #[error("cancelled")]
    Cancelled,
}

impl FileManagerError {
    pub(crate) fn not_allowed(view: &View) -> Self {
        Self::NotAllowedInView(view.as_route().to_owned())
    }
}
