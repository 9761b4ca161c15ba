use async_trait::async_trait;
use thiserror::Error;

use crate::core::{Item, ItemId, ItemKind};

/// Error returned by a [`FileService`] call.
///
/// `message` is the human-readable reason supplied by the backend, if any. The
/// engine shows it verbatim and substitutes a per-operation message otherwise.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", .message.as_deref().unwrap_or("file service request failed"))]
pub struct ServiceError {
    /// Backend-provided message.
    pub message: Option<String>,
}

impl ServiceError {
    /// An error carrying a backend message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// An error without a message (transport failure, malformed response, ...).
    pub fn silent() -> Self {
        Self { message: None }
    }

    /// The backend message, or `fallback` when none was supplied.
    pub fn message_or(&self, fallback: impl Into<String>) -> String {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m.to_owned(),
            _ => fallback.into(),
        }
    }
}

/// A file picked or dropped by the user, ready for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    /// File name.
    pub name: String,
    /// Contents.
    pub data: Vec<u8>,
}

impl UploadFile {
    /// Create an upload.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Remote file service consumed by the engine.
///
/// Request and response shapes follow the dashboard's `/files` API; the
/// transport (and its timeout/retry policy) belongs to the implementation.
/// Futures are not required to be `Send`: the engine runs on a single UI
/// event loop.
#[async_trait(?Send)]
pub trait FileService {
    /// List a directory.
    async fn browse(&self, path: &str) -> Result<Vec<Item>, ServiceError>;
    /// Create a file or directory named `name` inside `parent`.
    async fn create_item(&self, parent: &str, name: &str, kind: ItemKind)
    -> Result<(), ServiceError>;
    /// Upload one file into `dest`.
    async fn upload_file(&self, file: &UploadFile, dest: &str) -> Result<(), ServiceError>;
    /// Move paths to the trash.
    async fn delete_items(&self, paths: &[String]) -> Result<(), ServiceError>;
    /// Rename the item at `path`.
    async fn rename_item(&self, path: &str, new_name: &str) -> Result<(), ServiceError>;
    /// Move paths into `destination`.
    async fn move_items(&self, paths: &[String], destination: &str) -> Result<(), ServiceError>;
    /// Copy paths into `destination`.
    async fn copy_items(&self, paths: &[String], destination: &str) -> Result<(), ServiceError>;
    /// List the trash.
    async fn trash_items(&self) -> Result<Vec<Item>, ServiceError>;
    /// Restore trash entries to their original location.
    async fn restore_trash_items(&self, trashed_names: &[ItemId]) -> Result<(), ServiceError>;
    /// Delete trash entries for good.
    async fn delete_trash_items_permanently(
        &self,
        trashed_names: &[ItemId],
    ) -> Result<(), ServiceError>;
    /// Delete every trash entry for good.
    async fn empty_trash(&self) -> Result<(), ServiceError>;
    /// List items shared with the current user.
    async fn shared_with_me_items(&self) -> Result<Vec<Item>, ServiceError>;
    /// Download the file behind a shared-with-me record.
    async fn download_shared_with_me_file(&self, share_id: &ItemId)
    -> Result<Vec<u8>, ServiceError>;
    /// Revoke (or, for recipients, dismiss) share records.
    async fn unshare_with_users(&self, share_ids: &[ItemId]) -> Result<(), ServiceError>;
    /// Record that the user has looked at the shared-with-me list.
    async fn update_last_viewed_shared_timestamp(&self) -> Result<(), ServiceError>;
    /// List items the current user shared with others.
    async fn shared_by_me_items(&self) -> Result<Vec<Item>, ServiceError>;
}

/// Severity of a [`Notice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Operation completed.
    Success,
    /// Operation failed or was refused.
    Error,
    /// Progress or neutral information.
    Info,
}

/// A user-facing notification (toast).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// Success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

/// Presents notifications to the user.
pub trait Notifier {
    /// Show one notification.
    fn notify(&self, notice: Notice);
}

impl<F> Notifier for F
where
    F: Fn(Notice),
{
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// What a confirmation prompt is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmKind {
    /// Move browse items to the trash.
    MoveToTrash,
    /// Irreversibly delete trash entries.
    DeletePermanently,
    /// Remove items from the shared-with-me list.
    RemoveShared,
    /// Revoke shares made by the user.
    Unshare,
    /// Irreversibly delete everything in the trash.
    EmptyTrash,
}

/// A confirmation prompt shown before a destructive operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmRequest {
    /// Prompt category.
    pub kind: ConfirmKind,
    /// Number of affected items (0 for empty-trash).
    pub count: usize,
    /// Text shown to the user.
    pub message: String,
}

/// Asks the user to confirm destructive operations.
pub trait Confirmer {
    /// Return `true` to proceed.
    fn confirm(&self, request: &ConfirmRequest) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&ConfirmRequest) -> bool,
{
    fn confirm(&self, request: &ConfirmRequest) -> bool {
        self(request)
    }
}
