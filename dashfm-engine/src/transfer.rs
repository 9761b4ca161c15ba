//! Mutating operations against the file service.
//!
//! Each operation notifies the outcome, reloads the active view after a
//! success and returns a structured result, so modal call sites can decide
//! whether to close while gesture call sites can ignore it.

use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::clipboard::ClipboardOp;
use crate::core::{FileManagerError, Item, ItemId, ItemKind, View};
use crate::identity::identify;
use crate::manager::FileManager;
use crate::service::{
    ConfirmKind, ConfirmRequest, FileService, Notice, ServiceError, UploadFile,
};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Which bulk service call a transfer issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Bulk {
    Move,
    Copy,
}

impl Bulk {
    fn name(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
        }
    }
}

impl<S: FileService> FileManager<S> {
    /// Create a file or directory named `name` in the current directory.
    pub async fn create(&mut self, name: &str, kind: ItemKind) -> Result<(), FileManagerError> {
        let parent = self.browse_dir()?;
        match self.service.create_item(&parent, name, kind).await {
            Ok(()) => {
                self.succeed(format!("'{name}' created successfully.")).await;
                Ok(())
            }
            Err(err) => Err(self.report_failure("create", err, format!("Failed to create {kind}."))),
        }
    }

    /// Upload `files` into the current directory.
    ///
    /// Requests run concurrently, bounded by
    /// [`FileManagerConfig::max_concurrent_uploads`](crate::FileManagerConfig::max_concurrent_uploads).
    /// One failure does not stop the others; the batch is reported once after
    /// every request has settled, and the view reloads whenever at least one
    /// file went through.
    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Result<(), FileManagerError> {
        let dest = self.browse_dir()?;
        if files.is_empty() {
            return Ok(());
        }
        let total = files.len();
        self.notifier
            .notify(Notice::info(format!("Uploading {total} file(s)...")));

        let service = &self.service;
        let results: Vec<Result<(), ServiceError>> = match self.config.max_concurrent_uploads {
            Some(limit) if limit > 0 => {
                stream::iter(files.iter())
                    .map(|file| service.upload_file(file, &dest))
                    .buffer_unordered(limit)
                    .collect::<Vec<_>>()
                    .await
            }
            _ => join_all(files.iter().map(|file| service.upload_file(file, &dest))).await,
        };

        let failed = results.iter().filter(|r| r.is_err()).count();
        trace_upload_settled(total, failed);
        if failed == 0 {
            self.succeed(format!("{total} file(s) uploaded successfully!"))
                .await;
            return Ok(());
        }

        self.notifier
            .notify(Notice::error("An error occurred during upload."));
        if failed < total {
            self.refresh().await;
        }
        Err(FileManagerError::Upload { failed, total })
    }

    /// Delete the items identified by `ids` in the active view.
    ///
    /// Browse views move them to the trash, the trash deletes them for good
    /// and shared views drop the share records. Every variant asks for
    /// confirmation first; an empty set does nothing.
    pub async fn delete_many(&mut self, ids: &[ItemId]) -> Result<(), FileManagerError> {
        if ids.is_empty() {
            return Ok(());
        }
        let count = ids.len();
        let view = self.listing.view().clone();
        let request = delete_confirmation(&view, count);
        if !self.confirmer.confirm(&request) {
            trace_cancelled(request.kind);
            return Err(FileManagerError::Cancelled);
        }

        let result = match &view {
            View::SharedWithMe | View::MyShares => self.service.unshare_with_users(ids).await,
            View::Trash => self.service.delete_trash_items_permanently(ids).await,
            View::Browse(_) => {
                let paths: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
                self.service.delete_items(&paths).await
            }
        };

        let (success, fallback) = if view.is_shared() {
            (
                format!("{count} item(s) removed/unshared successfully."),
                "Failed to remove/unshare item(s).",
            )
        } else {
            (
                format!("{count} item(s) deleted."),
                "Failed to complete the delete operation.",
            )
        };
        match result {
            Ok(()) => {
                self.succeed(success).await;
                Ok(())
            }
            Err(err) => Err(self.report_failure("delete", err, fallback)),
        }
    }

    /// [`delete_many`](Self::delete_many) over the current selection.
    pub async fn delete_selected(&mut self) -> Result<(), FileManagerError> {
        let ids = self.selection.to_vec();
        self.delete_many(&ids).await
    }

    /// Restore trash entries to their original locations.
    pub async fn restore_many(&mut self, ids: &[ItemId]) -> Result<(), FileManagerError> {
        if *self.listing.view() != View::Trash {
            return Err(FileManagerError::not_allowed(self.listing.view()));
        }
        if ids.is_empty() {
            return Ok(());
        }
        match self.service.restore_trash_items(ids).await {
            Ok(()) => {
                self.succeed(format!("{} item(s) restored.", ids.len()))
                    .await;
                Ok(())
            }
            Err(err) => Err(self.report_failure(
                "restore",
                err,
                "Failed to restore one or more items.",
            )),
        }
    }

    /// [`restore_many`](Self::restore_many) over the current selection.
    pub async fn restore_selected(&mut self) -> Result<(), FileManagerError> {
        let ids = self.selection.to_vec();
        self.restore_many(&ids).await
    }

    /// Permanently delete everything in the trash, after confirmation.
    pub async fn empty_trash(&mut self) -> Result<(), FileManagerError> {
        let request = ConfirmRequest {
            kind: ConfirmKind::EmptyTrash,
            count: 0,
            message: "Are you sure you want to permanently empty the trash? This action cannot be undone."
                .to_owned(),
        };
        if !self.confirmer.confirm(&request) {
            trace_cancelled(request.kind);
            return Err(FileManagerError::Cancelled);
        }
        match self.service.empty_trash().await {
            Ok(()) => {
                self.succeed("Trash has been emptied.".to_owned()).await;
                Ok(())
            }
            Err(err) => Err(self.report_failure("empty_trash", err, "Failed to empty trash.")),
        }
    }

    /// Rename `item`; an empty or unchanged name does nothing.
    pub async fn rename(&mut self, item: &Item, new_name: &str) -> Result<(), FileManagerError> {
        if !self.listing.view().is_browsable() {
            return Err(FileManagerError::not_allowed(self.listing.view()));
        }
        if new_name.is_empty() || new_name == item.name {
            return Ok(());
        }
        match self.service.rename_item(&item.path, new_name).await {
            Ok(()) => {
                self.succeed(format!("Renamed to '{new_name}'.")).await;
                Ok(())
            }
            Err(err) => Err(self.report_failure("rename", err, "Failed to rename item.")),
        }
    }

    /// Move `paths` into `destination`.
    pub async fn move_items(
        &mut self,
        paths: &[String],
        destination: &str,
    ) -> Result<(), FileManagerError> {
        let success = format!("{} item(s) moved successfully.", paths.len());
        self.bulk(Bulk::Move, paths, destination, success, "Failed to move item(s).")
            .await
    }

    /// Copy `paths` into `destination`.
    pub async fn copy_items(
        &mut self,
        paths: &[String],
        destination: &str,
    ) -> Result<(), FileManagerError> {
        let success = format!("{} item(s) copied successfully.", paths.len());
        self.bulk(Bulk::Copy, paths, destination, success, "Failed to copy item(s).")
            .await
    }

    /// Paste the clipboard into `destination` (default: the current directory).
    ///
    /// An empty clipboard does nothing. Outside browse views the paste is
    /// refused and the clipboard kept. The clipboard is cleared only once the
    /// service accepted the transfer.
    pub async fn paste(&mut self, destination: Option<&str>) -> Result<(), FileManagerError> {
        let Some(content) = self.clipboard.content().cloned() else {
            return Ok(());
        };
        let Some(current) = self.current_path().map(str::to_owned) else {
            let err = FileManagerError::PasteNotAllowed;
            trace_paste_rejected(self.listing.view());
            self.notifier.notify(Notice::error(err.to_string()));
            return Err(err);
        };
        let dest = destination.map_or(current, str::to_owned);
        let count = content.sources.len();
        let (kind, success) = match content.op {
            ClipboardOp::Cut => (Bulk::Move, format!("{count} item(s) moved successfully.")),
            ClipboardOp::Copy => (Bulk::Copy, format!("{count} item(s) pasted successfully.")),
        };
        self.bulk(kind, &content.sources, &dest, success, "Failed to paste item(s).")
            .await?;
        self.clipboard.clear();
        Ok(())
    }

    /// Download a shared-with-me file.
    pub async fn download_shared(&mut self, item: &Item) -> Result<Vec<u8>, FileManagerError> {
        let view = self.listing.view();
        if *view != View::SharedWithMe {
            return Err(FileManagerError::not_allowed(view));
        }
        if item.is_dir() {
            let message = "Cannot view directories directly. Please download.";
            self.notifier.notify(Notice::error(message));
            return Err(FileManagerError::InvalidInput(message.to_owned()));
        }
        let Some(id) = identify(item, view) else {
            return Err(FileManagerError::InvalidInput(format!(
                "'{}' has no share record",
                item.name
            )));
        };
        match self.service.download_shared_with_me_file(&id).await {
            Ok(data) => {
                self.notifier
                    .notify(Notice::success(format!("Downloading {}...", item.name)));
                Ok(data)
            }
            Err(err) => Err(self.report_failure(
                "download",
                err,
                format!("Failed to download {}.", item.name),
            )),
        }
    }

    pub(crate) async fn bulk(
        &mut self,
        kind: Bulk,
        paths: &[String],
        destination: &str,
        success: String,
        fallback: &str,
    ) -> Result<(), FileManagerError> {
        if paths.is_empty() {
            return Ok(());
        }
        let result = match kind {
            Bulk::Move => self.service.move_items(paths, destination).await,
            Bulk::Copy => self.service.copy_items(paths, destination).await,
        };
        match result {
            Ok(()) => {
                self.succeed(success).await;
                Ok(())
            }
            Err(err) => Err(self.report_failure(kind.name(), err, fallback)),
        }
    }

    fn browse_dir(&self) -> Result<String, FileManagerError> {
        self.current_path()
            .map(str::to_owned)
            .ok_or_else(|| FileManagerError::not_allowed(self.listing.view()))
    }

    async fn succeed(&mut self, message: String) {
        self.notifier.notify(Notice::success(message));
        self.refresh().await;
    }

    pub(crate) fn report_failure(
        &self,
        op: &'static str,
        err: ServiceError,
        fallback: impl Into<String>,
    ) -> FileManagerError {
        let message = err.message_or(fallback);
        trace_transfer_failed(op, &message);
        self.notifier.notify(Notice::error(message.clone()));
        FileManagerError::Service(message)
    }
}

fn delete_confirmation(view: &View, count: usize) -> ConfirmRequest {
    let (kind, message) = match view {
        View::SharedWithMe => (
            ConfirmKind::RemoveShared,
            format!(
                "Are you sure you want to remove {count} item(s) from your 'Shared with me' list? This will not delete the original files."
            ),
        ),
        View::MyShares => (
            ConfirmKind::Unshare,
            format!(
                "Are you sure you want to unshare {count} item(s)? This will revoke access for the recipients."
            ),
        ),
        View::Trash => (
            ConfirmKind::DeletePermanently,
            format!(
                "Are you sure you want to permanently delete {count} item(s)? This action cannot be undone."
            ),
        ),
        View::Browse(_) => (
            ConfirmKind::MoveToTrash,
            format!("Are you sure you want to move {count} item(s) to the trash?"),
        ),
    };
    ConfirmRequest {
        kind,
        count,
        message,
    }
}

#[cfg(feature = "tracing")]
fn trace_transfer_failed(op: &'static str, message: &str) {
    warn!(event = "transfer.failed", op, error = message, "transfer failed");
}

#[cfg(not(feature = "tracing"))]
fn trace_transfer_failed(_op: &'static str, _message: &str) {}

#[cfg(feature = "tracing")]
fn trace_upload_settled(total: usize, failed: usize) {
    debug!(event = "transfer.upload_settled", total, failed, "upload batch settled");
}

#[cfg(not(feature = "tracing"))]
fn trace_upload_settled(_total: usize, _failed: usize) {}

#[cfg(feature = "tracing")]
fn trace_cancelled(kind: ConfirmKind) {
    debug!(event = "transfer.cancelled", kind = ?kind, "confirmation declined");
}

#[cfg(not(feature = "tracing"))]
fn trace_cancelled(_kind: ConfirmKind) {}

#[cfg(feature = "tracing")]
fn trace_paste_rejected(view: &View) {
    debug!(event = "transfer.paste_rejected", view = %view, "paste rejected");
}

#[cfg(not(feature = "tracing"))]
fn trace_paste_rejected(_view: &View) {}
