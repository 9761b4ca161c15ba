use crate::core::{FileManagerError, Item, ItemKind};
use crate::manager::FileManager;
use crate::service::FileService;

/// Validation message for an empty name.
pub const NAME_EMPTY_MESSAGE: &str = "Name cannot be empty.";
/// Validation message for an empty move destination.
pub const DESTINATION_EMPTY_MESSAGE: &str = "Destination path cannot be empty.";

/// The modal dialogs the file manager can show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modal {
    /// Name a new file or folder.
    Create {
        /// What to create.
        kind: ItemKind,
    },
    /// Rename one item.
    Rename {
        /// Item being renamed.
        item: Item,
    },
    /// Pick a destination for the selected paths.
    Move {
        /// Paths to move.
        paths: Vec<String>,
    },
    /// Preview a file.
    ViewFile {
        /// File shown.
        item: Item,
    },
    /// Create a public share link.
    SharePublic {
        /// Paths to share.
        paths: Vec<String>,
    },
    /// Share with other users.
    ShareWithUsers {
        /// Paths to share.
        paths: Vec<String>,
    },
}

/// Tracks the single open modal and its last submission error.
#[derive(Clone, Debug, Default)]
pub struct ModalCoordinator {
    active: Option<Modal>,
    error: Option<String>,
}

impl ModalCoordinator {
    /// The open modal.
    pub fn active(&self) -> Option<&Modal> {
        self.active.as_ref()
    }

    /// Error shown inside the open modal.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Open `modal`, replacing any other.
    pub fn open(&mut self, modal: Modal) {
        self.active = Some(modal);
        self.error = None;
    }

    /// Close the open modal.
    pub fn close(&mut self) -> Option<Modal> {
        self.error = None;
        self.active.take()
    }

    fn fail(&mut self, err: FileManagerError) -> FileManagerError {
        self.error = Some(err.to_string());
        err
    }
}

fn no_dialog(name: &str) -> FileManagerError {
    FileManagerError::InvalidInput(format!("no {name} dialog is open"))
}

impl<S: FileService> FileManager<S> {
    /// Modal state.
    pub fn modal(&self) -> &ModalCoordinator {
        &self.modal
    }

    /// Open `modal`, replacing any other and closing the menus.
    pub fn open_modal(&mut self, modal: Modal) {
        self.popups.close_all();
        self.modal.open(modal);
    }

    /// Close the open modal.
    pub fn close_modal(&mut self) -> Option<Modal> {
        self.modal.close()
    }

    /// Submit the create dialog. Closes it on success.
    pub async fn submit_create(&mut self, name: &str) -> Result<(), FileManagerError> {
        let Some(Modal::Create { kind }) = self.modal.active().cloned() else {
            return Err(no_dialog("create"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(self
                .modal
                .fail(FileManagerError::InvalidInput(NAME_EMPTY_MESSAGE.to_owned())));
        }
        match self.create(name, kind).await {
            Ok(()) => {
                self.modal.close();
                Ok(())
            }
            Err(err) => Err(self.modal.fail(err)),
        }
    }

    /// Submit the rename dialog. Closes it on success, including an unchanged name.
    pub async fn submit_rename(&mut self, new_name: &str) -> Result<(), FileManagerError> {
        let Some(Modal::Rename { item }) = self.modal.active().cloned() else {
            return Err(no_dialog("rename"));
        };
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(self
                .modal
                .fail(FileManagerError::InvalidInput(NAME_EMPTY_MESSAGE.to_owned())));
        }
        match self.rename(&item, new_name).await {
            Ok(()) => {
                self.modal.close();
                Ok(())
            }
            Err(err) => Err(self.modal.fail(err)),
        }
    }

    /// Submit the move dialog. Closes it on success.
    pub async fn submit_move(&mut self, destination: &str) -> Result<(), FileManagerError> {
        let Some(Modal::Move { paths }) = self.modal.active().cloned() else {
            return Err(no_dialog("move"));
        };
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(self.modal.fail(FileManagerError::InvalidInput(
                DESTINATION_EMPTY_MESSAGE.to_owned(),
            )));
        }
        match self.move_items(&paths, destination).await {
            Ok(()) => {
                self.modal.close();
                Ok(())
            }
            Err(err) => Err(self.modal.fail(err)),
        }
    }

    /// A share dialog finished its own request: close it and reload.
    pub async fn share_completed(&mut self) {
        if matches!(
            self.modal.active(),
            Some(Modal::SharePublic { .. } | Modal::ShareWithUsers { .. })
        ) {
            self.modal.close();
        }
        self.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryFileService, ServiceOp};
    use crate::service::{ConfirmRequest, Notice};
    use pollster::block_on;

    fn mounted(svc: MemoryFileService) -> FileManager<MemoryFileService> {
        let mut fm = FileManager::new(svc, |_: Notice| {}, |_: &ConfirmRequest| true);
        block_on(fm.mount());
        fm
    }

    #[test]
    fn opening_a_modal_replaces_the_previous_one() {
        let mut fm = mounted(MemoryFileService::new());
        fm.open_modal(Modal::Create {
            kind: ItemKind::File,
        });
        fm.open_modal(Modal::Move { paths: Vec::new() });
        assert!(matches!(fm.modal().active(), Some(Modal::Move { .. })));
    }

    #[test]
    fn empty_name_keeps_modal_open_with_error() {
        let svc = MemoryFileService::new();
        let mut fm = mounted(svc.clone());
        fm.open_modal(Modal::Create { kind: ItemKind::Dir });
        let err = block_on(fm.submit_create("   ")).unwrap_err();
        assert_eq!(err, FileManagerError::InvalidInput(NAME_EMPTY_MESSAGE.into()));
        assert_eq!(fm.modal().error(), Some(NAME_EMPTY_MESSAGE));
        assert!(fm.modal().active().is_some());
        assert_eq!(svc.call_count(ServiceOp::CreateItem), 0);
    }

    #[test]
    fn successful_create_closes_modal() {
        let svc = MemoryFileService::new();
        let mut fm = mounted(svc.clone());
        fm.open_modal(Modal::Create { kind: ItemKind::Dir });
        block_on(fm.submit_create("music")).unwrap();
        assert!(fm.modal().active().is_none());
        assert!(svc.exists("/music"));
    }

    #[test]
    fn failed_move_keeps_modal_open() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let mut fm = mounted(svc);
        fm.open_modal(Modal::Move {
            paths: vec!["/a.txt".into()],
        });
        assert!(block_on(fm.submit_move("")).is_err());
        assert_eq!(fm.modal().error(), Some(DESTINATION_EMPTY_MESSAGE));

        let err = block_on(fm.submit_move("/missing")).unwrap_err();
        assert!(matches!(err, FileManagerError::Service(_)));
        assert!(fm.modal().active().is_some());
    }

    #[test]
    fn unchanged_rename_closes_without_a_call() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let mut fm = mounted(svc.clone());
        let item = fm.items()[0].clone();
        fm.open_modal(Modal::Rename { item });
        block_on(fm.submit_rename("a.txt")).unwrap();
        assert!(fm.modal().active().is_none());
        assert_eq!(svc.call_count(ServiceOp::RenameItem), 0);
    }

    #[test]
    fn share_completed_closes_and_refreshes() {
        let svc = MemoryFileService::new();
        let mut fm = mounted(svc.clone());
        fm.open_modal(Modal::ShareWithUsers {
            paths: vec!["/a".into()],
        });
        svc.clear_calls();
        block_on(fm.share_completed());
        assert!(fm.modal().active().is_none());
        assert_eq!(svc.call_count(ServiceOp::Browse), 1);
    }
}
