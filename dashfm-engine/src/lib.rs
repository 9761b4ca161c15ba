#![deny(missing_docs)]
//! Headless file-manager engine for the dashboard's file screen.
//!
//! The engine tracks the listing of one of four views (directory browse,
//! trash, shared-with-me, my-shares), the selection and its shift-click
//! anchor, a copy/cut clipboard, drag-and-drop gestures, the context menus and
//! the open modal. Every mutation goes through a [`FileService`] and is
//! reported through a [`Notifier`]; destructive ones are gated by a
//! [`Confirmer`].
//!
//! Items are keyed differently per view (path, trashed name or share id); see
//! [`identify`].
//!
//! [`MemoryFileService`] is an in-memory service for hosts without a backend
//! and for tests.

mod clipboard;
mod config;
mod context_menu;
mod core;
mod drag_drop;
mod identity;
mod listing;
mod manager;
mod memory;
mod modal;
pub mod paths;
mod selection;
mod service;
mod transfer;

pub use clipboard::{Clipboard, ClipboardOp, FileClipboard};
pub use config::FileManagerConfig;
pub use context_menu::{ActionOutcome, MenuAction, MenuPosition, PopupId, PopupRegistry};
pub use core::{
    FileManagerError, Item, ItemId, ItemKind, MY_SHARES_ROUTE, Modifiers, ROOT_PATH,
    SHARED_WITH_ME_ROUTE, SortBy, TRASH_ROUTE, View,
};
pub use drag_drop::{DRAG_PAYLOAD_MIME, DragPayload, DragState, DropOutcome};
pub use identity::{IdentityKey, identify};
pub use listing::{FETCH_FAILED_MESSAGE, FetchOutcome, FetchTicket, ListingStore, read_view};
pub use manager::{FileManager, SHARED_SUBFOLDER_MESSAGE};
pub use memory::{MemoryFileService, ServiceCall, ServiceOp};
pub use modal::{DESTINATION_EMPTY_MESSAGE, Modal, ModalCoordinator, NAME_EMPTY_MESSAGE};
pub use selection::{ClickKind, Selection};
pub use service::{
    ConfirmKind, ConfirmRequest, Confirmer, FileService, Notice, NoticeLevel, Notifier,
    ServiceError, UploadFile,
};
