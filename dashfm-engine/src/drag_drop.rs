use serde::{Deserialize, Serialize};

use crate::core::{FileManagerError, Item};
use crate::identity::identify;
use crate::manager::FileManager;
use crate::service::{FileService, UploadFile};
use crate::transfer::Bulk;

#[cfg(feature = "tracing")]
use tracing::trace;

/// MIME type the drag payload is attached under.
pub const DRAG_PAYLOAD_MIME: &str = "application/json";

/// Paths carried by an internal item drag.
///
/// Serializes as a plain JSON array of paths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DragPayload {
    /// Source paths, in selection order.
    pub paths: Vec<String>,
}

impl DragPayload {
    /// Payload carrying `paths`.
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    /// Encode for the drag data transfer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the drag data transfer.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether `path` is one of the dragged paths.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Visual state of the current drag gesture.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DragState {
    payload: Option<DragPayload>,
    drop_target: Option<String>,
    dragging_files: bool,
}

impl DragState {
    /// Payload of the internal drag in progress.
    pub fn payload(&self) -> Option<&DragPayload> {
        self.payload.as_ref()
    }

    /// Path of the directory currently hovered as a drop target.
    pub fn drop_target(&self) -> Option<&str> {
        self.drop_target.as_deref()
    }

    /// Whether external files are being dragged over the canvas.
    pub fn is_dragging_files(&self) -> bool {
        self.dragging_files
    }
}

/// What a drop did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// Nothing happened (wrong target, disallowed view, self-drop, no payload).
    Ignored,
    /// Items were moved into the target directory.
    Moved {
        /// Number of moved paths.
        count: usize,
    },
    /// Files were uploaded into the current directory.
    Uploaded {
        /// Number of uploaded files.
        count: usize,
    },
    /// The service refused the transfer; the failure was notified.
    Failed(FileManagerError),
}

impl<S: FileService> FileManager<S> {
    /// Start dragging `item`.
    ///
    /// Only browse views allow dragging. A selected item drags the whole
    /// selection; any other item becomes the only selected one and drags
    /// alone.
    pub fn drag_start(&mut self, item: &Item) -> Option<DragPayload> {
        let view = self.listing.view();
        if !view.is_browsable() {
            trace_drag_rejected(view.as_route());
            return None;
        }
        identify(item, view)?;

        let paths: Vec<String> = if self.selection.contains_item(item, view) {
            self.selected_items()
                .into_iter()
                .map(|i| i.path.clone())
                .collect()
        } else {
            let view = view.clone();
            self.selection.select_only(item, &view);
            vec![item.path.clone()]
        };
        let payload = DragPayload::new(paths);
        self.drag.payload = Some(payload.clone());
        Some(payload)
    }

    /// Hover `item` during a drag; directories become the drop target.
    pub fn drag_over_item(&mut self, item: &Item) -> bool {
        if !item.is_dir() || !self.listing.view().is_browsable() {
            return false;
        }
        self.drag.drop_target = Some(item.path.clone());
        true
    }

    /// Leave `item` during a drag.
    pub fn drag_leave_item(&mut self, item: &Item) {
        if self.drag.drop_target.as_deref() == Some(item.path.as_str()) {
            self.drag.drop_target = None;
        }
    }

    /// Drop an internal drag payload on `target`.
    ///
    /// Only directories in browse views accept drops, and a directory never
    /// accepts itself.
    pub async fn drop_on_item(&mut self, target: &Item, payload: &DragPayload) -> DropOutcome {
        self.drag.drop_target = None;
        if !target.is_dir() || !self.listing.view().is_browsable() || payload.paths.is_empty() {
            return DropOutcome::Ignored;
        }
        if payload.contains(&target.path) {
            trace_self_drop(&target.path);
            return DropOutcome::Ignored;
        }
        let count = payload.paths.len();
        let success = format!("{count} item(s) moved to {}", target.name);
        match self
            .bulk(
                Bulk::Move,
                &payload.paths,
                &target.path,
                success,
                "Failed to move item(s).",
            )
            .await
        {
            Ok(()) => DropOutcome::Moved { count },
            Err(err) => DropOutcome::Failed(err),
        }
    }

    /// Drop raw drag data (see [`DRAG_PAYLOAD_MIME`]) on `target`.
    ///
    /// Data that is not a payload is ignored.
    pub async fn drop_json_on_item(&mut self, target: &Item, json: &str) -> DropOutcome {
        match DragPayload::from_json(json) {
            Ok(payload) => self.drop_on_item(target, &payload).await,
            Err(err) => {
                self.drag.drop_target = None;
                trace_payload_rejected(&err);
                DropOutcome::Ignored
            }
        }
    }

    /// Hover the canvas; external files switch on the upload indicator.
    pub fn drag_over_canvas(&mut self, has_external_files: bool) -> bool {
        if has_external_files && self.listing.view().is_browsable() {
            self.drag.dragging_files = true;
        }
        self.drag.dragging_files
    }

    /// Leave the canvas.
    pub fn drag_leave_canvas(&mut self) {
        self.drag.dragging_files = false;
    }

    /// Drop external files on the canvas, uploading them into the current directory.
    pub async fn drop_on_canvas(&mut self, files: Vec<UploadFile>) -> DropOutcome {
        self.drag.dragging_files = false;
        self.drag.drop_target = None;
        if files.is_empty() || !self.listing.view().is_browsable() {
            return DropOutcome::Ignored;
        }
        let count = files.len();
        match self.upload(files).await {
            Ok(()) => DropOutcome::Uploaded { count },
            Err(err) => DropOutcome::Failed(err),
        }
    }

    /// End the drag gesture, however it concluded.
    pub fn drag_end(&mut self) {
        self.drag = DragState::default();
    }
}

#[cfg(feature = "tracing")]
fn trace_drag_rejected(view: &str) {
    trace!(event = "drag.rejected", view, "drag rejected in view");
}

#[cfg(not(feature = "tracing"))]
fn trace_drag_rejected(_view: &str) {}

#[cfg(feature = "tracing")]
fn trace_self_drop(path: &str) {
    trace!(event = "drag.self_drop", path, "drop on dragged item ignored");
}

#[cfg(not(feature = "tracing"))]
fn trace_self_drop(_path: &str) {}

#[cfg(feature = "tracing")]
fn trace_payload_rejected(err: &serde_json::Error) {
    trace!(event = "drag.bad_payload", error = %err, "drop payload rejected");
}

#[cfg(not(feature = "tracing"))]
fn trace_payload_rejected(_err: &serde_json::Error) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ItemId, Modifiers, View};
    use crate::memory::{MemoryFileService, ServiceOp};
    use crate::service::{ConfirmRequest, Notice};
    use pollster::block_on;

    fn mounted(svc: MemoryFileService) -> FileManager<MemoryFileService> {
        let mut fm = FileManager::new(svc, |_: Notice| {}, |_: &ConfirmRequest| true);
        block_on(fm.mount());
        fm
    }

    fn item(fm: &FileManager<MemoryFileService>, path: &str) -> Item {
        fm.items().iter().find(|i| i.path == path).cloned().unwrap()
    }

    #[test]
    fn payload_is_a_json_array_of_paths() {
        let payload = DragPayload::new(vec!["/a".into(), "/b".into()]);
        assert_eq!(payload.to_json().unwrap(), r#"["/a","/b"]"#);
        assert_eq!(DragPayload::from_json(r#"["/a","/b"]"#).unwrap(), payload);
    }

    #[test]
    fn dragging_selected_item_carries_whole_selection() {
        let svc = MemoryFileService::new()
            .with_file("/a.txt", "a")
            .with_file("/b.txt", "b");
        let mut fm = mounted(svc);
        let (a, b) = (item(&fm, "/a.txt"), item(&fm, "/b.txt"));
        fm.click(&a, Modifiers::NONE);
        fm.click(&b, Modifiers::CTRL);
        let payload = fm.drag_start(&b).unwrap();
        assert_eq!(payload.paths, vec!["/a.txt", "/b.txt"]);
    }

    #[test]
    fn dragging_unselected_item_collapses_selection() {
        let svc = MemoryFileService::new()
            .with_file("/a.txt", "a")
            .with_file("/b.txt", "b");
        let mut fm = mounted(svc);
        let (a, b) = (item(&fm, "/a.txt"), item(&fm, "/b.txt"));
        fm.click(&a, Modifiers::NONE);
        let payload = fm.drag_start(&b).unwrap();
        assert_eq!(payload.paths, vec!["/b.txt"]);
        assert_eq!(fm.selection().to_vec(), vec![ItemId::from("/b.txt")]);
    }

    #[test]
    fn drag_is_rejected_in_trash() {
        let svc = MemoryFileService::new();
        let mut fm = mounted(svc);
        block_on(fm.navigate(View::Trash));
        let trashed = Item::file("/a.txt").with_trashed_name("a.txt.1");
        assert_eq!(fm.drag_start(&trashed), None);
    }

    #[test]
    fn drop_on_directory_moves_and_drag_end_resets() {
        let svc = MemoryFileService::new()
            .with_file("/a.txt", "a")
            .with_dir("/dst");
        let mut fm = mounted(svc.clone());
        let (a, dst) = (item(&fm, "/a.txt"), item(&fm, "/dst"));

        let payload = fm.drag_start(&a).unwrap();
        assert!(fm.drag_over_item(&dst));
        assert_eq!(fm.drag_state().drop_target(), Some("/dst"));
        assert!(!fm.drag_over_item(&a));

        let json = payload.to_json().unwrap();
        assert_eq!(
            block_on(fm.drop_json_on_item(&dst, &json)),
            DropOutcome::Moved { count: 1 }
        );
        assert!(svc.exists("/dst/a.txt"));
        fm.drag_end();
        assert_eq!(fm.drag_state(), &DragState::default());
    }

    #[test]
    fn drop_on_file_or_garbage_is_ignored() {
        let svc = MemoryFileService::new()
            .with_file("/a.txt", "a")
            .with_file("/b.txt", "b");
        let mut fm = mounted(svc.clone());
        let b = item(&fm, "/b.txt");
        let payload = DragPayload::new(vec!["/a.txt".into()]);
        assert_eq!(block_on(fm.drop_on_item(&b, &payload)), DropOutcome::Ignored);
        assert_eq!(
            block_on(fm.drop_json_on_item(&b, "not json")),
            DropOutcome::Ignored
        );
        assert_eq!(svc.call_count(ServiceOp::MoveItems), 0);
    }

    #[test]
    fn canvas_file_drop_uploads_only_in_browse_views() {
        let svc = MemoryFileService::new();
        let mut fm = mounted(svc.clone());
        assert!(fm.drag_over_canvas(true));
        let outcome = block_on(fm.drop_on_canvas(vec![UploadFile::new("x.txt", "x")]));
        assert_eq!(outcome, DropOutcome::Uploaded { count: 1 });
        assert!(!fm.drag_state().is_dragging_files());

        block_on(fm.navigate(View::MyShares));
        assert!(!fm.drag_over_canvas(true));
        let outcome = block_on(fm.drop_on_canvas(vec![UploadFile::new("y.txt", "y")]));
        assert_eq!(outcome, DropOutcome::Ignored);
        assert_eq!(svc.call_count(ServiceOp::UploadFile), 1);
    }
}
