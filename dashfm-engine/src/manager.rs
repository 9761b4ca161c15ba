use crate::clipboard::{Clipboard, ClipboardOp};
use crate::config::FileManagerConfig;
use crate::context_menu::{PopupId, PopupRegistry};
use crate::core::{FileManagerError, Item, Modifiers, SortBy, View};
use crate::drag_drop::DragState;
use crate::listing::{FetchOutcome, FetchTicket, ListingStore, read_view};
use crate::modal::{Modal, ModalCoordinator};
use crate::paths;
use crate::selection::{ClickKind, Selection};
use crate::service::{Confirmer, FileService, Notice, Notifier, ServiceError};

#[cfg(feature = "tracing")]
use tracing::trace;

/// Message shown when a directory is opened in a shared view.
pub const SHARED_SUBFOLDER_MESSAGE: &str =
    "Cannot browse subfolders directly in this view. Please download or view the item.";

/// File-manager engine for one mounted screen.
///
/// Owns the listing, selection, clipboard, drag state, context-menu popups and
/// modal of the screen, and drives the [`FileService`] for every gesture.
/// All methods run on the host's UI task; async methods borrow the engine
/// mutably until the service answers.
///
/// ```
/// use dashfm_engine::{FileManager, MemoryFileService, Modifiers, Notice, ConfirmRequest};
///
/// let svc = MemoryFileService::new().with_file("/a.txt", "a").with_file("/b.txt", "b");
/// let mut fm = FileManager::new(svc, |_: Notice| {}, |_: &ConfirmRequest| true);
/// pollster::block_on(fm.mount());
///
/// let a = fm.visible_items()[0].clone();
/// fm.click(&a, Modifiers::NONE);
/// assert_eq!(fm.selection().len(), 1);
/// ```
pub struct FileManager<S> {
    pub(crate) service: S,
    pub(crate) notifier: Box<dyn Notifier>,
    pub(crate) confirmer: Box<dyn Confirmer>,
    pub(crate) config: FileManagerConfig,
    pub(crate) listing: ListingStore,
    pub(crate) selection: Selection,
    pub(crate) clipboard: Clipboard,
    pub(crate) drag: DragState,
    pub(crate) popups: PopupRegistry,
    pub(crate) item_menu: PopupId,
    pub(crate) empty_menu: PopupId,
    pub(crate) modal: ModalCoordinator,
}

impl<S: FileService> FileManager<S> {
    /// Create an engine with the default configuration.
    pub fn new(
        service: S,
        notifier: impl Notifier + 'static,
        confirmer: impl Confirmer + 'static,
    ) -> Self {
        Self::with_config(service, notifier, confirmer, FileManagerConfig::default())
    }

    /// Create an engine with an explicit configuration.
    ///
    /// Nothing is fetched until [`mount`](Self::mount).
    pub fn with_config(
        service: S,
        notifier: impl Notifier + 'static,
        confirmer: impl Confirmer + 'static,
        config: FileManagerConfig,
    ) -> Self {
        let mut popups = PopupRegistry::new();
        let item_menu = popups.register();
        let empty_menu = popups.register();
        Self {
            service,
            notifier: Box::new(notifier),
            confirmer: Box::new(confirmer),
            listing: ListingStore::new(config.initial_view.clone()),
            config,
            selection: Selection::new(),
            clipboard: Clipboard::new(),
            drag: DragState::default(),
            popups,
            item_menu,
            empty_menu,
            modal: ModalCoordinator::default(),
        }
    }

    /// File service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Configuration.
    pub fn config(&self) -> &FileManagerConfig {
        &self.config
    }

    /// Active view.
    pub fn view(&self) -> &View {
        self.listing.view()
    }

    /// Directory shown, in browse views.
    pub fn current_path(&self) -> Option<&str> {
        self.listing.view().browse_path()
    }

    /// Listing state.
    pub fn listing(&self) -> &ListingStore {
        &self.listing
    }

    /// Items in service order.
    pub fn items(&self) -> &[Item] {
        self.listing.items()
    }

    /// Items after search and sort, in display order.
    pub fn visible_items(&self) -> Vec<&Item> {
        self.listing.visible_items()
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.listing.is_loading()
    }

    /// Message of the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.listing.error()
    }

    /// Selection state.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected items of the listing, in selection order.
    pub fn selected_items(&self) -> Vec<&Item> {
        self.selection
            .selected_items(self.listing.items(), self.listing.view())
    }

    /// Clipboard state.
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Drag-and-drop state.
    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// Load the configured initial view.
    pub async fn mount(&mut self) -> FetchOutcome {
        let view = self.config.initial_view.clone();
        self.navigate(view).await
    }

    /// Switch to `view` and load it.
    ///
    /// The old listing, selection, search, sort, drag state and open menus are
    /// dropped before the request is issued.
    pub async fn navigate(&mut self, view: View) -> FetchOutcome {
        trace_navigate(&view);
        self.listing.set_view(view.clone());
        self.selection.clear();
        self.drag = DragState::default();
        self.popups.close_all();
        self.fetch(view).await
    }

    /// Reload the active view.
    pub async fn refresh(&mut self) -> FetchOutcome {
        let view = self.listing.view().clone();
        self.fetch(view).await
    }

    /// Load `view`, falling back to the root directory when a browse fails.
    ///
    /// The fallback is notified and the root fetched once; the first failure
    /// is returned.
    pub async fn fetch(&mut self, view: View) -> FetchOutcome {
        let outcome = self.fetch_once(view).await;
        if let FetchOutcome::Failed {
            fallback: Some(root),
            ..
        } = &outcome
        {
            let root = root.clone();
            self.fetch_once(root).await;
        }
        outcome
    }

    async fn fetch_once(&mut self, view: View) -> FetchOutcome {
        let ticket = self.begin_fetch(view);
        let result = read_view(&self.service, ticket.view(), self.config.mark_shared_viewed).await;
        self.apply_fetch(ticket, result)
    }

    /// Start a fetch without awaiting it.
    ///
    /// Hosts that overlap requests pair this with [`read_view`] and
    /// [`apply_fetch`](Self::apply_fetch); only the latest ticket applies.
    pub fn begin_fetch(&mut self, view: View) -> FetchTicket {
        self.listing.begin_fetch(view)
    }

    /// Apply the response of a fetch started with [`begin_fetch`](Self::begin_fetch).
    ///
    /// A failed browse that fell back to the root is also notified; the
    /// caller loads the fallback view.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Item>, ServiceError>,
    ) -> FetchOutcome {
        let outcome = self
            .listing
            .finish_fetch(ticket, result, &self.config.root_path);
        match &outcome {
            FetchOutcome::Applied => self.selection.clear(),
            FetchOutcome::Failed {
                message,
                fallback: Some(_),
            } => {
                self.selection.clear();
                self.notifier.notify(Notice::error(message.clone()));
            }
            FetchOutcome::Failed { fallback: None, .. } | FetchOutcome::Stale => {}
        }
        outcome
    }

    /// Browse the parent directory; `None` at the root or outside browse views.
    pub async fn go_up(&mut self) -> Option<FetchOutcome> {
        let path = self.current_path()?;
        if path == self.config.root_path {
            return None;
        }
        let parent = paths::parent(path);
        Some(self.navigate(View::Browse(parent)).await)
    }

    /// Open an item (double-click).
    ///
    /// Directories are entered in browse views and refused in shared views;
    /// files open the file viewer outside the trash.
    pub async fn open_item(&mut self, item: &Item) -> Option<FetchOutcome> {
        let view = self.listing.view();
        if item.is_dir() {
            if view.is_shared() {
                self.notifier.notify(Notice::error(SHARED_SUBFOLDER_MESSAGE));
                return None;
            }
            if !view.is_browsable() || item.path.is_empty() {
                return None;
            }
            return Some(self.navigate(View::Browse(item.path.clone())).await);
        }
        if *view != View::Trash {
            self.open_modal(Modal::ViewFile { item: item.clone() });
        }
        None
    }

    /// Set the search term.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.listing.set_search(term);
    }

    /// Sort by `column`, flipping the direction if it is already active.
    pub fn toggle_sort(&mut self, column: SortBy) {
        self.listing.toggle_sort(column);
    }

    /// Apply a click on `item`.
    ///
    /// Shift ranges follow the visible order. A plain click also abandons any
    /// pending copy/cut. Items that are not in the listing are ignored.
    pub fn click(&mut self, item: &Item, modifiers: Modifiers) -> Option<ClickKind> {
        if !self.listing.contains(item) {
            return None;
        }
        let order = self.listing.visible_items();
        let kind = self
            .selection
            .click(item, modifiers, self.listing.view(), &order)?;
        if kind == ClickKind::Single {
            self.clipboard.clear();
        }
        Some(kind)
    }

    /// Select every visible item.
    pub fn select_all(&mut self) {
        let order = self.listing.visible_items();
        self.selection.select_all(order, self.listing.view());
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Put the selected items' paths on the clipboard for copying.
    pub fn copy(&mut self) -> Result<usize, FileManagerError> {
        self.capture(ClipboardOp::Copy)
    }

    /// Put the selected items' paths on the clipboard for moving.
    pub fn cut(&mut self) -> Result<usize, FileManagerError> {
        self.capture(ClipboardOp::Cut)
    }

    fn capture(&mut self, op: ClipboardOp) -> Result<usize, FileManagerError> {
        if !self.listing.view().is_browsable() {
            return Err(FileManagerError::not_allowed(self.listing.view()));
        }
        let paths: Vec<String> = self
            .selected_items()
            .into_iter()
            .map(|item| item.path.clone())
            .collect();
        let count = paths.len();
        self.clipboard.set(op, paths);
        if count > 0 {
            let verb = match op {
                ClipboardOp::Copy => "copied",
                ClipboardOp::Cut => "cut",
            };
            self.notifier
                .notify(Notice::success(format!("{count} item(s) {verb}.")));
        }
        Ok(count)
    }

    /// Newline-separated paths of the selected items, for the system clipboard.
    ///
    /// Shared views prefix each path with the other party's name
    /// (`sharer:path` / `recipient:path`). `None` in the trash or with nothing
    /// selected.
    pub fn copy_paths_text(&self) -> Option<String> {
        let view = self.listing.view();
        if *view == View::Trash {
            return None;
        }
        let lines: Vec<String> = self
            .selected_items()
            .into_iter()
            .map(|item| match view {
                View::SharedWithMe => {
                    format!("{}:{}", item.sharer_name.as_deref().unwrap_or_default(), item.path)
                }
                View::MyShares => format!(
                    "{}:{}",
                    item.recipient_name.as_deref().unwrap_or_default(),
                    item.path
                ),
                _ => item.path.clone(),
            })
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

#[cfg(feature = "tracing")]
fn trace_navigate(view: &View) {
    trace!(event = "manager.navigate", view = %view, "navigate");
}

#[cfg(not(feature = "tracing"))]
fn trace_navigate(_view: &View) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ItemId;
    use crate::memory::MemoryFileService;
    use crate::service::ConfirmRequest;
    use pollster::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn manager(svc: MemoryFileService) -> (FileManager<MemoryFileService>, Rc<RefCell<Vec<Notice>>>) {
        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        let fm = FileManager::new(
            svc,
            move |n: Notice| sink.borrow_mut().push(n),
            |_: &ConfirmRequest| true,
        );
        (fm, notices)
    }

    #[test]
    fn plain_click_clears_clipboard_but_ctrl_click_keeps_it() {
        let svc = MemoryFileService::new()
            .with_file("/a.txt", "a")
            .with_file("/b.txt", "b");
        let (mut fm, _) = manager(svc);
        block_on(fm.mount());
        let a = fm.visible_items()[0].clone();
        let b = fm.visible_items()[1].clone();

        fm.click(&a, Modifiers::NONE);
        fm.copy().unwrap();
        fm.click(&b, Modifiers::CTRL);
        assert_eq!(fm.clipboard().copied(), ["/a.txt".to_owned()]);

        fm.click(&b, Modifiers::NONE);
        assert!(fm.clipboard().is_empty());
    }

    #[test]
    fn click_on_unlisted_item_is_ignored() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let (mut fm, _) = manager(svc);
        block_on(fm.mount());
        let a = fm.visible_items()[0].clone();
        fm.click(&a, Modifiers::NONE);

        let gone = Item::file("/gone.txt");
        assert_eq!(fm.click(&gone, Modifiers::CTRL), None);
        assert_eq!(fm.click(&gone, Modifiers::NONE), None);
        assert_eq!(fm.selection().to_vec(), vec![ItemId::from("/a.txt")]);
    }

    #[test]
    fn go_up_stops_at_root() {
        let svc = MemoryFileService::new().with_dir("/docs/deep");
        let (mut fm, _) = manager(svc);
        block_on(fm.navigate(View::Browse("/docs/deep".into())));
        block_on(fm.go_up());
        assert_eq!(fm.current_path(), Some("/docs"));
        block_on(fm.go_up());
        assert_eq!(fm.current_path(), Some("/"));
        assert_eq!(block_on(fm.go_up()), None);
    }

    #[test]
    fn opening_a_folder_in_shared_view_is_refused() {
        let svc = MemoryFileService::new();
        svc.add_shared_with_me(Item::dir("/photos").with_share_id(3), Vec::new());
        let (mut fm, notices) = manager(svc);
        block_on(fm.navigate(View::SharedWithMe));
        let dir = fm.items()[0].clone();
        assert_eq!(block_on(fm.open_item(&dir)), None);
        assert_eq!(fm.view(), &View::SharedWithMe);
        assert_eq!(notices.borrow().last().unwrap().message, SHARED_SUBFOLDER_MESSAGE);
    }

    #[test]
    fn copy_paths_text_prefixes_sharer_in_shared_view() {
        let svc = MemoryFileService::new();
        let mut item = Item::file("/r.pdf").with_share_id(9);
        item.sharer_name = Some("alice".into());
        svc.add_shared_with_me(item, Vec::new());
        let (mut fm, _) = manager(svc);
        block_on(fm.navigate(View::SharedWithMe));
        fm.select_all();
        assert_eq!(fm.copy_paths_text().as_deref(), Some("alice:/r.pdf"));
    }

    #[test]
    fn shared_with_me_fetch_marks_list_viewed() {
        let svc = MemoryFileService::new();
        let (mut fm, _) = manager(svc.clone());
        block_on(fm.navigate(View::SharedWithMe));
        assert_eq!(svc.last_viewed_updates(), 1);
    }
}
