use indexmap::IndexMap;

use crate::core::{FileManagerError, Item, ItemKind, View};
use crate::manager::FileManager;
use crate::modal::Modal;
use crate::service::FileService;

/// Opaque identifier of a popup registered in a [`PopupRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PopupId(u64);

/// Screen position a context menu opens at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MenuPosition {
    /// Horizontal offset.
    pub x: f32,
    /// Vertical offset.
    pub y: f32,
}

impl MenuPosition {
    /// Position at `(x, y)`.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Registry of mutually exclusive popups.
///
/// Popups register when they mount and unregister when they unmount. At most
/// one is open at a time; opening one closes the rest, and a generic click
/// closes all of them unless that click opened a menu itself.
#[derive(Debug, Default)]
pub struct PopupRegistry {
    next_id: u64,
    popups: IndexMap<PopupId, Option<MenuPosition>>,
}

impl PopupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closed popup.
    pub fn register(&mut self) -> PopupId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = PopupId(self.next_id);
        self.popups.insert(id, None);
        id
    }

    /// Forget a popup. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: PopupId) -> bool {
        self.popups.shift_remove(&id).is_some()
    }

    /// Returns `true` if the popup is registered.
    pub fn contains(&self, id: PopupId) -> bool {
        self.popups.contains_key(&id)
    }

    /// Open `id` at `position`, closing every other popup.
    ///
    /// Returns `false` for unregistered popups.
    pub fn open(&mut self, id: PopupId, position: MenuPosition) -> bool {
        if !self.popups.contains_key(&id) {
            return false;
        }
        for (other, state) in self.popups.iter_mut() {
            *state = (*other == id).then_some(position);
        }
        true
    }

    /// Close one popup.
    pub fn close(&mut self, id: PopupId) {
        if let Some(state) = self.popups.get_mut(&id) {
            *state = None;
        }
    }

    /// Close every popup.
    pub fn close_all(&mut self) {
        for state in self.popups.values_mut() {
            *state = None;
        }
    }

    /// Position of `id` when open.
    pub fn position(&self, id: PopupId) -> Option<MenuPosition> {
        self.popups.get(&id).copied().flatten()
    }

    /// Returns `true` if `id` is open.
    pub fn is_open(&self, id: PopupId) -> bool {
        self.position(id).is_some()
    }

    /// The open popup, if any.
    pub fn open_popup(&self) -> Option<PopupId> {
        self.popups
            .iter()
            .find_map(|(id, state)| state.map(|_| *id))
    }

    /// Handle a generic click anywhere on screen.
    ///
    /// `consumed` is set when the same event already opened a menu; such
    /// clicks leave the popups alone. Returns `true` if popups were closed.
    pub fn dismiss_on_click(&mut self, consumed: bool) -> bool {
        if consumed || self.open_popup().is_none() {
            return false;
        }
        self.close_all();
        true
    }
}

/// Entries of the item and empty-space context menus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MenuAction {
    /// Open the file viewer.
    View,
    /// Download a shared-with-me file.
    DownloadShared,
    /// Create a public share link.
    SharePublic,
    /// Share with other users.
    ShareWithUsers,
    /// Copy to the clipboard.
    Copy,
    /// Cut to the clipboard.
    Cut,
    /// Move via the destination dialog.
    Move,
    /// Copy path text to the system clipboard.
    CopyPath,
    /// Rename via the rename dialog.
    Rename,
    /// Move to trash, or drop share records in shared views.
    Delete,
    /// Restore from the trash.
    Restore,
    /// Delete trash entries for good.
    DeletePermanently,
    /// Paste the clipboard into the current directory.
    Paste,
    /// Create a file via the create dialog.
    CreateFile,
    /// Create a folder via the create dialog.
    CreateFolder,
}

impl MenuAction {
    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::DownloadShared => "Download",
            Self::SharePublic => "Share Link",
            Self::ShareWithUsers => "Share with Users",
            Self::Copy => "Copy",
            Self::Cut => "Cut",
            Self::Move => "Move to...",
            Self::CopyPath => "Copy Path(s)",
            Self::Rename => "Rename",
            Self::Delete => "Delete",
            Self::Restore => "Restore",
            Self::DeletePermanently => "Delete Permanently",
            Self::Paste => "Paste",
            Self::CreateFile => "New File",
            Self::CreateFolder => "New Folder",
        }
    }
}

/// What the host still has to do after a menu action ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Nothing; state and notifications were handled by the engine.
    Done,
    /// Write this text to the system clipboard.
    CopyText(String),
    /// Save these bytes under `name`.
    Download {
        /// Suggested file name.
        name: String,
        /// File contents.
        data: Vec<u8>,
    },
}

impl<S: FileService> FileManager<S> {
    /// Popup registry shared with the host's other popups.
    pub fn popups(&self) -> &PopupRegistry {
        &self.popups
    }

    /// Mutable popup registry, for host popups to register themselves.
    pub fn popups_mut(&mut self) -> &mut PopupRegistry {
        &mut self.popups
    }

    /// Position of the item menu when open.
    pub fn item_menu(&self) -> Option<MenuPosition> {
        self.popups.position(self.item_menu)
    }

    /// Position of the empty-space menu when open.
    pub fn empty_space_menu(&self) -> Option<MenuPosition> {
        self.popups.position(self.empty_menu)
    }

    /// Right-click on `item`.
    ///
    /// An item outside the selection becomes the only selected item first; an
    /// item inside it keeps the selection.
    pub fn open_item_menu(&mut self, item: &Item, position: MenuPosition) -> bool {
        if !self.listing.contains(item) {
            return false;
        }
        let view = self.listing.view();
        if !self.selection.contains_item(item, view) {
            let view = view.clone();
            if !self.selection.select_only(item, &view) {
                return false;
            }
        }
        self.popups.open(self.item_menu, position)
    }

    /// Right-click on blank canvas.
    ///
    /// Always closes the other menu and clears the selection; the menu itself
    /// only opens in browse views.
    pub fn open_empty_space_menu(&mut self, position: MenuPosition) -> bool {
        self.popups.close_all();
        self.selection.clear();
        if !self.listing.view().is_browsable() {
            return false;
        }
        self.popups.open(self.empty_menu, position)
    }

    /// Close every popup.
    pub fn close_menus(&mut self) {
        self.popups.close_all();
    }

    /// Generic click anywhere; see [`PopupRegistry::dismiss_on_click`].
    pub fn handle_click(&mut self, consumed: bool) -> bool {
        self.popups.dismiss_on_click(consumed)
    }

    /// Actions offered by the item menu for the current selection.
    pub fn item_menu_actions(&self) -> Vec<MenuAction> {
        let view = self.listing.view();
        let selected = self.selected_items();
        let mut actions = Vec::new();
        if selected.is_empty() {
            return actions;
        }
        if *view == View::Trash {
            actions.extend([MenuAction::Restore, MenuAction::DeletePermanently]);
            return actions;
        }

        let single = match selected.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        let single_file = single.filter(|item| !item.is_dir());
        let browsable = view.is_browsable();

        if single_file.is_some() {
            actions.push(MenuAction::View);
            if *view == View::SharedWithMe {
                actions.push(MenuAction::DownloadShared);
            }
        }
        if browsable {
            actions.extend([
                MenuAction::SharePublic,
                MenuAction::ShareWithUsers,
                MenuAction::Copy,
                MenuAction::Cut,
                MenuAction::Move,
            ]);
        }
        actions.push(MenuAction::CopyPath);
        if browsable && single.is_some() {
            actions.push(MenuAction::Rename);
        }
        actions.push(MenuAction::Delete);
        if self.can_paste() {
            actions.push(MenuAction::Paste);
        }
        actions
    }

    /// Actions offered by the empty-space menu.
    pub fn empty_space_menu_actions(&self) -> Vec<MenuAction> {
        if !self.listing.view().is_browsable() {
            return Vec::new();
        }
        let mut actions = vec![MenuAction::CreateFile, MenuAction::CreateFolder];
        if self.can_paste() {
            actions.push(MenuAction::Paste);
        }
        actions
    }

    /// Whether a paste would reach the service.
    pub fn can_paste(&self) -> bool {
        !self.clipboard.is_empty() && self.listing.view().is_browsable()
    }

    /// Run a menu action and close the menus.
    ///
    /// Actions not currently offered by either menu are refused.
    pub async fn run_menu_action(
        &mut self,
        action: MenuAction,
    ) -> Result<ActionOutcome, FileManagerError> {
        let offered = self.item_menu_actions().contains(&action)
            || self.empty_space_menu_actions().contains(&action);
        if !offered {
            return Err(FileManagerError::not_allowed(self.listing.view()));
        }
        self.popups.close_all();

        let single = match self.selected_items().as_slice() {
            [only] => Some((*only).clone()),
            _ => None,
        };
        let paths: Vec<String> = self
            .selected_items()
            .into_iter()
            .map(|item| item.path.clone())
            .collect();

        match action {
            MenuAction::View => {
                if let Some(item) = single {
                    self.open_modal(Modal::ViewFile { item });
                }
            }
            MenuAction::Rename => {
                if let Some(item) = single {
                    self.open_modal(Modal::Rename { item });
                }
            }
            MenuAction::DownloadShared => {
                if let Some(item) = single {
                    let data = self.download_shared(&item).await?;
                    return Ok(ActionOutcome::Download {
                        name: item.name,
                        data,
                    });
                }
            }
            MenuAction::SharePublic => self.open_modal(Modal::SharePublic { paths }),
            MenuAction::ShareWithUsers => self.open_modal(Modal::ShareWithUsers { paths }),
            MenuAction::Move => self.open_modal(Modal::Move { paths }),
            MenuAction::Copy => {
                self.copy()?;
            }
            MenuAction::Cut => {
                self.cut()?;
            }
            MenuAction::CopyPath => {
                if let Some(text) = self.copy_paths_text() {
                    return Ok(ActionOutcome::CopyText(text));
                }
            }
            MenuAction::Delete | MenuAction::DeletePermanently => self.delete_selected().await?,
            MenuAction::Restore => self.restore_selected().await?,
            MenuAction::Paste => self.paste(None).await?,
            MenuAction::CreateFile => self.open_modal(Modal::Create {
                kind: ItemKind::File,
            }),
            MenuAction::CreateFolder => self.open_modal(Modal::Create {
                kind: ItemKind::Dir,
            }),
        }
        Ok(ActionOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Modifiers;
    use crate::memory::MemoryFileService;
    use crate::service::{ConfirmRequest, Notice};
    use pollster::block_on;

    fn mounted(svc: MemoryFileService) -> FileManager<MemoryFileService> {
        let mut fm = FileManager::new(svc, |_: Notice| {}, |_: &ConfirmRequest| true);
        block_on(fm.mount());
        fm
    }

    #[test]
    fn registry_keeps_one_popup_open() {
        let mut reg = PopupRegistry::new();
        let a = reg.register();
        let b = reg.register();
        assert!(reg.open(a, MenuPosition::new(1.0, 2.0)));
        assert!(reg.open(b, MenuPosition::default()));
        assert!(!reg.is_open(a));
        assert_eq!(reg.open_popup(), Some(b));

        assert!(!reg.dismiss_on_click(true));
        assert!(reg.is_open(b));
        assert!(reg.dismiss_on_click(false));
        assert_eq!(reg.open_popup(), None);

        assert!(reg.unregister(a));
        assert!(!reg.open(a, MenuPosition::default()));
    }

    #[test]
    fn right_click_outside_selection_collapses_it() {
        let svc = MemoryFileService::new()
            .with_file("/a.txt", "a")
            .with_file("/b.txt", "b")
            .with_file("/c.txt", "c");
        let mut fm = mounted(svc);
        let items: Vec<Item> = fm.visible_items().into_iter().cloned().collect();
        fm.click(&items[0], Modifiers::NONE);
        fm.click(&items[1], Modifiers::CTRL);

        fm.open_item_menu(&items[1], MenuPosition::default());
        assert_eq!(fm.selection().len(), 2);

        fm.open_item_menu(&items[2], MenuPosition::default());
        assert_eq!(fm.selection().len(), 1);
        assert_eq!(
            fm.selection().anchor().map(|a| a.path.as_str()),
            Some("/c.txt")
        );
    }

    #[test]
    fn empty_space_menu_is_suppressed_outside_browse() {
        let mut fm = mounted(MemoryFileService::new());
        block_on(fm.navigate(View::Trash));
        assert!(!fm.open_empty_space_menu(MenuPosition::default()));
        assert!(fm.empty_space_menu_actions().is_empty());
    }

    #[test]
    fn empty_space_right_click_in_trash_still_closes_item_menu() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let mut fm = mounted(svc);
        fm.select_all();
        block_on(fm.delete_selected()).unwrap();
        block_on(fm.navigate(View::Trash));
        let trashed = fm.items()[0].clone();
        assert!(fm.open_item_menu(&trashed, MenuPosition::new(3.0, 4.0)));
        assert_eq!(fm.selection().len(), 1);

        assert!(!fm.open_empty_space_menu(MenuPosition::default()));
        assert!(fm.item_menu().is_none());
        assert!(fm.empty_space_menu().is_none());
        assert!(fm.selection().is_empty());
    }

    #[test]
    fn trash_menu_offers_restore_and_permanent_delete() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let mut fm = mounted(svc);
        fm.select_all();
        block_on(fm.delete_selected()).unwrap();
        block_on(fm.navigate(View::Trash));
        fm.select_all();
        assert_eq!(
            fm.item_menu_actions(),
            vec![MenuAction::Restore, MenuAction::DeletePermanently]
        );
    }

    #[test]
    fn single_file_menu_in_browse_view() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let mut fm = mounted(svc);
        fm.select_all();
        let actions = fm.item_menu_actions();
        assert!(actions.contains(&MenuAction::View));
        assert!(actions.contains(&MenuAction::Rename));
        assert!(!actions.contains(&MenuAction::DownloadShared));
        assert!(!actions.contains(&MenuAction::Paste));

        fm.copy().unwrap();
        assert!(fm.item_menu_actions().contains(&MenuAction::Paste));
    }

    #[test]
    fn shared_with_me_menu_offers_download_but_no_rename() {
        let svc = MemoryFileService::new();
        svc.add_shared_with_me(Item::file("/r.pdf").with_share_id(1), "x");
        let mut fm = mounted(svc);
        block_on(fm.navigate(View::SharedWithMe));
        fm.select_all();
        let actions = fm.item_menu_actions();
        assert!(actions.contains(&MenuAction::DownloadShared));
        assert!(actions.contains(&MenuAction::CopyPath));
        assert!(!actions.contains(&MenuAction::Rename));
        assert!(!actions.contains(&MenuAction::Copy));
        assert!(!actions.contains(&MenuAction::SharePublic));
    }

    #[test]
    fn unavailable_action_is_refused() {
        let mut fm = mounted(MemoryFileService::new());
        let err = block_on(fm.run_menu_action(MenuAction::Rename)).unwrap_err();
        assert!(matches!(err, FileManagerError::NotAllowedInView(_)));
    }

    #[test]
    fn running_an_action_closes_menus() {
        let svc = MemoryFileService::new().with_file("/a.txt", "a");
        let mut fm = mounted(svc);
        let a = fm.items()[0].clone();
        fm.open_item_menu(&a, MenuPosition::default());
        let out = block_on(fm.run_menu_action(MenuAction::CopyPath)).unwrap();
        assert_eq!(out, ActionOutcome::CopyText("/a.txt".into()));
        assert!(fm.item_menu().is_none());
    }
}
