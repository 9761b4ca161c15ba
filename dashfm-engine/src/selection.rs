use indexmap::IndexSet;

use crate::core::{Item, ItemId, Modifiers, View};
use crate::identity::{find_by_id, identify};

/// How a click changed the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickKind {
    /// Selection replaced by the clicked item (plain click or shift fallback).
    Single,
    /// Clicked item toggled in or out (ctrl).
    Toggle,
    /// Contiguous range from the anchor selected (shift, ctrl+shift).
    Range,
}

/// Selected item identifiers plus the shift-click anchor.
///
/// Identifiers are the ones produced by [`identify`] for the view the items
/// were listed in; insertion order is kept.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    ids: IndexSet<ItemId>,
    anchor: Option<Item>,
}

impl Selection {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected identifiers in selection order.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = &ItemId> {
        self.ids.iter()
    }

    /// Selected identifiers as an owned vector.
    pub fn to_vec(&self) -> Vec<ItemId> {
        self.ids.iter().cloned().collect()
    }

    /// Shift-click pivot.
    pub fn anchor(&self) -> Option<&Item> {
        self.anchor.as_ref()
    }

    /// Number of selected items.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is selected.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    /// Whether `item` is selected in `view`.
    pub fn contains_item(&self, item: &Item, view: &View) -> bool {
        identify(item, view).is_some_and(|id| self.ids.contains(&id))
    }

    /// Drop the selection and the anchor.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.anchor = None;
    }

    /// Select exactly `item` and make it the anchor.
    ///
    /// Returns `false` (leaving the selection untouched) when the item has no
    /// identity in `view`.
    pub fn select_only(&mut self, item: &Item, view: &View) -> bool {
        let Some(id) = identify(item, view) else {
            return false;
        };
        self.ids.clear();
        self.ids.insert(id);
        self.anchor = Some(item.clone());
        true
    }

    /// Select every item of `order` that has an identity.
    pub fn select_all<'a, I>(&mut self, order: I, view: &View)
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let key = view.identity_key();
        self.ids = order.into_iter().filter_map(|item| key.extract(item)).collect();
    }

    /// Apply a click on `item`.
    ///
    /// `order` is the listing order shift ranges are computed over. Returns
    /// `None` when the item cannot be identified in `view`.
    pub fn click(
        &mut self,
        item: &Item,
        modifiers: Modifiers,
        view: &View,
        order: &[&Item],
    ) -> Option<ClickKind> {
        let id = identify(item, view)?;

        if modifiers.shift {
            if let Some(range) = self.anchor_range(&id, view, order) {
                if !modifiers.ctrl {
                    self.ids.clear();
                }
                self.ids.extend(range);
                return Some(ClickKind::Range);
            }
            self.select_only(item, view);
            return Some(ClickKind::Single);
        }

        if modifiers.ctrl {
            toggle_select_id(&mut self.ids, id);
            self.anchor = Some(item.clone());
            return Some(ClickKind::Toggle);
        }

        self.select_only(item, view);
        Some(ClickKind::Single)
    }

    fn anchor_range(&self, target: &ItemId, view: &View, order: &[&Item]) -> Option<Vec<ItemId>> {
        let anchor = identify(self.anchor.as_ref()?, view)?;
        let key = view.identity_key();
        let ids: Vec<Option<ItemId>> = order.iter().map(|item| key.extract(item)).collect();
        select_range_by_id(&ids, &anchor, target)
    }

    /// Selected items, resolved against `items` in selection order.
    pub fn selected_items<'a>(&self, items: &'a [Item], view: &View) -> Vec<&'a Item> {
        self.ids
            .iter()
            .filter_map(|id| find_by_id(items, view, id))
            .collect()
    }
}

fn toggle_select_id(list: &mut IndexSet<ItemId>, id: ItemId) {
    if !list.shift_remove(&id) {
        list.insert(id);
    }
}

fn select_range_by_id(
    view_ids: &[Option<ItemId>],
    anchor: &ItemId,
    target: &ItemId,
) -> Option<Vec<ItemId>> {
    let ia = view_ids.iter().position(|id| id.as_ref() == Some(anchor))?;
    let it = view_ids.iter().position(|id| id.as_ref() == Some(target))?;
    let (lo, hi) = if ia <= it { (ia, it) } else { (it, ia) };
    Some(view_ids[lo..=hi].iter().flatten().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> Vec<Item> {
        ["/a.txt", "/b.txt", "/c.txt", "/d.txt"]
            .into_iter()
            .map(Item::file)
            .collect()
    }

    fn ids(sel: &Selection) -> Vec<&str> {
        sel.ids().map(ItemId::as_str).collect()
    }

    #[test]
    fn shift_click_selects_inclusive_range() {
        let items = abcd();
        let order: Vec<&Item> = items.iter().collect();
        let view = View::root();
        let mut sel = Selection::new();

        sel.click(&items[2], Modifiers::NONE, &view, &order);
        assert_eq!(
            sel.click(&items[0], Modifiers::SHIFT, &view, &order),
            Some(ClickKind::Range)
        );
        assert_eq!(ids(&sel), vec!["/a.txt", "/b.txt", "/c.txt"]);
        assert_eq!(sel.anchor().map(|a| a.path.as_str()), Some("/c.txt"));
    }

    #[test]
    fn ctrl_shift_unions_range_into_selection() {
        let items = abcd();
        let order: Vec<&Item> = items.iter().collect();
        let view = View::root();
        let mut sel = Selection::new();

        sel.click(&items[3], Modifiers::NONE, &view, &order);
        sel.click(&items[0], Modifiers::CTRL, &view, &order);
        let both = Modifiers {
            ctrl: true,
            shift: true,
        };
        sel.click(&items[1], both, &view, &order);
        assert_eq!(ids(&sel), vec!["/d.txt", "/a.txt", "/b.txt"]);
    }

    #[test]
    fn ctrl_click_toggles_only_the_clicked_item() {
        let items = abcd();
        let order: Vec<&Item> = items.iter().collect();
        let view = View::root();
        let mut sel = Selection::new();

        sel.click(&items[0], Modifiers::NONE, &view, &order);
        sel.click(&items[1], Modifiers::CTRL, &view, &order);
        sel.click(&items[2], Modifiers::CTRL, &view, &order);
        sel.click(&items[1], Modifiers::CTRL, &view, &order);
        assert_eq!(ids(&sel), vec!["/a.txt", "/c.txt"]);
        assert_eq!(sel.anchor().map(|a| a.path.as_str()), Some("/b.txt"));
    }

    #[test]
    fn shift_without_anchor_acts_as_plain_click() {
        let items = abcd();
        let order: Vec<&Item> = items.iter().collect();
        let mut sel = Selection::new();
        assert_eq!(
            sel.click(&items[1], Modifiers::SHIFT, &View::root(), &order),
            Some(ClickKind::Single)
        );
        assert_eq!(ids(&sel), vec!["/b.txt"]);
    }

    #[test]
    fn vanished_anchor_falls_back_to_plain_click() {
        let items = abcd();
        let view = View::root();
        let mut sel = Selection::new();
        let full: Vec<&Item> = items.iter().collect();
        sel.click(&items[0], Modifiers::NONE, &view, &full);

        let without_anchor: Vec<&Item> = items[1..].iter().collect();
        sel.click(&items[3], Modifiers::SHIFT, &view, &without_anchor);
        assert_eq!(ids(&sel), vec!["/d.txt"]);
        assert_eq!(sel.anchor().map(|a| a.path.as_str()), Some("/d.txt"));
    }

    #[test]
    fn trash_selection_uses_trashed_names() {
        let items = vec![
            Item::file("/a.txt").with_trashed_name("a.txt.1"),
            Item::file("/a.txt").with_trashed_name("a.txt.2"),
        ];
        let order: Vec<&Item> = items.iter().collect();
        let mut sel = Selection::new();
        sel.click(&items[0], Modifiers::NONE, &View::Trash, &order);
        sel.click(&items[1], Modifiers::SHIFT, &View::Trash, &order);
        assert_eq!(ids(&sel), vec!["a.txt.1", "a.txt.2"]);
        assert_eq!(sel.selected_items(&items, &View::Trash).len(), 2);
    }

    #[test]
    fn items_without_identity_cannot_be_selected() {
        let item = Item::file("/a.txt");
        let mut sel = Selection::new();
        assert_eq!(
            sel.click(&item, Modifiers::NONE, &View::SharedWithMe, &[&item]),
            None
        );
        assert!(sel.is_empty());
    }
}
