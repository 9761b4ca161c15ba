//! View-dependent item identity.
//!
//! Browse views key items by path, the trash keys them by trashed name, and
//! both shared views key them by share record id. The extractor is chosen once
//! per view through [`View::identity_key`]; every comparison, selection and
//! lookup goes through it.

use crate::core::{Item, ItemId, View};

/// Which item field identifies an item in a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityKey {
    /// `item.path`
    Path,
    /// `item.trashed_name`
    TrashedName,
    /// `item.id`
    ShareId,
}

impl IdentityKey {
    /// Read the identity field from an item.
    ///
    /// Returns `None` when the item lacks the field; such an item cannot be
    /// selected or compared in this view.
    pub fn extract(self, item: &Item) -> Option<ItemId> {
        match self {
            Self::Path => (!item.path.is_empty()).then(|| ItemId::new(item.path.as_str())),
            Self::TrashedName => item
                .trashed_name
                .as_deref()
                .filter(|name| !name.is_empty())
                .map(ItemId::from),
            Self::ShareId => item.id.map(|id| ItemId::new(id.to_string())),
        }
    }
}

impl View {
    /// Identity extractor for items listed in this view.
    pub fn identity_key(&self) -> IdentityKey {
        match self {
            View::Browse(_) => IdentityKey::Path,
            View::Trash => IdentityKey::TrashedName,
            View::SharedWithMe | View::MyShares => IdentityKey::ShareId,
        }
    }
}

/// Identity of `item` in `view`.
pub fn identify(item: &Item, view: &View) -> Option<ItemId> {
    view.identity_key().extract(item)
}

/// Find the item with identity `id` in `items`.
pub(crate) fn find_by_id<'a, I>(items: I, view: &View, id: &ItemId) -> Option<&'a Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    let key = view.identity_key();
    items
        .into_iter()
        .find(|item| key.extract(item).as_ref() == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_items_are_keyed_by_trashed_name() {
        let item = Item::file("/a.txt").with_trashed_name("a.txt.1700000000");
        assert_eq!(
            identify(&item, &View::Trash),
            Some(ItemId::from("a.txt.1700000000"))
        );
        assert_eq!(identify(&item, &View::root()), Some(ItemId::from("/a.txt")));
    }

    #[test]
    fn shared_items_are_keyed_by_share_id() {
        let item = Item::file("/report.pdf").with_share_id(42);
        assert_eq!(identify(&item, &View::SharedWithMe), Some(ItemId::from("42")));
        assert_eq!(identify(&item, &View::MyShares), Some(ItemId::from("42")));
    }

    #[test]
    fn missing_identity_field_yields_none() {
        let mut trashed = Item::file("x").with_trashed_name("");
        trashed.path.clear();
        assert_eq!(identify(&trashed, &View::Trash), None);
        assert_eq!(identify(&trashed, &View::root()), None);
        assert_eq!(identify(&Item::file("/a"), &View::SharedWithMe), None);
    }

    #[test]
    fn find_by_id_uses_the_view_key() {
        let items = vec![
            Item::file("/a").with_share_id(1),
            Item::file("/b").with_share_id(2),
        ];
        let found = find_by_id(&items, &View::MyShares, &ItemId::from("2")).unwrap();
        assert_eq!(found.path, "/b");
        assert!(find_by_id(&items, &View::MyShares, &ItemId::from("/b")).is_none());
    }
}
