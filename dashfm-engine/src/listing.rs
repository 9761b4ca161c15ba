use std::cmp::Ordering;

use crate::core::{Item, SortBy, View};
use crate::identity::{find_by_id, identify};
use crate::service::{FileService, ServiceError};

#[cfg(feature = "tracing")]
use tracing::trace;

/// Message recorded when a fetch fails without a backend message.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to load directory.";

/// Handle for one in-flight fetch, issued by [`ListingStore::begin_fetch`].
///
/// Carries the request sequence number; only the ticket of the latest
/// request can apply its response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    view: View,
}

impl FetchTicket {
    /// Request sequence number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// View being fetched.
    pub fn view(&self) -> &View {
        &self.view
    }
}

/// Result of applying a fetch response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The listing was replaced.
    Applied,
    /// A newer request was issued meanwhile; the response was dropped.
    Stale,
    /// The request failed; the message was recorded.
    Failed {
        /// User-facing error message.
        message: String,
        /// View the store switched to so the user is not left in a dead end.
        fallback: Option<View>,
    },
}

/// Current view contents plus loading/error, search and sort state.
#[derive(Debug)]
pub struct ListingStore {
    view: View,
    items: Vec<Item>,
    loading: bool,
    error: Option<String>,
    search: String,
    sort_by: SortBy,
    sort_ascending: bool,
    generation: u64,
}

impl ListingStore {
    /// Create an empty store showing `view`.
    pub fn new(view: View) -> Self {
        Self {
            view,
            items: Vec::new(),
            loading: false,
            error: None,
            search: String::new(),
            sort_by: SortBy::Name,
            sort_ascending: true,
            generation: 0,
        }
    }

    /// Active view.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Items in service order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Search term applied by [`visible_items`](Self::visible_items).
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Sort column and direction (`true` = ascending).
    pub fn sort(&self) -> (SortBy, bool) {
        (self.sort_by, self.sort_ascending)
    }

    /// Sequence number of the latest issued request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Switch view, discarding the old listing and resetting search/sort.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.items.clear();
        self.error = None;
        self.reset_search_and_sort();
    }

    /// Set the search term.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Sort by `column`; selecting the active column flips its direction.
    pub fn toggle_sort(&mut self, column: SortBy) {
        if self.sort_by == column {
            self.sort_ascending = !self.sort_ascending;
        } else {
            self.sort_by = column;
            self.sort_ascending = true;
        }
    }

    fn reset_search_and_sort(&mut self) {
        self.search.clear();
        self.sort_by = SortBy::Name;
        self.sort_ascending = true;
    }

    /// Start fetching `view`: sets loading, clears the error and issues a new sequence number.
    pub fn begin_fetch(&mut self, view: View) -> FetchTicket {
        self.generation = self.generation.wrapping_add(1);
        self.loading = true;
        self.error = None;
        let ticket = FetchTicket {
            generation: self.generation,
            view,
        };
        trace_fetch_requested(&ticket);
        ticket
    }

    /// Apply the response for `ticket`.
    ///
    /// Stale responses leave the store untouched. A failed browse of anything
    /// but `root` switches the store to `root`.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Item>, ServiceError>,
        root: &str,
    ) -> FetchOutcome {
        if ticket.generation != self.generation {
            trace_fetch_dropped_stale(ticket.generation, self.generation);
            return FetchOutcome::Stale;
        }
        self.loading = false;

        match result {
            Ok(items) => {
                trace_fetch_applied(ticket.generation, items.len());
                self.view = ticket.view;
                self.items = items;
                self.reset_search_and_sort();
                FetchOutcome::Applied
            }
            Err(err) => {
                let message = err.message_or(FETCH_FAILED_MESSAGE);
                trace_fetch_failed(ticket.generation, &message);
                self.error = Some(message.clone());
                let fallback = match &ticket.view {
                    View::Browse(path) if path != root => {
                        let root = View::Browse(root.to_owned());
                        self.view = root.clone();
                        self.items.clear();
                        Some(root)
                    }
                    _ => None,
                };
                FetchOutcome::Failed { message, fallback }
            }
        }
    }

    /// Whether `item` is part of the current listing, by its identity in the
    /// active view.
    pub fn contains(&self, item: &Item) -> bool {
        identify(item, &self.view)
            .is_some_and(|id| find_by_id(&self.items, &self.view, &id).is_some())
    }

    /// Items after search filtering and sorting, in display order.
    ///
    /// Directories always come first; names compare case-insensitively with
    /// digit runs ordered numerically.
    pub fn visible_items(&self) -> Vec<&Item> {
        let query = self.search.trim().to_lowercase();
        let mut visible: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| query.is_empty() || item.name.to_lowercase().contains(&query))
            .collect();
        let (sort_by, ascending) = (self.sort_by, self.sort_ascending);
        visible.sort_by(|a, b| {
            if a.is_dir() != b.is_dir() {
                return b.is_dir().cmp(&a.is_dir());
            }
            let ord = match sort_by {
                SortBy::Name => natural_cmp_lower(&a.name.to_lowercase(), &b.name.to_lowercase()),
                SortBy::Size => a.size.unwrap_or(0).cmp(&b.size.unwrap_or(0)),
                SortBy::Modified => timestamp(a).cmp(&timestamp(b)),
            };
            if ascending { ord } else { ord.reverse() }
        });
        visible
    }
}

/// Read the contents of `view` from the service.
///
/// Reading the shared-with-me list also marks it as viewed when
/// `mark_shared_viewed` is set; that update never fails the read.
pub async fn read_view<S>(
    service: &S,
    view: &View,
    mark_shared_viewed: bool,
) -> Result<Vec<Item>, ServiceError>
where
    S: FileService + ?Sized,
{
    match view {
        View::Browse(path) => service.browse(path).await,
        View::Trash => service.trash_items().await,
        View::MyShares => service.shared_by_me_items().await,
        View::SharedWithMe => {
            let items = service.shared_with_me_items().await?;
            if mark_shared_viewed {
                if let Err(err) = service.update_last_viewed_shared_timestamp().await {
                    trace_mark_viewed_failed(&err);
                }
            }
            Ok(items)
        }
    }
}

fn timestamp(item: &Item) -> Option<&str> {
    item.modified_at.as_deref().or(item.deleted_at.as_deref())
}

fn natural_cmp_lower(a: &str, b: &str) -> Ordering {
    let (ab, bb) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0usize, 0usize);

    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let a_end = digit_run_end(ab, i);
            let b_end = digit_run_end(bb, j);
            let a_num = trim_leading_zeros(&ab[i..a_end]);
            let b_num = trim_leading_zeros(&bb[j..b_end]);
            let ord = a_num
                .len()
                .cmp(&b_num.len())
                .then_with(|| a_num.cmp(b_num))
                .then_with(|| (a_end - i).cmp(&(b_end - j)));
            if ord != Ordering::Equal {
                return ord;
            }
            i = a_end;
            j = b_end;
            continue;
        }
        if ab[i] != bb[j] {
            return ab[i].cmp(&bb[j]);
        }
        i += 1;
        j += 1;
    }

    (ab.len() - i).cmp(&(bb.len() - j))
}

fn digit_run_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset)
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits.iter().position(|b| *b != b'0').unwrap_or(digits.len());
    &digits[first..]
}

#[cfg(feature = "tracing")]
fn trace_fetch_requested(ticket: &FetchTicket) {
    trace!(
        event = "listing.fetch_requested",
        generation = ticket.generation,
        view = %ticket.view,
        "fetch requested"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_fetch_requested(_ticket: &FetchTicket) {}

#[cfg(feature = "tracing")]
fn trace_fetch_applied(generation: u64, items: usize) {
    trace!(
        event = "listing.fetch_applied",
        generation, items, "fetch applied"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_fetch_applied(_generation: u64, _items: usize) {}

#[cfg(feature = "tracing")]
fn trace_fetch_failed(generation: u64, message: &str) {
    tracing::debug!(
        event = "listing.fetch_failed",
        generation,
        error = message,
        "fetch failed"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_fetch_failed(_generation: u64, _message: &str) {}

#[cfg(feature = "tracing")]
fn trace_fetch_dropped_stale(generation: u64, current_generation: u64) {
    trace!(
        event = "listing.fetch_dropped_stale",
        generation, current_generation, "fetch dropped stale response"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_fetch_dropped_stale(_generation: u64, _current_generation: u64) {}

#[cfg(feature = "tracing")]
fn trace_mark_viewed_failed(err: &ServiceError) {
    tracing::warn!(
        event = "listing.mark_viewed_failed",
        error = %err,
        "failed to update shared-with-me last viewed timestamp"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_mark_viewed_failed(_err: &ServiceError) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ROOT_PATH;

    fn names(store: &ListingStore) -> Vec<&str> {
        store
            .visible_items()
            .into_iter()
            .map(|i| i.name.as_str())
            .collect()
    }

    fn store_with(items: Vec<Item>) -> ListingStore {
        let mut store = ListingStore::new(View::root());
        let ticket = store.begin_fetch(View::root());
        assert_eq!(
            store.finish_fetch(ticket, Ok(items), ROOT_PATH),
            FetchOutcome::Applied
        );
        store
    }

    #[test]
    fn contains_matches_by_view_identity() {
        let store = store_with(vec![Item::file("/a"), Item::dir("/b")]);
        assert!(store.contains(&Item::file("/a")));
        assert!(!store.contains(&Item::file("/c")));
        assert!(!store.contains(&Item::file("")));
    }

    #[test]
    fn fetch_toggles_loading_and_replaces_items() {
        let mut store = ListingStore::new(View::root());
        let ticket = store.begin_fetch(View::root());
        assert!(store.is_loading());
        store.finish_fetch(ticket, Ok(vec![Item::file("/a")]), ROOT_PATH);
        assert!(!store.is_loading());
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut store = ListingStore::new(View::root());
        let old = store.begin_fetch(View::root());
        let new = store.begin_fetch(View::root());

        store.finish_fetch(new, Ok(vec![Item::file("/fresh")]), ROOT_PATH);
        let outcome = store.finish_fetch(old, Ok(vec![Item::file("/stale")]), ROOT_PATH);

        assert_eq!(outcome, FetchOutcome::Stale);
        assert_eq!(store.items()[0].path, "/fresh");
    }

    #[test]
    fn stale_response_does_not_clear_loading_of_newer_request() {
        let mut store = ListingStore::new(View::root());
        let old = store.begin_fetch(View::root());
        let _new = store.begin_fetch(View::root());
        store.finish_fetch(old, Ok(Vec::new()), ROOT_PATH);
        assert!(store.is_loading());
    }

    #[test]
    fn failed_browse_falls_back_to_root() {
        let mut store = ListingStore::new(View::Browse("/gone".into()));
        let ticket = store.begin_fetch(View::Browse("/gone".into()));
        let outcome = store.finish_fetch(ticket, Err(ServiceError::silent()), ROOT_PATH);
        assert_eq!(
            outcome,
            FetchOutcome::Failed {
                message: FETCH_FAILED_MESSAGE.into(),
                fallback: Some(View::root()),
            }
        );
        assert_eq!(store.view(), &View::root());
        assert_eq!(store.error(), Some(FETCH_FAILED_MESSAGE));
        assert!(!store.is_loading());
    }

    #[test]
    fn failed_trash_fetch_keeps_view_and_backend_message() {
        let mut store = ListingStore::new(View::Trash);
        let ticket = store.begin_fetch(View::Trash);
        let outcome = store.finish_fetch(ticket, Err(ServiceError::new("User not found")), ROOT_PATH);
        assert!(matches!(outcome, FetchOutcome::Failed { fallback: None, .. }));
        assert_eq!(store.view(), &View::Trash);
        assert_eq!(store.error(), Some("User not found"));
    }

    #[test]
    fn successful_fetch_resets_search_and_sort() {
        let mut store = store_with(vec![Item::file("/a")]);
        store.set_search("a");
        store.toggle_sort(SortBy::Size);
        store.toggle_sort(SortBy::Size);
        assert_eq!(store.sort(), (SortBy::Size, false));

        let ticket = store.begin_fetch(View::root());
        store.finish_fetch(ticket, Ok(Vec::new()), ROOT_PATH);
        assert_eq!(store.search(), "");
        assert_eq!(store.sort(), (SortBy::Name, true));
    }

    #[test]
    fn visible_items_sort_dirs_first_and_naturally() {
        let store = store_with(vec![
            Item::file("/file10.txt"),
            Item::dir("/zeta"),
            Item::file("/file2.txt"),
            Item::dir("/Alpha"),
        ]);
        assert_eq!(
            names(&store),
            vec!["Alpha", "zeta", "file2.txt", "file10.txt"]
        );
    }

    #[test]
    fn visible_items_filter_by_search_case_insensitively() {
        let mut store = store_with(vec![
            Item::file("/Report.pdf"),
            Item::file("/notes.md"),
        ]);
        store.set_search("REP");
        assert_eq!(names(&store), vec!["Report.pdf"]);
    }

    #[test]
    fn size_sort_descending_keeps_dirs_first() {
        let mut store = store_with(vec![
            Item::file("/small").with_size(1),
            Item::file("/big").with_size(100),
            Item::dir("/d"),
        ]);
        store.toggle_sort(SortBy::Size);
        store.toggle_sort(SortBy::Size);
        assert_eq!(names(&store), vec!["d", "big", "small"]);
    }
}
