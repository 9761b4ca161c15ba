use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;

use crate::core::{Item, ItemId, ItemKind, ROOT_PATH};
use crate::paths;
use crate::service::{FileService, ServiceError, UploadFile};

const TRASH_EPOCH: u64 = 1_700_000_000;

/// [`FileService`] operation, used for call logging and failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ServiceOp {
    Browse,
    CreateItem,
    UploadFile,
    DeleteItems,
    RenameItem,
    MoveItems,
    CopyItems,
    TrashItems,
    RestoreTrashItems,
    DeleteTrashItemsPermanently,
    EmptyTrash,
    SharedWithMeItems,
    DownloadSharedWithMeFile,
    UnshareWithUsers,
    UpdateLastViewedSharedTimestamp,
    SharedByMeItems,
}

/// One recorded request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceCall {
    /// Operation invoked.
    pub op: ServiceOp,
    /// Arguments rendered as strings, in parameter order.
    pub args: Vec<String>,
}

#[derive(Clone, Debug)]
struct Node {
    kind: ItemKind,
    data: Vec<u8>,
}

impl Node {
    fn dir() -> Self {
        Self {
            kind: ItemKind::Dir,
            data: Vec::new(),
        }
    }

    fn file(data: Vec<u8>) -> Self {
        Self {
            kind: ItemKind::File,
            data,
        }
    }
}

#[derive(Clone, Debug)]
struct TrashEntry {
    item: Item,
    nodes: Vec<(String, Node)>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    trash: Vec<TrashEntry>,
    trash_seq: u64,
    shared_with_me: Vec<(Item, Vec<u8>)>,
    shared_by_me: Vec<Item>,
    last_viewed_updates: usize,
    calls: Vec<ServiceCall>,
    failures: HashMap<ServiceOp, VecDeque<ServiceError>>,
    failing_uploads: HashSet<String>,
}

impl State {
    fn is_dir(&self, path: &str) -> bool {
        path == ROOT_PATH || self.nodes.get(path).is_some_and(|n| n.kind == ItemKind::Dir)
    }

    fn exists(&self, path: &str) -> bool {
        path == ROOT_PATH || self.nodes.contains_key(path)
    }

    fn require_dir(&self, path: &str) -> Result<(), ServiceError> {
        if self.is_dir(path) {
            Ok(())
        } else {
            Err(ServiceError::new(format!("Directory '{path}' not found.")))
        }
    }

    fn require_exists(&self, path: &str) -> Result<(), ServiceError> {
        if path != ROOT_PATH && self.nodes.contains_key(path) {
            Ok(())
        } else {
            Err(ServiceError::new(format!("'{path}' not found.")))
        }
    }

    fn subtree_keys(&self, path: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|k| paths::is_same_or_within(k, path))
            .cloned()
            .collect()
    }

    fn take_subtree(&mut self, path: &str) -> Vec<(String, Node)> {
        self.subtree_keys(path)
            .into_iter()
            .filter_map(|k| self.nodes.remove(&k).map(|n| (k, n)))
            .collect()
    }

    fn reparent(&mut self, from: &str, to: &str) {
        for (key, node) in self.take_subtree(from) {
            let rest = &key[from.len()..];
            self.nodes.insert(format!("{to}{rest}"), node);
        }
    }

    fn copy_subtree(&mut self, from: &str, to: &str) {
        let copies: Vec<(String, Node)> = self
            .subtree_keys(from)
            .into_iter()
            .filter_map(|k| {
                let node = self.nodes.get(&k)?.clone();
                Some((format!("{to}{}", &k[from.len()..]), node))
            })
            .collect();
        self.nodes.extend(copies);
    }

    fn ensure_dirs(&mut self, dir: &str) {
        if dir == ROOT_PATH || self.nodes.contains_key(dir) {
            return;
        }
        self.ensure_dirs(&paths::parent(dir));
        self.nodes.insert(dir.to_owned(), Node::dir());
    }

    fn listing_item(&self, path: &str, node: &Node) -> Item {
        let mut item = Item::new(paths::file_name(path), path, node.kind);
        if node.kind == ItemKind::File {
            item.size = Some(node.data.len() as u64);
        }
        item
    }
}

/// In-memory [`FileService`] for hosts without a backend and for tests.
///
/// Clones share the same state, so a test can keep a handle for seeding,
/// inspecting recorded calls and injecting failures while the engine owns
/// another.
///
/// ```
/// use dashfm_engine::{FileService, MemoryFileService};
/// let svc = MemoryFileService::new().with_dir("/docs").with_file("/docs/a.txt", "hi");
/// let items = pollster::block_on(svc.browse("/docs")).unwrap();
/// assert_eq!(items[0].name, "a.txt");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryFileService {
    state: Rc<RefCell<State>>,
}

impl MemoryFileService {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory (and its missing parents).
    pub fn with_dir(self, path: &str) -> Self {
        self.state.borrow_mut().ensure_dirs(path);
        self
    }

    /// Add a file (and its missing parent directories).
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.ensure_dirs(&paths::parent(path));
            state.nodes.insert(path.to_owned(), Node::file(data.into()));
        }
        self
    }

    /// Add a shared-with-me record; `item.id` must be set.
    pub fn add_shared_with_me(&self, item: Item, data: impl Into<Vec<u8>>) {
        self.state
            .borrow_mut()
            .shared_with_me
            .push((item, data.into()));
    }

    /// Add a shared-by-me record; `item.id` must be set.
    pub fn add_shared_by_me(&self, item: Item) {
        self.state.borrow_mut().shared_by_me.push(item);
    }

    /// Make the next call of `op` fail with `error`.
    ///
    /// Injected failures queue up per operation.
    pub fn fail_next(&self, op: ServiceOp, error: ServiceError) {
        self.state
            .borrow_mut()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Make every upload of a file called `name` fail.
    pub fn fail_uploads_named(&self, name: &str) {
        self.state
            .borrow_mut()
            .failing_uploads
            .insert(name.to_owned());
    }

    /// Every request received so far.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.borrow().calls.clone()
    }

    /// Number of requests of kind `op` received so far.
    pub fn call_count(&self, op: ServiceOp) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &str) -> bool {
        self.state.borrow().exists(path)
    }

    /// Contents of the file at `path`.
    pub fn file_data(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .nodes
            .get(path)
            .filter(|n| n.kind == ItemKind::File)
            .map(|n| n.data.clone())
    }

    /// How many times the shared-with-me list was marked as viewed.
    pub fn last_viewed_updates(&self) -> usize {
        self.state.borrow().last_viewed_updates
    }

    fn begin<I, A>(&self, op: ServiceOp, args: I) -> Result<std::cell::RefMut<'_, State>, ServiceError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut state = self.state.borrow_mut();
        state.calls.push(ServiceCall {
            op,
            args: args.into_iter().map(Into::into).collect(),
        });
        if let Some(err) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }
}

fn id_args(ids: &[ItemId]) -> impl Iterator<Item = &str> {
    ids.iter().map(ItemId::as_str)
}

#[async_trait(?Send)]
impl FileService for MemoryFileService {
    async fn browse(&self, path: &str) -> Result<Vec<Item>, ServiceError> {
        let state = self.begin(ServiceOp::Browse, [path])?;
        state.require_dir(path)?;
        Ok(state
            .nodes
            .iter()
            .filter(|(k, _)| paths::parent(k) == path)
            .map(|(k, n)| state.listing_item(k, n))
            .collect())
    }

    async fn create_item(
        &self,
        parent: &str,
        name: &str,
        kind: ItemKind,
    ) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::CreateItem, [parent, name, kind.as_str()])?;
        state.require_dir(parent)?;
        if name.trim().is_empty() || name.contains('/') {
            return Err(ServiceError::new(format!("Invalid name '{name}'.")));
        }
        let path = paths::join(parent, name);
        if state.exists(&path) {
            return Err(ServiceError::new(format!("'{name}' already exists.")));
        }
        let node = match kind {
            ItemKind::Dir => Node::dir(),
            ItemKind::File => Node::file(Vec::new()),
        };
        state.nodes.insert(path, node);
        Ok(())
    }

    async fn upload_file(&self, file: &UploadFile, dest: &str) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::UploadFile, [file.name.as_str(), dest])?;
        state.require_dir(dest)?;
        if state.failing_uploads.contains(&file.name) {
            return Err(ServiceError::new(format!("Upload of '{}' failed.", file.name)));
        }
        let path = paths::join(dest, &file.name);
        if state.is_dir(&path) {
            return Err(ServiceError::new(format!("'{}' is a directory.", file.name)));
        }
        state.nodes.insert(path, Node::file(file.data.clone()));
        Ok(())
    }

    async fn delete_items(&self, paths_in: &[String]) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::DeleteItems, paths_in)?;
        for path in paths_in {
            state.require_exists(path)?;
        }
        for path in paths_in {
            // Already trashed together with an ancestor listed earlier.
            if !state.nodes.contains_key(path) {
                continue;
            }
            let kind = state.nodes[path].kind;
            state.trash_seq += 1;
            let stamp = TRASH_EPOCH + state.trash_seq;
            let name = paths::file_name(path).to_owned();
            let mut item = Item::new(name.as_str(), path.as_str(), kind)
                .with_trashed_name(format!("{name}.{stamp}"));
            item.original_path = Some(path.clone());
            item.deleted_at = Some(stamp.to_string());
            let nodes = state.take_subtree(path);
            if kind == ItemKind::File {
                item.size = nodes.first().map(|(_, n)| n.data.len() as u64);
            }
            state.trash.push(TrashEntry { item, nodes });
        }
        Ok(())
    }

    async fn rename_item(&self, path: &str, new_name: &str) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::RenameItem, [path, new_name])?;
        state.require_exists(path)?;
        if new_name.trim().is_empty() || new_name.contains('/') {
            return Err(ServiceError::new(format!("Invalid name '{new_name}'.")));
        }
        let target = paths::join(&paths::parent(path), new_name);
        if state.exists(&target) {
            return Err(ServiceError::new(format!("'{new_name}' already exists.")));
        }
        state.reparent(path, &target);
        Ok(())
    }

    async fn move_items(&self, paths_in: &[String], destination: &str) -> Result<(), ServiceError> {
        let args = paths_in.iter().map(String::as_str).chain([destination]);
        let mut state = self.begin(ServiceOp::MoveItems, args)?;
        state.require_dir(destination)?;
        let mut plan = Vec::new();
        for path in paths_in {
            state.require_exists(path)?;
            if paths::is_same_or_within(destination, path) {
                return Err(ServiceError::new("Cannot move a folder into itself."));
            }
            if paths::parent(path) == destination {
                continue;
            }
            let target = paths::join(destination, paths::file_name(path));
            if state.exists(&target) {
                return Err(ServiceError::new(format!(
                    "'{}' already exists in the destination.",
                    paths::file_name(path)
                )));
            }
            plan.push((path.clone(), target));
        }
        for (from, to) in plan {
            state.reparent(&from, &to);
        }
        Ok(())
    }

    async fn copy_items(&self, paths_in: &[String], destination: &str) -> Result<(), ServiceError> {
        let args = paths_in.iter().map(String::as_str).chain([destination]);
        let mut state = self.begin(ServiceOp::CopyItems, args)?;
        state.require_dir(destination)?;
        for path in paths_in {
            state.require_exists(path)?;
            if state.is_dir(path) && paths::is_same_or_within(destination, path) {
                return Err(ServiceError::new("Cannot copy a folder into itself."));
            }
        }
        for path in paths_in {
            let taken = |name: &str| state.exists(&paths::join(destination, name));
            let name = paths::unique_child_name(taken, paths::file_name(path))
                .ok_or_else(|| ServiceError::new("No free name in the destination."))?;
            let target = paths::join(destination, &name);
            state.copy_subtree(path, &target);
        }
        Ok(())
    }

    async fn trash_items(&self) -> Result<Vec<Item>, ServiceError> {
        let state = self.begin(ServiceOp::TrashItems, None::<&str>)?;
        Ok(state.trash.iter().map(|e| e.item.clone()).collect())
    }

    async fn restore_trash_items(&self, trashed_names: &[ItemId]) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::RestoreTrashItems, id_args(trashed_names))?;
        let mut picked = Vec::new();
        for name in trashed_names {
            let idx = trash_index(&state, name)?;
            let original = state.trash[idx].item.original_path.clone().unwrap_or_default();
            if state.exists(&original) {
                return Err(ServiceError::new(format!(
                    "'{}' already exists at its original location.",
                    paths::file_name(&original)
                )));
            }
            picked.push(idx);
        }
        picked.sort_unstable_by(|a, b| b.cmp(a));
        picked.dedup();
        for idx in picked {
            let entry = state.trash.remove(idx);
            if let Some(original) = entry.item.original_path.as_deref() {
                state.ensure_dirs(&paths::parent(original));
            }
            state.nodes.extend(entry.nodes);
        }
        Ok(())
    }

    async fn delete_trash_items_permanently(
        &self,
        trashed_names: &[ItemId],
    ) -> Result<(), ServiceError> {
        let mut state = self.begin(
            ServiceOp::DeleteTrashItemsPermanently,
            id_args(trashed_names),
        )?;
        for name in trashed_names {
            trash_index(&state, name)?;
        }
        state.trash.retain(|e| {
            !trashed_names
                .iter()
                .any(|n| e.item.trashed_name.as_deref() == Some(n.as_str()))
        });
        Ok(())
    }

    async fn empty_trash(&self) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::EmptyTrash, None::<&str>)?;
        state.trash.clear();
        Ok(())
    }

    async fn shared_with_me_items(&self) -> Result<Vec<Item>, ServiceError> {
        let state = self.begin(ServiceOp::SharedWithMeItems, None::<&str>)?;
        Ok(state.shared_with_me.iter().map(|(i, _)| i.clone()).collect())
    }

    async fn download_shared_with_me_file(
        &self,
        share_id: &ItemId,
    ) -> Result<Vec<u8>, ServiceError> {
        let state = self.begin(ServiceOp::DownloadSharedWithMeFile, [share_id.as_str()])?;
        state
            .shared_with_me
            .iter()
            .find(|(i, _)| i.id.map(|id| id.to_string()).as_deref() == Some(share_id.as_str()))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| ServiceError::new("Shared file not found."))
    }

    async fn unshare_with_users(&self, share_ids: &[ItemId]) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::UnshareWithUsers, id_args(share_ids))?;
        let matches = |item: &Item| {
            item.id
                .is_some_and(|id| share_ids.iter().any(|s| s.as_str() == id.to_string()))
        };
        state.shared_with_me.retain(|(i, _)| !matches(i));
        state.shared_by_me.retain(|i| !matches(i));
        Ok(())
    }

    async fn update_last_viewed_shared_timestamp(&self) -> Result<(), ServiceError> {
        let mut state = self.begin(ServiceOp::UpdateLastViewedSharedTimestamp, None::<&str>)?;
        state.last_viewed_updates += 1;
        Ok(())
    }

    async fn shared_by_me_items(&self) -> Result<Vec<Item>, ServiceError> {
        let state = self.begin(ServiceOp::SharedByMeItems, None::<&str>)?;
        Ok(state.shared_by_me.clone())
    }
}

fn trash_index(state: &State, name: &ItemId) -> Result<usize, ServiceError> {
    state
        .trash
        .iter()
        .position(|e| e.item.trashed_name.as_deref() == Some(name.as_str()))
        .ok_or_else(|| ServiceError::new(format!("'{name}' is not in the trash.")))
}
