//! The normalized entity store.
//!
//! One [`Collection`] per entity kind, each holding the canonical copy of its
//! entities plus the ordered id lists produced by pagination. All mutation
//! (server replies, speculative writes, push events) goes through the single
//! [`EntityStore::upsert`] / [`EntityStore::remove`] pair, so the three write
//! paths cannot diverge in behavior.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use hearth_common::{PageMeta, PaginationState};
use hearth_model::{
    Entity, EntityKind, EntityRef, Household, ListKey, Member, Message, Poll, Record, Thread,
};

/// Callback invoked after every store write, used by the reactive layer to
/// trigger recomputation of derived views.
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// Conflict resolution for concurrent writes to the same entity.
///
/// Last-write-wins: the most recently applied write fully replaces the stored
/// value, with no field-level merge. Both the optimistic mutation engine and
/// the real-time reconciliation layer resolve through this one function, so
/// the policy is auditable and swappable (e.g. for version-stamped
/// reconciliation) without touching any call site.
pub fn resolve_write<T: Record>(current: Option<&T>, incoming: T) -> T {
    let _ = current;
    incoming
}

/// An ordered id list plus its pagination state.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PagedList {
    pub(crate) ids: Vec<String>,
    pub(crate) page: PaginationState,
}

/// One entity kind's normalized collection.
///
/// Entities are keyed by id in an insertion-ordered map; replacing a known id
/// keeps its position. Ordered views (a thread's messages, a household's
/// threads) are id lists scoped by [`ListKey`], populated by the pagination
/// merge engine and kept in server-delivery order; the store never re-sorts.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T: Record> {
    entities: IndexMap<String, T>,
    lists: HashMap<ListKey, PagedList>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
            lists: HashMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entities.values()
    }

    /// The ordered entities of one list. Unknown lists are empty.
    pub fn list(&self, key: &ListKey) -> Vec<T> {
        match self.lists.get(key) {
            Some(list) => list
                .ids
                .iter()
                .filter_map(|id| self.entities.get(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether a list has been initialized by a fetch (or a replace-merge).
    pub fn list_initialized(&self, key: &ListKey) -> bool {
        self.lists.contains_key(key)
    }

    pub fn pagination(&self, key: &ListKey) -> PaginationState {
        self.lists
            .get(key)
            .map(|l| l.page.clone())
            .unwrap_or_default()
    }

    /// Replace-whole-value write. If the entity's parent list is already
    /// initialized, its id is appended (once) so push-created entities are
    /// visible; uninitialized lists are left untouched for a later initial
    /// fetch to replace wholesale.
    pub(crate) fn upsert(&mut self, value: T) {
        let id = value.record_id().to_string();
        let list_key = value.list_key();
        let resolved = resolve_write(self.entities.get(&id), value);
        self.entities.insert(id.clone(), resolved);
        if let Some(key) = list_key {
            if let Some(list) = self.lists.get_mut(&key) {
                if !list.ids.iter().any(|existing| existing == &id) {
                    list.ids.push(id);
                }
            }
        }
    }

    /// Remove the entity and drop its id from every list.
    pub(crate) fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.entities.shift_remove(id);
        if removed.is_some() {
            for list in self.lists.values_mut() {
                list.ids.retain(|existing| existing != id);
            }
        }
        removed
    }

    /// Substitute a temporary id with the server-issued one, in place: the
    /// entity keeps its position in the collection and in every list. If the
    /// authoritative id is already present (its push event won the race), the
    /// temporary entry is dropped instead of duplicated.
    pub(crate) fn reconcile_id(&mut self, temp_id: &str, value: T) {
        let id = value.record_id().to_string();
        if temp_id == id {
            self.upsert(value);
            return;
        }

        match self.entities.shift_remove_full(temp_id) {
            Some((index, _, _)) => {
                if self.entities.contains_key(&id) {
                    let resolved = resolve_write(self.entities.get(&id), value);
                    self.entities.insert(id.clone(), resolved);
                } else {
                    let index = index.min(self.entities.len());
                    self.entities.shift_insert(index, id.clone(), value);
                }
            }
            None => {
                self.upsert(value);
                return;
            }
        }

        for list in self.lists.values_mut() {
            if list.ids.iter().any(|existing| existing == &id) {
                list.ids.retain(|existing| existing != temp_id);
            } else if let Some(slot) = list.ids.iter_mut().find(|existing| *existing == temp_id) {
                *slot = id.clone();
            }
        }
    }

    /// Merge one page into the list at `key`.
    ///
    /// An initial (non-cursor) fetch replaces the list wholesale; a
    /// continuation appends. Items whose id is already present replace the
    /// stored value without moving position: refresh-on-revisit, not
    /// duplication. Ordering is preserved exactly as delivered.
    pub(crate) fn merge_page(
        &mut self,
        key: &ListKey,
        items: Vec<T>,
        meta: &PageMeta,
        initial: bool,
    ) {
        let page = PaginationState::from_meta(meta);
        if initial {
            self.lists.insert(key.clone(), PagedList::default());
        } else {
            self.lists.entry(key.clone()).or_default();
        }

        for item in items {
            if item.list_key().as_ref() != Some(key) {
                log::warn!(
                    "[store] page item {}/{} does not belong to list {key}",
                    T::KIND,
                    item.record_id()
                );
            }
            self.upsert(item);
        }

        if let Some(list) = self.lists.get_mut(key) {
            list.page = page;
        }
    }

    pub(crate) fn page_snapshot(&self, key: &ListKey) -> Option<PagedList> {
        self.lists.get(key).cloned()
    }

    pub(crate) fn restore_page(&mut self, key: &ListKey, page: Option<PagedList>) {
        match page {
            Some(list) => {
                self.lists.insert(key.clone(), list);
            }
            None => {
                self.lists.remove(key);
            }
        }
    }
}

/// Total record of store state touched by one mutation, for rollback.
///
/// Captures `Option<Entity>` per touched ref (absence included, so restoring
/// removes entities the mutation created) plus the touched lists' id order
/// and pagination state verbatim.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<(EntityRef, Option<Entity>)>,
    lists: Vec<(EntityKind, ListKey, Option<PagedList>)>,
}

/// Access to a typed collection inside [`EntityStore`]. Implemented for the
/// five entity kinds; generic store code (pagination merge, fetch helpers,
/// hooks) is written against it.
pub trait StoreCollection<T: Record> {
    fn collection(&self) -> &Collection<T>;
    fn collection_mut(&mut self) -> &mut Collection<T>;
}

/// The normalized, per-kind entity cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    threads: Collection<Thread>,
    messages: Collection<Message>,
    polls: Collection<Poll>,
    households: Collection<Household>,
    members: Collection<Member>,
}

macro_rules! impl_store_collection {
    ($ty:ty, $field:ident) => {
        impl StoreCollection<$ty> for EntityStore {
            fn collection(&self) -> &Collection<$ty> {
                &self.$field
            }

            fn collection_mut(&mut self) -> &mut Collection<$ty> {
                &mut self.$field
            }
        }
    };
}

impl_store_collection!(Thread, threads);
impl_store_collection!(Message, messages);
impl_store_collection!(Poll, polls);
impl_store_collection!(Household, households);
impl_store_collection!(Member, members);

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed read access to one collection.
    pub fn of<T: Record>(&self) -> &Collection<T>
    where
        Self: StoreCollection<T>,
    {
        StoreCollection::collection(self)
    }

    /// The single write primitive: replace-whole-value upsert.
    pub fn upsert(&mut self, entity: Entity) {
        match entity {
            Entity::Thread(t) => self.threads.upsert(t),
            Entity::Message(m) => self.messages.upsert(m),
            Entity::Poll(p) => self.polls.upsert(p),
            Entity::Household(h) => self.households.upsert(h),
            Entity::Member(m) => self.members.upsert(m),
        }
    }

    /// The single removal primitive.
    pub fn remove(&mut self, target: &EntityRef) -> Option<Entity> {
        match target.kind {
            EntityKind::Thread => self.threads.remove(&target.id).map(Record::into_entity),
            EntityKind::Message => self.messages.remove(&target.id).map(Record::into_entity),
            EntityKind::Poll => self.polls.remove(&target.id).map(Record::into_entity),
            EntityKind::Household => self.households.remove(&target.id).map(Record::into_entity),
            EntityKind::Member => self.members.remove(&target.id).map(Record::into_entity),
        }
    }

    pub fn get(&self, target: &EntityRef) -> Option<Entity> {
        match target.kind {
            EntityKind::Thread => self.threads.get(&target.id).cloned().map(Record::into_entity),
            EntityKind::Message => self.messages.get(&target.id).cloned().map(Record::into_entity),
            EntityKind::Poll => self.polls.get(&target.id).cloned().map(Record::into_entity),
            EntityKind::Household => {
                self.households.get(&target.id).cloned().map(Record::into_entity)
            }
            EntityKind::Member => self.members.get(&target.id).cloned().map(Record::into_entity),
        }
    }

    /// Merge one page of `items` into the list at `key`. See
    /// [`Collection::merge_page`] for the replace/append semantics.
    pub fn merge_page<T: Record>(
        &mut self,
        key: &ListKey,
        items: Vec<T>,
        meta: &PageMeta,
        initial: bool,
    ) where
        Self: StoreCollection<T>,
    {
        self.collection_mut().merge_page(key, items, meta, initial);
    }

    /// Substitute a temporary id with the authoritative entity, in place.
    pub fn reconcile_id(&mut self, temp_id: &str, entity: Entity) {
        match entity {
            Entity::Thread(t) => self.threads.reconcile_id(temp_id, t),
            Entity::Message(m) => self.messages.reconcile_id(temp_id, m),
            Entity::Poll(p) => self.polls.reconcile_id(temp_id, p),
            Entity::Household(h) => self.households.reconcile_id(temp_id, h),
            Entity::Member(m) => self.members.reconcile_id(temp_id, m),
        }
    }

    /// Capture the current value of every ref (absence included) and the
    /// verbatim state of every named list.
    pub fn snapshot(&self, refs: &[EntityRef], lists: &[(EntityKind, ListKey)]) -> Snapshot {
        let entries = refs
            .iter()
            .map(|r| (r.clone(), self.get(r)))
            .collect();
        let lists = lists
            .iter()
            .map(|(kind, key)| {
                let page = match kind {
                    EntityKind::Thread => self.threads.page_snapshot(key),
                    EntityKind::Message => self.messages.page_snapshot(key),
                    EntityKind::Poll => self.polls.page_snapshot(key),
                    EntityKind::Household => self.households.page_snapshot(key),
                    EntityKind::Member => self.members.page_snapshot(key),
                };
                (*kind, key.clone(), page)
            })
            .collect();
        Snapshot { entries, lists }
    }

    /// Reinstate a snapshot verbatim: present entities are rewritten whole,
    /// absent ones are removed, list order and pagination state are restored.
    pub fn restore(&mut self, snapshot: Snapshot) {
        for (target, value) in snapshot.entries {
            match value {
                Some(entity) => self.upsert(entity),
                None => {
                    self.remove(&target);
                }
            }
        }
        for (kind, key, page) in snapshot.lists {
            match kind {
                EntityKind::Thread => self.threads.restore_page(&key, page),
                EntityKind::Message => self.messages.restore_page(&key, page),
                EntityKind::Poll => self.polls.restore_page(&key, page),
                EntityKind::Household => self.households.restore_page(&key, page),
                EntityKind::Member => self.members.restore_page(&key, page),
            }
        }
    }
}

/// Drop duplicate refs while keeping first-seen order.
pub(crate) fn dedup_refs(refs: &mut Vec<EntityRef>) {
    let mut seen = HashSet::new();
    refs.retain(|r| seen.insert((r.kind, r.id.clone())));
}

/// The engine-owned, shareable store handle.
///
/// Interior `Mutex` only because the reactive layer's types require
/// `Send + Sync`; the scheduling model is single-threaded cooperative and the
/// lock is never held across a suspension point. Every write runs the change
/// listener after the lock is released.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<EntityStore>>,
    listener: Arc<Mutex<Option<ChangeListener>>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<R>(&self, f: impl FnOnce(&EntityStore) -> R) -> R {
        let guard = self.inner.lock().unwrap();
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut EntityStore) -> R) -> R {
        let result = {
            let mut guard = self.inner.lock().unwrap();
            f(&mut guard)
        };
        self.notify();
        result
    }

    pub fn set_listener(&self, listener: ChangeListener) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn notify(&self) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hearth_model::{HouseholdId, MessageId, ReadReceipts, ThreadId, UserId};

    fn message(id: &str, thread: &str, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            thread_id: ThreadId::new(thread),
            author_id: UserId::new("ana"),
            content: content.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            attachments: vec![],
            reactions: vec![],
            mentions: vec![],
            poll_id: None,
            receipts: ReadReceipts::default(),
        }
    }

    fn thread(id: &str, household: &str) -> Thread {
        Thread {
            id: ThreadId::new(id),
            household_id: HouseholdId::new(household),
            author_id: UserId::new("ana"),
            title: "Chores".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            participants: vec![],
        }
    }

    fn full_page<T: Record>(store: &mut EntityStore, key: &ListKey, items: Vec<T>)
    where
        EntityStore: StoreCollection<T>,
    {
        store.merge_page(key, items, &PageMeta::done(), true);
    }

    #[test]
    fn upsert_replaces_whole_value_in_place() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("th-1");
        full_page(
            &mut store,
            &key,
            vec![message("m1", "th-1", "one"), message("m2", "th-1", "two")],
        );

        store.upsert(message("m1", "th-1", "edited").into_entity());

        let listed = store.of::<Message>().list(&key);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.as_str(), "m1");
        assert_eq!(listed[0].content, "edited");
    }

    #[test]
    fn upsert_appends_to_initialized_list_only() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("th-1");

        // No list yet: entity is stored but not listed anywhere.
        store.upsert(message("m0", "th-1", "early").into_entity());
        assert!(store.of::<Message>().contains("m0"));
        assert!(store.of::<Message>().list(&key).is_empty());

        full_page(&mut store, &key, vec![message("m1", "th-1", "one")]);
        store.upsert(message("m2", "th-1", "pushed").into_entity());

        let ids: Vec<_> = store
            .of::<Message>()
            .list(&key)
            .iter()
            .map(|m| m.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn remove_drops_entity_and_list_membership() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("th-1");
        full_page(
            &mut store,
            &key,
            vec![message("m1", "th-1", "one"), message("m2", "th-1", "two")],
        );

        let removed = store.remove(&EntityRef::new(EntityKind::Message, "m1"));
        assert!(removed.is_some());
        assert!(!store.of::<Message>().contains("m1"));
        assert_eq!(store.of::<Message>().list(&key).len(), 1);

        // Removing an unknown id is a no-op.
        assert!(store.remove(&EntityRef::new(EntityKind::Message, "m1")).is_none());
    }

    #[test]
    fn snapshot_restore_is_total() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("th-1");
        full_page(&mut store, &key, vec![message("m1", "th-1", "one")]);

        let refs = vec![
            EntityRef::new(EntityKind::Message, "m1"),
            EntityRef::new(EntityKind::Message, "tmp-1"),
        ];
        let lists = vec![(EntityKind::Message, key.clone())];
        let snapshot = store.snapshot(&refs, &lists);
        let before = store.clone();

        // Speculative: edit m1 and create tmp-1.
        store.upsert(message("m1", "th-1", "speculative edit").into_entity());
        store.upsert(message("tmp-1", "th-1", "speculative create").into_entity());
        assert_eq!(store.of::<Message>().list(&key).len(), 2);

        store.restore(snapshot);
        assert_eq!(store, before);
    }

    #[test]
    fn restore_reinstates_removed_entities_and_list_order() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("hh-1");
        full_page(
            &mut store,
            &key,
            vec![thread("t1", "hh-1"), thread("t2", "hh-1"), thread("t3", "hh-1")],
        );

        let refs = vec![EntityRef::new(EntityKind::Thread, "t2")];
        let lists = vec![(EntityKind::Thread, key.clone())];
        let snapshot = store.snapshot(&refs, &lists);
        let before = store.clone();

        store.remove(&EntityRef::new(EntityKind::Thread, "t2"));
        store.restore(snapshot);

        let ids: Vec<_> = store
            .of::<Thread>()
            .list(&key)
            .iter()
            .map(|t| t.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(store, before);
    }

    #[test]
    fn reconcile_id_substitutes_in_place() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("th-1");
        full_page(
            &mut store,
            &key,
            vec![message("m1", "th-1", "one")],
        );
        store.upsert(message("tmp-1", "th-1", "hello").into_entity());
        store.upsert(message("m9", "th-1", "later").into_entity());

        store.reconcile_id("tmp-1", message("msg-42", "th-1", "hello").into_entity());

        let ids: Vec<_> = store
            .of::<Message>()
            .list(&key)
            .iter()
            .map(|m| m.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["m1", "msg-42", "m9"]);
        assert!(!store.of::<Message>().contains("tmp-1"));
    }

    #[test]
    fn reconcile_id_drops_temp_when_event_arrived_first() {
        let mut store = EntityStore::new();
        let key = ListKey::parent("th-1");
        full_page(&mut store, &key, Vec::<Message>::new());
        store.upsert(message("tmp-1", "th-1", "hello").into_entity());
        // The push event for the same creation lands before the reply.
        store.upsert(message("msg-42", "th-1", "hello").into_entity());
        assert_eq!(store.of::<Message>().list(&key).len(), 2);

        store.reconcile_id("tmp-1", message("msg-42", "th-1", "hello").into_entity());

        let listed = store.of::<Message>().list(&key);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.as_str(), "msg-42");
    }

    #[test]
    fn reconcile_id_for_unknown_temp_falls_back_to_upsert() {
        let mut store = EntityStore::new();
        store.reconcile_id("tmp-404", message("msg-1", "th-1", "hi").into_entity());
        assert!(store.of::<Message>().contains("msg-1"));
    }

    #[test]
    fn shared_store_notifies_listener_on_write() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let store = SharedStore::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        store.set_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.write(|s| s.upsert(message("m1", "th-1", "one").into_entity()));
        store.read(|s| assert!(s.of::<Message>().contains("m1")));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dedup_refs_keeps_first_occurrence() {
        let mut refs = vec![
            EntityRef::new(EntityKind::Message, "m1"),
            EntityRef::new(EntityKind::Thread, "m1"),
            EntityRef::new(EntityKind::Message, "m1"),
        ];
        dedup_refs(&mut refs);
        assert_eq!(refs.len(), 2);
    }
}
