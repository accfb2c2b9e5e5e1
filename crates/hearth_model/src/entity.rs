use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::household::{Household, Member};
use crate::message::Message;
use crate::poll::Poll;
use crate::thread::Thread;

/// The closed set of entity collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Thread,
    Message,
    Poll,
    Household,
    Member,
}

impl EntityKind {
    /// Slice name used in operation keys and resource paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Thread => "threads",
            EntityKind::Message => "messages",
            EntityKind::Poll => "polls",
            EntityKind::Household => "households",
            EntityKind::Member => "members",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names an entity without owning it: the kind plus the raw id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Scope key of an ordered list inside one collection.
///
/// Lists are keyed by the parent entity's id (messages of a thread, threads
/// of a household, members of a household); top-level collections use the
/// root key (the current user's households).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListKey(String);

impl ListKey {
    pub fn parent(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_string())
    }

    pub fn root() -> Self {
        Self("*".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed sum of storable entities. Every write path (server reply,
/// speculative apply, push event) carries one of these, so store dispatch
/// is exhaustive.
///
/// Externally tagged on purpose: frames travel through a non-self-describing
/// binary codec, which cannot roundtrip internally tagged enums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Thread(Thread),
    Message(Message),
    Poll(Poll),
    Household(Household),
    Member(Member),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Thread(_) => EntityKind::Thread,
            Entity::Message(_) => EntityKind::Message,
            Entity::Poll(_) => EntityKind::Poll,
            Entity::Household(_) => EntityKind::Household,
            Entity::Member(_) => EntityKind::Member,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Thread(t) => t.id.as_str(),
            Entity::Message(m) => m.id.as_str(),
            Entity::Poll(p) => p.id.as_str(),
            Entity::Household(h) => h.id.as_str(),
            Entity::Member(m) => m.id.as_str(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }

    /// The ordered list this entity belongs to, if its collection keeps one.
    pub fn list_key(&self) -> Option<ListKey> {
        match self {
            Entity::Thread(t) => t.list_key(),
            Entity::Message(m) => m.list_key(),
            Entity::Poll(p) => p.list_key(),
            Entity::Household(h) => h.list_key(),
            Entity::Member(m) => m.list_key(),
        }
    }
}

/// Per-type seam the generic store collection is written against.
///
/// Implemented only by the five entity types; the closed [`Entity`] sum is
/// the corresponding type-erased form.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn record_id(&self) -> &str;

    /// The ordered list this record belongs to, if any. Polls are reached
    /// through `Message::poll_id` and keep no list of their own.
    fn list_key(&self) -> Option<ListKey>;

    fn into_entity(self) -> Entity;

    fn from_entity(entity: Entity) -> Option<Self>;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.record_id())
    }
}

impl Record for Thread {
    const KIND: EntityKind = EntityKind::Thread;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn list_key(&self) -> Option<ListKey> {
        Some(ListKey::parent(&self.household_id))
    }

    fn into_entity(self) -> Entity {
        Entity::Thread(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Thread(t) => Some(t),
            _ => None,
        }
    }
}

impl Record for Message {
    const KIND: EntityKind = EntityKind::Message;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn list_key(&self) -> Option<ListKey> {
        Some(ListKey::parent(&self.thread_id))
    }

    fn into_entity(self) -> Entity {
        Entity::Message(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Message(m) => Some(m),
            _ => None,
        }
    }
}

impl Record for Poll {
    const KIND: EntityKind = EntityKind::Poll;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn list_key(&self) -> Option<ListKey> {
        None
    }

    fn into_entity(self) -> Entity {
        Entity::Poll(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Poll(p) => Some(p),
            _ => None,
        }
    }
}

impl Record for Household {
    const KIND: EntityKind = EntityKind::Household;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn list_key(&self) -> Option<ListKey> {
        Some(ListKey::root())
    }

    fn into_entity(self) -> Entity {
        Entity::Household(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Household(h) => Some(h),
            _ => None,
        }
    }
}

impl Record for Member {
    const KIND: EntityKind = EntityKind::Member;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }

    fn list_key(&self) -> Option<ListKey> {
        Some(ListKey::parent(&self.household_id))
    }

    fn into_entity(self) -> Entity {
        Entity::Member(self)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Member(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{HouseholdId, ThreadId, UserId};
    use chrono::Utc;

    #[test]
    fn entity_sum_reports_kind_and_id() {
        let thread = Thread {
            id: ThreadId::new("th-1"),
            household_id: HouseholdId::new("hh-1"),
            author_id: UserId::new("ana"),
            title: "Chores".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            participants: vec![],
        };
        let entity = thread.clone().into_entity();
        assert_eq!(entity.kind(), EntityKind::Thread);
        assert_eq!(entity.id(), "th-1");
        assert_eq!(entity.list_key(), Some(ListKey::parent("hh-1")));
        assert_eq!(Thread::from_entity(entity), Some(thread));
    }

    #[test]
    fn from_entity_rejects_mismatched_kind() {
        let household = Household {
            id: HouseholdId::new("hh-1"),
            name: "Maple St".into(),
            created_at: Utc::now(),
        };
        assert_eq!(Thread::from_entity(household.into_entity()), None);
    }
}
