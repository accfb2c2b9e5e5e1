use serde::{Deserialize, Serialize};

/// Sort order requested from a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Query parameters accepted by every list operation.
///
/// The cursor is an opaque resumption token issued by the server; the client
/// never inspects it and must not assume time-based semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl PageQuery {
    /// An initial (non-cursor) fetch. Merging its result replaces the list
    /// wholesale.
    pub fn first(limit: u32) -> Self {
        Self {
            cursor: None,
            limit,
            direction: None,
            sort_by: None,
        }
    }

    /// A continuation fetch resuming at `cursor`. Merging its result appends.
    pub fn after(cursor: impl Into<String>, limit: u32) -> Self {
        Self {
            cursor: Some(cursor.into()),
            limit,
            direction: None,
            sort_by: None,
        }
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn is_initial(&self) -> bool {
        self.cursor.is_none()
    }
}

/// Pagination metadata attached to a list reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PageMeta {
    pub fn done() -> Self {
        Self {
            has_more: false,
            next_cursor: None,
            total: None,
        }
    }

    pub fn more(next_cursor: impl Into<String>) -> Self {
        Self {
            has_more: true,
            next_cursor: Some(next_cursor.into()),
            total: None,
        }
    }
}

/// Per-list pagination state held by the entity store.
///
/// Invariant: `next_cursor` is `Some` if and only if `has_more`. Construction
/// goes through [`PaginationState::from_meta`], which normalizes sloppy server
/// replies so the invariant cannot be violated downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl PaginationState {
    pub fn from_meta(meta: &PageMeta) -> Self {
        let next_cursor = if meta.has_more {
            if meta.next_cursor.is_none() {
                log::warn!("[pagination] has_more without next_cursor; treating list as exhausted");
            }
            meta.next_cursor.clone()
        } else {
            None
        };
        Self {
            has_more: next_cursor.is_some(),
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_meta_keeps_cursor_while_more_pages_remain() {
        let state = PaginationState::from_meta(&PageMeta::more("c1"));
        assert!(state.has_more);
        assert_eq!(state.next_cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn from_meta_drops_cursor_on_final_page() {
        let meta = PageMeta {
            has_more: false,
            next_cursor: Some("stale".into()),
            total: Some(12),
        };
        let state = PaginationState::from_meta(&meta);
        assert!(!state.has_more);
        assert_eq!(state.next_cursor, None);
    }

    #[test]
    fn from_meta_normalizes_missing_cursor() {
        let meta = PageMeta {
            has_more: true,
            next_cursor: None,
            total: None,
        };
        let state = PaginationState::from_meta(&meta);
        assert!(!state.has_more, "has_more without a cursor is unusable");
    }

    #[test]
    fn initial_query_has_no_cursor() {
        assert!(PageQuery::first(20).is_initial());
        assert!(!PageQuery::after("c1", 20).is_initial());
    }
}
