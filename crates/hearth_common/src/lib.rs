//! hearth_common
//!
//! Transport-agnostic plumbing shared by every hearth crate:
//!
//! - [`ApiError`]: the closed error taxonomy surfaced by the request
//!   transport and recorded by the operation tracker.
//! - [`PageQuery`] / [`PageMeta`] / [`PaginationState`]: cursor-based
//!   pagination parameters and the normalized per-list pagination state.
//! - [`codec`]: the length-prefixed binary frame codec used by the
//!   WebSocket event transport.

pub mod codec;
pub mod error;
pub mod pagination;

pub use error::{ApiError, ErrorKind, FieldError};
pub use pagination::{PageMeta, PageQuery, PaginationState, SortDirection};
