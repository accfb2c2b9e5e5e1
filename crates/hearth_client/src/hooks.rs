//! Hooks consumed by UI components.
//!
//! Each hook subscribes to the topics it needs for the lifetime of the
//! calling component (subscriptions are shared and ref-counted) and returns
//! derived signals over the store.

use leptos::prelude::*;

use hearth_common::PaginationState;
use hearth_model::{
    EntityKind, Household, HouseholdId, ListKey, Member, Message, MessageId, Poll, PollId,
    Thread, ThreadId, UserId,
};
use hearth_sync::Topic;

use crate::context::{SyncConnection, SyncContext};
use crate::status::{OpKey, OperationState};

/// Access the sync context directly.
///
/// # Panics
///
/// Panics if called outside of a `SyncProvider`.
pub fn use_sync_context() -> SyncContext {
    expect_context::<SyncContext>()
}

/// Subscribe to one thread's messages.
///
/// Returns the ordered message list as delivered by the server. The
/// subscription is shared with other components watching the same thread and
/// dropped when the last one unmounts.
///
/// # Example
///
/// ```rust,ignore
/// #[component]
/// fn MessageList(thread_id: ThreadId) -> impl IntoView {
///     let messages = use_messages(thread_id.clone());
///
///     view! {
///         <For
///             each=move || messages.get()
///             key=|m| m.id.clone()
///             let:message
///         >
///             <MessageRow message/>
///         </For>
///     }
/// }
/// ```
pub fn use_messages(thread_id: ThreadId) -> Signal<Vec<Message>> {
    let ctx = use_sync_context();
    ctx.use_topic(Topic::entity(EntityKind::Thread, thread_id.as_str()));
    ctx.messages_in(&thread_id)
}

/// Subscribe to one household's threads.
pub fn use_threads(household_id: HouseholdId) -> Signal<Vec<Thread>> {
    let ctx = use_sync_context();
    ctx.use_topic(Topic::entity(EntityKind::Household, household_id.as_str()));
    ctx.threads_in(&household_id)
}

/// Subscribe to the current user's households.
pub fn use_households() -> Signal<Vec<Household>> {
    let ctx = use_sync_context();
    ctx.use_topic(Topic::collection(EntityKind::Household));
    ctx.households()
}

/// Subscribe to one household's members. Member events flow through the
/// household's topic.
pub fn use_members(household_id: HouseholdId) -> Signal<Vec<Member>> {
    let ctx = use_sync_context();
    ctx.use_topic(Topic::entity(EntityKind::Household, household_id.as_str()));
    ctx.members_in(&household_id)
}

/// A single message by id.
pub fn use_message(id: MessageId) -> Signal<Option<Message>> {
    use_sync_context().message(&id)
}

/// A single thread by id.
pub fn use_thread(id: ThreadId) -> Signal<Option<Thread>> {
    use_sync_context().thread(&id)
}

/// A single poll by id.
pub fn use_poll(id: PollId) -> Signal<Option<Poll>> {
    use_sync_context().poll(&id)
}

/// The poll attached to a message, if any.
pub fn use_message_poll(message_id: MessageId) -> Signal<Option<Poll>> {
    use_sync_context().poll_for_message(&message_id)
}

/// Status and last error of one operation class.
///
/// # Example
///
/// ```rust,ignore
/// use hearth_client::actions::ops;
///
/// #[component]
/// fn SendButton() -> impl IntoView {
///     let create = use_operation(ops::MESSAGES_CREATE);
///
///     view! {
///         <button disabled=move || create.get().is_pending()>"Send"</button>
///         <Show when=move || create.get().is_failed()>
///             <p class="error">{move || create.get().error.unwrap_or_default()}</p>
///         </Show>
///     }
/// }
/// ```
pub fn use_operation(op: OpKey) -> Signal<OperationState> {
    use_sync_context().operation(op)
}

/// Pagination state of a thread list.
pub fn use_thread_pagination(household_id: HouseholdId) -> Signal<PaginationState> {
    use_sync_context().pagination::<Thread>(ListKey::parent(&household_id))
}

/// Pagination state of a message list.
pub fn use_message_pagination(thread_id: ThreadId) -> Signal<PaginationState> {
    use_sync_context().pagination::<Message>(ListKey::parent(&thread_id))
}

/// Connection control for the push-event transport.
pub fn use_connection() -> SyncConnection {
    use_sync_context().connection()
}

/// The authenticated user, set by login or the server's welcome frame.
pub fn use_current_user() -> Signal<Option<UserId>> {
    use_sync_context().current_user()
}
