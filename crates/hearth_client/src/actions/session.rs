//! Session actions: login and initialization.
//!
//! Both run under fixed deduplication keys: they have no natural request
//! identifier, so a double-click or component re-render must not fire the
//! side effect twice.

use serde::Deserialize;
use serde_json::json;

use hearth_common::{ApiError, PageMeta};
use hearth_model::{Household, ListKey, Member, Record, UserId};

use crate::actions::ops;
use crate::client::HearthClient;
use crate::mutation::MutationPlan;
use crate::transport::ApiCall;

/// Login form data. Credential transport (tokens, cookies) is handled by the
/// request transport implementation.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Everything the app needs to render its first screen.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub user_id: UserId,
    pub households: Vec<Household>,
    pub members: Vec<Member>,
}

impl HearthClient {
    /// Authenticate. Deduplicated under `session.login`: concurrent calls
    /// share one dispatch and one result.
    pub async fn login(&self, credentials: Credentials) -> Result<UserId, ApiError> {
        let call = ApiCall::new(
            "session",
            "login",
            json!({ "email": credentials.email, "password": credentials.password }),
        );
        let plan = MutationPlan::new(ops::SESSION_LOGIN, call).dedupe("session.login");
        let reply = self.mutator().run(plan, None).await?;

        #[derive(Deserialize)]
        struct LoginReply {
            user_id: UserId,
        }
        let LoginReply { user_id } = reply.decode()?;
        self.set_current_user(Some(user_id.clone()));
        Ok(user_id)
    }

    /// Load the session's households and memberships into the store.
    /// Deduplicated under `session.initialize`.
    pub async fn initialize(&self) -> Result<SessionInfo, ApiError> {
        self.tracker().begin(ops::SESSION_INITIALIZE);

        let transport = self.transport().clone();
        let result = self
            .dedupe()
            .dedupe("session.initialize", move || {
                transport.call(ApiCall::new("session", "initialize", json!({})))
            })
            .await;

        let outcome = match result {
            Ok(reply) => reply.decode::<SessionInfo>(),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(info) => {
                self.store().write(|store| {
                    store.merge_page(
                        &ListKey::root(),
                        info.households.clone(),
                        &PageMeta::done(),
                        true,
                    );
                    for member in info.members.clone() {
                        store.upsert(member.into_entity());
                    }
                });
                self.set_current_user(Some(info.user_id.clone()));
                self.tracker().succeed(ops::SESSION_INITIALIZE);
                Ok(info)
            }
            Err(err) => {
                self.tracker().fail(ops::SESSION_INITIALIZE, err.to_string());
                Err(err)
            }
        }
    }
}
