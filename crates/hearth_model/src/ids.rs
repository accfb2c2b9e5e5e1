use serde::{Deserialize, Serialize};

/// Prefix of client-generated temporary identifiers.
///
/// Speculative entities carry a `tmp-<n>` id until the server's reply
/// substitutes the authoritative one.
pub const TEMP_ID_PREFIX: &str = "tmp-";

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// A client-generated temporary id, substituted on reconciliation.
            pub fn temp(n: u64) -> Self {
                Self(format!("{TEMP_ID_PREFIX}{n}"))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_temp(&self) -> bool {
                self.0.starts_with(TEMP_ID_PREFIX)
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(ThreadId);
define_id!(MessageId);
define_id!(PollId);
define_id!(
    /// Identifies one option inside a poll.
    OptionId
);
define_id!(VoteId);
define_id!(HouseholdId);
define_id!(MemberId);
define_id!(UserId);
define_id!(AttachmentId);
define_id!(ReactionId);
define_id!(MentionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_recognizable() {
        let id = MessageId::temp(3);
        assert_eq!(id.as_str(), "tmp-3");
        assert!(id.is_temp());
        assert!(!MessageId::new("msg-42").is_temp());
    }
}
