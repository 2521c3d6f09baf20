//! Opaque identifier newtypes.
//!
//! Every entity in the data model (§3) is keyed by an opaque UUID string.
//! Each gets its own newtype so the compiler catches a `WorkItemId` handed
//! to a function expecting a `DispatchId`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing [`Uuid`].
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Return the inner [`Uuid`].
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(WorkItemId, "Identifies one work item row.");
opaque_id!(PluginInstanceId, "Identifies one configured plugin instance.");
opaque_id!(DispatchId, "Identifies one run dispatch ledger row.");
opaque_id!(EffectId, "Identifies one effect outbox row.");
opaque_id!(ScheduledItemId, "Identifies one scheduled item row.");
opaque_id!(RoutineId, "Identifies one declarative routine.");
opaque_id!(RoutineRunId, "Identifies one routine evaluation receipt.");

/// A session key identifies a conversation/thread (e.g. `"chatsvc:12345"`,
/// `"repo:acme/x#42"`). Not an entity on its own — used as the shard key
/// across the Session Queue, Run Dispatcher, and Effect Outbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Build a session key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Durable mirror key for one Session Queue lane: `session_key:agent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueKey(String);

impl QueueKey {
    /// Build a queue key from a session key and agent id.
    #[must_use]
    pub fn new(session_key: &SessionKey, agent_id: &str) -> Self {
        Self(format!("{session_key}:{agent_id}"))
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QueueKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One normalized idempotency key alias for a work item.
///
/// Keys are trimmed and de-duplicated by the Ingress Router before storage
/// (§4.A algorithm step 1); this type does not itself enforce that — it is
/// a plain value type over whatever string survived normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap a raw string as an idempotency key without normalization.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_ids_are_unique_and_roundtrip() {
        let a = WorkItemId::new();
        let b = WorkItemId::new();
        assert_ne!(a, b);

        let json = serde_json::to_string(&a).unwrap();
        let back: WorkItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn queue_key_formats_as_session_colon_agent() {
        let session = SessionKey::new("chatsvc:12345");
        let key = QueueKey::new(&session, "agent-1");
        assert_eq!(key.as_str(), "chatsvc:12345:agent-1");
    }

    #[test]
    fn session_key_display_matches_inner_string() {
        let session = SessionKey::new("repo:acme/x#42");
        assert_eq!(session.to_string(), "repo:acme/x#42");
    }

    #[test]
    fn work_item_id_from_str_roundtrip() {
        let id = WorkItemId::new();
        let parsed: WorkItemId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
