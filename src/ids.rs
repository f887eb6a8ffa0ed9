//! Identifier newtypes used across the change graph
//!
//! Every entity is referenced by a stable string id in flat maps rather
//! than by object reference, so graph structures stay acyclic at the
//! ownership level even when the edge topology is not.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a string-backed identifier newtype.
///
/// Serializes as a plain string (UUID or a server-assigned semantic id).
macro_rules! id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random id (UUID-based)
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wrap an existing id string
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id! {
    /// Primary identity of a component
    ComponentId
}

id! {
    /// Secondary node identity of a component (distinct namespace, 1:1 with
    /// [`ComponentId`])
    NodeId
}

id! {
    /// Identity of a socket on a node
    SocketId
}

id! {
    /// Identity of an edge between two sockets
    EdgeId
}

id! {
    /// Identity of a pending action
    ActionId
}

id! {
    /// Identity of the template an action was instantiated from
    ActionPrototypeId
}

id! {
    /// Identity of a change set
    ChangeSetId
}

id! {
    /// Identity of a workspace
    WorkspaceId
}

id! {
    /// Identity of an attribute value (dependent-value recomputation unit)
    AttributeValueId
}

/// Provisional ids are minted client-side for optimistic creations and
/// replaced by the server-assigned canonical id on confirmation.
const PROVISIONAL_PREFIX: &str = "temp-";

impl ComponentId {
    /// Mint a provisional id for a not-yet-confirmed component
    pub fn provisional() -> Self {
        Self(format!("{}component-{}", PROVISIONAL_PREFIX, Uuid::new_v4()))
    }

    /// True if this id was minted client-side and not yet reconciled
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }
}

impl NodeId {
    /// Mint a provisional id for a not-yet-confirmed node
    pub fn provisional() -> Self {
        Self(format!("{}node-{}", PROVISIONAL_PREFIX, Uuid::new_v4()))
    }

    /// True if this id was minted client-side and not yet reconciled
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }
}

impl EdgeId {
    /// Mint a provisional id for a not-yet-confirmed edge
    pub fn provisional() -> Self {
        Self(format!("{}edge-{}", PROVISIONAL_PREFIX, Uuid::new_v4()))
    }

    /// True if this id was minted client-side and not yet reconciled
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }
}

impl ActionId {
    /// Mint a provisional id for a not-yet-confirmed action
    pub fn provisional() -> Self {
        Self(format!("{}action-{}", PROVISIONAL_PREFIX, Uuid::new_v4()))
    }

    /// True if this id was minted client-side and not yet reconciled
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }
}
