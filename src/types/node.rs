use serde::{Deserialize, Serialize};

use crate::types::{attributes::Attributes, value::Comments};

/// A node (ECU) of the network, as listed by `BU_`.
///
/// # Example
/// ```
/// use can_database::Node;
///
/// let node = Node::new("Motor").with_comment("Controls engine-related functions");
/// assert_eq!(node.name, "Motor");
/// assert_eq!(node.comment(), Some("Controls engine-related functions"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub comments: Comments,
    pub attributes: Attributes,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.set(comment);
        self
    }

    /// Language-less (or English) comment.
    pub fn comment(&self) -> Option<&str> {
        self.comments.get()
    }
}

/// A bus of the database. DBC files describe at most one, through the
/// `DBName`, `Baudrate`, `BaudrateCANFD` and `BusType` attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,
    pub comments: Comments,
    /// Nominal bit rate in bit/s.
    pub baudrate: Option<u32>,
    /// Data-phase bit rate of CAN FD in bit/s.
    pub fd_baudrate: Option<u32>,
    /// `true` for a CAN FD bus.
    pub is_fd: bool,
}

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Bus {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Environment variable (`EV_`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    /// 0 = integer, 1 = float, 2 = string.
    pub env_type: u32,
    pub minimum: f64,
    pub maximum: f64,
    pub unit: String,
    pub initial_value: f64,
    pub env_id: u32,
    /// Access type token, e.g. `DUMMY_NODE_VECTOR0`.
    pub access_type: String,
    pub access_nodes: Vec<String>,
    pub comments: Comments,
    pub attributes: Attributes,
}
