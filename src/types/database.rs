//! Database model (SlotMap-backed).
//!
//! Messages and nodes live in **SlotMap** arenas with stable keys ([`MessageKey`],
//! [`NodeKey`]); public iteration follows the **order vectors**, which keep the
//! insertion (file) order. Lookups by name and by masked frame id are derived caches,
//! regenerated by [`Database::refresh`] after every schema change.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::dbc;
use crate::options::{DecodeOptions, EncodeOptions};
use crate::codec::container::ContainedEntry;
use crate::types::{
    attributes::{AttributeDefinition, Attributes, RelationAttribute},
    errors::{Error, LookupError, SchemaError},
    message::{DecodedMessage, Message},
    node::{Bus, EnvironmentVariable, Node},
    value::{Comments, SignalMap, ValueTable},
};

// --- Stable keys (SlotMap) ---
new_key_type! { pub struct MessageKey; }
new_key_type! { pub struct NodeKey; }

/// Message reference accepted by the encode/decode entry points: frame id or name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageRef {
    FrameId(u32),
    Name(String),
}

impl From<u32> for MessageRef {
    fn from(frame_id: u32) -> Self {
        MessageRef::FrameId(frame_id)
    }
}

impl From<&str> for MessageRef {
    fn from(name: &str) -> Self {
        MessageRef::Name(name.to_string())
    }
}

impl From<String> for MessageRef {
    fn from(name: String) -> Self {
        MessageRef::Name(name)
    }
}

impl From<&String> for MessageRef {
    fn from(name: &String) -> Self {
        MessageRef::Name(name.clone())
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRef::FrameId(id) => write!(f, "0x{id:X}"),
            MessageRef::Name(name) => f.write_str(name),
        }
    }
}

/// In-memory CAN database.
///
/// # Example
/// ```
/// use can_database::{Database, EncodeOptions, Message, Signal, SignalMap};
///
/// let mut db = Database::new();
/// db.add_message(Message::new(0x10, "Status", 1, vec![Signal::new("Counter", 0, 8)]))
///     .unwrap();
/// let mut data = SignalMap::new();
/// data.insert("Counter".into(), 3.into());
/// assert_eq!(db.encode_message("Status", &data, &EncodeOptions::default()).unwrap(), vec![3]);
/// assert_eq!(db.get_message_by_frame_id(0x10).unwrap().name(), "Status");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Database {
    // --- General information ---
    /// Version string (`VERSION`).
    pub version: Option<String>,
    pub comments: Comments,
    pub attributes: Attributes,

    // --- Side tables ---
    /// Flat table of attribute definitions; attributes refer to them by name.
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub relation_attributes: Vec<RelationAttribute>,
    pub value_tables: Vec<ValueTable>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub buses: Vec<Bus>,

    // --- Main storage (stable-key maps) ---
    messages: SlotMap<MessageKey, Message>,
    nodes: SlotMap<NodeKey, Node>,

    // --- Order "views" ---
    messages_order: Vec<MessageKey>,
    nodes_order: Vec<NodeKey>,

    frame_id_mask: u32,
    strict: bool,

    // --- Lookups ---
    msg_key_by_name: HashMap<String, MessageKey>,
    msg_key_by_frame_id: HashMap<u32, MessageKey>, // masked frame id → MessageKey
    node_key_by_name: HashMap<String, NodeKey>,
}

impl Default for Database {
    fn default() -> Self {
        Database::with_options(true, 0xFFFF_FFFF)
    }
}

impl Database {
    /// Empty strict database without frame id mask.
    pub fn new() -> Self {
        Database::default()
    }

    /// Empty database; `strict` applies to every message added later.
    pub fn with_options(strict: bool, frame_id_mask: u32) -> Self {
        Database {
            version: None,
            comments: Comments::default(),
            attributes: Attributes::default(),
            attribute_definitions: Vec::new(),
            relation_attributes: Vec::new(),
            value_tables: Vec::new(),
            environment_variables: Vec::new(),
            buses: Vec::new(),
            messages: SlotMap::with_key(),
            nodes: SlotMap::with_key(),
            messages_order: Vec::new(),
            nodes_order: Vec::new(),
            frame_id_mask,
            strict,
            msg_key_by_name: HashMap::new(),
            msg_key_by_frame_id: HashMap::new(),
            node_key_by_name: HashMap::new(),
        }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn frame_id_mask(&self) -> u32 {
        self.frame_id_mask
    }

    // --------- Messages --------

    /// Validates and appends a message.
    ///
    /// # Errors
    /// - [`SchemaError::DuplicateMessageName`] if a message with the same name exists.
    /// - Any error of [`Message::refresh`] under the database's strictness.
    pub fn add_message(&mut self, mut message: Message) -> Result<MessageKey, SchemaError> {
        if self.msg_key_by_name.contains_key(message.name()) {
            return Err(SchemaError::DuplicateMessageName {
                name: message.name().to_string(),
            });
        }
        message.refresh(self.strict)?;
        let key: MessageKey = self.messages.insert(message);
        self.messages_order.push(key);
        self.index_message(key);
        Ok(key)
    }

    /// Removes a message; returns it if it existed.
    pub fn remove_message(&mut self, message: impl Into<MessageRef>) -> Option<Message> {
        let key: MessageKey = self.message_key(&message.into()).ok()?;
        self.messages_order.retain(|k| *k != key);
        let removed: Option<Message> = self.messages.remove(key);
        self.rebuild_lookups();
        removed
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages_order
            .iter()
            .filter_map(|key| self.messages.get(*key))
    }

    /// Messages in insertion order, with their keys.
    pub fn iter_messages(&self) -> impl Iterator<Item = (MessageKey, &Message)> {
        self.messages_order
            .iter()
            .filter_map(|key| self.messages.get(*key).map(|m| (*key, m)))
    }

    pub fn message_count(&self) -> usize {
        self.messages_order.len()
    }

    pub fn get_message_by_key(&self, key: MessageKey) -> Option<&Message> {
        self.messages.get(key)
    }

    /// Returns the message called `name` (case sensitive).
    pub fn get_message_by_name(&self, name: &str) -> Result<&Message, LookupError> {
        self.msg_key_by_name
            .get(name)
            .and_then(|key| self.messages.get(*key))
            .ok_or_else(|| LookupError::MessageName(name.to_string()))
    }

    /// Returns the message whose masked frame id equals `frame_id & mask`.
    ///
    /// When several messages share a masked id the last one added wins.
    pub fn get_message_by_frame_id(&self, frame_id: u32) -> Result<&Message, LookupError> {
        self.msg_key_by_frame_id
            .get(&(frame_id & self.frame_id_mask))
            .and_then(|key| self.messages.get(*key))
            .ok_or(LookupError::FrameId(frame_id))
    }

    /// Returns a message by frame id or name.
    pub fn get_message(&self, message: impl Into<MessageRef>) -> Result<&Message, LookupError> {
        match message.into() {
            MessageRef::FrameId(id) => self.get_message_by_frame_id(id),
            MessageRef::Name(name) => self.get_message_by_name(&name),
        }
    }

    /// Runs `f` on a copy of a message and stores the copy once it validates.
    ///
    /// On error the database is left unchanged.
    pub fn update_message<F, R>(&mut self, message: impl Into<MessageRef>, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Message) -> R,
    {
        let key: MessageKey = self.message_key(&message.into())?;
        let Some(current) = self.messages.get(key) else {
            return Err(LookupError::MessageName(String::new()).into());
        };
        let mut updated: Message = current.clone();
        let result: R = f(&mut updated);
        updated.refresh(self.strict)?;
        if self
            .iter_messages()
            .any(|(other, m)| other != key && m.name() == updated.name())
        {
            return Err(SchemaError::DuplicateMessageName {
                name: updated.name().to_string(),
            }
            .into());
        }
        if let Some(slot) = self.messages.get_mut(key) {
            *slot = updated;
        }
        self.rebuild_lookups();
        Ok(result)
    }

    fn message_key(&self, message: &MessageRef) -> Result<MessageKey, LookupError> {
        match message {
            MessageRef::FrameId(id) => self
                .msg_key_by_frame_id
                .get(&(id & self.frame_id_mask))
                .copied()
                .ok_or(LookupError::FrameId(*id)),
            MessageRef::Name(name) => self
                .msg_key_by_name
                .get(name)
                .copied()
                .ok_or_else(|| LookupError::MessageName(name.clone())),
        }
    }

    // --------- Nodes --------

    pub fn add_node(&mut self, node: Node) -> Result<NodeKey, SchemaError> {
        if self.node_key_by_name.contains_key(&node.name) {
            return Err(SchemaError::DuplicateNodeName { name: node.name });
        }
        let name: String = node.name.clone();
        let key: NodeKey = self.nodes.insert(node);
        self.nodes_order.push(key);
        self.node_key_by_name.insert(name, key);
        Ok(key)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_order.iter().filter_map(|key| self.nodes.get(*key))
    }

    pub fn get_node_by_key(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_node_by_name(&self, name: &str) -> Result<&Node, LookupError> {
        self.node_key_by_name
            .get(name)
            .and_then(|key| self.nodes.get(*key))
            .ok_or_else(|| LookupError::NodeName(name.to_string()))
    }

    /// Runs `f` on a copy of a node and stores the copy unless its name clashes.
    pub fn update_node<F, R>(&mut self, name: &str, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut Node) -> R,
    {
        let key: NodeKey = *self
            .node_key_by_name
            .get(name)
            .ok_or_else(|| LookupError::NodeName(name.to_string()))?;
        let Some(current) = self.nodes.get(key) else {
            return Err(LookupError::NodeName(name.to_string()).into());
        };
        let mut updated: Node = current.clone();
        let result: R = f(&mut updated);
        if self
            .node_key_by_name
            .get(&updated.name)
            .is_some_and(|other| *other != key)
        {
            return Err(SchemaError::DuplicateNodeName { name: updated.name }.into());
        }
        if let Some(slot) = self.nodes.get_mut(key) {
            *slot = updated;
        }
        self.rebuild_lookups();
        Ok(result)
    }

    // --------- Buses and side tables --------

    pub fn add_bus(&mut self, bus: Bus) {
        self.buses.push(bus);
    }

    pub fn get_bus_by_name(&self, name: &str) -> Result<&Bus, LookupError> {
        self.buses
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| LookupError::BusName(name.to_string()))
    }

    pub fn get_value_table(&self, name: &str) -> Option<&ValueTable> {
        self.value_tables.iter().find(|t| t.name == name)
    }

    /// Attribute definition by name; object attributes come before relation ones.
    pub fn attribute_definition(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attribute_definitions
            .iter()
            .filter(|d| d.name == name)
            .min_by_key(|d| d.object.is_relation())
    }

    // --------- Refresh --------

    /// Re-validates every message and regenerates the lookup tables.
    ///
    /// Idempotent. Duplicate masked frame ids are reported with a warning; the last
    /// message keeps the id.
    pub fn refresh(&mut self) -> Result<(), SchemaError> {
        for key in &self.messages_order {
            if let Some(message) = self.messages.get_mut(*key) {
                message.refresh(self.strict)?;
            }
        }
        self.rebuild_lookups();

        let mut seen: HashSet<&str> = HashSet::new();
        for message in self.messages() {
            if !seen.insert(message.name()) {
                return Err(SchemaError::DuplicateMessageName {
                    name: message.name().to_string(),
                });
            }
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for node in self.nodes() {
            if !seen.insert(node.name.as_str()) {
                return Err(SchemaError::DuplicateNodeName {
                    name: node.name.clone(),
                });
            }
        }
        debug!(
            "database refreshed: {} messages, {} nodes",
            self.messages_order.len(),
            self.nodes_order.len()
        );
        Ok(())
    }

    fn rebuild_lookups(&mut self) {
        self.msg_key_by_name.clear();
        self.msg_key_by_frame_id.clear();
        self.node_key_by_name.clear();
        for key in self.messages_order.clone() {
            self.index_message(key);
        }
        for key in &self.nodes_order {
            if let Some(node) = self.nodes.get(*key) {
                self.node_key_by_name.insert(node.name.clone(), *key);
            }
        }
    }

    fn index_message(&mut self, key: MessageKey) {
        let Some(message) = self.messages.get(key) else {
            return;
        };
        let masked: u32 = message.frame_id() & self.frame_id_mask;
        if let Some(previous) = self.msg_key_by_frame_id.insert(masked, key)
            && previous != key
            && let Some(other) = self.messages.get(previous)
        {
            warn!(
                "Overwriting message '{}' with '{}' in the frame id lookup, as both have frame id 0x{:X} after masking",
                other.name(),
                message.name(),
                masked
            );
        }
        self.msg_key_by_name.insert(message.name().to_string(), key);
    }

    // --------- Encode / decode --------

    /// Encodes `data` into the payload of a message given by frame id or name.
    pub fn encode_message(
        &self,
        message: impl Into<MessageRef>,
        data: &SignalMap,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, Error> {
        let msg: &Message = self.get_message(message)?;
        Ok(msg.encode(data, options)?)
    }

    /// Encodes the entries of a container message given by frame id or name.
    pub fn encode_container(
        &self,
        message: impl Into<MessageRef>,
        entries: &[ContainedEntry],
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, Error> {
        let msg: &Message = self.get_message(message)?;
        Ok(msg.encode_container(entries, options)?)
    }

    /// Decodes the payload of a message given by frame id or name.
    pub fn decode_message(
        &self,
        message: impl Into<MessageRef>,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<DecodedMessage, Error> {
        let msg: &Message = self.get_message(message)?;
        Ok(msg.decode(data, options)?)
    }

    /// Decodes a stream of `(frame id, payload)` frames.
    ///
    /// Yields one result per frame; a frame that fails to decode does not stop the stream.
    pub fn decode_frames<'a, I, B>(
        &'a self,
        frames: I,
        options: DecodeOptions,
    ) -> impl Iterator<Item = Result<(&'a Message, DecodedMessage), Error>> + 'a
    where
        I: IntoIterator<Item = (u32, B)>,
        I::IntoIter: 'a,
        B: AsRef<[u8]>,
    {
        frames.into_iter().map(move |(frame_id, data)| {
            let msg: &Message = self.get_message_by_frame_id(frame_id)?;
            let decoded: DecodedMessage = msg.decode(data.as_ref(), &options)?;
            Ok((msg, decoded))
        })
    }

    /// Serializes the database to DBC text (`\r\n` line endings).
    pub fn as_dbc_string(&self) -> String {
        dbc::save::to_dbc_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::signal::Signal;
    use crate::types::value::SignalValue;

    fn build_test_db() -> Database {
        let mut db: Database = Database::with_options(true, 0xFFFF_FFFF);
        db.add_node(Node::new("Gateway")).expect("node");
        db.add_message(Message::new(0x100, "First", 2, vec![Signal::new("A", 0, 16)]))
            .expect("first");
        db.add_message(Message::new(0x200, "Second", 1, vec![Signal::new("B", 0, 8)]))
            .expect("second");
        db
    }

    #[test]
    fn test_lookups() {
        let db: Database = build_test_db();
        assert_eq!(db.get_message_by_name("First").map(|m| m.frame_id()), Ok(0x100));
        assert_eq!(db.get_message_by_frame_id(0x200).map(|m| m.name()), Ok("Second"));
        assert_eq!(db.get_message_by_frame_id(0x300), Err(LookupError::FrameId(0x300)));
        assert!(db.get_message_by_name("first").is_err());
        assert!(db.get_node_by_name("Gateway").is_ok());
        assert!(db.get_bus_by_name("None").is_err());
        let names: Vec<&str> = db.messages().map(|m| m.name()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut db: Database = build_test_db();
        let err = db.add_message(Message::new(0x300, "First", 1, Vec::new()));
        assert!(matches!(err, Err(SchemaError::DuplicateMessageName { .. })));
        let err = db.add_node(Node::new("Gateway"));
        assert!(matches!(err, Err(SchemaError::DuplicateNodeName { .. })));
    }

    #[test]
    fn test_masked_frame_ids_last_wins() {
        let mut db: Database = Database::with_options(true, 0xFF);
        db.add_message(Message::new(0x101, "A", 1, Vec::new())).expect("a");
        db.add_message(Message::new(0x201, "B", 1, Vec::new())).expect("b");
        assert_eq!(db.get_message_by_frame_id(0x001).map(|m| m.name()), Ok("B"));
        assert_eq!(db.get_message_by_frame_id(0x101).map(|m| m.name()), Ok("B"));
        db.refresh().expect("refresh");
        db.refresh().expect("idempotent");
        assert_eq!(db.get_message_by_frame_id(0x301).map(|m| m.name()), Ok("B"));
    }

    #[test]
    fn test_update_message_refreshes_lookups() {
        let mut db: Database = build_test_db();
        db.update_message("First", |m| m.set_frame_id(0x123)).expect("update");
        assert!(db.get_message_by_frame_id(0x100).is_err());
        assert_eq!(db.get_message_by_frame_id(0x123).map(|m| m.name()), Ok("First"));
        let err = db.update_message("First", |m| m.set_length(1));
        assert!(matches!(err, Err(Error::Schema(SchemaError::SignalOutOfBounds { .. }))));
        assert_eq!(db.get_message_by_name("First").map(|m| m.length()), Ok(2));
    }

    #[test]
    fn test_failed_update_leaves_database_unchanged() {
        let mut db: Database = build_test_db();
        db.add_node(Node::new("Motor")).expect("node");
        let before: String = db.as_dbc_string();

        let err = db.update_message("Second", |m| m.set_name("First"));
        assert!(matches!(
            err,
            Err(Error::Schema(SchemaError::DuplicateMessageName { .. }))
        ));
        let names: Vec<&str> = db.messages().map(|m| m.name()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(db.get_message_by_name("First").map(|m| m.frame_id()), Ok(0x100));
        assert_eq!(db.get_message_by_name("Second").map(|m| m.frame_id()), Ok(0x200));

        let err = db.update_node("Motor", |n| n.name = "Gateway".to_string());
        assert!(matches!(err, Err(Error::Schema(SchemaError::DuplicateNodeName { .. }))));
        assert!(db.get_node_by_name("Motor").is_ok());
        assert_eq!(db.as_dbc_string(), before);

        db.update_node("Motor", |n| n.name = "Engine".to_string()).expect("rename");
        assert!(db.get_node_by_name("Engine").is_ok());
        assert!(db.get_node_by_name("Motor").is_err());
    }

    #[test]
    fn test_decode_frames_continues_after_errors() {
        let db: Database = build_test_db();
        let frames: Vec<(u32, Vec<u8>)> = vec![(0x100, vec![1, 0]), (0x999, vec![0]), (0x200, vec![])];
        let results: Vec<Result<(&Message, DecodedMessage), Error>> =
            db.decode_frames(frames, DecodeOptions::default()).collect();
        assert_eq!(results.len(), 3);
        let (msg, decoded) = results[0].as_ref().expect("first frame");
        assert_eq!(msg.name(), "First");
        assert_eq!(decoded.signals().map(|s| s["A"].clone()), Some(SignalValue::Integer(1)));
        assert!(matches!(results[1], Err(Error::Lookup(LookupError::FrameId(0x999)))));
        assert!(matches!(results[2], Err(Error::Decode(_))));
    }

    #[test]
    fn test_remove_message() {
        let mut db: Database = build_test_db();
        assert!(db.remove_message(0x100u32).is_some());
        assert_eq!(db.message_count(), 1);
        assert!(db.get_message_by_name("First").is_err());
    }
}
