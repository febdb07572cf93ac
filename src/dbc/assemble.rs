use log::{debug, warn};
use std::collections::HashMap;

use crate::dbc::core::sg_::NO_NODE;
use crate::dbc::records::{ObjectRef, Records};
use crate::options::LoadOptions;
use crate::types::{
    attributes::{
        AttrObject, AttributeDefinition, AttributeValue, Attributes, RawAttributeValue,
        RelationAttribute, RelationTarget, find_definition,
    },
    database::Database,
    errors::Error,
    message::Message,
    node::{Bus, EnvironmentVariable, Node},
    signal::Signal,
    value::{Choices, Comments},
};

/// Extended-frame flag of DBC frame ids.
pub(crate) const EXTENDED_FRAME_FLAG: u32 = 0x8000_0000;

/// Pseudo message holding signals that belong to no message.
const INDEPENDENT_SIGNALS_MESSAGE: &str = "VECTOR__INDEPENDENT_SIG_MSG";

// Well-known attributes feeding the data model.
pub(crate) const CYCLE_TIME: &str = "GenMsgCycleTime";
pub(crate) const SEND_TYPE: &str = "GenMsgSendType";
pub(crate) const FRAME_FORMAT: &str = "VFrameFormat";
pub(crate) const START_VALUE: &str = "GenSigStartValue";
const DB_NAME: &str = "DBName";
const BAUDRATE: &str = "Baudrate";
const BAUDRATE_FD: &str = "BaudrateCANFD";
const BUS_TYPE: &str = "BusType";

/// Message being assembled; signals are kept aside until the message is complete.
struct PendingMessage {
    message: Message,
    signals: Vec<Signal>,
}

struct Pending {
    messages: Vec<PendingMessage>,
    /// DBC frame id (with extended flag) → index in `messages`.
    by_frame_id: HashMap<u32, usize>,
}

impl Pending {
    fn message_mut(&mut self, frame_id: u32) -> Option<&mut PendingMessage> {
        let idx: usize = *self.by_frame_id.get(&frame_id)?;
        self.messages.get_mut(idx)
    }

    fn signal_mut(&mut self, frame_id: u32, name: &str) -> Option<&mut Signal> {
        self.message_mut(frame_id)?
            .signals
            .iter_mut()
            .find(|s| s.name == name)
    }
}

/// Builds a [`Database`] from the records of a DBC document.
///
/// Records are applied in a fixed order: nodes, attribute definitions, messages and
/// signals, comments, attribute values (and the fields derived from them), value
/// tables, extended multiplexing, senders, signal groups and float markers. References
/// to unknown objects are reported with a warning and ignored.
///
/// # Errors
/// Any [`SchemaError`](crate::SchemaError) raised while adding nodes and messages.
pub(crate) fn assemble(records: Records, options: &LoadOptions) -> Result<Database, Error> {
    let Records {
        version,
        nodes: node_names,
        value_tables,
        messages: message_records,
        environment_variables,
        comments,
        attribute_definitions,
        attribute_defaults,
        attributes,
        relation_attributes,
        choices,
        value_types,
        signal_groups,
        mux_values,
        senders,
    } = records;

    let mut db: Database = Database::with_options(options.strict, options.frame_id_mask);
    db.version = version;

    // --- Attribute definitions and their defaults ---
    let mut definitions: Vec<AttributeDefinition> = attribute_definitions;
    for default in attribute_defaults {
        let Some(def) = definitions
            .iter_mut()
            .find(|d| d.name == default.name && d.object.is_relation() == default.relation)
        else {
            warn!("Default value given for undefined attribute '{}'", default.name);
            continue;
        };
        def.default = Some(coerce(def, &default.value));
    }

    // --- Nodes ---
    let mut nodes: Vec<Node> = node_names.into_iter().map(Node::new).collect();
    let mut environment_variables: Vec<EnvironmentVariable> = environment_variables;

    // --- Messages and signals ---
    let mut pending: Pending = Pending {
        messages: Vec::with_capacity(message_records.len()),
        by_frame_id: HashMap::new(),
    };
    for record in message_records {
        if record.name == INDEPENDENT_SIGNALS_MESSAGE {
            debug!("Skipping pseudo message '{}'", record.name);
            continue;
        }
        let is_extended: bool = record.frame_id & EXTENDED_FRAME_FLAG != 0;
        let mut message: Message = Message::new(
            record.frame_id & !EXTENDED_FRAME_FLAG,
            record.name,
            record.length,
            Vec::new(),
        )
        .with_extended_frame(is_extended);
        if !record.sender.is_empty() && record.sender != NO_NODE {
            message.senders.push(record.sender);
        }
        if pending
            .by_frame_id
            .insert(record.frame_id, pending.messages.len())
            .is_some()
        {
            warn!(
                "Frame id {} is used by several messages; comments and attributes go to '{}'",
                record.frame_id,
                message.name()
            );
        }
        // signals are listed in reverse order in DBC files
        let signals: Vec<Signal> = record.signals.into_iter().rev().collect();
        pending.messages.push(PendingMessage { message, signals });
    }

    // --- Comments ---
    for comment in comments {
        let target: Option<&mut Comments> = match &comment.target {
            ObjectRef::Database => Some(&mut db.comments),
            ObjectRef::Node(name) => nodes
                .iter_mut()
                .find(|n| &n.name == name)
                .map(|n| &mut n.comments),
            ObjectRef::Message(frame_id) => pending
                .message_mut(*frame_id)
                .map(|m| &mut m.message.comments),
            ObjectRef::Signal(frame_id, name) => {
                pending.signal_mut(*frame_id, name).map(|s| &mut s.comments)
            }
            ObjectRef::EnvironmentVariable(name) => environment_variables
                .iter_mut()
                .find(|e| &e.name == name)
                .map(|e| &mut e.comments),
        };
        match target {
            Some(comments) => comments.set(comment.text),
            None => warn!("Ignoring comment of unknown object {:?}", comment.target),
        }
    }

    // --- Attribute values ---
    for attribute in attributes {
        let object: AttrObject = match &attribute.target {
            ObjectRef::Database => AttrObject::Database,
            ObjectRef::Node(_) => AttrObject::Node,
            ObjectRef::Message(_) => AttrObject::Message,
            ObjectRef::Signal(..) => AttrObject::Signal,
            ObjectRef::EnvironmentVariable(_) => AttrObject::EnvironmentVariable,
        };
        let value: AttributeValue =
            typed_value(&definitions, &attribute.name, object, &attribute.value);
        let target: Option<&mut Attributes> = match &attribute.target {
            ObjectRef::Database => Some(&mut db.attributes),
            ObjectRef::Node(name) => nodes
                .iter_mut()
                .find(|n| &n.name == name)
                .map(|n| &mut n.attributes),
            ObjectRef::Message(frame_id) => pending
                .message_mut(*frame_id)
                .map(|m| &mut m.message.attributes),
            ObjectRef::Signal(frame_id, name) => {
                pending.signal_mut(*frame_id, name).map(|s| &mut s.attributes)
            }
            ObjectRef::EnvironmentVariable(name) => environment_variables
                .iter_mut()
                .find(|e| &e.name == name)
                .map(|e| &mut e.attributes),
        };
        match target {
            Some(attributes) => attributes.set(attribute.name, value),
            None => warn!(
                "Ignoring attribute '{}' of unknown object {:?}",
                attribute.name, attribute.target
            ),
        }
    }

    // --- Fields derived from attributes ---
    let bus: Option<Bus> = bus_from_attributes(&db.attributes, &definitions);
    for entry in pending.messages.iter_mut() {
        let message: &mut Message = &mut entry.message;
        message.cycle_time = attribute_or_default(&message.attributes, &definitions, CYCLE_TIME)
            .and_then(|v| v.as_i64())
            .and_then(|v| u32::try_from(v).ok());
        message.send_type = attribute_or_default(&message.attributes, &definitions, SEND_TYPE)
            .and_then(|v| v.as_str().map(str::to_string));
        message.is_fd = attribute_or_default(&message.attributes, &definitions, FRAME_FORMAT)
            .and_then(|v| v.as_str().map(|s| s.contains("CAN_FD")))
            .unwrap_or(false);
        if let Some(bus) = &bus {
            message.bus_name = Some(bus.name.clone());
        }
        for signal in entry.signals.iter_mut() {
            signal.initial = attribute_or_default(&signal.attributes, &definitions, START_VALUE)
                .and_then(|v| v.as_i64())
                .map(i128::from);
        }
    }

    // --- Value tables ---
    db.value_tables = value_tables;
    for record in choices {
        match pending.signal_mut(record.frame_id, &record.signal) {
            Some(signal) => signal.choices = Some(record.choices),
            None => warn!(
                "Ignoring value descriptions of unknown signal '{}' (frame id {})",
                record.signal, record.frame_id
            ),
        }
    }

    // --- Extended multiplexing ---
    for record in mux_values {
        let Some(entry) = pending.message_mut(record.frame_id) else {
            warn!("SG_MUL_VAL_ refers to unknown frame id {}", record.frame_id);
            continue;
        };
        let Some(signal) = entry.signals.iter_mut().find(|s| s.name == record.signal) else {
            warn!(
                "SG_MUL_VAL_ refers to unknown signal '{}' of message '{}'",
                record.signal,
                entry.message.name()
            );
            continue;
        };
        let mut ids: Vec<i64> = signal.multiplexer_ids.take().unwrap_or_default();
        for (low, high) in record.ranges {
            if high < low || high.saturating_sub(low) > 0xFFFF {
                warn!(
                    "Ignoring multiplexer range {low}-{high} of signal '{}'",
                    record.signal
                );
                continue;
            }
            ids.extend(low..=high);
        }
        ids.sort_unstable();
        ids.dedup();
        signal.multiplexer_ids = Some(ids);
        signal.multiplexer_signal = Some(record.multiplexer.clone());
        if let Some(parent) = entry
            .signals
            .iter_mut()
            .find(|s| s.name == record.multiplexer)
        {
            parent.is_multiplexer = true;
        }
    }

    // --- Senders, signal groups, float markers ---
    for record in senders {
        let Some(entry) = pending.message_mut(record.frame_id) else {
            warn!("BO_TX_BU_ refers to unknown frame id {}", record.frame_id);
            continue;
        };
        for sender in record.senders {
            if sender != NO_NODE && !entry.message.senders.contains(&sender) {
                entry.message.senders.push(sender);
            }
        }
    }
    for record in signal_groups {
        match pending.message_mut(record.frame_id) {
            Some(entry) => entry.message.signal_groups.push(record.group),
            None => warn!("SIG_GROUP_ refers to unknown frame id {}", record.frame_id),
        }
    }
    for record in value_types {
        match pending.signal_mut(record.frame_id, &record.signal) {
            Some(signal) => match record.value_type {
                0 => signal.is_float = false,
                1 | 2 => signal.is_float = true,
                other => warn!("Unknown value type {other} of signal '{}'", record.signal),
            },
            None => warn!(
                "SIG_VALTYPE_ refers to unknown signal '{}' (frame id {})",
                record.signal, record.frame_id
            ),
        }
    }

    // --- Multiplexer parents and choice names ---
    for entry in pending.messages.iter_mut() {
        resolve_multiplexers(entry.message.name(), &mut entry.signals);
        if options.prune_choices {
            for signal in entry.signals.iter_mut() {
                if let Some(choices) = signal.choices.as_mut() {
                    prune_choices(choices);
                }
            }
        }
    }

    // --- Database ---
    for node in nodes {
        db.add_node(node)?;
    }
    for entry in pending.messages {
        let PendingMessage {
            mut message,
            signals,
        } = entry;
        message.set_signals(signals);
        db.add_message(message)?;
    }
    db.environment_variables = environment_variables;
    for record in relation_attributes {
        let object: AttrObject = match &record.target {
            RelationTarget::Signal { .. } => AttrObject::NodeSignal,
            RelationTarget::Message { .. } => AttrObject::NodeMessage,
            RelationTarget::EnvironmentVariable { .. } => {
                AttrObject::NodeEnvironmentVariable
            }
        };
        let value: AttributeValue = typed_value(&definitions, &record.name, object, &record.value);
        db.relation_attributes.push(RelationAttribute {
            name: record.name,
            node: record.node,
            target: record.target,
            value,
        });
    }
    db.attribute_definitions = definitions;
    if let Some(bus) = bus {
        db.add_bus(bus);
    }

    debug!(
        "DBC database assembled: {} messages, {} nodes, {} attribute definitions",
        db.message_count(),
        db.nodes().count(),
        db.attribute_definitions.len()
    );
    Ok(db)
}

/// Coerces a value to its definition's type; keeps an untyped value when it does not fit.
fn coerce(def: &AttributeDefinition, raw: &RawAttributeValue) -> AttributeValue {
    def.coerce(raw).unwrap_or_else(|| {
        warn!(
            "Value {:?} does not match the definition of attribute '{}' ({})",
            raw, def.name, def.value_type
        );
        raw.untyped()
    })
}

fn typed_value(
    definitions: &[AttributeDefinition],
    name: &str,
    object: AttrObject,
    raw: &RawAttributeValue,
) -> AttributeValue {
    match find_definition(definitions, name, object) {
        Some(def) => coerce(def, raw),
        None => {
            warn!("Attribute '{name}' has no definition");
            raw.untyped()
        }
    }
}

/// Value of `name` on an object, or the default of its definition.
pub(crate) fn attribute_or_default<'a>(
    attributes: &'a Attributes,
    definitions: &'a [AttributeDefinition],
    name: &str,
) -> Option<&'a AttributeValue> {
    attributes.get(name).or_else(|| {
        definitions
            .iter()
            .find(|d| d.name == name && !d.object.is_relation())
            .and_then(|d| d.default.as_ref())
    })
}

/// The bus described by the `DBName`, `Baudrate`, `BaudrateCANFD` and `BusType`
/// database attributes, if the database is named.
fn bus_from_attributes(attributes: &Attributes, definitions: &[AttributeDefinition]) -> Option<Bus> {
    let name: &str = attribute_or_default(attributes, definitions, DB_NAME)?.as_str()?;
    if name.is_empty() {
        return None;
    }
    let rate = |attr: &str| -> Option<u32> {
        attribute_or_default(attributes, definitions, attr)
            .and_then(|v| v.as_i64())
            .and_then(|v| u32::try_from(v).ok())
    };
    let mut bus: Bus = Bus::new(name);
    bus.baudrate = rate(BAUDRATE);
    bus.fd_baudrate = rate(BAUDRATE_FD);
    bus.is_fd = attribute_or_default(attributes, definitions, BUS_TYPE)
        .and_then(|v| v.as_str())
        .is_some_and(|s| s == "CAN FD");
    Some(bus)
}

/// Gives every `m<N>`-tagged signal without explicit parent the message's root
/// multiplexer (the `M` signal) as parent.
fn resolve_multiplexers(message: &str, signals: &mut [Signal]) {
    let root: Option<String> = signals
        .iter()
        .find(|s| s.is_multiplexer && s.multiplexer_ids.is_none())
        .map(|s| s.name.clone());
    for signal in signals.iter_mut() {
        if signal.multiplexer_signal.is_some() || signal.multiplexer_ids.is_none() {
            continue;
        }
        match &root {
            Some(root) => signal.multiplexer_signal = Some(root.clone()),
            None => {
                warn!(
                    "Signal '{}' of message '{}' is multiplexed, but the message has no multiplexer",
                    signal.name, message
                );
                signal.multiplexer_ids = None;
            }
        }
    }
}

/// Strips a `Prefix_` shared by every choice name, if all names keep a non-empty rest.
pub(crate) fn prune_choices(choices: &mut Choices) {
    if choices.len() < 2 {
        return;
    }
    let prefix_len: usize = {
        let mut names = choices.iter().map(|c| c.name.as_str());
        let Some(first) = names.next() else {
            return;
        };
        let common: usize = names.fold(first.len(), |len, name| {
            first[..len]
                .char_indices()
                .zip(name.chars())
                .find(|((_, a), b)| a != b)
                .map_or(len.min(name.len()), |((idx, _), _)| idx)
        });
        let Some(cut) = first[..common].rfind('_') else {
            return;
        };
        cut + 1
    };
    if choices.iter().any(|c| c.name.len() <= prefix_len) {
        return;
    }
    for name in choices.names_mut() {
        name.drain(..prefix_len);
    }
}
