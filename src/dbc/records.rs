//! Records collected from a DBC document, grouped by record kind, before they are
//! assembled into a [`Database`](crate::Database).
//!
//! Frame ids are kept in their DBC form (bit 31 flags extended frames).

use crate::types::{
    attributes::{AttributeDefinition, RawAttributeValue, RelationTarget},
    message::SignalGroup,
    node::EnvironmentVariable,
    signal::Signal,
    value::{Choices, ValueTable},
};

/// `BO_` record with its nested `SG_` records in file order. A `m<N>` tag leaves the
/// signal with `multiplexer_ids == [N]` and no `multiplexer_signal` yet.
#[derive(Clone, Debug)]
pub(crate) struct MessageRecord {
    pub frame_id: u32,
    pub name: String,
    pub length: usize,
    pub sender: String,
    pub signals: Vec<Signal>,
}

/// Object a `CM_` or `BA_` record is attached to.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ObjectRef {
    Database,
    Node(String),
    Message(u32),
    Signal(u32, String),
    EnvironmentVariable(String),
}

#[derive(Clone, Debug)]
pub(crate) struct CommentRecord {
    pub target: ObjectRef,
    pub text: String,
}

#[derive(Clone, Debug)]
pub(crate) struct AttributeRecord {
    pub name: String,
    pub target: ObjectRef,
    pub value: RawAttributeValue,
}

/// `BA_DEF_DEF_` / `BA_DEF_DEF_REL_` record.
#[derive(Clone, Debug)]
pub(crate) struct DefaultRecord {
    pub name: String,
    pub relation: bool,
    pub value: RawAttributeValue,
}

#[derive(Clone, Debug)]
pub(crate) struct RelationRecord {
    pub name: String,
    pub node: String,
    pub target: RelationTarget,
    pub value: RawAttributeValue,
}

/// `VAL_` record of a signal.
#[derive(Clone, Debug)]
pub(crate) struct ChoicesRecord {
    pub frame_id: u32,
    pub signal: String,
    pub choices: Choices,
}

/// `SIG_VALTYPE_` record: 1 = 32-bit float, 2 = 64-bit float.
#[derive(Clone, Debug)]
pub(crate) struct ValueTypeRecord {
    pub frame_id: u32,
    pub signal: String,
    pub value_type: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct SignalGroupRecord {
    pub frame_id: u32,
    pub group: SignalGroup,
}

/// `SG_MUL_VAL_` record: selector ranges of an extended-multiplexed signal.
#[derive(Clone, Debug)]
pub(crate) struct MuxValuesRecord {
    pub frame_id: u32,
    pub signal: String,
    pub multiplexer: String,
    pub ranges: Vec<(i64, i64)>,
}

#[derive(Clone, Debug)]
pub(crate) struct SendersRecord {
    pub frame_id: u32,
    pub senders: Vec<String>,
}

/// All records of a document, keyed by record kind, in order of appearance.
#[derive(Clone, Debug, Default)]
pub(crate) struct Records {
    pub version: Option<String>,
    pub nodes: Vec<String>,
    pub value_tables: Vec<ValueTable>,
    pub messages: Vec<MessageRecord>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub comments: Vec<CommentRecord>,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub attribute_defaults: Vec<DefaultRecord>,
    pub attributes: Vec<AttributeRecord>,
    pub relation_attributes: Vec<RelationRecord>,
    pub choices: Vec<ChoicesRecord>,
    pub value_types: Vec<ValueTypeRecord>,
    pub signal_groups: Vec<SignalGroupRecord>,
    pub mux_values: Vec<MuxValuesRecord>,
    pub senders: Vec<SendersRecord>,
}
