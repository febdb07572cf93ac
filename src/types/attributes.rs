use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute definition as declared by `BA_DEF_` (or `BA_DEF_REL_`) lines, together
/// with the default provided by `BA_DEF_DEF_`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name.
    pub name: String,
    /// Which kind of object the attribute applies to.
    pub object: AttrObject,
    /// Declared type and bounds.
    pub value_type: AttrValueType,
    /// Default value from `BA_DEF_DEF_`.
    pub default: Option<AttributeValue>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, object: AttrObject, value_type: AttrValueType) -> Self {
        AttributeDefinition {
            name: name.into(),
            object,
            value_type,
            default: None,
        }
    }

    /// Coerces a value read from a DBC file to the declared type.
    ///
    /// Numbers are kept as their text so `INT`/`HEX` values never pass through a float.
    /// `ENUM` values may be given either as index or as label and are stored as label.
    pub fn coerce(&self, value: &RawAttributeValue) -> Option<AttributeValue> {
        match (&self.value_type, value) {
            (AttrValueType::Int { .. }, RawAttributeValue::Number(text)) => {
                parse_integer(text).map(AttributeValue::Int)
            }
            (AttrValueType::Hex { .. }, RawAttributeValue::Number(text)) => parse_integer(text)
                .and_then(|v| u64::try_from(v).ok())
                .map(AttributeValue::Hex),
            (AttrValueType::Float { .. }, RawAttributeValue::Number(text)) => {
                text.parse::<f64>().ok().map(AttributeValue::Float)
            }
            (AttrValueType::String, RawAttributeValue::Str(s)) => Some(AttributeValue::Str(s.clone())),
            (AttrValueType::String, RawAttributeValue::Number(text)) => {
                Some(AttributeValue::Str(text.clone()))
            }
            (AttrValueType::Enum(values), RawAttributeValue::Number(text)) => parse_integer(text)
                .and_then(|idx| usize::try_from(idx).ok())
                .and_then(|idx| values.get(idx))
                .map(|label| AttributeValue::Enum(label.clone())),
            (AttrValueType::Enum(_), RawAttributeValue::Str(s)) => Some(AttributeValue::Enum(s.clone())),
            // numbers written as strings, seen in the wild
            (_, RawAttributeValue::Str(s)) => self.coerce(&RawAttributeValue::Number(s.trim().to_string())),
        }
    }

    /// Index of an enum label, as written in `BA_` lines.
    pub fn enum_index(&self, label: &str) -> Option<usize> {
        match &self.value_type {
            AttrValueType::Enum(values) => values.iter().position(|v| v == label),
            _ => None,
        }
    }
}

/// Attribute value types with their bounds.
///
/// `Display` renders the DBC signature, e.g. `INT 0 65535` or `ENUM "Cyclic","Event"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValueType {
    Int { minimum: i64, maximum: i64 },
    Hex { minimum: u64, maximum: u64 },
    Float { minimum: f64, maximum: f64 },
    String,
    Enum(Vec<String>),
}

impl fmt::Display for AttrValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValueType::Int { minimum, maximum } => write!(f, "INT {minimum} {maximum}"),
            AttrValueType::Hex { minimum, maximum } => write!(f, "HEX {minimum} {maximum}"),
            AttrValueType::Float { minimum, maximum } => write!(f, "FLOAT {minimum} {maximum}"),
            AttrValueType::String => f.write_str("STRING"),
            AttrValueType::Enum(values) => {
                f.write_str("ENUM ")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "\"{}\"", escape(value))?;
                }
                Ok(())
            }
        }
    }
}

/// Concrete attribute value stored on DB/Node/Message/Signal entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Hex(u64), // memorize as a number, proper display later.
    Float(f64),
    Enum(String),
}

impl AttributeValue {
    /// Numeric view used for well-known attributes such as `GenMsgCycleTime`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Hex(v) => i64::try_from(*v).ok(),
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            AttributeValue::Str(s) | AttributeValue::Enum(s) => s.trim().parse::<i64>().ok(),
            AttributeValue::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) | AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "{}", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Hex(h) => write!(f, "0x{:X}", h),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Enum(s) => write!(f, "{}", s),
        }
    }
}

/// Attribute value as found in the text, before it is matched with its definition.
#[derive(Clone, Debug, PartialEq)]
pub enum RawAttributeValue {
    Number(String),
    Str(String),
}

impl RawAttributeValue {
    /// Best-effort typing for values whose definition is missing.
    pub fn untyped(&self) -> AttributeValue {
        match self {
            RawAttributeValue::Str(s) => AttributeValue::Str(s.clone()),
            RawAttributeValue::Number(text) => match parse_integer(text) {
                Some(v) => AttributeValue::Int(v),
                None => AttributeValue::Float(text.parse::<f64>().unwrap_or_default()),
            },
        }
    }
}

/// Declares which entity kind an attribute targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrObject {
    #[default]
    Database,
    Node,
    Message,
    Signal,
    EnvironmentVariable,
    /// `BU_SG_REL_`: node ↔ signal relation.
    NodeSignal,
    /// `BU_BO_REL_`: node ↔ message relation.
    NodeMessage,
    /// `BU_EV_REL_`: node ↔ environment variable relation.
    NodeEnvironmentVariable,
}

impl AttrObject {
    /// DBC keyword of the object kind; empty for database attributes.
    pub fn keyword(&self) -> &'static str {
        match self {
            AttrObject::Database => "",
            AttrObject::Node => "BU_",
            AttrObject::Message => "BO_",
            AttrObject::Signal => "SG_",
            AttrObject::EnvironmentVariable => "EV_",
            AttrObject::NodeSignal => "BU_SG_REL_",
            AttrObject::NodeMessage => "BU_BO_REL_",
            AttrObject::NodeEnvironmentVariable => "BU_EV_REL_",
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            AttrObject::NodeSignal | AttrObject::NodeMessage | AttrObject::NodeEnvironmentVariable
        )
    }
}

impl fmt::Display for AttrObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttrObject::Database => "Database",
            AttrObject::Node => "Node",
            AttrObject::Message => "Message",
            AttrObject::Signal => "Signal",
            AttrObject::EnvironmentVariable => "EnvironmentVariable",
            AttrObject::NodeSignal => "NodeSignal",
            AttrObject::NodeMessage => "NodeMessage",
            AttrObject::NodeEnvironmentVariable => "NodeEnvironmentVariable",
        })
    }
}

/// Named attribute value attached to an object. The definition is looked up by name
/// in [`Database::attribute_definitions`](crate::Database::attribute_definitions).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// Ordered attribute list of one object; order is the order of appearance in the source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Sets `name`, keeping its position if already present.
    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        let name: String = name.into();
        match self.0.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Attribute { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let pos: usize = self.0.iter().position(|a| a.name == name)?;
        Some(self.0.remove(pos).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Target of a relation attribute (`BA_REL_`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RelationTarget {
    /// `BU_SG_REL_ <node> SG_ <frame id> <signal>`
    Signal { frame_id: u32, signal: String },
    /// `BU_BO_REL_ <node> <frame id>`
    Message { frame_id: u32 },
    /// `BU_EV_REL_ <node> <env var>`
    EnvironmentVariable { name: String },
}

/// Relation attribute: a value attached to a (node, message/signal/env var) pair.
/// Frame ids are stored in their DBC form (bit 31 set for extended frames).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationAttribute {
    pub name: String,
    pub node: String,
    pub target: RelationTarget,
    pub value: AttributeValue,
}

/// Definition of `name` for an object kind; falls back to any definition of that name.
pub(crate) fn find_definition<'a>(
    definitions: &'a [AttributeDefinition],
    name: &str,
    object: AttrObject,
) -> Option<&'a AttributeDefinition> {
    definitions
        .iter()
        .find(|d| d.name == name && d.object == object)
        .or_else(|| definitions.iter().find(|d| d.name == name))
}

/// Parses a decimal integer; tolerates a trailing `.0` and hexadecimal `0x` prefix.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    let text: &str = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let f: f64 = text.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

pub(crate) fn escape(input: &str) -> String {
    input.replace('"', "\\\"")
}
