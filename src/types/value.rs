use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Map of signal name → value, used both as encode input and decode output.
///
/// A `BTreeMap` keeps the keys sorted, so printing a decoded message is deterministic.
pub type SignalMap = BTreeMap<String, SignalValue>;

/// A raw integer paired with its display name, as declared by a `VAL_` entry.
///
/// Compares equal to its integer value and to its name, so a decoded choice can be
/// checked either way:
///
/// ```
/// use can_database::NamedSignalValue;
/// let v = NamedSignalValue::new(1, "Enabled");
/// assert!(v == 1);
/// assert!(v == "Enabled");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedSignalValue {
    /// Raw value of the entry.
    pub value: i64,
    /// Display name.
    pub name: String,
    /// Per-language descriptions of the entry (empty for DBC sources).
    #[serde(default)]
    pub comments: BTreeMap<String, String>,
}

impl NamedSignalValue {
    pub fn new(value: i64, name: impl Into<String>) -> Self {
        NamedSignalValue {
            value,
            name: name.into(),
            comments: BTreeMap::new(),
        }
    }
}

impl PartialEq<i64> for NamedSignalValue {
    fn eq(&self, other: &i64) -> bool {
        self.value == *other
    }
}

impl PartialEq<str> for NamedSignalValue {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for NamedSignalValue {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl fmt::Display for NamedSignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Physical (or raw, when scaling is disabled) value of a single signal.
///
/// - `Integer`: exact integer; wide enough for both `u64` and `i64` fields.
/// - `Float`: non-integral scaled values and IEEE float signals.
/// - `Named`: a decoded choice.
/// - `Choice`: a choice given by name only (encode input).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignalValue {
    Integer(i128),
    Float(f64),
    Named(NamedSignalValue),
    Choice(String),
}

impl SignalValue {
    /// Numeric view of the value; `None` for choice names.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Integer(v) => Some(*v as f64),
            SignalValue::Float(v) => Some(*v),
            SignalValue::Named(n) => Some(n.value as f64),
            SignalValue::Choice(_) => None,
        }
    }

    /// Integer view of the value. Floats are accepted only when integral.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            SignalValue::Integer(v) => Some(*v),
            SignalValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i128),
            SignalValue::Float(_) => None,
            SignalValue::Named(n) => Some(n.value as i128),
            SignalValue::Choice(_) => None,
        }
    }

    /// Name of the choice, if this value designates one.
    pub fn choice_name(&self) -> Option<&str> {
        match self {
            SignalValue::Named(n) => Some(&n.name),
            SignalValue::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SignalValue::Integer(_) | SignalValue::Float(_))
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{v}"),
            SignalValue::Float(v) => write!(f, "{v}"),
            SignalValue::Named(n) => write!(f, "{}", n.name),
            SignalValue::Choice(s) => write!(f, "{s}"),
        }
    }
}

macro_rules! signal_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SignalValue {
                fn from(v: $t) -> Self {
                    SignalValue::Integer(v as i128)
                }
            }
        )*
    };
}

signal_value_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<f64> for SignalValue {
    fn from(v: f64) -> Self {
        SignalValue::Float(v)
    }
}

impl From<f32> for SignalValue {
    fn from(v: f32) -> Self {
        SignalValue::Float(v as f64)
    }
}

impl From<&str> for SignalValue {
    fn from(v: &str) -> Self {
        SignalValue::Choice(v.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(v: String) -> Self {
        SignalValue::Choice(v)
    }
}

impl From<NamedSignalValue> for SignalValue {
    fn from(v: NamedSignalValue) -> Self {
        SignalValue::Named(v)
    }
}

impl PartialEq<i64> for SignalValue {
    fn eq(&self, other: &i64) -> bool {
        match self {
            SignalValue::Integer(v) => *v == *other as i128,
            SignalValue::Float(v) => *v == *other as f64,
            SignalValue::Named(n) => n.value == *other,
            SignalValue::Choice(_) => false,
        }
    }
}

impl PartialEq<&str> for SignalValue {
    fn eq(&self, other: &&str) -> bool {
        self.choice_name() == Some(*other)
    }
}

/// Ordered enumeration of a signal (`VAL_`) or of a global value table (`VAL_TABLE_`).
///
/// Entries keep their declaration order, which is also the order they are written back.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Choices {
    entries: Vec<NamedSignalValue>,
    #[serde(skip)]
    index: HashMap<i64, usize>,
}

impl Choices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry; an existing entry with the same value is replaced in place.
    pub fn insert(&mut self, entry: NamedSignalValue) {
        match self.position(entry.value) {
            Some(pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.value, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, value: i64) -> Option<&NamedSignalValue> {
        self.position(value).map(|pos| &self.entries[pos])
    }

    /// Reverse lookup: raw value of the entry called `name`.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    pub fn contains(&self, value: i64) -> bool {
        self.position(value).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedSignalValue> {
        self.entries.iter()
    }

    /// Mutable access to the entry names only; values stay indexed.
    pub(crate) fn names_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.entries.iter_mut().map(|entry| &mut entry.name)
    }

    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.iter().map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, value: i64) -> Option<usize> {
        // the index is not serialized, fall back to a scan after deserialization
        if self.index.len() == self.entries.len() {
            self.index.get(&value).copied()
        } else {
            self.entries.iter().position(|entry| entry.value == value)
        }
    }
}

impl PartialEq for Choices {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<(i64, String)> for Choices {
    fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
        let mut choices: Choices = Choices::new();
        for (value, name) in iter {
            choices.insert(NamedSignalValue::new(value, name));
        }
        choices
    }
}

impl<'a> FromIterator<(i64, &'a str)> for Choices {
    fn from_iter<T: IntoIterator<Item = (i64, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(value, name)| (value, name.to_string()))
            .collect()
    }
}

/// Global, named enumeration (`VAL_TABLE_`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueTable {
    pub name: String,
    pub choices: Choices,
}

/// Comments attached to a database object, keyed by language.
///
/// DBC only knows a single, language-less comment; other front-ends may provide
/// several translations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Comments {
    default: Option<String>,
    languages: BTreeMap<String, String>,
}

impl Comments {
    pub fn new(text: impl Into<String>) -> Self {
        Comments {
            default: Some(text.into()),
            languages: BTreeMap::new(),
        }
    }

    /// The language-less comment, or the English one, or any.
    pub fn get(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.languages.get("EN").map(String::as_str))
            .or_else(|| self.languages.values().next().map(String::as_str))
    }

    pub fn get_language(&self, language: &str) -> Option<&str> {
        self.languages.get(language).map(String::as_str)
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.default = Some(text.into());
    }

    pub fn set_language(&mut self, language: impl Into<String>, text: impl Into<String>) {
        self.languages.insert(language.into(), text.into());
    }

    pub fn clear(&mut self) {
        self.default = None;
        self.languages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.languages.is_empty()
    }
}
