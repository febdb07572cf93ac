//! Multiplex codec tree of a message.
//!
//! The root [`Codec`] holds the signals that are always present. Each multiplexer in a
//! node maps every selector value to a child codec holding the signals present for
//! that value, which may multiplex again.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::codec::{
    conversion::{
        DecodeContext, EncodeContext, RawValue, decode_value, encode_value, raw_from_bits,
    },
    layout::FieldLayout,
};
use crate::types::{
    errors::{DecodeError, EncodeError, SchemaError},
    signal::Signal,
    value::{SignalMap, SignalValue},
};

/// One node of the multiplex tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Codec {
    /// Indices into the message's signal list.
    pub signals: Vec<usize>,
    /// Layouts, parallel to `signals`.
    pub fields: Vec<FieldLayout>,
    /// 1-bits where no signal of this node lies.
    pub padding_mask: Vec<u8>,
    pub multiplexers: Vec<Multiplexer>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Multiplexer {
    /// Index of the selector signal.
    pub signal: usize,
    pub children: BTreeMap<i64, Codec>,
}

/// Plain signal name or a selector with its branches, as rendered by listing tools.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SignalTreeNode {
    Signal(String),
    Multiplexer {
        name: String,
        branches: BTreeMap<i64, Vec<SignalTreeNode>>,
    },
}

impl Codec {
    /// Builds the codec tree of `signals` for a `length`-byte payload.
    pub fn build(message: &str, signals: &[Signal], length: usize) -> Codec {
        build_node(message, signals, None, None, length)
    }

    /// Largest byte count required by any field of the tree.
    pub fn required_bytes(&self) -> usize {
        let own: usize = self
            .fields
            .iter()
            .map(FieldLayout::required_bytes)
            .max()
            .unwrap_or(0);
        self.multiplexers
            .iter()
            .flat_map(|m| m.children.values())
            .map(Codec::required_bytes)
            .fold(own, usize::max)
    }

    /// Checks that no two fields of one branch share a bit.
    ///
    /// Ownership of bits is inherited from the parent, so a branch conflicts with the
    /// signals always present but never with its siblings.
    pub fn check_overlaps(&self, message: &str, signals: &[Signal]) -> Result<(), SchemaError> {
        let bits: usize = self.required_bytes() * 8;
        let mut owners: Vec<Option<usize>> = vec![None; bits];
        self.check_overlaps_in(message, signals, &mut owners)
    }

    fn check_overlaps_in(
        &self,
        message: &str,
        signals: &[Signal],
        owners: &mut [Option<usize>],
    ) -> Result<(), SchemaError> {
        for (&index, field) in self.signals.iter().zip(&self.fields) {
            for bit in field.bits() {
                if let Some(owner) = owners[bit]
                    && owner != index
                {
                    return Err(SchemaError::FieldOverlap {
                        message: message.to_string(),
                        first: signals[owner].name.clone(),
                        second: signals[index].name.clone(),
                    });
                }
                owners[bit] = Some(index);
            }
        }
        for multiplexer in &self.multiplexers {
            for child in multiplexer.children.values() {
                let mut inherited: Vec<Option<usize>> = owners.to_vec();
                child.check_overlaps_in(message, signals, &mut inherited)?;
            }
        }
        Ok(())
    }

    /// Names of the signals active for the selector values found in `data`.
    pub fn gather<'s>(
        &self,
        signals: &'s [Signal],
        data: &SignalMap,
        ctx: &EncodeContext<'_>,
        out: &mut Vec<&'s Signal>,
    ) -> Result<(), EncodeError> {
        out.extend(self.signals.iter().map(|&i| &signals[i]));
        for multiplexer in &self.multiplexers {
            let child: &Codec = multiplexer.select_for_encode(signals, data, ctx)?;
            child.gather(signals, data, ctx, out)?;
        }
        Ok(())
    }

    /// Packs the signals of this node and of the selected branches.
    ///
    /// Bits falling past the end of `buffer` are dropped. `mask` accumulates the
    /// padding mask of the visited nodes.
    pub fn encode(
        &self,
        signals: &[Signal],
        data: &SignalMap,
        ctx: &EncodeContext<'_>,
        buffer: &mut [u8],
        mask: &mut [u8],
    ) -> Result<(), EncodeError> {
        for (&index, field) in self.signals.iter().zip(&self.fields) {
            let signal: &Signal = &signals[index];
            let raw: RawValue = match data.get(&signal.name) {
                Some(value) => encode_value(signal, value, ctx)?,
                None if signal.is_float => RawValue::Float(0.0),
                None => RawValue::Int(0),
            };
            field.insert(buffer, raw.to_bits(signal.length));
        }
        for (byte, padding) in mask.iter_mut().zip(&self.padding_mask) {
            *byte &= padding;
        }
        for multiplexer in &self.multiplexers {
            let child: &Codec = multiplexer.select_for_encode(signals, data, ctx)?;
            child.encode(signals, data, ctx, buffer, mask)?;
        }
        Ok(())
    }

    /// Unpacks the signals of this node and of the selected branches into `out`.
    pub fn decode(
        &self,
        message: &str,
        signals: &[Signal],
        data: &[u8],
        ctx: DecodeContext,
        allow_truncated: bool,
        out: &mut SignalMap,
    ) -> Result<(), DecodeError> {
        let mut raws: Vec<(usize, RawValue)> = Vec::with_capacity(self.signals.len());
        for (&index, field) in self.signals.iter().zip(&self.fields) {
            let signal: &Signal = &signals[index];
            if field.required_bytes() > data.len() {
                if allow_truncated {
                    continue;
                }
                return Err(DecodeError::NotEnoughData {
                    message: message.to_string(),
                    expected: field.required_bytes(),
                    actual: data.len(),
                });
            }
            let raw: RawValue = raw_from_bits(signal, field.extract(data));
            raws.push((index, raw));
            out.insert(signal.name.clone(), decode_value(signal, raw, ctx));
        }

        for multiplexer in &self.multiplexers {
            let selector: &Signal = &signals[multiplexer.signal];
            let Some(&(_, raw)) = raws.iter().find(|(i, _)| *i == multiplexer.signal) else {
                // selector outside the supplied bytes
                return Err(DecodeError::NotEnoughData {
                    message: message.to_string(),
                    expected: self.required_bytes(),
                    actual: data.len(),
                });
            };
            let value: i128 = match raw {
                RawValue::Int(v) => v,
                RawValue::Float(f) => f as i128,
            };
            let child: &Codec = i64::try_from(value)
                .ok()
                .and_then(|id| multiplexer.children.get(&id))
                .ok_or_else(|| DecodeError::InvalidMultiplexId {
                    message: message.to_string(),
                    multiplexer: selector.name.clone(),
                    value,
                    valid: multiplexer.children.keys().copied().collect(),
                })?;
            child.decode(message, signals, data, ctx, allow_truncated, out)?;
        }
        Ok(())
    }

    /// Nested view of the tree for listing tools.
    pub fn signal_tree(&self, signals: &[Signal]) -> Vec<SignalTreeNode> {
        self.signals
            .iter()
            .map(|&index| {
                match self.multiplexers.iter().find(|m| m.signal == index) {
                    Some(multiplexer) => SignalTreeNode::Multiplexer {
                        name: signals[index].name.clone(),
                        branches: multiplexer
                            .children
                            .iter()
                            .map(|(&id, child)| (id, child.signal_tree(signals)))
                            .collect(),
                    },
                    None => SignalTreeNode::Signal(signals[index].name.clone()),
                }
            })
            .collect()
    }

    pub fn is_multiplexed(&self) -> bool {
        !self.multiplexers.is_empty()
    }
}

impl Multiplexer {
    /// Child codec of the selector value found in the encode input.
    fn select_for_encode<'c>(
        &'c self,
        signals: &[Signal],
        data: &SignalMap,
        ctx: &EncodeContext<'_>,
    ) -> Result<&'c Codec, EncodeError> {
        let selector: &Signal = &signals[self.signal];
        let value: SignalValue = data
            .get(&selector.name)
            .cloned()
            .unwrap_or(SignalValue::Integer(0));
        let invalid = || EncodeError::InvalidMultiplexId {
            message: ctx.message.to_string(),
            multiplexer: selector.name.clone(),
            value: value.to_string(),
            valid: self.children.keys().copied().collect(),
        };
        let id: i64 = match encode_value(selector, &value, ctx) {
            Ok(RawValue::Int(raw)) => i64::try_from(raw).map_err(|_| invalid())?,
            Ok(RawValue::Float(f)) if f.fract() == 0.0 => f as i64,
            Ok(RawValue::Float(_)) => return Err(invalid()),
            Err(EncodeError::UnknownChoice { .. }) => return Err(invalid()),
            Err(err) => return Err(err),
        };
        self.children.get(&id).ok_or_else(invalid)
    }
}

fn build_node(
    message: &str,
    signals: &[Signal],
    selector: Option<&str>,
    id: Option<i64>,
    length: usize,
) -> Codec {
    let members: Vec<usize> = signals
        .iter()
        .enumerate()
        .filter(|(_, signal)| match (selector, id) {
            (None, _) => signal.multiplexer_signal.is_none(),
            (Some(name), Some(id)) => {
                signal.multiplexer_signal.as_deref() == Some(name) && signal.is_present_for(id)
            }
            (Some(_), None) => false,
        })
        .map(|(index, _)| index)
        .collect();

    let fields: Vec<FieldLayout> = members
        .iter()
        .map(|&i| FieldLayout::new(signals[i].start, signals[i].length, signals[i].byte_order))
        .collect();

    let mut padding_mask: Vec<u8> = vec![0xFF; length];
    for field in &fields {
        field.clear_in_mask(&mut padding_mask);
    }

    let mut multiplexers: Vec<Multiplexer> = Vec::new();
    for &index in &members {
        let signal: &Signal = &signals[index];
        if !signal.is_multiplexer {
            continue;
        }
        let mut ids: BTreeSet<i64> = signals
            .iter()
            .filter(|s| s.multiplexer_signal.as_deref() == Some(signal.name.as_str()))
            .flat_map(|s| s.multiplexer_ids.iter().flatten().copied())
            .collect();
        if let Some(choices) = &signal.choices {
            ids.extend(choices.values());
        }

        let children: BTreeMap<i64, Codec> = ids
            .into_iter()
            .map(|id| {
                let child: Codec =
                    build_node(message, signals, Some(&signal.name), Some(id), length);
                (id, child)
            })
            .collect();
        if children.is_empty() {
            debug!(
                "Multiplexer '{}' of message '{}' has no multiplexed signals",
                signal.name, message
            );
        }
        multiplexers.push(Multiplexer {
            signal: index,
            children,
        });
    }

    Codec {
        signals: members,
        fields,
        padding_mask,
        multiplexers,
    }
}
