//! Options of the load, encode and decode entry points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source formats a database can be described in.
///
/// Only [`DatabaseFormat::Dbc`] is read by this crate; the others belong to
/// separate front-ends producing the same data model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseFormat {
    Dbc,
    Kcd,
    Sym,
    Arxml,
}

impl DatabaseFormat {
    /// Infers the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension: String = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "dbc" => Some(DatabaseFormat::Dbc),
            "kcd" => Some(DatabaseFormat::Kcd),
            "sym" => Some(DatabaseFormat::Sym),
            "arxml" | "xml" => Some(DatabaseFormat::Arxml),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatabaseFormat::Dbc => "dbc",
            DatabaseFormat::Kcd => "kcd",
            DatabaseFormat::Sym => "sym",
            DatabaseFormat::Arxml => "arxml",
        })
    }
}

/// Options used while loading a database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Validate signal bounds and overlaps of every message.
    pub strict: bool,
    /// Mask applied to frame ids before they are used as lookup keys.
    pub frame_id_mask: u32,
    /// Strip a `Prefix_` shared by every choice name of a signal.
    pub prune_choices: bool,
    /// Source format; inferred from the file extension when `None`.
    pub format: Option<DatabaseFormat>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            strict: true,
            frame_id_mask: 0xFFFF_FFFF,
            prune_choices: false,
            format: None,
        }
    }
}

impl LoadOptions {
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_frame_id_mask(mut self, mask: u32) -> Self {
        self.frame_id_mask = mask;
        self
    }

    pub fn with_prune_choices(mut self, prune: bool) -> Self {
        self.prune_choices = prune;
        self
    }

    pub fn with_format(mut self, format: DatabaseFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Options of a single encode call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Inputs are physical values; `false` means they are raw field values.
    pub scaling: bool,
    /// Fill bits no signal covers from the message's unused bit pattern.
    pub padding: bool,
    /// Require every active signal, reject unknown ones and check ranges.
    pub strict: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            scaling: true,
            padding: false,
            strict: true,
        }
    }
}

impl EncodeOptions {
    pub fn with_scaling(mut self, scaling: bool) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Options of a single decode call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Report raw values found in `choices` as named values.
    pub decode_choices: bool,
    /// Apply scale and offset.
    pub scaling: bool,
    /// Split container messages into their entries instead of failing.
    pub decode_containers: bool,
    /// Decode the signals that fit in a short payload instead of failing.
    pub allow_truncated: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            decode_choices: true,
            scaling: true,
            decode_containers: false,
            allow_truncated: false,
        }
    }
}

impl DecodeOptions {
    pub fn with_decode_choices(mut self, decode_choices: bool) -> Self {
        self.decode_choices = decode_choices;
        self
    }

    pub fn with_scaling(mut self, scaling: bool) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_decode_containers(mut self, decode_containers: bool) -> Self {
        self.decode_containers = decode_containers;
        self
    }

    pub fn with_allow_truncated(mut self, allow_truncated: bool) -> Self {
        self.allow_truncated = allow_truncated;
        self
    }
}
