use log::debug;
use std::fmt::{self, Write as FmtWrite};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dbc::assemble::{CYCLE_TIME, EXTENDED_FRAME_FLAG, SEND_TYPE, START_VALUE};
use crate::dbc::core::sg_::NO_NODE;
use crate::types::{
    attributes::{
        AttrObject, AttrValueType, AttributeDefinition, AttributeValue, Attributes,
        RelationTarget, escape, find_definition,
    },
    database::Database,
    errors::SaveError,
    message::Message,
    signal::Signal,
    value::{Choices, Comments},
};

const NS_KEYWORDS: &[&str] = &[
    "NS_DESC_",
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "SG_MUL_VAL_",
];

const CRLF: &str = "\r\n";

/// Serializes a [`Database`] into DBC text and writes it to `path`.
///
/// Ensures the destination has a `.dbc` extension, creates intermediate
/// directories when needed, and reports structured [`SaveError`] variants
/// for path or I/O failures.
pub fn save_to_file(path: impl AsRef<Path>, database: &Database) -> Result<(), SaveError> {
    let path_ref: &Path = path.as_ref();
    let display: String = path_ref.display().to_string();
    let is_dbc: bool = path_ref
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dbc"));
    if !is_dbc {
        return Err(SaveError::InvalidExtension { path: display });
    }

    let serialized: String = to_dbc_string(database);

    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SaveError::CreateDirectory {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let file: File = File::create(path_ref).map_err(|source| SaveError::CreateFile {
        path: display.clone(),
        source,
    })?;
    let mut writer: BufWriter<File> = BufWriter::new(file);
    writer
        .write_all(serialized.as_bytes())
        .map_err(|source| SaveError::Write {
            path: display.clone(),
            source,
        })?;
    writer.flush().map_err(|source| SaveError::Write {
        path: display,
        source,
    })?;
    debug!("DBC database written to '{}'", path_ref.display());
    Ok(())
}

/// Serializes a [`Database`] into canonical DBC text with `\r\n` line endings.
///
/// Records are written in a fixed order: header, value tables, messages with their
/// signals (in reverse order), extra senders, environment variables, comments,
/// attributes, value descriptions, float markers, signal groups and extended
/// multiplexing. Sections without content are left out.
///
/// `cycle_time`, `send_type` and `initial` of messages and signals take precedence
/// over the corresponding `GenMsgCycleTime`, `GenMsgSendType` and `GenSigStartValue`
/// attributes.
pub fn to_dbc_string(database: &Database) -> String {
    let mut out: String = String::new();
    // writing into a String cannot fail
    let _ = write_database(database, &mut out);
    out
}

fn write_database(db: &Database, out: &mut String) -> fmt::Result {
    let definitions: Vec<AttributeDefinition> = effective_definitions(db);

    push_line(
        out,
        format_args!("VERSION \"{}\"", escape(db.version.as_deref().unwrap_or(""))),
    )?;
    out.push_str(CRLF);
    out.push_str(CRLF);

    push_line(out, format_args!("NS_ :"))?;
    for keyword in NS_KEYWORDS {
        push_line(out, format_args!("\t{keyword}"))?;
    }
    out.push_str(CRLF);

    push_line(out, format_args!("BS_:"))?;
    out.push_str(CRLF);

    out.push_str("BU_:");
    for node in db.nodes() {
        out.push(' ');
        out.push_str(&node.name);
    }
    out.push_str(CRLF);
    out.push_str(CRLF);

    section(out, |s| write_value_tables(db, s))?;
    for message in db.messages() {
        section(out, |s| write_message(message, s))?;
    }
    section(out, |s| write_senders(db, s))?;
    section(out, |s| write_environment_variables(db, s))?;
    section(out, |s| write_comments(db, s))?;
    section(out, |s| write_attributes(db, &definitions, s))?;
    section(out, |s| write_choices(db, s))?;
    section(out, |s| write_value_types(db, s))?;
    section(out, |s| write_signal_groups(db, s))?;
    section(out, |s| write_mux_values(db, s))?;
    Ok(())
}

/// Appends the lines produced by `f`, followed by an empty line, unless there are none.
fn section<F>(out: &mut String, f: F) -> fmt::Result
where
    F: FnOnce(&mut String) -> fmt::Result,
{
    let mut lines: String = String::new();
    f(&mut lines)?;
    if !lines.is_empty() {
        out.push_str(&lines);
        out.push_str(CRLF);
    }
    Ok(())
}

fn push_line(out: &mut String, args: fmt::Arguments<'_>) -> fmt::Result {
    out.write_fmt(args)?;
    out.push_str(CRLF);
    Ok(())
}

fn dbc_frame_id(message: &Message) -> u32 {
    if message.is_extended_frame() {
        message.frame_id() | EXTENDED_FRAME_FLAG
    } else {
        message.frame_id()
    }
}

fn write_value_tables(db: &Database, out: &mut String) -> fmt::Result {
    for table in &db.value_tables {
        write!(out, "VAL_TABLE_ {}", table.name)?;
        write_choice_list(&table.choices, out)?;
        push_line(out, format_args!(" ;"))?;
    }
    Ok(())
}

fn write_message(message: &Message, out: &mut String) -> fmt::Result {
    let sender: &str = message
        .senders
        .first()
        .map(String::as_str)
        .unwrap_or(NO_NODE);
    push_line(
        out,
        format_args!(
            "BO_ {} {}: {} {}",
            dbc_frame_id(message),
            message.name(),
            message.length(),
            sender
        ),
    )?;
    for signal in message.signals().iter().rev() {
        write_signal(signal, out)?;
    }
    Ok(())
}

fn write_signal(signal: &Signal, out: &mut String) -> fmt::Result {
    let receivers: String = if signal.receivers.is_empty() {
        NO_NODE.to_string()
    } else {
        signal.receivers.join(",")
    };
    push_line(
        out,
        format_args!(
            " SG_ {}{} : {}|{}@{}{} ({},{}) [{}|{}] \"{}\" {}",
            signal.name,
            format_mux_tag(signal),
            signal.start,
            signal.length,
            signal.byte_order.dbc_digit(),
            if signal.is_signed { '-' } else { '+' },
            signal.scale(),
            signal.offset(),
            signal.minimum.unwrap_or(0.0),
            signal.maximum.unwrap_or(0.0),
            escape(signal.unit.as_deref().unwrap_or("")),
            receivers
        ),
    )
}

/// ` M`, ` m<N>` or ` m<N>M`; the first id stands for all of them.
fn format_mux_tag(signal: &Signal) -> String {
    match signal.multiplexer_ids.as_deref() {
        Some([first, ..]) if signal.is_multiplexer => format!(" m{first}M"),
        Some([first, ..]) => format!(" m{first}"),
        _ if signal.is_multiplexer => " M".to_string(),
        _ => String::new(),
    }
}

fn write_senders(db: &Database, out: &mut String) -> fmt::Result {
    for message in db.messages().filter(|m| m.senders.len() > 1) {
        push_line(
            out,
            format_args!(
                "BO_TX_BU_ {} : {};",
                dbc_frame_id(message),
                message.senders.join(",")
            ),
        )?;
    }
    Ok(())
}

fn write_environment_variables(db: &Database, out: &mut String) -> fmt::Result {
    for env in &db.environment_variables {
        let nodes: String = if env.access_nodes.is_empty() {
            NO_NODE.to_string()
        } else {
            env.access_nodes.join(",")
        };
        push_line(
            out,
            format_args!(
                "EV_ {}: {} [{}|{}] \"{}\" {} {} {} {};",
                env.name,
                env.env_type,
                env.minimum,
                env.maximum,
                escape(&env.unit),
                env.initial_value,
                env.env_id,
                env.access_type,
                nodes
            ),
        )?;
    }
    Ok(())
}

fn write_comments(db: &Database, out: &mut String) -> fmt::Result {
    let text = |comments: &Comments| comments.get().map(escape);

    if let Some(comment) = text(&db.comments) {
        push_line(out, format_args!("CM_ \"{comment}\";"))?;
    }
    for node in db.nodes() {
        if let Some(comment) = text(&node.comments) {
            push_line(out, format_args!("CM_ BU_ {} \"{}\";", node.name, comment))?;
        }
    }
    for message in db.messages() {
        if let Some(comment) = text(&message.comments) {
            push_line(
                out,
                format_args!("CM_ BO_ {} \"{}\";", dbc_frame_id(message), comment),
            )?;
        }
    }
    for message in db.messages() {
        for signal in message.signals() {
            if let Some(comment) = text(&signal.comments) {
                push_line(
                    out,
                    format_args!(
                        "CM_ SG_ {} {} \"{}\";",
                        dbc_frame_id(message),
                        signal.name,
                        comment
                    ),
                )?;
            }
        }
    }
    for env in &db.environment_variables {
        if let Some(comment) = text(&env.comments) {
            push_line(out, format_args!("CM_ EV_ {} \"{}\";", env.name, comment))?;
        }
    }
    Ok(())
}

fn write_attributes(db: &Database, definitions: &[AttributeDefinition], out: &mut String) -> fmt::Result {
    // definitions, plain then relation
    for def in definitions.iter().filter(|d| !d.object.is_relation()) {
        match def.object.keyword() {
            "" => push_line(out, format_args!("BA_DEF_ \"{}\" {};", def.name, def.value_type))?,
            keyword => push_line(
                out,
                format_args!("BA_DEF_ {} \"{}\" {};", keyword, def.name, def.value_type),
            )?,
        }
    }
    for def in definitions.iter().filter(|d| d.object.is_relation()) {
        push_line(
            out,
            format_args!(
                "BA_DEF_REL_ {} \"{}\" {};",
                def.object.keyword(),
                def.name,
                def.value_type
            ),
        )?;
    }

    // defaults
    for def in definitions.iter().filter(|d| !d.object.is_relation()) {
        if let Some(default) = &def.default {
            push_line(
                out,
                format_args!("BA_DEF_DEF_ \"{}\" {};", def.name, format_default(default)),
            )?;
        }
    }
    for def in definitions.iter().filter(|d| d.object.is_relation()) {
        if let Some(default) = &def.default {
            push_line(
                out,
                format_args!("BA_DEF_DEF_REL_ \"{}\" {};", def.name, format_default(default)),
            )?;
        }
    }

    // values
    let value = |name: &str, object: AttrObject, raw: &AttributeValue| -> String {
        format_value(raw, find_definition(definitions, name, object))
    };
    for attr in db.attributes.iter() {
        push_line(
            out,
            format_args!(
                "BA_ \"{}\" {};",
                attr.name,
                value(&attr.name, AttrObject::Database, &attr.value)
            ),
        )?;
    }
    for node in db.nodes() {
        for attr in node.attributes.iter() {
            push_line(
                out,
                format_args!(
                    "BA_ \"{}\" BU_ {} {};",
                    attr.name,
                    node.name,
                    value(&attr.name, AttrObject::Node, &attr.value)
                ),
            )?;
        }
    }
    for message in db.messages() {
        let frame_id: u32 = dbc_frame_id(message);
        for attr in message_attributes(message, definitions).iter() {
            push_line(
                out,
                format_args!(
                    "BA_ \"{}\" BO_ {} {};",
                    attr.name,
                    frame_id,
                    value(&attr.name, AttrObject::Message, &attr.value)
                ),
            )?;
        }
        for signal in message.signals() {
            for attr in signal_attributes(signal, definitions).iter() {
                push_line(
                    out,
                    format_args!(
                        "BA_ \"{}\" SG_ {} {} {};",
                        attr.name,
                        frame_id,
                        signal.name,
                        value(&attr.name, AttrObject::Signal, &attr.value)
                    ),
                )?;
            }
        }
    }
    for env in &db.environment_variables {
        for attr in env.attributes.iter() {
            push_line(
                out,
                format_args!(
                    "BA_ \"{}\" EV_ {} {};",
                    attr.name,
                    env.name,
                    value(&attr.name, AttrObject::EnvironmentVariable, &attr.value)
                ),
            )?;
        }
    }

    // relation values
    for rel in &db.relation_attributes {
        match &rel.target {
            RelationTarget::Signal { frame_id, signal } => push_line(
                out,
                format_args!(
                    "BA_REL_ \"{}\" BU_SG_REL_ {} SG_ {} {} {};",
                    rel.name,
                    rel.node,
                    frame_id,
                    signal,
                    value(&rel.name, AttrObject::NodeSignal, &rel.value)
                ),
            )?,
            RelationTarget::Message { frame_id } => push_line(
                out,
                format_args!(
                    "BA_REL_ \"{}\" BU_BO_REL_ {} {} {};",
                    rel.name,
                    rel.node,
                    frame_id,
                    value(&rel.name, AttrObject::NodeMessage, &rel.value)
                ),
            )?,
            RelationTarget::EnvironmentVariable { name } => push_line(
                out,
                format_args!(
                    "BA_REL_ \"{}\" BU_EV_REL_ {} {} {};",
                    rel.name,
                    rel.node,
                    name,
                    value(&rel.name, AttrObject::NodeEnvironmentVariable, &rel.value)
                ),
            )?,
        }
    }
    Ok(())
}

fn write_choices(db: &Database, out: &mut String) -> fmt::Result {
    for message in db.messages() {
        for signal in message.signals() {
            let Some(choices) = signal.choices.as_ref().filter(|c| !c.is_empty()) else {
                continue;
            };
            write!(out, "VAL_ {} {}", dbc_frame_id(message), signal.name)?;
            write_choice_list(choices, out)?;
            push_line(out, format_args!(" ;"))?;
        }
    }
    Ok(())
}

fn write_choice_list(choices: &Choices, out: &mut String) -> fmt::Result {
    for choice in choices.iter() {
        write!(out, " {} \"{}\"", choice.value, escape(&choice.name))?;
    }
    Ok(())
}

fn write_value_types(db: &Database, out: &mut String) -> fmt::Result {
    for message in db.messages() {
        for signal in message.signals().iter().filter(|s| s.is_float) {
            let code: u8 = if signal.length == 64 { 2 } else { 1 };
            push_line(
                out,
                format_args!(
                    "SIG_VALTYPE_ {} {} : {};",
                    dbc_frame_id(message),
                    signal.name,
                    code
                ),
            )?;
        }
    }
    Ok(())
}

fn write_signal_groups(db: &Database, out: &mut String) -> fmt::Result {
    for message in db.messages() {
        for group in &message.signal_groups {
            push_line(
                out,
                format_args!(
                    "SIG_GROUP_ {} {} {} : {};",
                    dbc_frame_id(message),
                    group.name,
                    group.repetitions,
                    group.signal_names.join(" ")
                ),
            )?;
        }
    }
    Ok(())
}

/// `SG_MUL_VAL_` lines, only for messages the `M`/`m<N>` tags cannot describe alone.
fn write_mux_values(db: &Database, out: &mut String) -> fmt::Result {
    for message in db.messages() {
        let signals: &[Signal] = message.signals();
        let multiplexers: usize = signals.iter().filter(|s| s.is_multiplexer).count();
        let extended: bool = multiplexers > 1
            || signals
                .iter()
                .any(|s| s.multiplexer_ids.as_ref().is_some_and(|ids| ids.len() > 1));
        if !extended {
            continue;
        }
        for signal in signals {
            let (Some(parent), Some(ids)) = (&signal.multiplexer_signal, &signal.multiplexer_ids)
            else {
                continue;
            };
            if ids.is_empty() {
                continue;
            }
            let ranges: Vec<String> = compact_ranges(ids)
                .into_iter()
                .map(|(low, high)| format!("{low}-{high}"))
                .collect();
            push_line(
                out,
                format_args!(
                    "SG_MUL_VAL_ {} {} {} {};",
                    dbc_frame_id(message),
                    signal.name,
                    parent,
                    ranges.join(", ")
                ),
            )?;
        }
    }
    Ok(())
}

/// Groups sorted ids into inclusive `(low, high)` runs.
fn compact_ranges(ids: &[i64]) -> Vec<(i64, i64)> {
    let mut sorted: Vec<i64> = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let mut ranges: Vec<(i64, i64)> = Vec::new();
    for id in sorted {
        match ranges.last_mut() {
            Some((_, high)) if high.checked_add(1) == Some(id) => *high = id,
            _ => ranges.push((id, id)),
        }
    }
    ranges
}

fn format_value(value: &AttributeValue, def: Option<&AttributeDefinition>) -> String {
    match value {
        AttributeValue::Str(s) => format!("\"{}\"", escape(s)),
        AttributeValue::Enum(label) => match def.and_then(|d| d.enum_index(label)) {
            Some(idx) => idx.to_string(),
            None => format!("\"{}\"", escape(label)),
        },
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Hex(v) => v.to_string(),
        AttributeValue::Float(v) => v.to_string(),
    }
}

fn format_default(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) | AttributeValue::Enum(s) => format!("\"{}\"", escape(s)),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Hex(v) => v.to_string(),
        AttributeValue::Float(v) => v.to_string(),
    }
}

// --------- Well-known attributes --------

/// Attribute definitions of the database, plus the ones needed by `cycle_time` and
/// `initial` values that have no definition yet.
fn effective_definitions(db: &Database) -> Vec<AttributeDefinition> {
    let mut definitions: Vec<AttributeDefinition> = db.attribute_definitions.clone();
    let defined = |defs: &[AttributeDefinition], name: &str| {
        defs.iter().any(|d| d.name == name && !d.object.is_relation())
    };
    if !defined(&definitions, CYCLE_TIME) && db.messages().any(|m| m.cycle_time.is_some()) {
        definitions.push(AttributeDefinition::new(
            CYCLE_TIME,
            AttrObject::Message,
            AttrValueType::Int {
                minimum: 0,
                maximum: 65535,
            },
        ));
    }
    if !defined(&definitions, START_VALUE)
        && db
            .messages()
            .any(|m| m.signals().iter().any(|s| s.initial.is_some()))
    {
        definitions.push(AttributeDefinition::new(
            START_VALUE,
            AttrObject::Signal,
            AttrValueType::Int {
                minimum: i64::from(i32::MIN),
                maximum: i64::from(i32::MAX),
            },
        ));
    }
    definitions
}

fn message_attributes(message: &Message, definitions: &[AttributeDefinition]) -> Attributes {
    let mut attributes: Attributes = message.attributes.clone();
    sync_attribute(
        &mut attributes,
        definitions,
        CYCLE_TIME,
        message.cycle_time.map(|v| AttributeValue::Int(i64::from(v))),
    );
    let send_type_is_enum: bool = find_definition(definitions, SEND_TYPE, AttrObject::Message)
        .is_some_and(|d| matches!(d.value_type, AttrValueType::Enum(_)));
    if send_type_is_enum {
        sync_attribute(
            &mut attributes,
            definitions,
            SEND_TYPE,
            message.send_type.clone().map(AttributeValue::Enum),
        );
    }
    attributes
}

fn signal_attributes(signal: &Signal, definitions: &[AttributeDefinition]) -> Attributes {
    let mut attributes: Attributes = signal.attributes.clone();
    sync_attribute(
        &mut attributes,
        definitions,
        START_VALUE,
        signal
            .initial
            .and_then(|v| i64::try_from(v).ok())
            .map(AttributeValue::Int),
    );
    attributes
}

/// Writes `value` into `name`, leaving it out when it equals the definition default.
fn sync_attribute(
    attributes: &mut Attributes,
    definitions: &[AttributeDefinition],
    name: &str,
    value: Option<AttributeValue>,
) {
    let Some(value) = value else {
        attributes.remove(name);
        return;
    };
    if attributes.get(name).is_none() {
        let default: Option<&AttributeValue> = definitions
            .iter()
            .find(|d| d.name == name && !d.object.is_relation())
            .and_then(|d| d.default.as_ref());
        if default == Some(&value) {
            return;
        }
    }
    attributes.set(name, value);
}
