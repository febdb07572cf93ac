use can_database::{
    ByteOrder, ContainedEntry, Database, DecodeOptions, DecodedMessage, EncodeOptions, LoadOptions,
    Message, MessageKey, Node, NodeKey, Signal, SignalMap, SignalValue, load_bytes, load_file,
    load_str,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("files")
        .join(name)
}

fn value_of(decoded: &DecodedMessage, name: &str) -> SignalValue {
    decoded
        .signals()
        .and_then(|signals| signals.get(name))
        .cloned()
        .expect("signal decoded")
}

#[test]
fn test_load_bytes_matches_load_file() {
    let bytes: Vec<u8> = fs::read(fixture("motohawk.dbc")).expect("fixture readable");
    let from_bytes: Database = load_bytes(&bytes, &LoadOptions::default()).expect("bytes");
    let from_file: Database = load_file(fixture("motohawk.dbc"), &LoadOptions::default()).expect("file");
    assert_eq!(from_bytes.as_dbc_string(), from_file.as_dbc_string());
}

#[test]
fn test_frame_id_mask_lookup() {
    let options: LoadOptions = LoadOptions::default().with_frame_id_mask(0x7FF);
    let db: Database = load_file(fixture("socialledge.dbc"), &options).expect("load");
    assert_eq!(db.frame_id_mask(), 0x7FF);
    let msg: &Message = db.get_message_by_frame_id(0x1064).expect("masked lookup");
    assert_eq!(msg.name(), "DRIVER_HEARTBEAT");
    assert!(db.get_message_by_frame_id(0x65).is_err());
}

#[test]
fn test_choice_decoding_can_be_disabled() {
    let db: Database = load_file(fixture("socialledge.dbc"), &LoadOptions::default()).expect("load");
    let named: DecodedMessage = db
        .decode_message("DRIVER_HEARTBEAT", &[2], &DecodeOptions::default())
        .expect("decode");
    let value: SignalValue = value_of(&named, "DRIVER_HEARTBEAT_cmd");
    assert_eq!(value.choice_name(), Some("DRIVER_HEARTBEAT_cmd_REBOOT"));
    assert!(!value.is_numeric());

    let plain: DecodedMessage = db
        .decode_message(
            "DRIVER_HEARTBEAT",
            &[2],
            &DecodeOptions::default().with_decode_choices(false),
        )
        .expect("decode");
    let value: SignalValue = value_of(&plain, "DRIVER_HEARTBEAT_cmd");
    assert_eq!(value, SignalValue::Integer(2));
    assert!(value.is_numeric());
}

#[test]
fn test_side_tables() {
    let text: &str = "BU_: ECU\n\
        VAL_TABLE_ OnOff 1 \"On\" 0 \"Off\" ;\n\
        BO_ 1 M: 1 ECU\n SG_ S : 0|8@1+ (1,0) [0|0] \"\" Vector__XXX\n\
        BA_DEF_ BO_ \"GenMsgCycleTime\" INT 0 1000;\n\
        BA_DEF_REL_ BU_BO_REL_ \"GenMsgCycleTime\" INT 0 10;\n\
        BA_DEF_DEF_ \"GenMsgCycleTime\" 0;\n";
    let db: Database = load_str(text, &LoadOptions::default()).expect("load");

    let table = db.get_value_table("OnOff").expect("value table");
    assert_eq!(table.choices.value_of("On"), Some(1));
    assert!(db.get_value_table("Missing").is_none());

    // object definitions come first
    let definition = db.attribute_definition("GenMsgCycleTime").expect("definition");
    assert!(!definition.object.is_relation());
    assert!(db.attribute_definition("Missing").is_none());
}

#[test]
fn test_keys_stay_valid() {
    let mut db: Database = Database::new();
    let node: NodeKey = db.add_node(Node::new("Gateway")).expect("node");
    let first: MessageKey = db
        .add_message(Message::new(0x10, "First", 1, vec![Signal::new("A", 0, 8)]))
        .expect("first");
    db.add_message(Message::new(0x20, "Second", 1, Vec::new()))
        .expect("second");

    let keys: Vec<MessageKey> = db.iter_messages().map(|(key, _)| key).collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], first);

    db.remove_message("Second").expect("removed");
    assert_eq!(db.get_message_by_key(first).map(Message::name), Some("First"));
    assert_eq!(db.get_node_by_key(node).map(|n| n.name.as_str()), Some("Gateway"));
}

#[test]
fn test_updates_are_revalidated() {
    let mut db: Database = Database::new();
    db.add_node(Node::new("Gateway")).expect("node");
    db.add_message(Message::new(0x10, "Status", 2, vec![Signal::new("A", 0, 8)]))
        .expect("message");

    db.update_message("Status", |m| {
        m.set_name("Renamed");
        m.add_signal(Signal::new("B", 8, 4));
        m.update_signals(|signals| signals[0].set_scaling(2.0, 0.0));
    })
    .expect("update");
    assert!(db.get_message_by_name("Status").is_err());

    let mut data: SignalMap = SignalMap::new();
    data.insert("A".into(), SignalValue::Integer(10));
    data.insert("B".into(), SignalValue::Integer(3));
    let encoded: Vec<u8> = db
        .encode_message("Renamed", &data, &EncodeOptions::default())
        .expect("encode");
    assert_eq!(encoded, vec![5, 3]);

    db.update_node("Gateway", |n| n.comments.set("Central gateway"))
        .expect("node update");
    assert!(db
        .as_dbc_string()
        .contains("CM_ BU_ Gateway \"Central gateway\";"));

    // a signal beyond the payload is rejected under strict validation
    let result = db.update_message(0x10u32, |m| m.add_signal(Signal::new("C", 16, 8)));
    assert!(result.is_err());
}

#[test]
fn test_message_builders_are_dumped() {
    let mut msg: Message = Message::new(0x123, "Frame", 12, vec![Signal::new("A", 0, 8)])
        .with_fd(true)
        .with_senders(["Gateway", "Motor"]);
    msg.set_extended_frame(true);
    let mut db: Database = Database::new();
    db.add_message(msg).expect("message");

    let text: String = db.as_dbc_string();
    assert!(text.contains("BO_ 2147483939 Frame: 12 Gateway\r\n"));
    assert!(text.contains("BO_TX_BU_ 2147483939 : Gateway,Motor;\r\n"));
    let msg: &Message = db.get_message_by_name("Frame").expect("message");
    assert!(msg.is_fd && msg.is_extended_frame());
}

#[test]
fn test_gather_follows_selector() {
    let db: Database = load_file(fixture("socialledge.dbc"), &LoadOptions::default()).expect("load");
    let msg: &Message = db.get_message_by_name("SENSOR_SONARS").expect("message");
    let mut data: SignalMap = SignalMap::new();
    data.insert("SENSOR_SONARS_mux".into(), SignalValue::Integer(1));

    let names: BTreeSet<&str> = msg
        .gather_signals(&data, &EncodeOptions::default())
        .expect("gather")
        .into_iter()
        .map(|s| s.name.as_str())
        .collect();
    let expected: BTreeSet<&str> = [
        "SENSOR_SONARS_mux",
        "SENSOR_SONARS_err_count",
        "SENSOR_SONARS_no_filt_left",
        "SENSOR_SONARS_no_filt_middle",
        "SENSOR_SONARS_no_filt_right",
        "SENSOR_SONARS_no_filt_rear",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);
}

#[test]
fn test_little_endian_container_headers() {
    let inner: Message =
        Message::new(0x100, "Inner", 1, vec![Signal::new("X", 0, 8)]).with_header_id(0x010203);
    let container: Message = Message::new(0x300, "Container", 8, Vec::new())
        .with_header_byte_order(ByteOrder::LittleEndian)
        .with_contained_messages(vec![inner]);
    assert_eq!(
        container
            .get_contained_message_by_header_id(0x010203)
            .map(Message::name),
        Some("Inner")
    );
    assert!(container.get_contained_message_by_name("Inner").is_some());
    assert!(container.get_contained_message_by_name("Other").is_none());

    let mut data: SignalMap = SignalMap::new();
    data.insert("X".into(), SignalValue::Integer(0x42));
    let encoded: Vec<u8> = container
        .encode_container(
            &[ContainedEntry::signals("Inner", data)],
            &EncodeOptions::default(),
        )
        .expect("encode");
    assert_eq!(encoded, vec![0x03, 0x02, 0x01, 1, 0x42]);
}
