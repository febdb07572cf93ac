use can_database::{
    Database, DecodeOptions, EncodeError, EncodeOptions, Error, LoadOptions, Message, SchemaError,
    SignalMap, SignalValue, load_file, load_str,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("files")
        .join(name)
}

fn load(name: &str) -> Database {
    load_file(fixture(name), &LoadOptions::default()).expect("fixture loads")
}

fn signals(entries: &[(&str, SignalValue)]) -> SignalMap {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn test_motohawk_encode_decode() {
    let db: Database = load("motohawk.dbc");
    let msg: &Message = db.get_message_by_name("ExampleMessage").expect("message");
    assert_eq!(msg.frame_id(), 0x1F0);
    assert_eq!(msg.length(), 8);
    assert_eq!(msg.senders, vec!["PCM1"]);
    assert_eq!(msg.cycle_time, Some(100));

    let data: SignalMap = signals(&[
        ("Temperature", 250.55.into()),
        ("AverageRadius", 3.2.into()),
        ("Enable", "Enabled".into()),
    ]);
    let encoded: Vec<u8> = db
        .encode_message(0x1F0u32, &data, &EncodeOptions::default())
        .expect("encode");
    assert_eq!(encoded, vec![0xc0, 0x06, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let decoded: SignalMap = db
        .decode_message("ExampleMessage", &encoded, &DecodeOptions::default())
        .expect("decode")
        .into_signals()
        .expect("plain message");
    assert_eq!(decoded["Temperature"], SignalValue::Float(250.55));
    assert_eq!(decoded["AverageRadius"], SignalValue::Float(3.2));
    assert_eq!(decoded["Enable"], "Enabled");
    assert_eq!(decoded["Enable"], 1);
}

#[test]
fn test_motohawk_choices_round_trip() {
    let db: Database = load("motohawk.dbc");
    let msg: &Message = db.get_message_by_name("ExampleMessage").expect("message");
    let enable = msg.get_signal_by_name("Enable").expect("signal");
    let choices = enable.choices.as_ref().expect("choices");
    for choice in choices.iter() {
        let data: SignalMap = signals(&[
            ("Temperature", 250.0.into()),
            ("AverageRadius", 0.into()),
            ("Enable", choice.name.as_str().into()),
        ]);
        let encoded: Vec<u8> = msg.encode(&data, &EncodeOptions::default()).expect("encode");
        let decoded: SignalMap = msg
            .decode_signals(&encoded, &DecodeOptions::default())
            .expect("decode");
        assert_eq!(decoded["Enable"], SignalValue::Named(choice.clone()));
    }
}

#[test]
fn test_padding_bit_order() {
    let db: Database = load("padding_bit_order.dbc");
    let data: SignalMap = signals(&[
        ("A", 0x2C9.into()),
        ("B", 1.into()),
        ("C", 0x2C9.into()),
        ("D", 0.into()),
    ]);
    let big_endian: Vec<u8> = db
        .encode_message(1u32, &data, &EncodeOptions::default())
        .expect("encode MSG0");
    assert_eq!(big_endian, vec![0x82, 0xc9, 0x00, 0x00, 0x02, 0xc9, 0x00, 0x00]);
    let little_endian: Vec<u8> = db
        .encode_message(2u32, &data, &EncodeOptions::default())
        .expect("encode MSG1");
    assert_eq!(little_endian, vec![0xc9, 0x12, 0x00, 0x00, 0xc9, 0x02, 0x00, 0x00]);

    let decoded: SignalMap = db
        .decode_message(1u32, &big_endian, &DecodeOptions::default())
        .expect("decode")
        .into_signals()
        .expect("plain message");
    assert_eq!(decoded, data);
}

#[test]
fn test_padding_law() {
    let mut db: Database = load("padding_bit_order.dbc");
    db.update_message("MSG0", |msg| msg.set_unused_bit_pattern(0xFF))
        .expect("update");
    let zeros: SignalMap = signals(&[
        ("A", 0.into()),
        ("B", 0.into()),
        ("C", 0.into()),
        ("D", 0.into()),
    ]);
    let options: EncodeOptions = EncodeOptions::default().with_padding(true);
    let encoded: Vec<u8> = db.encode_message("MSG0", &zeros, &options).expect("encode");
    assert_eq!(encoded, vec![0x70, 0x00, 0xFF, 0xFF, 0x70, 0x00, 0xFF, 0xFF]);

    let unpadded: Vec<u8> = db
        .encode_message("MSG0", &zeros, &EncodeOptions::default())
        .expect("encode");
    assert_eq!(unpadded, vec![0; 8]);
}

#[test]
fn test_padding_fills_bits_of_inactive_branch() {
    let text: &str = "BU_: ECU\n\
        BO_ 16 Muxed: 4 ECU\n\
        \x20SG_ Selector M : 0|8@1+ (1,0) [0|0] \"\" Vector__XXX\n\
        \x20SG_ A m0 : 8|8@1+ (1,0) [0|0] \"\" Vector__XXX\n\
        \x20SG_ B m1 : 16|8@1+ (1,0) [0|0] \"\" Vector__XXX\n";
    let mut db: Database = load_str(text, &LoadOptions::default()).expect("load");
    db.update_message("Muxed", |msg| msg.set_unused_bit_pattern(0xFF))
        .expect("update");
    let options: EncodeOptions = EncodeOptions::default().with_padding(true);

    let first: SignalMap = signals(&[("Selector", 0.into()), ("A", 0x12.into())]);
    let encoded: Vec<u8> = db.encode_message("Muxed", &first, &options).expect("encode");
    assert_eq!(encoded, vec![0x00, 0x12, 0xFF, 0xFF]);

    let second: SignalMap = signals(&[("Selector", 1.into()), ("B", 0x34.into())]);
    let encoded: Vec<u8> = db.encode_message("Muxed", &second, &options).expect("encode");
    assert_eq!(encoded, vec![0x01, 0xFF, 0x34, 0xFF]);

    let unpadded: Vec<u8> = db
        .encode_message("Muxed", &second, &EncodeOptions::default())
        .expect("encode");
    assert_eq!(unpadded, vec![0x01, 0x00, 0x34, 0x00]);
}

#[test]
fn test_socialledge_multiplex_dispatch() {
    let db: Database = load("socialledge.dbc");
    let msg: &Message = db.get_message_by_frame_id(200).expect("message");
    assert!(msg.is_multiplexed());
    assert_eq!(msg.cycle_time, Some(50));

    let branch0: SignalMap = signals(&[
        ("SENSOR_SONARS_mux", 0.into()),
        ("SENSOR_SONARS_err_count", 1.into()),
        ("SENSOR_SONARS_left", 2.into()),
        ("SENSOR_SONARS_middle", 3.into()),
        ("SENSOR_SONARS_right", 4.into()),
        ("SENSOR_SONARS_rear", 5.into()),
    ]);
    let encoded: Vec<u8> = msg.encode(&branch0, &EncodeOptions::default()).expect("encode");
    assert_eq!(encoded, vec![0x10, 0x00, 0x14, 0xe0, 0x01, 0x28, 0x20, 0x03]);
    let decoded: SignalMap = msg
        .decode_signals(&encoded, &DecodeOptions::default())
        .expect("decode");
    assert_eq!(
        decoded.keys().collect::<Vec<_>>(),
        branch0.keys().collect::<Vec<_>>()
    );
    assert_eq!(decoded["SENSOR_SONARS_rear"], 5i64);

    let branch1: SignalMap = signals(&[
        ("SENSOR_SONARS_mux", 1.into()),
        ("SENSOR_SONARS_err_count", 2.into()),
        ("SENSOR_SONARS_no_filt_left", 3.into()),
        ("SENSOR_SONARS_no_filt_middle", 4.into()),
        ("SENSOR_SONARS_no_filt_right", 5.into()),
        ("SENSOR_SONARS_no_filt_rear", 6.into()),
    ]);
    let encoded: Vec<u8> = msg.encode(&branch1, &EncodeOptions::default()).expect("encode");
    assert_eq!(encoded, vec![0x21, 0x00, 0x1e, 0x80, 0x02, 0x32, 0xc0, 0x03]);

    // a key of the other branch is rejected
    let mut mixed: SignalMap = branch0.clone();
    mixed.insert("SENSOR_SONARS_no_filt_left".into(), 1.into());
    assert!(matches!(
        msg.encode(&mixed, &EncodeOptions::default()),
        Err(EncodeError::UnknownSignals { .. })
    ));

    // a selector value without branch
    let mut unknown: SignalMap = branch0.clone();
    unknown.insert("SENSOR_SONARS_mux".into(), 7.into());
    assert!(matches!(
        msg.encode(&unknown, &EncodeOptions::default()),
        Err(EncodeError::InvalidMultiplexId { .. })
    ));
}

#[test]
fn test_socialledge_metadata() {
    let db: Database = load("socialledge.dbc");
    let names: Vec<&str> = db.nodes().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["DBG", "DRIVER", "IO", "MOTOR", "SENSOR"]);
    assert_eq!(
        db.get_node_by_name("DRIVER").expect("node").comment(),
        Some("The driver controller driving the car")
    );
    let heartbeat: &Message = db.get_message_by_name("DRIVER_HEARTBEAT").expect("message");
    assert_eq!(heartbeat.cycle_time, Some(1000));
    let cmd = heartbeat
        .get_signal_by_name("DRIVER_HEARTBEAT_cmd")
        .expect("signal");
    assert_eq!(cmd.receivers, vec!["SENSOR", "MOTOR"]);
    assert_eq!(cmd.comment(), Some("Heartbeat command of the driver"));
    let first = cmd.choices.as_ref().and_then(|c| c.iter().next()).expect("choice");
    assert_eq!(first.name, "DRIVER_HEARTBEAT_cmd_REBOOT");

    let pruned: Database = load_file(
        fixture("socialledge.dbc"),
        &LoadOptions::default().with_prune_choices(true),
    )
    .expect("load");
    let cmd = pruned
        .get_message_by_frame_id(100)
        .and_then(|m| m.get_signal_by_name("DRIVER_HEARTBEAT_cmd").cloned())
        .expect("signal");
    let names: Vec<String> = cmd
        .choices
        .expect("choices")
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, vec!["REBOOT", "SYNC", "NOOP"]);
}

#[test]
fn test_foobar_can_fd() {
    let db: Database = load("foobar.dbc");
    let msg: &Message = db.get_message_by_frame_id(0x12333).expect("message");
    assert_eq!(msg.name(), "CanFd");
    assert!(msg.is_extended_frame());
    assert!(msg.is_fd);
    assert_eq!(msg.length(), 64);
    assert_eq!(msg.bus_name.as_deref(), Some("foobar"));

    let bus = db.get_bus_by_name("foobar").expect("bus");
    assert!(bus.is_fd);

    let data: SignalMap = signals(&[
        ("Fie", 0x0123_4567_89AB_CDEFu64.into()),
        ("Fas", 0xDEAD_BEEF_DEAD_BEEFu64.into()),
    ]);
    let encoded: Vec<u8> = msg.encode(&data, &EncodeOptions::default()).expect("encode");
    let mut expected: Vec<u8> = vec![
        0xef, 0xcd, 0xab, 0x89, 0x67, 0x45, 0x23, 0x01, 0xef, 0xbe, 0xad, 0xde, 0xef, 0xbe, 0xad,
        0xde,
    ];
    expected.extend_from_slice(&[0u8; 48]);
    assert_eq!(encoded, expected);

    let decoded: SignalMap = msg
        .decode_signals(&encoded, &DecodeOptions::default())
        .expect("decode");
    assert_eq!(decoded, data);

    let foo: &Message = db.get_message_by_name("Foo").expect("message");
    assert!(!foo.is_fd);
    assert_eq!(foo.senders, vec!["FOO", "FIE"]);
    assert_eq!(foo.signal_groups[0].signal_names, vec!["Foo", "Bar"]);
    assert_eq!(foo.get_signal_by_name("Bar").expect("signal").initial, Some(5));
    assert_eq!(db.environment_variables[0].access_nodes, vec!["BAR", "FOO"]);
    assert_eq!(db.relation_attributes.len(), 1);
}

#[test]
fn test_signal_range_check() {
    let db: Database = load("signal_range.dbc");
    let data: SignalMap = signals(&[("Signal1", 0.into())]);
    let err: Error = db
        .encode_message("Message1", &data, &EncodeOptions::default())
        .expect_err("out of range");
    assert!(err.to_string().contains("greater than or equal to 1"), "{err}");

    // range checks belong to strict mode
    let relaxed: EncodeOptions = EncodeOptions::default().with_strict(false);
    assert_eq!(
        db.encode_message("Message1", &data, &relaxed).expect("encode"),
        vec![0]
    );
}

#[test]
fn test_strict_overlap_detection() {
    let text: &str = "BO_ 1 Overlap: 8 Vector__XXX\n SG_ B : 4|8@1+ (1,0) [0|0] \"\" Vector__XXX\n SG_ A : 0|8@1+ (1,0) [0|0] \"\" Vector__XXX\n";
    assert!(matches!(
        load_str(text, &LoadOptions::default()),
        Err(Error::Schema(SchemaError::FieldOverlap { .. }))
    ));
    let db: Database = load_str(text, &LoadOptions::default().with_strict(false)).expect("lenient");
    assert_eq!(db.message_count(), 1);
}

#[test]
fn test_decode_stream_continues_after_errors() {
    let db: Database = load("motohawk.dbc");
    let frames: Vec<(u32, Vec<u8>)> = vec![
        (0x1F0, vec![0xc0, 0x06, 0xe0, 0, 0, 0, 0, 0]),
        (0x123, vec![0; 8]),
        (0x1F0, vec![0xc0]),
        (0x1F0, vec![0; 8]),
    ];
    let results: Vec<bool> = db
        .decode_frames(frames, DecodeOptions::default())
        .map(|r| r.is_ok())
        .collect();
    assert_eq!(results, vec![true, false, false, true]);
}

#[test]
fn test_truncated_decode() {
    let db: Database = load("padding_bit_order.dbc");
    let options: DecodeOptions = DecodeOptions::default().with_allow_truncated(true);
    let decoded: SignalMap = db
        .decode_message(2u32, &[0xc9, 0x12], &options)
        .expect("decode")
        .into_signals()
        .expect("plain message");
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded["A"], 0x2C9i64);
    assert_eq!(decoded["B"], 1i64);
}
