use can_database::{
    ByteOrder, ContainedDecoded, ContainedEntry, Database, DecodeOptions, DecodedMessage,
    EncodeOptions, Message, Signal, SignalMap, SignalValue,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn raw_options() -> (EncodeOptions, DecodeOptions) {
    (
        EncodeOptions::default().with_scaling(false),
        DecodeOptions::default().with_scaling(false),
    )
}

/// Random raw value of a field: any bit pattern, sign-extended for signed fields.
fn random_raw(rng: &mut StdRng, length: u32, signed: bool) -> i128 {
    let bits: u64 = if length == 64 {
        rng.random::<u64>()
    } else {
        rng.random::<u64>() & ((1u64 << length) - 1)
    };
    if signed {
        let shift: u32 = 64 - length;
        (((bits << shift) as i64) >> shift) as i128
    } else {
        bits as i128
    }
}

/// Random field fitting an 8-byte payload.
fn random_signal(rng: &mut StdRng, byte_order: ByteOrder) -> Signal {
    let length: u32 = rng.random_range(1..=64);
    let start: u32 = match byte_order {
        ByteOrder::LittleEndian => rng.random_range(0..=64 - length),
        ByteOrder::BigEndian => {
            // most significant bit in network order, turned into a sawtooth bit number
            let msb: u32 = rng.random_range(0..=64 - length);
            8 * (msb / 8) + 7 - (msb % 8)
        }
    };
    Signal::new("Field", start, length)
        .with_byte_order(byte_order)
        .signed(rng.random_bool(0.5))
}

fn round_trip(byte_order: ByteOrder, seed: u64) {
    let mut rng: StdRng = StdRng::seed_from_u64(seed);
    let (encode, decode) = raw_options();
    for _ in 0..500 {
        let signal: Signal = random_signal(&mut rng, byte_order);
        let raw: i128 = random_raw(&mut rng, signal.length, signal.is_signed);
        let description: String = format!("{signal:?} raw {raw}");
        let msg: Message = Message::new(1, "Random", 8, vec![signal]);

        let mut data: SignalMap = SignalMap::new();
        data.insert("Field".into(), SignalValue::Integer(raw));
        let encoded: Vec<u8> = msg.encode(&data, &encode).expect(&description);
        let decoded: SignalMap = msg.decode_signals(&encoded, &decode).expect(&description);
        assert_eq!(decoded["Field"], SignalValue::Integer(raw), "{description}");
    }
}

#[test]
fn test_little_endian_round_trip() {
    round_trip(ByteOrder::LittleEndian, 0x5EED);
}

#[test]
fn test_big_endian_round_trip() {
    round_trip(ByteOrder::BigEndian, 0xB16E);
}

#[test]
fn test_mixed_endianness_is_independent() {
    let signals: Vec<Signal> = vec![
        Signal::new("Le", 0, 12),
        Signal::new("Be", 23, 12).with_byte_order(ByteOrder::BigEndian),
        Signal::new("LeSigned", 36, 20).signed(true),
        Signal::new("BeSigned", 63, 8)
            .with_byte_order(ByteOrder::BigEndian)
            .signed(true),
    ];
    let msg: Message = Message::new(0x10, "Mixed", 8, signals);
    let (encode, decode) = raw_options();

    let mut rng: StdRng = StdRng::seed_from_u64(7);
    let mut data: SignalMap = SignalMap::new();
    for signal in msg.signals() {
        data.insert(
            signal.name.clone(),
            SignalValue::Integer(random_raw(&mut rng, signal.length, signal.is_signed)),
        );
    }
    let before: SignalMap = msg
        .decode_signals(&msg.encode(&data, &encode).expect("encode"), &decode)
        .expect("decode");
    assert_eq!(before, data);

    for signal in msg.signals() {
        let mut changed: SignalMap = data.clone();
        let value: i128 = random_raw(&mut rng, signal.length, signal.is_signed);
        changed.insert(signal.name.clone(), SignalValue::Integer(value));
        let after: SignalMap = msg
            .decode_signals(&msg.encode(&changed, &encode).expect("encode"), &decode)
            .expect("decode");
        for (name, original) in &data {
            if name == &signal.name {
                assert_eq!(after[name], SignalValue::Integer(value));
            } else {
                assert_eq!(&after[name], original, "{name} changed with {}", signal.name);
            }
        }
    }
}

#[test]
fn test_integral_scaling_is_exact() {
    let signal: Signal = Signal::new("Rpm", 0, 16).signed(true).with_scaling(3.0, -1000.0);
    let msg: Message = Message::new(0x20, "Engine", 2, vec![signal]);
    for raw in -32768i128..=32767 {
        let value: i128 = raw * 3 - 1000;
        let mut data: SignalMap = SignalMap::new();
        data.insert("Rpm".into(), SignalValue::Integer(value));
        let encoded: Vec<u8> = msg.encode(&data, &EncodeOptions::default()).expect("encode");
        let decoded: SignalMap = msg
            .decode_signals(&encoded, &DecodeOptions::default())
            .expect("decode");
        assert_eq!(decoded["Rpm"], SignalValue::Integer(value));
    }
}

#[test]
fn test_float_signals() {
    let signals: Vec<Signal> = vec![
        Signal::new("Single", 0, 32).float(true),
        Signal::new("Double", 32, 64).float(true),
    ];
    let msg: Message = Message::new(0x30, "Floats", 12, signals);
    let mut data: SignalMap = SignalMap::new();
    data.insert("Single".into(), SignalValue::Float(-1.5));
    data.insert("Double".into(), SignalValue::Float(1e-300));
    let encoded: Vec<u8> = msg.encode(&data, &EncodeOptions::default()).expect("encode");
    assert_eq!(&encoded[..4], &(-1.5f32).to_le_bytes());
    let decoded: SignalMap = msg
        .decode_signals(&encoded, &DecodeOptions::default())
        .expect("decode");
    assert_eq!(decoded, data);
}

#[test]
fn test_container_through_database() {
    let inner_a: Message = Message::new(0x100, "InnerA", 2, vec![Signal::new("Speed", 0, 16)])
        .with_header_id(0x000102);
    let inner_b: Message = Message::new(0x101, "InnerB", 1, vec![Signal::new("Gear", 0, 4)])
        .with_header_id(0x000103);
    let container: Message = Message::new(0x400, "Container", 64, Vec::new())
        .with_extended_frame(true)
        .with_contained_messages(vec![inner_a, inner_b]);
    let mut db: Database = Database::new();
    db.add_message(container).expect("container");

    let mut speed: SignalMap = SignalMap::new();
    speed.insert("Speed".into(), SignalValue::Integer(300));
    let mut gear: SignalMap = SignalMap::new();
    gear.insert("Gear".into(), SignalValue::Integer(3));
    let entries: Vec<ContainedEntry> = vec![
        ContainedEntry::signals("InnerA", speed.clone()),
        ContainedEntry::signals(0x000103u32, gear.clone()),
        ContainedEntry::raw(0x0000FFu32, vec![0xAA]),
    ];
    let encoded: Vec<u8> = db
        .encode_container("Container", &entries, &EncodeOptions::default())
        .expect("encode");
    assert_eq!(
        encoded,
        vec![0x00, 0x01, 0x02, 2, 0x2C, 0x01, 0x00, 0x01, 0x03, 1, 0x03, 0x00, 0x00, 0xFF, 1, 0xAA]
    );

    // containers are only split on request
    assert!(db
        .decode_message(0x400u32, &encoded, &DecodeOptions::default())
        .is_err());
    let decoded: DecodedMessage = db
        .decode_message(
            0x400u32,
            &encoded,
            &DecodeOptions::default().with_decode_containers(true),
        )
        .expect("decode");
    let entries: &[ContainedDecoded] = decoded.entries().expect("container");
    assert_eq!(entries.len(), 3);
    assert_eq!(
        entries[0],
        ContainedDecoded::Known {
            name: "InnerA".into(),
            header_id: 0x000102,
            signals: speed,
        }
    );
    assert_eq!(entries[1].header_id(), 0x000103);
    assert_eq!(
        entries[2],
        ContainedDecoded::Unknown {
            header_id: 0xFF,
            data: vec![0xAA],
        }
    );
}
