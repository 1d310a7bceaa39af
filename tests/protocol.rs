use proptest::collection::vec;
use proptest::prelude::*;

use chip8_rpc::protocol::*;

fn token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_./:-]{1,24}"
}

fn snapshots() -> BoxedStrategy<Message> {
    prop_oneof![
        token().prop_map(|version| Message::from(Version { version })),
        Just(Message::from(Ready {})),
        (any::<u8>(), any::<u8>(), any::<[u64; 32]>()).prop_map(|(width, height, rows)| {
            Message::from(DisplaySnapshot {
                width,
                height,
                rows,
            })
        }),
        (
            any::<u16>(),
            any::<u16>(),
            any::<u16>(),
            any::<[u8; 16]>(),
            any::<bool>(),
            any::<u32>(),
            any::<u64>(),
        )
            .prop_map(|(pc, sp, i, v, paused, errors, time)| {
                Message::from(CpuSnapshot {
                    pc,
                    sp,
                    i,
                    v,
                    paused,
                    errors,
                    time,
                })
            }),
        (any::<u16>(), vec(any::<u8>(), 0..300))
            .prop_map(|(address, bytes)| Message::from(MemorySnapshot { address, bytes })),
    ]
    .boxed()
}

fn io_traffic() -> BoxedStrategy<Message> {
    prop_oneof![
        any::<u64>().prop_map(|time| Message::from(SyncTime { time })),
        any::<u8>().prop_map(|ticks| Message::from(SetDelay { ticks })),
        any::<u8>().prop_map(|ticks| Message::from(SetSound { ticks })),
        any::<u8>().prop_map(|key| Message::from(KeyDownQuery { key })),
        any::<bool>().prop_map(|down| Message::from(KeyDownAnswer { down })),
        Just(Message::from(NextKeyQuery {})),
        any::<u8>().prop_map(|key| Message::from(NextKeyAnswer { key })),
        Just(Message::from(DelayQuery {})),
        any::<u8>().prop_map(|ticks| Message::from(DelayAnswer { ticks })),
    ]
    .boxed()
}

fn commands() -> BoxedStrategy<Message> {
    prop_oneof![
        token().prop_map(|path| Message::from(Load { path })),
        Just(Message::from(Step {})),
        any::<u64>().prop_map(|watchdog| Message::from(Run { watchdog })),
        Just(Message::from(DisplayRequest {})),
        Just(Message::from(CpuRequest {})),
        (any::<u16>(), any::<u16>())
            .prop_map(|(address, length)| Message::from(MemoryRequest { address, length })),
        Just(Message::from(Die {})),
    ]
    .boxed()
}

fn message() -> impl Strategy<Value = Message> {
    prop_oneof![snapshots(), io_traffic(), commands()]
}

proptest! {
    #[test]
    fn every_message_survives_the_wire(message in message()) {
        let line = message.encode();
        prop_assert!(!line.contains('\n'));
        prop_assert!(line.split(' ').all(|token| !token.is_empty()));
        prop_assert_eq!(Message::decode(&line), Ok(message));
    }

    #[test]
    fn commands_are_recognised(message in commands()) {
        prop_assert!(message.is_command());
    }

    #[test]
    fn decoding_junk_never_panics(line in "\\PC{0,64}") {
        let _ = Message::decode(&line);
    }

    #[test]
    fn extra_whitespace_is_tolerated(message in io_traffic()) {
        let line = format!("  {}\t ", message.encode().replace(' ', "   "));
        prop_assert_eq!(Message::decode(&line), Ok(message));
    }
}

#[test]
fn extreme_values() {
    let full = Message::from(MemorySnapshot {
        address: u16::MAX,
        bytes: vec![0xFF; 4096],
    });
    assert_eq!(Message::decode(&full.encode()), Ok(full));

    let empty = Message::from(MemorySnapshot {
        address: 0,
        bytes: Vec::new(),
    });
    assert_eq!(empty.encode(), "_mem 0000 00000000");

    let max = Message::from(CpuSnapshot {
        pc: u16::MAX,
        sp: u16::MAX,
        i: u16::MAX,
        v: [u8::MAX; 16],
        paused: true,
        errors: u32::MAX,
        time: u64::MAX,
    });
    assert_eq!(Message::decode(&max.encode()), Ok(max));
}
