//! Control thread feeding a performing instance through the command queue

mod common;

use std::thread;

use zpd_core::{Instance, Message, Sample, Tie, ZpdError};

use common::{init_logging, write_patch};

#[test]
fn test_commands_apply_on_block_boundaries() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    write_patch(
        dir.path(),
        "level.pd",
        "#N canvas 0 0 200 200 10;
#X obj 10 10 r queue-level;
#X obj 10 40 sig~;
#X obj 10 70 dac~ 1;
#X connect 0 0 1 0;
#X connect 1 0 2 0;
",
    );
    let mut instance = Instance::new();
    instance
        .load("level.pd", &dir.path().to_string_lossy())
        .unwrap();
    instance.prepare(0, 1, 44100, 16).unwrap();
    let mut tx = instance.command_channel(4);

    let control = thread::spawn(move || {
        for level in [0.25, 0.5, 0.75] {
            tx.send(Tie::intern("queue-level"), Message::Float(level))
                .unwrap();
        }
        tx
    });
    let mut tx = control.join().unwrap();

    // all three are drained before the block; the last one wins
    let mut out: Vec<Sample> = vec![0.0; 16];
    instance
        .perform(16, &[], &mut [out.as_mut_slice()])
        .unwrap();
    assert_eq!(out, vec![0.75; 16]);

    assert_eq!(tx.slots(), 4);
    for _ in 0..4 {
        tx.send(Tie::intern("queue-level"), Message::Float(0.0))
            .unwrap();
    }
    assert!(matches!(
        tx.send(Tie::intern("queue-level"), Message::Float(1.0)),
        Err(ZpdError::QueueFull)
    ));

    instance
        .perform(16, &[], &mut [out.as_mut_slice()])
        .unwrap();
    assert_eq!(out, vec![0.0; 16]);
}
