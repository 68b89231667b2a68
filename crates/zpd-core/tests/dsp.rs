//! prepare/perform/release against real patch files

mod common;

use std::sync::Arc;

use zpd_core::{ConsoleHistory, ConsoleLevel, Instance, Sample, Tie, ZpdError};

use common::{init_logging, noise, write_patch};

const PASS_STEREO: &str = "#N canvas 0 0 200 200 10;
#X obj 10 10 adc~ 1 2;
#X obj 10 60 dac~ 1 2;
#X connect 0 0 1 0;
#X connect 0 1 1 1;
";

fn open(body: &str) -> (tempfile::TempDir, Instance) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    write_patch(dir.path(), "patch.pd", body);
    let mut instance = Instance::new();
    instance
        .load("patch.pd", &dir.path().to_string_lossy())
        .unwrap();
    (dir, instance)
}

fn run_block(
    instance: &mut Instance,
    block: usize,
    inputs: &[Vec<Sample>],
    nouts: usize,
) -> Vec<Vec<Sample>> {
    let ins: Vec<&[Sample]> = inputs.iter().map(Vec::as_slice).collect();
    let mut outputs: Vec<Vec<Sample>> = vec![vec![0.5; block]; nouts];
    {
        let mut outs: Vec<&mut [Sample]> = outputs.iter_mut().map(Vec::as_mut_slice).collect();
        instance.perform(block, &ins, &mut outs).unwrap();
    }
    outputs
}

#[test]
fn test_identity_is_bit_exact() {
    for (rate, block, nins, nouts) in [(44100, 64, 2, 2), (44100, 256, 2, 1), (96000, 128, 1, 1)] {
        let (_dir, mut instance) = open(PASS_STEREO);
        instance.prepare(nins, nouts, rate, block).unwrap();

        let inputs: Vec<Vec<Sample>> = (0..nins).map(|c| noise(c as u32 + 7, block)).collect();
        let outputs = run_block(&mut instance, block, &inputs, nouts);
        for channel in 0..nouts {
            assert_eq!(
                outputs[channel], inputs[channel],
                "channel {} at {} Hz / {}",
                channel, rate, block
            );
        }
        instance.release();
    }
}

#[test]
fn test_scaling_and_fan_in() {
    let (_dir, mut instance) = open(
        "#N canvas 0 0 200 200 10;
#X obj 10 10 adc~ 1;
#X obj 10 40 *~ 0.5;
#X obj 80 40 sig~ 0.25;
#X obj 10 80 dac~ 1;
#X connect 0 0 1 0;
#X connect 1 0 3 0;
#X connect 2 0 3 0;
",
    );
    instance.prepare(1, 1, 48000, 4).unwrap();
    let outputs = run_block(&mut instance, 4, &[vec![1.0, -1.0, 0.5, 0.0]], 1);
    assert_eq!(outputs[0], vec![0.75, -0.25, 0.5, 0.25]);
}

#[test]
fn test_control_float_sets_scalar() {
    let (_dir, mut instance) = open(
        "#N canvas 0 0 200 200 10;
#X obj 10 10 r dsp-gain;
#X obj 10 40 *~ 1;
#X obj 80 10 adc~ 1;
#X obj 10 80 dac~ 1;
#X connect 0 0 1 1;
#X connect 2 0 1 0;
#X connect 1 0 3 0;
",
    );
    instance.prepare(1, 1, 44100, 4).unwrap();
    let outputs = run_block(&mut instance, 4, &[vec![0.5; 4]], 1);
    assert_eq!(outputs[0], vec![0.5; 4]);

    instance.send_float(Tie::intern("dsp-gain"), 2.0);
    let outputs = run_block(&mut instance, 4, &[vec![0.5; 4]], 1);
    assert_eq!(outputs[0], vec![1.0; 4]);
}

#[test]
fn test_missing_inputs_are_silent_and_extra_outputs_zeroed() {
    let (_dir, mut instance) = open(PASS_STEREO);
    instance.prepare(2, 2, 44100, 8).unwrap();
    // only one input slice supplied, three output slices
    let outputs = run_block(&mut instance, 8, &[vec![0.5; 8]], 3);
    assert_eq!(outputs[0], vec![0.5; 8]);
    assert_eq!(outputs[1], vec![0.0; 8]);
    assert_eq!(outputs[2], vec![0.0; 8]);
}

#[test]
fn test_bang_tilde_fires_once_per_block() {
    let (_dir, mut instance) = open(
        "#N canvas 0 0 200 200 10;
#X obj 10 10 bang~;
#X obj 10 40 print tick;
#X connect 0 0 1 0;
",
    );
    let history = Arc::new(ConsoleHistory::new());
    instance.set_console_hook(history.clone());
    instance.prepare(0, 0, 44100, 64).unwrap();
    for _ in 0..16 {
        instance.perform(64, &[], &mut []).unwrap();
    }
    assert_eq!(history.count(ConsoleLevel::Normal), 16);
    assert!(history.posts().iter().all(|p| p.text == "tick: bang"));
}

#[test]
fn test_release_then_perform_fails() {
    let (_dir, mut instance) = open(PASS_STEREO);
    instance.prepare(2, 2, 44100, 64).unwrap();
    instance.release();
    instance.release();
    assert!(matches!(
        instance.perform(64, &[], &mut []),
        Err(ZpdError::DspNotPrepared)
    ));
}

#[test]
fn test_close_while_prepared_rebuilds_chain() {
    let (_dir, mut instance) = open(PASS_STEREO);
    instance.prepare(1, 1, 44100, 4).unwrap();
    let outputs = run_block(&mut instance, 4, &[vec![0.5; 4]], 1);
    assert_eq!(outputs[0], vec![0.5; 4]);

    let id = instance.patches().next().map(|(id, _)| id).unwrap();
    instance.close(id).unwrap();
    let outputs = run_block(&mut instance, 4, &[vec![0.5; 4]], 1);
    assert_eq!(outputs[0], vec![0.0; 4]);
}
