//! Shared fixtures for the scenario tests

#![allow(dead_code)]

use std::path::Path;

use zpd_core::Sample;

/// Relay, audio pass-through and MIDI echo in one 85x60 canvas
pub const TEST_PATCH: &str = "#N canvas 100 100 85 60 10;
#X obj 10 10 r \\$0-fromxpd;
#X obj 10 40 s \\$0-toxpd1;
#X obj 100 10 adc~;
#X obj 100 40 dac~;
#X obj 200 10 notein;
#X obj 200 40 noteout;
#X obj 300 10 bendin;
#X obj 300 40 bendout;
#X connect 0 0 1 0;
#X connect 2 0 3 0;
#X connect 2 1 3 1;
#X connect 4 0 5 0;
#X connect 4 1 5 1;
#X connect 4 2 5 2;
#X connect 6 0 7 0;
#X connect 6 1 7 1;
";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn write_patch(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).expect("write test patch");
}

/// Deterministic samples in [-1, 1]
pub fn noise(seed: u32, len: usize) -> Vec<Sample> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as Sample / (1u32 << 24) as Sample * 2.0 - 1.0
        })
        .collect()
}
