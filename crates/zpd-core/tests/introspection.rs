//! Patch, object and GUI introspection on loaded files

mod common;

use std::sync::{Arc, Mutex};

use zpd_core::{environment, GuiKind, Instance, List, MessageHooks, Tie};

use common::{init_logging, write_patch, TEST_PATCH};

const GUI_PATCH: &str = "#N canvas 0 50 450 300 12;
#X obj 20 20 tgl 15 0 tgl-send tgl-recv toggle 17 7 0 10 -262144 -1 -1 0 1;
#X obj 20 60 hsl 128 15 0 127 0 0 hsl-send hsl-recv volume -2 -8 0 10 -262144 -1 -1 0 1;
#X obj 20 100 vradio 15 1 0 8 empty vr-recv empty 0 -8 0 10 -262144 -1 -1 0;
#X obj 20 240 print plain;
";

fn load(body: &str) -> (tempfile::TempDir, Instance, zpd_core::PatchId) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    write_patch(dir.path(), "patch.pd", body);
    let mut instance = Instance::new();
    let id = instance
        .load("patch.pd", &dir.path().to_string_lossy())
        .unwrap();
    (dir, instance, id)
}

#[test]
fn test_canvas_geometry() {
    let (_dir, instance, id) = load(TEST_PATCH);
    let patch = instance.patch(id).unwrap();
    assert_eq!(patch.x(), 100);
    assert_eq!(patch.y(), 100);
    assert_eq!(patch.width(), 85);
    assert_eq!(patch.height(), 60);
    assert_eq!(patch.name(), "patch.pd");
    assert!(patch.dollar_zero() >= 1000);
}

#[test]
fn test_object_walk_visits_every_object_once() {
    let (_dir, instance, id) = load(TEST_PATCH);
    let patch = instance.patch(id).unwrap();

    let mut names = Vec::new();
    let mut cursor = patch.first_object();
    while let Some(object_id) = cursor {
        let object = patch.object(object_id).unwrap();
        names.push(object.name().name().to_string());
        cursor = patch.next_object(object_id);
    }
    assert_eq!(names.len(), patch.object_count());
    assert_eq!(
        names,
        ["r", "s", "adc~", "dac~", "notein", "noteout", "bendin", "bendout"]
    );

    let relay = patch.objects().next().unwrap();
    assert_eq!(relay.x(), 10);
    assert_eq!(relay.y(), 10);
    assert!(relay.width() > 0 && relay.height() > 0);
    assert!(relay.text().starts_with("r "));
    assert!(!relay.is_gui());
}

#[test]
fn test_gui_metadata() {
    let (_dir, instance, id) = load(GUI_PATCH);
    let patch = instance.patch(id).unwrap();
    let guis: Vec<_> = patch.objects().filter_map(|o| o.gui()).collect();
    assert_eq!(guis.len(), 3);

    let toggle = guis[0];
    assert_eq!(toggle.kind(), GuiKind::Toggle);
    assert_eq!(toggle.send_tie().name(), "tgl-send");
    assert_eq!(toggle.receive_tie().name(), "tgl-recv");
    assert_eq!(toggle.label().name(), "toggle");
    assert_eq!(toggle.number_of_steps(), 2);

    let slider = guis[1];
    assert_eq!(slider.kind(), GuiKind::HorizontalSlider);
    assert_eq!(slider.minimum(), 0.0);
    assert_eq!(slider.maximum(), 127.0);
    assert_eq!(slider.label().name(), "volume");

    let radio = guis[2];
    assert_eq!(radio.kind(), GuiKind::VerticalRadio);
    assert_eq!(radio.number_of_steps(), 8);
    assert_eq!(radio.maximum(), 7.0);
    assert!(radio.send_tie().is_empty());
}

#[test]
fn test_gui_forwards_received_values() {
    let (_dir, mut instance, id) = load(GUI_PATCH);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    instance.bind(
        Tie::intern("hsl-send"),
        Arc::new(MessageHooks::new().on_float(move |_, v| sink.lock().unwrap().push(v))),
    );

    instance.send_float(Tie::intern("hsl-recv"), 64.0);
    instance.send_float(Tie::intern("hsl-recv"), 500.0);
    assert_eq!(*seen.lock().unwrap(), vec![64.0, 127.0]);

    let patch = instance.patch(id).unwrap();
    let slider = patch.objects().filter_map(|o| o.gui()).nth(1).unwrap();
    assert_eq!(slider.value(), 127.0);
}

#[test]
fn test_unbound_send_is_silent() {
    let (_dir, mut instance, _id) = load(TEST_PATCH);
    let tie = Tie::intern("nobody-listens-here");
    instance.send_bang(tie);
    instance.send_float(tie, 1.0);
    instance.send_list(tie, List::new());
    assert_eq!(instance.binding_count(tie), 0);

    let count = Arc::new(Mutex::new(0));
    let counter = count.clone();
    instance.bind(
        tie,
        Arc::new(MessageHooks::new().on_bang(move |_| *counter.lock().unwrap() += 1)),
    );
    assert!(instance.unbind(tie));
    assert!(!instance.unbind(tie));
    instance.send_bang(tie);
    assert_eq!(*count.lock().unwrap(), 0);
}

#[test]
fn test_version_matches_crate() {
    let v = environment::version();
    assert_eq!(v.major, environment::version_major());
    assert_eq!(v.minor, environment::version_minor());
    assert_eq!(v.bug, environment::version_bug());
    assert_eq!(v.to_string(), env!("CARGO_PKG_VERSION"));
}
