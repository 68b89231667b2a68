//! Per-instance hook slots and receiver bindings

use std::collections::HashMap;
use std::sync::Arc;

use crate::message::Message;
use crate::symbol::Tie;

use super::console::forward_to_log;
use super::{ConsoleLevel, ConsoleSink, MessageSink, MidiEvent, MidiSink};

/// What an instance calls back into
///
/// Bindings are stacked per tie: every bound sink receives each message,
/// and `unbind` removes the most recent binding first.
#[derive(Default)]
pub(crate) struct HookTables {
    instance_id: u64,
    console: Option<Arc<dyn ConsoleSink>>,
    midi: Option<Arc<dyn MidiSink>>,
    bindings: HashMap<Tie, Vec<Arc<dyn MessageSink>>>,
}

impl HookTables {
    pub(crate) fn new(instance_id: u64) -> Self {
        Self {
            instance_id,
            ..Default::default()
        }
    }

    pub(crate) fn set_console(&mut self, sink: Option<Arc<dyn ConsoleSink>>) {
        self.console = sink;
    }

    pub(crate) fn set_midi(&mut self, sink: Option<Arc<dyn MidiSink>>) {
        self.midi = sink;
    }

    pub(crate) fn post(&self, level: ConsoleLevel, text: &str) {
        match &self.console {
            Some(sink) => sink.receive(level, text),
            None => forward_to_log(self.instance_id, level, text),
        }
    }

    pub(crate) fn midi(&self, event: &MidiEvent) {
        if let Some(sink) = &self.midi {
            sink.receive(event);
        }
    }

    pub(crate) fn bind(&mut self, tie: Tie, sink: Arc<dyn MessageSink>) {
        self.bindings.entry(tie).or_default().push(sink);
    }

    /// Remove the latest binding on `tie`. Returns false if there was none.
    pub(crate) fn unbind(&mut self, tie: Tie) -> bool {
        let Some(stack) = self.bindings.get_mut(&tie) else {
            return false;
        };
        let removed = stack.pop().is_some();
        if stack.is_empty() {
            self.bindings.remove(&tie);
        }
        removed
    }

    pub(crate) fn binding_count(&self, tie: Tie) -> usize {
        self.bindings.get(&tie).map_or(0, Vec::len)
    }

    /// Deliver to every host sink bound on `tie`
    pub(crate) fn deliver(&self, tie: Tie, message: &Message) {
        if let Some(stack) = self.bindings.get(&tie) {
            for sink in stack {
                sink.receive(tie, message);
            }
        }
    }
}
