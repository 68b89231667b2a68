//! Patch engine: message dispatch and DSP scheduling
//!
//! The engine owns the open patches of one instance. Control messages are
//! dispatched depth-first: a node appends its `Emission`s to a shared stack,
//! and the dispatcher drains exactly the entries that node produced before
//! returning to its caller. The stack is allocated once, so steady-state
//! dispatch does not allocate for float/bang/symbol traffic.
//!
//! ```text
//!   host send ──► send_to_tie ──► [r foo] ──► deliver ──► Node::receive
//!                     │                                      │ push
//!                     ▼                                      ▼
//!               host bindings                         emission stack
//!                                                            │ flush
//!                       ┌──────────────┬─────────────┬───────┴──────┐
//!                       ▼              ▼             ▼              ▼
//!                   outlet fan-out   send_to_tie   console hook   MIDI hook
//! ```

pub(crate) mod dsp;
pub(crate) mod node;

use std::collections::HashMap;

use crate::config::DspConfig;
use crate::hook::{ConsoleLevel, HookTables, MidiEvent};
use crate::message::Message;
use crate::patch::{Object, Patch, PatchId};
use crate::symbol::Tie;
use crate::types::MAX_MESSAGE_DEPTH;

use dsp::{DspChain, HostIo};
use node::Node;

/// Initial capacity of the emission stack
const EMISSION_STACK_CAPACITY: usize = 256;

/// Effect a node produces while handling a message
#[derive(Debug, Clone)]
pub(crate) enum Emission {
    /// Message out of the node's outlet
    Outlet(usize, Message),
    /// Message to every receiver of a tie
    Send(Tie, Message),
    /// Console text
    Post(ConsoleLevel, String),
    /// MIDI to the host
    Midi(MidiEvent),
    /// Already processed
    Done,
}

/// Address of one object across the engine's patch slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeRef {
    pub slot: u32,
    pub object: u32,
}

#[derive(Debug, Default)]
pub(crate) struct PatchSlot {
    pub generation: u32,
    pub patch: Option<Patch>,
}

fn object_at(slots: &[PatchSlot], node: NodeRef) -> Option<&Object> {
    slots
        .get(node.slot as usize)?
        .patch
        .as_ref()?
        .objects_slice()
        .get(node.object as usize)
}

fn object_at_mut(slots: &mut [PatchSlot], node: NodeRef) -> Option<&mut Object> {
    slots
        .get_mut(node.slot as usize)?
        .patch
        .as_mut()?
        .object_mut(node.object as usize)
}

pub(crate) struct Engine {
    slots: Vec<PatchSlot>,
    /// Patch-side listeners per tie (`r` objects and GUI receive names)
    receivers: HashMap<Tie, Vec<NodeRef>>,
    midi_inputs: Vec<NodeRef>,
    stack: Vec<Emission>,
    depth: usize,
    dsp_config: Option<DspConfig>,
    chain: DspChain,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            receivers: HashMap::new(),
            midi_inputs: Vec::new(),
            stack: Vec::with_capacity(EMISSION_STACK_CAPACITY),
            depth: 0,
            dsp_config: None,
            chain: DspChain::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Patch slots
    // ─────────────────────────────────────────────────────────────────

    pub(crate) fn insert_patch(&mut self, patch: Patch) -> PatchId {
        let slot = match self.slots.iter().position(|s| s.patch.is_none()) {
            Some(index) => index,
            None => {
                self.slots.push(PatchSlot::default());
                self.slots.len() - 1
            }
        };
        let entry = &mut self.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        entry.patch = Some(patch);
        let id = PatchId {
            slot: slot as u32,
            generation: entry.generation,
        };
        self.rebuild_index();
        id
    }

    pub(crate) fn remove_patch(&mut self, id: PatchId) -> Option<Patch> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let patch = slot.patch.take();
        if patch.is_some() {
            self.rebuild_index();
        }
        patch
    }

    pub(crate) fn patch(&self, id: PatchId) -> Option<&Patch> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.patch.as_ref()
    }

    /// Open patches in slot order
    pub(crate) fn patches(&self) -> impl Iterator<Item = (PatchId, &Patch)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let patch = slot.patch.as_ref()?;
            Some((
                PatchId {
                    slot: index as u32,
                    generation: slot.generation,
                },
                patch,
            ))
        })
    }

    pub(crate) fn patch_count(&self) -> usize {
        self.slots.iter().filter(|s| s.patch.is_some()).count()
    }

    fn rebuild_index(&mut self) {
        self.receivers.clear();
        self.midi_inputs.clear();
        for (slot_index, slot) in self.slots.iter().enumerate() {
            let Some(patch) = &slot.patch else { continue };
            for (object_index, object) in patch.objects_slice().iter().enumerate() {
                let node = NodeRef {
                    slot: slot_index as u32,
                    object: object_index as u32,
                };
                if let Some(tie) = object.node.receive_tie() {
                    self.receivers.entry(tie).or_default().push(node);
                }
                if matches!(object.node, Node::MidiIn(_)) {
                    self.midi_inputs.push(node);
                }
            }
        }
    }

    /// Number of patch-side receivers listening on `tie`
    pub(crate) fn receiver_count(&self, tie: Tie) -> usize {
        self.receivers.get(&tie).map_or(0, Vec::len)
    }

    // ─────────────────────────────────────────────────────────────────
    // Message dispatch
    // ─────────────────────────────────────────────────────────────────

    /// Host-originated message to a tie
    pub(crate) fn send(&mut self, hooks: &HookTables, tie: Tie, message: Message) {
        self.send_to_tie(hooks, tie, message);
    }

    /// Host-originated MIDI, fed to every MIDI input object
    pub(crate) fn midi_in(&mut self, hooks: &HookTables, event: &MidiEvent) {
        for i in 0..self.midi_inputs.len() {
            let node = self.midi_inputs[i];
            let start = self.stack.len();
            if let Some(object) = object_at(&self.slots, node) {
                object.node.midi_in(event, &mut self.stack);
            }
            self.flush(hooks, node, start);
        }
    }

    /// Bang every `loadbang` in the patch
    pub(crate) fn loadbang(&mut self, hooks: &HookTables, id: PatchId) {
        let Some(patch) = self.patch(id) else { return };
        let count = patch.object_count();
        for object in 0..count {
            let node = NodeRef {
                slot: id.slot,
                object: object as u32,
            };
            if matches!(
                object_at(&self.slots, node).map(|o| &o.node),
                Some(Node::Loadbang)
            ) {
                self.fire(hooks, node, Emission::Outlet(0, Message::Bang));
            }
        }
    }

    fn fire(&mut self, hooks: &HookTables, node: NodeRef, emission: Emission) {
        let start = self.stack.len();
        self.stack.push(emission);
        self.flush(hooks, node, start);
    }

    fn send_to_tie(&mut self, hooks: &HookTables, tie: Tie, message: Message) {
        let count = self.receiver_count(tie);
        for i in 0..count {
            let Some(&node) = self.receivers.get(&tie).and_then(|r| r.get(i)) else {
                break;
            };
            self.deliver(hooks, node, 0, message.clone());
        }
        hooks.deliver(tie, &message);
    }

    fn deliver(&mut self, hooks: &HookTables, node: NodeRef, inlet: usize, message: Message) {
        if self.depth >= MAX_MESSAGE_DEPTH {
            hooks.post(ConsoleLevel::Error, "stack overflow");
            return;
        }
        self.depth += 1;
        let start = self.stack.len();
        if let Some(object) = object_at_mut(&mut self.slots, node) {
            object.node.receive(inlet, message, &mut self.stack);
        }
        self.flush(hooks, node, start);
        self.depth -= 1;
    }

    /// Process the emissions `source` pushed since `start`, depth-first
    fn flush(&mut self, hooks: &HookTables, source: NodeRef, start: usize) {
        let mut i = start;
        while i < self.stack.len() {
            let emission = std::mem::replace(&mut self.stack[i], Emission::Done);
            i += 1;
            match emission {
                Emission::Outlet(outlet, message) => self.fan_out(hooks, source, outlet, message),
                Emission::Send(tie, message) => self.send_to_tie(hooks, tie, message),
                Emission::Post(level, text) => hooks.post(level, &text),
                Emission::Midi(event) => hooks.midi(&event),
                Emission::Done => {}
            }
        }
        self.stack.truncate(start);
    }

    fn fan_out(&mut self, hooks: &HookTables, source: NodeRef, outlet: usize, message: Message) {
        let count = self
            .slots
            .get(source.slot as usize)
            .and_then(|s| s.patch.as_ref())
            .map_or(0, |p| p.outgoing(source.object as usize, outlet).len());
        let mut message = Some(message);
        for k in 0..count {
            let Some((to, inlet)) = self
                .slots
                .get(source.slot as usize)
                .and_then(|s| s.patch.as_ref())
                .and_then(|p| p.outgoing(source.object as usize, outlet).get(k).copied())
            else {
                break;
            };
            let payload = if k + 1 == count {
                message.take()
            } else {
                message.clone()
            };
            let Some(payload) = payload else { break };
            let target = NodeRef {
                slot: source.slot,
                object: to as u32,
            };
            self.deliver(hooks, target, inlet, payload);
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // DSP
    // ─────────────────────────────────────────────────────────────────

    pub(crate) fn prepare(&mut self, hooks: &HookTables, config: DspConfig) {
        self.dsp_config = Some(config);
        self.rebuild_dsp(hooks);
    }

    pub(crate) fn dsp_config(&self) -> Option<&DspConfig> {
        self.dsp_config.as_ref()
    }

    /// Reschedule after the patch set changed; no-op while released
    pub(crate) fn rebuild_dsp(&mut self, hooks: &HookTables) {
        let Some(config) = &self.dsp_config else {
            self.chain = DspChain::default();
            return;
        };
        self.chain = DspChain::build(&self.slots, config);
        if self.chain.unscheduled() > 0 {
            hooks.post(
                ConsoleLevel::Error,
                &format!(
                    "DSP loop detected ({} objects not scheduled)",
                    self.chain.unscheduled()
                ),
            );
        }
        log::debug!(
            "DSP chain rebuilt: {} steps, block size {}",
            self.chain.step_count(),
            self.chain.block_size()
        );
    }

    /// One block of audio, then the `bang~` ticks
    pub(crate) fn perform(&mut self, hooks: &HookTables, io: &mut HostIo<'_, '_>) {
        self.chain.perform(&self.slots, io);
        for i in 0..self.chain.tick_listeners().len() {
            let node = self.chain.tick_listeners()[i];
            self.fire(hooks, node, Emission::Outlet(0, Message::Bang));
        }
    }

    pub(crate) fn release(&mut self) {
        self.dsp_config = None;
        self.chain = DspChain::default();
    }
}
