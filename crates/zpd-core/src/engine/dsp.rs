//! DSP chain: scheduling and the real-time block walk
//!
//! `DspChain::build` runs on the control thread whenever the instance is
//! prepared or its patch set changes. It sorts the signal objects
//! topologically and preallocates every buffer, so `perform` only copies
//! and combines samples in place.
//!
//! # Buffer layout
//!
//! ```text
//! adc~ ──► [outlet buf] ──feed──► [inlet buf] dac~ ──► host output
//!                     └──feed──► [inlet buf] *~ ──► [outlet buf] ...
//! ```
//!
//! A feed copies when it is the first writer of an inlet buffer and adds
//! otherwise, which gives fan-in summing while keeping single connections
//! bit-exact. Inlet buffers without feeds stay zero.

use std::collections::HashMap;

use crate::config::DspConfig;
use crate::types::Sample;

use super::node::Node;
use super::{NodeRef, PatchSlot};

/// Host channel routing for one adc~ outlet or dac~ inlet
#[derive(Debug, Clone, Copy)]
pub(crate) struct Route {
    /// Host channel, `None` when outside the prepared channel count
    pub channel: Option<usize>,
    /// First dac~ writer of this host output copies instead of adding
    pub copy: bool,
}

#[derive(Debug, Clone, Copy)]
struct Feed {
    from: usize,
    to: usize,
    copy: bool,
}

/// One scheduled signal object
#[derive(Debug)]
pub(crate) struct DspStep {
    pub node: NodeRef,
    pub inlets: Vec<usize>,
    pub outlets: Vec<usize>,
    pub routes: Vec<Route>,
    feeds: Vec<Feed>,
}

/// Caller buffers for one `perform`
pub(crate) struct HostIo<'a, 'b> {
    pub nsamples: usize,
    pub inputs: &'a [&'a [Sample]],
    pub outputs: &'a mut [&'b mut [Sample]],
}

#[derive(Debug, Default)]
pub(crate) struct DspChain {
    block_size: usize,
    buffers: Vec<Vec<Sample>>,
    steps: Vec<DspStep>,
    /// Host outputs written by at least one dac~
    written: Vec<bool>,
    /// bang~ objects, fired after each block
    tick_listeners: Vec<NodeRef>,
    /// Signal objects left out because they sit on a cycle
    unscheduled: usize,
}

fn node_at(slots: &[PatchSlot], node: NodeRef) -> Option<&Node> {
    slots
        .get(node.slot as usize)?
        .patch
        .as_ref()?
        .objects_slice()
        .get(node.object as usize)
        .map(|o| &o.node)
}

impl DspChain {
    pub(crate) fn build(slots: &[PatchSlot], config: &DspConfig) -> DspChain {
        let mut chain = DspChain {
            block_size: config.block_size,
            written: vec![false; config.outputs],
            ..Default::default()
        };

        // Collect signal nodes in patch order
        let mut nodes: Vec<(NodeRef, (usize, usize))> = Vec::new();
        let mut index: HashMap<NodeRef, usize> = HashMap::new();
        for (slot_index, slot) in slots.iter().enumerate() {
            let Some(patch) = &slot.patch else { continue };
            for (object_index, object) in patch.objects_slice().iter().enumerate() {
                let node = NodeRef {
                    slot: slot_index as u32,
                    object: object_index as u32,
                };
                if matches!(object.node, Node::BangTilde) {
                    chain.tick_listeners.push(node);
                }
                if object.node.is_signal() {
                    index.insert(node, nodes.len());
                    nodes.push((node, object.node.signal_ports()));
                }
            }
        }

        // Signal edges: (from node, outlet, to node, inlet)
        let mut edges = Vec::new();
        for (slot_index, slot) in slots.iter().enumerate() {
            let Some(patch) = &slot.patch else { continue };
            for c in patch.connections() {
                let from = NodeRef {
                    slot: slot_index as u32,
                    object: c.from as u32,
                };
                let to = NodeRef {
                    slot: slot_index as u32,
                    object: c.to as u32,
                };
                let (Some(&a), Some(&b)) = (index.get(&from), index.get(&to)) else {
                    continue;
                };
                if c.outlet < nodes[a].1 .1 && c.inlet < nodes[b].1 .0 {
                    edges.push((a, c.outlet, b, c.inlet));
                }
            }
        }

        // Kahn's algorithm, stable on patch order
        let mut indegree = vec![0usize; nodes.len()];
        for &(_, _, b, _) in &edges {
            indegree[b] += 1;
        }
        let mut ready: std::collections::VecDeque<usize> =
            (0..nodes.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(nodes.len());
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &(a, _, b, _) in &edges {
                if a == i {
                    indegree[b] -= 1;
                    if indegree[b] == 0 {
                        ready.push_back(b);
                    }
                }
            }
        }
        chain.unscheduled = nodes.len() - order.len();

        // Buffers and steps
        let mut outlet_buffers: HashMap<(usize, usize), usize> = HashMap::new();
        let mut inlet_buffers: HashMap<(usize, usize), usize> = HashMap::new();
        let mut step_of: HashMap<usize, usize> = HashMap::new();
        for &i in &order {
            let (node, (ins, outs)) = nodes[i];
            let mut step = DspStep {
                node,
                inlets: Vec::with_capacity(ins),
                outlets: Vec::with_capacity(outs),
                routes: Vec::new(),
                feeds: Vec::new(),
            };
            for inlet in 0..ins {
                inlet_buffers.insert((i, inlet), chain.buffers.len());
                step.inlets.push(chain.buffers.len());
                chain.buffers.push(vec![0.0; config.block_size]);
            }
            for outlet in 0..outs {
                outlet_buffers.insert((i, outlet), chain.buffers.len());
                step.outlets.push(chain.buffers.len());
                chain.buffers.push(vec![0.0; config.block_size]);
            }
            step_of.insert(i, chain.steps.len());
            chain.steps.push(step);
        }

        let mut fed = vec![false; chain.buffers.len()];
        for &(a, outlet, b, inlet) in &edges {
            let (Some(&from), Some(&to), Some(&step)) = (
                outlet_buffers.get(&(a, outlet)),
                inlet_buffers.get(&(b, inlet)),
                step_of.get(&b),
            ) else {
                continue;
            };
            chain.steps[step].feeds.push(Feed {
                from,
                to,
                copy: !fed[to],
            });
            fed[to] = true;
        }

        for step in &mut chain.steps {
            match node_at(slots, step.node) {
                Some(Node::Adc(channels)) => {
                    step.routes = channels
                        .iter()
                        .map(|&c| Route {
                            channel: (c < config.inputs).then_some(c),
                            copy: true,
                        })
                        .collect();
                }
                Some(Node::Dac(channels)) => {
                    step.routes = channels
                        .iter()
                        .map(|&c| {
                            let channel = (c < config.outputs).then_some(c);
                            let copy = channel.is_some_and(|c| !chain.written[c]);
                            if let Some(c) = channel {
                                chain.written[c] = true;
                            }
                            Route { channel, copy }
                        })
                        .collect();
                }
                _ => {}
            }
        }

        chain
    }

    pub(crate) fn block_size(&self) -> usize {
        self.block_size
    }

    pub(crate) fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn unscheduled(&self) -> usize {
        self.unscheduled
    }

    pub(crate) fn tick_listeners(&self) -> &[NodeRef] {
        &self.tick_listeners
    }

    /// Process one block. Allocation-free.
    pub(crate) fn perform(&mut self, slots: &[PatchSlot], io: &mut HostIo<'_, '_>) {
        let n = io.nsamples;
        for (channel, output) in io.outputs.iter_mut().enumerate() {
            if !self.written.get(channel).copied().unwrap_or(false) {
                output[..n].fill(0.0);
            }
        }

        for step in &self.steps {
            for feed in &step.feeds {
                for i in 0..n {
                    let sample = self.buffers[feed.from][i];
                    if feed.copy {
                        self.buffers[feed.to][i] = sample;
                    } else {
                        self.buffers[feed.to][i] += sample;
                    }
                }
            }
            if let Some(node) = node_at(slots, step.node) {
                node.perform(step, &mut self.buffers, io);
            }
        }
    }
}
