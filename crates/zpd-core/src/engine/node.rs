//! Built-in object vocabulary
//!
//! Each object in a patch carries one `Node`. Control behaviour is a pure
//! function of (node state, inlet, message) that appends `Emission`s; the
//! dispatcher in `engine` turns those into outlet deliveries, tie sends,
//! console posts and MIDI output. Signal behaviour is the `perform` kernel
//! driven by the DSP chain.

use crate::atom::Atom;
use crate::hook::{ConsoleLevel, MidiEvent};
use crate::list::List;
use crate::message::Message;
use crate::patch::Gui;
use crate::symbol::{Symbol, Tie};
use crate::types::Sample;

use super::dsp::{DspStep, HostIo};
use super::Emission;

/// Which MIDI event family a `*in`/`*out` object handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MidiKind {
    Note,
    Control,
    Program,
    Bend,
    Touch,
    PolyTouch,
    Byte,
}

impl MidiKind {
    fn from_class(class: &str) -> Option<(Self, bool)> {
        let (kind, input) = match class {
            "notein" => (MidiKind::Note, true),
            "noteout" => (MidiKind::Note, false),
            "ctlin" => (MidiKind::Control, true),
            "ctlout" => (MidiKind::Control, false),
            "pgmin" => (MidiKind::Program, true),
            "pgmout" => (MidiKind::Program, false),
            "bendin" => (MidiKind::Bend, true),
            "bendout" => (MidiKind::Bend, false),
            "touchin" => (MidiKind::Touch, true),
            "touchout" => (MidiKind::Touch, false),
            "polytouchin" => (MidiKind::PolyTouch, true),
            "polytouchout" => (MidiKind::PolyTouch, false),
            "midiin" => (MidiKind::Byte, true),
            "midiout" => (MidiKind::Byte, false),
            _ => return None,
        };
        Some((kind, input))
    }

    /// Number of inlets on the output object (hot inlet included)
    fn inlets(self) -> usize {
        match self {
            MidiKind::Note | MidiKind::Control | MidiKind::PolyTouch => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    #[inline]
    fn apply(self, a: Sample, b: Sample) -> Sample {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
        }
    }
}

/// Message-box atom, with `$N` placeholders resolved at load time
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SegmentAtom {
    Literal(Atom),
    /// 0-based index into the incoming arguments (`$1` is 0)
    Arg(usize),
}

impl SegmentAtom {
    /// `$1`..`$N` become argument slots, anything else stays literal
    pub(crate) fn from_atom(atom: Atom) -> Self {
        if let Atom::Symbol(symbol) = atom {
            let index = symbol
                .name()
                .strip_prefix('$')
                .and_then(|n| n.parse::<usize>().ok());
            match index {
                Some(index) if index >= 1 => return SegmentAtom::Arg(index - 1),
                _ => {}
            }
        }
        SegmentAtom::Literal(atom)
    }

    /// Value for one delivery; missing arguments read as 0
    #[inline]
    fn resolve(self, input: &List) -> Atom {
        match self {
            SegmentAtom::Literal(atom) => atom,
            SegmentAtom::Arg(index) => input.get(index).unwrap_or(Atom::Float(0.0)),
        }
    }
}

/// One `,`/`;` separated piece of a message box
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MessageSegment {
    /// `None` for the outlet, a tie for `; name ...` segments
    pub target: Option<Tie>,
    pub atoms: Vec<SegmentAtom>,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// Comments, subpatch boxes and classes that failed to create
    Inert,
    Receive(Tie),
    Send(Tie),
    Print(String),
    Loadbang,
    BangTilde,
    MessageBox(Vec<MessageSegment>),
    FloatAtom(f32),
    MidiIn(MidiKind),
    /// Output kind plus the values latched on its cold inlets
    MidiOut(MidiKind, [i32; 2]),
    /// Host input channels (0-based), one outlet each
    Adc(Vec<usize>),
    /// Host output channels (0-based), one inlet each
    Dac(Vec<usize>),
    /// Binary signal op; `Some` scalar replaces the right signal inlet
    Binop(BinOp, Option<f32>),
    Sig(f32),
    Gui(Gui),
}

/// Host channel list from creation arguments, 1-based in the text
fn channels(args: &[Atom]) -> Vec<usize> {
    let list: Vec<usize> = args
        .iter()
        .filter_map(|a| match a {
            Atom::Float(f) if *f >= 1.0 => Some(*f as usize - 1),
            _ => None,
        })
        .collect();
    if list.is_empty() {
        vec![0, 1]
    } else {
        list
    }
}

fn tie_arg(args: &[Atom]) -> Tie {
    match args.first() {
        Some(Atom::Symbol(s)) => Tie::intern(s.name()),
        Some(Atom::Float(f)) => Tie::intern(&f.to_string()),
        _ => Tie::EMPTY,
    }
}

impl Node {
    /// Instantiate a non-GUI class, `None` if the class is unknown
    pub(crate) fn create(class: &str, args: &[Atom]) -> Option<Node> {
        let node = match class {
            "r" | "receive" => Node::Receive(tie_arg(args)),
            "s" | "send" => Node::Send(tie_arg(args)),
            "print" => Node::Print(match args.first() {
                Some(atom @ (Atom::Symbol(_) | Atom::Float(_))) => atom.to_string(),
                _ => "print".to_string(),
            }),
            "loadbang" => Node::Loadbang,
            "bang~" => Node::BangTilde,
            "adc~" => Node::Adc(channels(args)),
            "dac~" => Node::Dac(channels(args)),
            "+~" | "-~" | "*~" => {
                let op = match class {
                    "+~" => BinOp::Add,
                    "-~" => BinOp::Sub,
                    _ => BinOp::Mul,
                };
                let scalar = args.first().filter(|a| a.is_float()).map(|a| a.as_float());
                Node::Binop(op, scalar)
            }
            "sig~" => Node::Sig(args.first().map_or(0.0, |a| a.as_float())),
            _ => {
                let (kind, input) = MidiKind::from_class(class)?;
                if input {
                    Node::MidiIn(kind)
                } else {
                    let mut cold = [0; 2];
                    let ints = args.iter().map(|a| a.as_float() as i32);
                    if matches!(kind, MidiKind::Note | MidiKind::PolyTouch) {
                        // single argument is the channel, on the last inlet
                        if let Some(channel) = ints.take(1).next() {
                            cold[1] = channel;
                        }
                    } else {
                        for (slot, value) in cold.iter_mut().zip(ints) {
                            *slot = value;
                        }
                    }
                    Node::MidiOut(kind, cold)
                }
            }
        };
        Some(node)
    }

    /// `(signal inlets, signal outlets)`, zero for control objects
    pub(crate) fn signal_ports(&self) -> (usize, usize) {
        match self {
            Node::Adc(ch) => (0, ch.len()),
            Node::Dac(ch) => (ch.len(), 0),
            Node::Binop(_, Some(_)) => (1, 1),
            Node::Binop(_, None) => (2, 1),
            Node::Sig(_) => (0, 1),
            _ => (0, 0),
        }
    }

    pub(crate) fn is_signal(&self) -> bool {
        self.signal_ports() != (0, 0)
    }

    /// Tie this node listens on, if any
    pub(crate) fn receive_tie(&self) -> Option<Tie> {
        let tie = match self {
            Node::Receive(tie) => *tie,
            Node::Gui(gui) => gui.receive_tie(),
            _ => return None,
        };
        (!tie.is_empty()).then_some(tie)
    }

    /// Control message on `inlet`
    pub(crate) fn receive(&mut self, inlet: usize, msg: Message, out: &mut Vec<Emission>) {
        match self {
            Node::Inert | Node::Loadbang | Node::BangTilde | Node::MidiIn(_) => {}
            Node::Adc(_) | Node::Dac(_) => {}
            Node::Receive(_) => out.push(Emission::Outlet(0, msg)),
            Node::Send(tie) => {
                if inlet == 1 {
                    if let Message::Symbol(name) = msg {
                        *tie = Tie::intern(name.name());
                    }
                } else if !tie.is_empty() {
                    out.push(Emission::Send(*tie, msg));
                }
            }
            Node::Print(prefix) => out.push(Emission::Post(
                ConsoleLevel::Normal,
                format!("{}: {}", prefix, msg),
            )),
            Node::MessageBox(segments) => match msg {
                Message::Anything { selector, args } if selector == Symbol::SET => {
                    *segments = vec![MessageSegment {
                        target: None,
                        atoms: args.iter().map(|a| SegmentAtom::Literal(*a)).collect(),
                    }];
                }
                msg => {
                    let input = msg.arguments();
                    for segment in segments.iter() {
                        let atoms: Vec<Atom> = segment
                            .atoms
                            .iter()
                            .map(|a| a.resolve(&input))
                            .collect();
                        let message = Message::from_atoms(&atoms);
                        out.push(match segment.target {
                            Some(tie) => Emission::Send(tie, message),
                            None => Emission::Outlet(0, message),
                        });
                    }
                }
            },
            Node::FloatAtom(value) => match msg {
                Message::Bang => out.push(Emission::Outlet(0, Message::Float(*value))),
                Message::Anything { selector, args } if selector == Symbol::SET => {
                    *value = args.first().map_or(*value, |a| a.as_float());
                }
                other => {
                    if let Some(v) = other.as_float() {
                        *value = v;
                        out.push(Emission::Outlet(0, Message::Float(v)));
                    }
                }
            },
            Node::MidiOut(kind, cold) => {
                let kind = *kind;
                if inlet > 0 {
                    if let (Some(v), Some(slot)) = (msg.as_float(), cold.get_mut(inlet - 1)) {
                        *slot = v as i32;
                    }
                    return;
                }
                let hot = match &msg {
                    Message::List(list) => {
                        // distribute right to left across the inlets
                        for i in (1..list.len().min(kind.inlets())).rev() {
                            cold[i - 1] = list.get_float(i).unwrap_or(0.0) as i32;
                        }
                        list.get_float(0).ok()
                    }
                    other => other.as_float(),
                };
                if let Some(hot) = hot {
                    out.push(Emission::Midi(midi_out_event(kind, hot as i32, *cold)));
                }
            }
            Node::Binop(_, scalar) => {
                if let (1, Some(s), Some(v)) = (inlet, scalar.as_mut(), msg.as_float()) {
                    *s = v;
                }
            }
            Node::Sig(value) => {
                if let Some(v) = msg.as_float() {
                    *value = v;
                }
            }
            Node::Gui(gui) => gui.receive(msg, out),
        }
    }

    /// Incoming MIDI from the host; outlets fire right to left
    pub(crate) fn midi_in(&self, event: &MidiEvent, out: &mut Vec<Emission>) {
        let Node::MidiIn(kind) = self else {
            return;
        };
        let (values, count) = match (*kind, *event) {
            (
                MidiKind::Note,
                MidiEvent::NoteOn {
                    channel,
                    pitch,
                    velocity,
                },
            ) => ([pitch, velocity, channel], 3),
            (
                MidiKind::Control,
                MidiEvent::ControlChange {
                    channel,
                    controller,
                    value,
                },
            ) => ([value, controller, channel], 3),
            (MidiKind::Program, MidiEvent::ProgramChange { channel, value })
            | (MidiKind::Bend, MidiEvent::PitchBend { channel, value })
            | (MidiKind::Touch, MidiEvent::AfterTouch { channel, value }) => {
                ([value, channel, 0], 2)
            }
            (
                MidiKind::PolyTouch,
                MidiEvent::PolyAfterTouch {
                    channel,
                    pitch,
                    value,
                },
            ) => ([value, pitch, channel], 3),
            (MidiKind::Byte, MidiEvent::Byte { port, value }) => ([value, port, 0], 2),
            _ => return,
        };
        for outlet in (0..count).rev() {
            out.push(Emission::Outlet(outlet, Message::Float(values[outlet] as f32)));
        }
    }

    /// Run one block of the signal kernel
    pub(crate) fn perform(&self, step: &DspStep, buffers: &mut [Vec<Sample>], io: &mut HostIo<'_, '_>) {
        let n = io.nsamples;
        match self {
            Node::Adc(_) => {
                for (route, &out) in step.routes.iter().zip(&step.outlets) {
                    match route.channel.and_then(|c| io.inputs.get(c)) {
                        Some(input) => buffers[out][..n].copy_from_slice(&input[..n]),
                        None => buffers[out][..n].fill(0.0),
                    }
                }
            }
            Node::Dac(_) => {
                for (route, &inlet) in step.routes.iter().zip(&step.inlets) {
                    let Some(output) = route.channel.and_then(|c| io.outputs.get_mut(c)) else {
                        continue;
                    };
                    let source = &buffers[inlet][..n];
                    if route.copy {
                        output[..n].copy_from_slice(source);
                    } else {
                        for (o, s) in output[..n].iter_mut().zip(source) {
                            *o += *s;
                        }
                    }
                }
            }
            Node::Binop(op, scalar) => {
                let (left, out) = (step.inlets[0], step.outlets[0]);
                match scalar {
                    Some(k) => {
                        for i in 0..n {
                            let a = buffers[left][i];
                            buffers[out][i] = op.apply(a, *k);
                        }
                    }
                    None => {
                        let right = step.inlets[1];
                        for i in 0..n {
                            let (a, b) = (buffers[left][i], buffers[right][i]);
                            buffers[out][i] = op.apply(a, b);
                        }
                    }
                }
            }
            Node::Sig(value) => buffers[step.outlets[0]][..n].fill(*value),
            _ => {}
        }
    }
}

/// Build the event a MIDI output object sends when its hot inlet fires
fn midi_out_event(kind: MidiKind, hot: i32, cold: [i32; 2]) -> MidiEvent {
    match kind {
        MidiKind::Note => MidiEvent::NoteOn {
            channel: cold[1],
            pitch: hot,
            velocity: cold[0],
        },
        MidiKind::Control => MidiEvent::ControlChange {
            channel: cold[1],
            controller: cold[0],
            value: hot,
        },
        MidiKind::Program => MidiEvent::ProgramChange {
            channel: cold[0],
            value: hot,
        },
        MidiKind::Bend => MidiEvent::PitchBend {
            channel: cold[0],
            value: hot,
        },
        MidiKind::Touch => MidiEvent::AfterTouch {
            channel: cold[0],
            value: hot,
        },
        MidiKind::PolyTouch => MidiEvent::PolyAfterTouch {
            channel: cold[1],
            pitch: cold[0],
            value: hot,
        },
        MidiKind::Byte => MidiEvent::Byte {
            port: cold[0],
            value: hot,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_and_unknown() {
        assert!(matches!(Node::create("r", &[Atom::from("x")]), Some(Node::Receive(t)) if t.name() == "x"));
        assert!(matches!(Node::create("dac~", &[]), Some(Node::Dac(ch)) if ch == vec![0, 1]));
        assert!(matches!(Node::create("adc~", &[Atom::Float(2.0)]), Some(Node::Adc(ch)) if ch == vec![1]));
        assert!(matches!(Node::create("*~", &[Atom::Float(0.5)]), Some(Node::Binop(BinOp::Mul, Some(k))) if k == 0.5));
        assert!(Node::create("osc~", &[]).is_none());
    }

    #[test]
    fn test_notein_fires_right_to_left() {
        let node = Node::create("notein", &[]).unwrap();
        let mut out = Vec::new();
        node.midi_in(
            &MidiEvent::NoteOn {
                channel: 1,
                pitch: 60,
                velocity: 100,
            },
            &mut out,
        );
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Emission::Outlet(2, Message::Float(c)) if c == 1.0));
        assert!(matches!(out[2], Emission::Outlet(0, Message::Float(p)) if p == 60.0));

        // Other event families are ignored
        out.clear();
        node.midi_in(&MidiEvent::Byte { port: 0, value: 1 }, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_noteout_latches_cold_inlets() {
        let mut node = Node::create("noteout", &[Atom::Float(3.0)]).unwrap();
        let mut out = Vec::new();
        node.receive(1, Message::Float(90.0), &mut out);
        node.receive(0, Message::Float(64.0), &mut out);
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out[0],
            Emission::Midi(MidiEvent::NoteOn {
                channel: 3,
                pitch: 64,
                velocity: 90
            })
        ));
    }

    #[test]
    fn test_ctlout_list_distribution() {
        let mut node = Node::create("ctlout", &[]).unwrap();
        let mut out = Vec::new();
        let list = List::new().with(10.0f32).with(7.0f32).with(2.0f32);
        node.receive(0, Message::List(list), &mut out);
        assert!(matches!(
            out[0],
            Emission::Midi(MidiEvent::ControlChange {
                channel: 2,
                controller: 7,
                value: 10
            })
        ));
    }

    #[test]
    fn test_message_box_segments_and_dollars() {
        let mut node = Node::MessageBox(vec![
            MessageSegment {
                target: None,
                atoms: vec![
                    SegmentAtom::from_atom(Atom::from("pitch")),
                    SegmentAtom::from_atom(Atom::from("$1")),
                    SegmentAtom::from_atom(Atom::from("$2")),
                ],
            },
            MessageSegment {
                target: Some(Tie::intern("elsewhere")),
                atoms: vec![SegmentAtom::Literal(Atom::Float(1.0))],
            },
        ]);
        let mut out = Vec::new();
        node.receive(0, Message::Float(440.0), &mut out);
        assert_eq!(out.len(), 2);
        match &out[0] {
            Emission::Outlet(0, Message::Anything { selector, args }) => {
                assert_eq!(selector.name(), "pitch");
                assert_eq!(args.get_float(0).unwrap(), 440.0);
                // only one argument came in, $2 reads as zero
                assert_eq!(args.get_float(1).unwrap(), 0.0);
            }
            other => panic!("unexpected emission {:?}", other),
        }
        assert!(matches!(&out[1], Emission::Send(t, Message::Float(v)) if t.name() == "elsewhere" && *v == 1.0));
    }

    #[test]
    fn test_segment_atom_from_atom() {
        assert_eq!(SegmentAtom::from_atom(Atom::from("$3")), SegmentAtom::Arg(2));
        assert_eq!(
            SegmentAtom::from_atom(Atom::from("$0")),
            SegmentAtom::Literal(Atom::from("$0"))
        );
        assert_eq!(
            SegmentAtom::from_atom(Atom::from("$x")),
            SegmentAtom::Literal(Atom::from("$x"))
        );
        assert_eq!(
            SegmentAtom::from_atom(Atom::Float(3.0)),
            SegmentAtom::Literal(Atom::Float(3.0))
        );
    }

    #[test]
    fn test_set_replaces_message_box_contents() {
        let mut node = Node::MessageBox(vec![MessageSegment {
            target: None,
            atoms: vec![SegmentAtom::Arg(0)],
        }]);
        let mut out = Vec::new();
        let set = Message::classify(Symbol::SET, List::new().with(5.0f32));
        node.receive(0, set, &mut out);
        assert!(out.is_empty());
        node.receive(0, Message::Float(9.0), &mut out);
        assert!(matches!(&out[0], Emission::Outlet(0, Message::Float(v)) if *v == 5.0));
    }

    #[test]
    fn test_send_name_from_right_inlet() {
        let mut node = Node::create("s", &[]).unwrap();
        let mut out = Vec::new();
        node.receive(0, Message::Bang, &mut out);
        assert!(out.is_empty());
        node.receive(1, Message::Symbol(Symbol::intern("later")), &mut out);
        node.receive(0, Message::Bang, &mut out);
        assert!(matches!(&out[0], Emission::Send(t, Message::Bang) if t.name() == "later"));
    }
}
