//! MIDI events exchanged with the host
//!
//! Values are carried as plain integers and never range-checked: a channel
//! of 16 or a velocity of 200 reaches the patch (or the host) unchanged.
//! Channels above 15 encode a port in their high bits, the same way
//! multi-port hosts number channels.

use std::fmt;

/// One of the seven MIDI event shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiEvent {
    NoteOn {
        channel: i32,
        pitch: i32,
        velocity: i32,
    },
    ControlChange {
        channel: i32,
        controller: i32,
        value: i32,
    },
    ProgramChange {
        channel: i32,
        value: i32,
    },
    /// Bend value, -8192..=8191 at the wire level
    PitchBend {
        channel: i32,
        value: i32,
    },
    AfterTouch {
        channel: i32,
        value: i32,
    },
    PolyAfterTouch {
        channel: i32,
        pitch: i32,
        value: i32,
    },
    /// Raw byte on a port
    Byte {
        port: i32,
        value: i32,
    },
}

impl MidiEvent {
    /// Raw channel field (includes the port bits), `None` for raw bytes
    pub fn raw_channel(&self) -> Option<i32> {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::AfterTouch { channel, .. }
            | MidiEvent::PolyAfterTouch { channel, .. } => Some(channel),
            MidiEvent::Byte { .. } => None,
        }
    }

    /// Port the event travels on
    pub fn port(&self) -> i32 {
        match *self {
            MidiEvent::Byte { port, .. } => port,
            _ => self.raw_channel().unwrap_or(0) >> 4,
        }
    }

    /// Channel within the port (0-15), 0 for raw bytes
    pub fn channel(&self) -> i32 {
        self.raw_channel().unwrap_or(0) & 0x0F
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MidiEvent::NoteOn { .. } => "noteon",
            MidiEvent::ControlChange { .. } => "controlchange",
            MidiEvent::ProgramChange { .. } => "programchange",
            MidiEvent::PitchBend { .. } => "pitchbend",
            MidiEvent::AfterTouch { .. } => "aftertouch",
            MidiEvent::PolyAfterTouch { .. } => "polyaftertouch",
            MidiEvent::Byte { .. } => "byte",
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiEvent::NoteOn {
                channel,
                pitch,
                velocity,
            } => write!(f, "noteon ch={} pitch={} vel={}", channel, pitch, velocity),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => write!(f, "cc ch={} ctl={} val={}", channel, controller, value),
            MidiEvent::ProgramChange { channel, value } => {
                write!(f, "pgm ch={} val={}", channel, value)
            }
            MidiEvent::PitchBend { channel, value } => {
                write!(f, "bend ch={} val={}", channel, value)
            }
            MidiEvent::AfterTouch { channel, value } => {
                write!(f, "touch ch={} val={}", channel, value)
            }
            MidiEvent::PolyAfterTouch {
                channel,
                pitch,
                value,
            } => write!(f, "polytouch ch={} pitch={} val={}", channel, pitch, value),
            MidiEvent::Byte { port, value } => write!(f, "byte port={} val={}", port, value),
        }
    }
}

/// Receiver of MIDI events emitted by a patch
pub trait MidiSink: Send + Sync {
    fn receive(&self, event: &MidiEvent);
}

type Hook3 = Box<dyn Fn(i32, i32, i32) + Send + Sync>;
type Hook2 = Box<dyn Fn(i32, i32) + Send + Sync>;

/// One optional closure per MIDI event shape
///
/// Closures receive the raw channel (or port for bytes) first.
#[derive(Default)]
pub struct MidiHooks {
    noteon: Option<Hook3>,
    controlchange: Option<Hook3>,
    programchange: Option<Hook2>,
    pitchbend: Option<Hook2>,
    aftertouch: Option<Hook2>,
    polyaftertouch: Option<Hook3>,
    byte: Option<Hook2>,
}

impl MidiHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_noteon(mut self, hook: impl Fn(i32, i32, i32) + Send + Sync + 'static) -> Self {
        self.noteon = Some(Box::new(hook));
        self
    }

    pub fn on_controlchange(
        mut self,
        hook: impl Fn(i32, i32, i32) + Send + Sync + 'static,
    ) -> Self {
        self.controlchange = Some(Box::new(hook));
        self
    }

    pub fn on_programchange(mut self, hook: impl Fn(i32, i32) + Send + Sync + 'static) -> Self {
        self.programchange = Some(Box::new(hook));
        self
    }

    pub fn on_pitchbend(mut self, hook: impl Fn(i32, i32) + Send + Sync + 'static) -> Self {
        self.pitchbend = Some(Box::new(hook));
        self
    }

    pub fn on_aftertouch(mut self, hook: impl Fn(i32, i32) + Send + Sync + 'static) -> Self {
        self.aftertouch = Some(Box::new(hook));
        self
    }

    pub fn on_polyaftertouch(
        mut self,
        hook: impl Fn(i32, i32, i32) + Send + Sync + 'static,
    ) -> Self {
        self.polyaftertouch = Some(Box::new(hook));
        self
    }

    pub fn on_byte(mut self, hook: impl Fn(i32, i32) + Send + Sync + 'static) -> Self {
        self.byte = Some(Box::new(hook));
        self
    }
}

impl MidiSink for MidiHooks {
    fn receive(&self, event: &MidiEvent) {
        match *event {
            MidiEvent::NoteOn {
                channel,
                pitch,
                velocity,
            } => {
                if let Some(hook) = &self.noteon {
                    hook(channel, pitch, velocity);
                }
            }
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => {
                if let Some(hook) = &self.controlchange {
                    hook(channel, controller, value);
                }
            }
            MidiEvent::ProgramChange { channel, value } => {
                if let Some(hook) = &self.programchange {
                    hook(channel, value);
                }
            }
            MidiEvent::PitchBend { channel, value } => {
                if let Some(hook) = &self.pitchbend {
                    hook(channel, value);
                }
            }
            MidiEvent::AfterTouch { channel, value } => {
                if let Some(hook) = &self.aftertouch {
                    hook(channel, value);
                }
            }
            MidiEvent::PolyAfterTouch {
                channel,
                pitch,
                value,
            } => {
                if let Some(hook) = &self.polyaftertouch {
                    hook(channel, pitch, value);
                }
            }
            MidiEvent::Byte { port, value } => {
                if let Some(hook) = &self.byte {
                    hook(port, value);
                }
            }
        }
    }
}
