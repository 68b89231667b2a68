//! ZPD Core - embeddable multi-instance dataflow audio engine
//!
//! Hosts create isolated [`Instance`]s, open patch files into them, talk to
//! the patches through interned [`Tie`] addresses and drive audio with
//! `prepare`/`perform`/`release`. Console output, MIDI and tie messages come
//! back through host-supplied sinks (see [`hook`]).

pub mod atom;
pub mod command;
pub mod config;
pub mod current;
pub mod environment;
pub mod error;
pub mod hook;
pub mod instance;
pub mod list;
pub mod message;
pub mod patch;
pub mod symbol;
pub mod types;

pub(crate) mod engine;

pub use atom::{Atom, AtomKind, Gpointer};
pub use command::{CommandSender, InstanceCommand, COMMAND_QUEUE_CAPACITY};
pub use config::{DspConfig, EngineConfig};
pub use error::{ZpdError, ZpdResult};
pub use hook::{
    ConsoleHistory, ConsoleHooks, ConsoleLevel, ConsoleSink, MessageHooks, MessageSink,
    MidiEvent, MidiHooks, MidiSink, Post,
};
pub use instance::Instance;
pub use list::List;
pub use message::Message;
pub use patch::{Bounds, Gui, GuiKind, Object, ObjectId, Patch, PatchId};
pub use symbol::{Symbol, Tie};
pub use types::*;
