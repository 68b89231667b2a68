//! Host hook tables
//!
//! The host supplies behaviour through three sink traits, injected per
//! instance:
//!
//! ```text
//! ┌──────────────┐  post(level, text)   ┌──────────────────┐
//! │   Instance   │ ───────────────────► │ dyn ConsoleSink  │
//! │              │  MidiEvent           ├──────────────────┤
//! │  patches,    │ ───────────────────► │ dyn MidiSink     │
//! │  bindings    │  (Tie, Message)      ├──────────────────┤
//! │              │ ───────────────────► │ dyn MessageSink  │ (one per bind)
//! └──────────────┘                      └──────────────────┘
//! ```
//!
//! Each sink receives a tagged value and matches on its kind. Hosts that
//! prefer one callback per kind can use the closure tables
//! ([`ConsoleHooks`], [`MidiHooks`], [`MessageHooks`]) which implement the
//! traits with optional per-kind closures.
//!
//! Sinks may be called from the audio thread when a patch emits messages
//! during `perform` (e.g. from `bang~`). They must not block for long.

mod console;
mod message;
mod midi;
mod table;

pub use console::{ConsoleHistory, ConsoleHooks, ConsoleLevel, ConsoleSink, Post};
pub use message::{MessageHooks, MessageSink};
pub use midi::{MidiEvent, MidiHooks, MidiSink};

pub(crate) use table::HookTables;
