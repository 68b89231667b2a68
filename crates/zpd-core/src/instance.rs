//! Isolated engine instance
//!
//! An `Instance` owns its open patches, host hooks, tie bindings and DSP
//! state. Nothing in it is shared with other instances except the symbol
//! and tie tables, so hosts can run one instance per thread.
//!
//! # Lifecycle
//!
//! ```text
//! new ──► load/bind/send ──► prepare ──► perform* ──► release ──► drop
//!                ▲                          │
//!                └──── load/close rebuild ──┘
//! ```
//!
//! `perform` is the real-time entry point. It drains the command queue,
//! runs one block and then fires `bang~`. It allocates nothing itself, but
//! messages emitted from `bang~` run host hooks on the calling thread, so
//! those hooks share the audio thread's constraints.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::atom::Gpointer;
use crate::command::{self, CommandSender, InstanceCommand};
use crate::config::DspConfig;
use crate::engine::dsp::HostIo;
use crate::engine::Engine;
use crate::environment;
use crate::error::{ZpdError, ZpdResult};
use crate::hook::{ConsoleLevel, ConsoleSink, HookTables, MessageSink, MidiEvent, MidiSink};
use crate::list::List;
use crate::message::Message;
use crate::patch::{Patch, PatchId};
use crate::symbol::{Symbol, Tie};
use crate::types::{Sample, DEFAULT_SAMPLE_RATE};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// One isolated engine context
pub struct Instance {
    id: u64,
    engine: Engine,
    hooks: HookTables,
    commands: Option<rtrb::Consumer<InstanceCommand>>,
    extension: Option<Box<dyn Any + Send>>,
    /// Sample rate of the last `prepare`, kept across `release`
    sample_rate: u32,
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl Instance {
    pub fn new() -> Self {
        environment::init();
        let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("Instance {}: created", id);
        Self {
            id,
            engine: Engine::new(),
            hooks: HookTables::new(id),
            commands: None,
            extension: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Create an instance carrying host data
    pub fn with_extension<T: Any + Send>(value: T) -> Self {
        let mut instance = Self::new();
        instance.extension = Some(Box::new(value));
        instance
    }

    pub fn extension<T: Any>(&self) -> Option<&T> {
        self.extension.as_ref()?.downcast_ref()
    }

    pub fn extension_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.extension.as_mut()?.downcast_mut()
    }

    /// Process-unique id, used to tag log output
    pub fn id(&self) -> u64 {
        self.id
    }

    // ─────────────────────────────────────────────────────────────────
    // Hooks
    // ─────────────────────────────────────────────────────────────────

    /// Route console posts to `sink` instead of the `log` facade
    pub fn set_console_hook(&mut self, sink: Arc<dyn ConsoleSink>) {
        self.hooks.set_console(Some(sink));
    }

    pub fn clear_console_hook(&mut self) {
        self.hooks.set_console(None);
    }

    pub fn set_midi_hook(&mut self, sink: Arc<dyn MidiSink>) {
        self.hooks.set_midi(Some(sink));
    }

    pub fn clear_midi_hook(&mut self) {
        self.hooks.set_midi(None);
    }

    /// Register `sink` for every message sent to `tie`. Bindings stack.
    pub fn bind(&mut self, tie: Tie, sink: Arc<dyn MessageSink>) {
        self.hooks.bind(tie, sink);
    }

    /// Remove the most recent binding on `tie`; false if none was active
    pub fn unbind(&mut self, tie: Tie) -> bool {
        self.hooks.unbind(tie)
    }

    pub fn binding_count(&self, tie: Tie) -> usize {
        self.hooks.binding_count(tie)
    }

    // ─────────────────────────────────────────────────────────────────
    // Console
    // ─────────────────────────────────────────────────────────────────

    pub fn post(&self, level: ConsoleLevel, text: &str) {
        self.hooks.post(level, text);
    }

    pub fn post_log(&self, text: &str) {
        self.post(ConsoleLevel::Log, text);
    }

    pub fn post_normal(&self, text: &str) {
        self.post(ConsoleLevel::Normal, text);
    }

    pub fn post_error(&self, text: &str) {
        self.post(ConsoleLevel::Error, text);
    }

    pub fn post_fatal(&self, text: &str) {
        self.post(ConsoleLevel::Fatal, text);
    }

    // ─────────────────────────────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────────────────────────────

    /// Deliver to patch receivers of `tie`, then to host bindings.
    /// Nobody listening is not an error.
    pub fn send(&mut self, tie: Tie, message: Message) {
        self.engine.send(&self.hooks, tie, message);
    }

    pub fn send_bang(&mut self, tie: Tie) {
        self.send(tie, Message::Bang);
    }

    pub fn send_float(&mut self, tie: Tie, value: f32) {
        self.send(tie, Message::Float(value));
    }

    pub fn send_symbol(&mut self, tie: Tie, symbol: Symbol) {
        self.send(tie, Message::Symbol(symbol));
    }

    pub fn send_pointer(&mut self, tie: Tie, pointer: Gpointer) {
        self.send(tie, Message::Pointer(pointer));
    }

    pub fn send_list(&mut self, tie: Tie, list: List) {
        self.send(tie, Message::List(list));
    }

    /// Send with an explicit selector, skipping classification
    pub fn send_anything(&mut self, tie: Tie, selector: Symbol, args: List) {
        self.send(tie, Message::Anything { selector, args });
    }

    /// Send `selector args`, classified against the reserved selectors
    pub fn send_message(&mut self, tie: Tie, selector: Symbol, args: List) {
        self.send(tie, Message::classify(selector, args));
    }

    // ─────────────────────────────────────────────────────────────────
    // MIDI
    // ─────────────────────────────────────────────────────────────────

    /// Feed a MIDI event to the patch MIDI inputs
    pub fn send_midi(&mut self, event: MidiEvent) {
        self.engine.midi_in(&self.hooks, &event);
    }

    pub fn midi_noteon(&mut self, channel: i32, pitch: i32, velocity: i32) {
        self.send_midi(MidiEvent::NoteOn {
            channel,
            pitch,
            velocity,
        });
    }

    pub fn midi_controlchange(&mut self, channel: i32, controller: i32, value: i32) {
        self.send_midi(MidiEvent::ControlChange {
            channel,
            controller,
            value,
        });
    }

    pub fn midi_programchange(&mut self, channel: i32, value: i32) {
        self.send_midi(MidiEvent::ProgramChange { channel, value });
    }

    pub fn midi_pitchbend(&mut self, channel: i32, value: i32) {
        self.send_midi(MidiEvent::PitchBend { channel, value });
    }

    pub fn midi_aftertouch(&mut self, channel: i32, value: i32) {
        self.send_midi(MidiEvent::AfterTouch { channel, value });
    }

    pub fn midi_polyaftertouch(&mut self, channel: i32, pitch: i32, value: i32) {
        self.send_midi(MidiEvent::PolyAfterTouch {
            channel,
            pitch,
            value,
        });
    }

    pub fn midi_byte(&mut self, port: i32, value: i32) {
        self.send_midi(MidiEvent::Byte { port, value });
    }

    // ─────────────────────────────────────────────────────────────────
    // Patches
    // ─────────────────────────────────────────────────────────────────

    /// Open `name`, resolved against `search_dir` or the global search path
    ///
    /// Objects that cannot be created are reported on the console at error
    /// level; the patch still opens. `loadbang` fires before returning.
    pub fn load(&mut self, name: &str, search_dir: &str) -> ZpdResult<PatchId> {
        let Some(path) = environment::resolve(name, search_dir) else {
            log::warn!(
                "Instance {}: patch {} not found (search dir '{}')",
                self.id,
                name,
                search_dir
            );
            return Err(ZpdError::PatchNotFound {
                name: name.to_string(),
                search_dir: search_dir.to_string(),
            });
        };

        let mut patch = Patch::open(&path)?;
        let diagnostics = patch.take_diagnostics();
        let dollar_zero = patch.dollar_zero();
        let id = self.engine.insert_patch(patch);
        for text in &diagnostics {
            self.hooks.post(ConsoleLevel::Error, text);
        }
        self.engine.rebuild_dsp(&self.hooks);
        self.engine.loadbang(&self.hooks, id);

        log::info!(
            "Instance {}: opened patch {} ($0={}) from {}",
            self.id,
            name,
            dollar_zero,
            path.display()
        );
        Ok(id)
    }

    /// Tear down a patch. Ties built from its dollar-zero go quiet.
    pub fn close(&mut self, id: PatchId) -> ZpdResult<()> {
        let patch = self.engine.remove_patch(id).ok_or(ZpdError::StalePatch)?;
        self.engine.rebuild_dsp(&self.hooks);
        log::info!("Instance {}: closed patch {}", self.id, patch.name());
        Ok(())
    }

    /// Open patch behind `id`, `None` once closed
    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.engine.patch(id)
    }

    pub fn patches(&self) -> impl Iterator<Item = (PatchId, &Patch)> {
        self.engine.patches()
    }

    pub fn patch_count(&self) -> usize {
        self.engine.patch_count()
    }

    // ─────────────────────────────────────────────────────────────────
    // DSP
    // ─────────────────────────────────────────────────────────────────

    /// Configure DSP for `nins` inputs, `nouts` outputs and a fixed block size
    pub fn prepare(
        &mut self,
        nins: usize,
        nouts: usize,
        sample_rate: u32,
        block_size: usize,
    ) -> ZpdResult<()> {
        self.prepare_with(&DspConfig::new(nins, nouts, sample_rate, block_size))
    }

    pub fn prepare_with(&mut self, config: &DspConfig) -> ZpdResult<()> {
        if let Err(e) = config.validate() {
            log::error!("Instance {}: {}", self.id, e);
            return Err(e);
        }
        self.sample_rate = config.sample_rate;
        self.engine.prepare(&self.hooks, *config);
        log::info!(
            "Instance {}: DSP prepared ({} in, {} out, {} Hz, block {})",
            self.id,
            config.inputs,
            config.outputs,
            config.sample_rate,
            config.block_size
        );
        Ok(())
    }

    /// Run one block
    ///
    /// `nsamples` must equal the prepared block size. Every slice passed in
    /// must hold at least `nsamples` samples. Input channels the caller does
    /// not supply read as silence; output slices beyond the prepared count
    /// are zeroed.
    pub fn perform(
        &mut self,
        nsamples: usize,
        inputs: &[&[Sample]],
        outputs: &mut [&mut [Sample]],
    ) -> ZpdResult<()> {
        let Some(config) = self.engine.dsp_config() else {
            log::error!("Instance {}: perform called before prepare", self.id);
            return Err(ZpdError::DspNotPrepared);
        };
        if nsamples != config.block_size {
            return Err(ZpdError::BlockSizeMismatch {
                expected: config.block_size,
                actual: nsamples,
            });
        }
        let input_lengths = inputs.iter().map(|s| s.len()).enumerate();
        let output_lengths = outputs.iter().map(|s| s.len()).enumerate();
        for (channel, actual) in input_lengths.chain(output_lengths) {
            if actual < nsamples {
                return Err(ZpdError::BufferTooShort {
                    channel,
                    expected: nsamples,
                    actual,
                });
            }
        }

        if let Some(commands) = &mut self.commands {
            while let Ok(command) = commands.pop() {
                match command {
                    InstanceCommand::Send { tie, message } => {
                        self.engine.send(&self.hooks, tie, message)
                    }
                    InstanceCommand::Midi(event) => self.engine.midi_in(&self.hooks, &event),
                }
            }
        }

        let mut io = HostIo {
            nsamples,
            inputs,
            outputs,
        };
        self.engine.perform(&self.hooks, &mut io);
        Ok(())
    }

    /// Drop DSP state. Safe to call any number of times.
    pub fn release(&mut self) {
        if self.engine.dsp_config().is_some() {
            log::info!("Instance {}: DSP released", self.id);
        }
        self.engine.release();
    }

    pub fn is_prepared(&self) -> bool {
        self.engine.dsp_config().is_some()
    }

    /// Sample rate of the last `prepare`, or the default before any
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> Option<usize> {
        self.engine.dsp_config().map(|c| c.block_size)
    }

    /// Open a lock-free queue drained at the start of each `perform`
    ///
    /// Replaces any previous queue; its sender then reports abandoned.
    pub fn command_channel(&mut self, capacity: usize) -> CommandSender {
        let (sender, consumer) = command::channel(capacity);
        self.commands = Some(consumer);
        sender
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        log::debug!("Instance {}: dropped", self.id);
    }
}
