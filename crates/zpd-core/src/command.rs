//! Lock-free command queue into a running instance
//!
//! An instance is driven by the audio thread through `perform`. Other
//! threads that want to inject messages or MIDI without taking the
//! instance's lock push an `InstanceCommand` into a ring buffer; the
//! instance drains it at the start of each `perform`, so the commands take
//! effect on a block boundary.
//!
//! # Real-Time Safety
//!
//! - The ring buffer is allocated once, by `Instance::command_channel`
//! - Push and pop are wait-free
//! - One producer, one consumer: clone-free, so each control thread that
//!   needs its own queue opens its own channel (the latest replaces the
//!   previous one)
//!
//! # Usage
//!
//! ```ignore
//! let mut tx = instance.command_channel(COMMAND_QUEUE_CAPACITY);
//!
//! // control thread
//! tx.send(Tie::intern("volume"), Message::Float(0.5))?;
//!
//! // audio thread
//! instance.perform(64, &inputs, &mut outputs)?;
//! ```

use crate::error::{ZpdError, ZpdResult};
use crate::hook::MidiEvent;
use crate::message::Message;
use crate::symbol::Tie;

/// Default ring buffer size, in commands
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Work queued for the next block boundary
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceCommand {
    /// Deliver `message` to every receiver of `tie`
    Send { tie: Tie, message: Message },
    /// Feed a MIDI event to the patch MIDI inputs
    Midi(MidiEvent),
}

/// Producer half handed to a control thread
pub struct CommandSender {
    producer: rtrb::Producer<InstanceCommand>,
}

impl CommandSender {
    pub(crate) fn new(producer: rtrb::Producer<InstanceCommand>) -> Self {
        Self { producer }
    }

    /// Queue a command. A full queue drops it and returns `QueueFull`.
    pub fn push(&mut self, command: InstanceCommand) -> ZpdResult<()> {
        self.producer
            .push(command)
            .map_err(|_| ZpdError::QueueFull)
    }

    pub fn send(&mut self, tie: Tie, message: Message) -> ZpdResult<()> {
        self.push(InstanceCommand::Send { tie, message })
    }

    pub fn midi(&mut self, event: MidiEvent) -> ZpdResult<()> {
        self.push(InstanceCommand::Midi(event))
    }

    /// Free slots left in the queue
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }

    /// True once the instance dropped its end (closed or replaced channel)
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

pub(crate) fn channel(capacity: usize) -> (CommandSender, rtrb::Consumer<InstanceCommand>) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity.max(1));
    (CommandSender::new(producer), consumer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut tx, mut rx) = channel(4);
        tx.send(Tie::intern("cmd-a"), Message::Bang).unwrap();
        tx.midi(MidiEvent::Byte { port: 0, value: 0xF8 }).unwrap();

        assert!(matches!(rx.pop(), Ok(InstanceCommand::Send { tie, .. }) if tie.name() == "cmd-a"));
        assert!(matches!(rx.pop(), Ok(InstanceCommand::Midi(MidiEvent::Byte { value: 0xF8, .. }))));
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_full_queue_reports_and_drops() {
        let (mut tx, _rx) = channel(2);
        tx.send(Tie::intern("cmd-b"), Message::Float(1.0)).unwrap();
        tx.send(Tie::intern("cmd-b"), Message::Float(2.0)).unwrap();
        assert_eq!(tx.slots(), 0);
        assert!(matches!(
            tx.send(Tie::intern("cmd-b"), Message::Float(3.0)),
            Err(ZpdError::QueueFull)
        ));
    }

    #[test]
    fn test_abandoned_after_consumer_drop() {
        let (tx, rx) = channel(1);
        assert!(!tx.is_abandoned());
        drop(rx);
        assert!(tx.is_abandoned());
    }
}
