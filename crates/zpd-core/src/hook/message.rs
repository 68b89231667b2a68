//! Message sinks bound to ties

use crate::atom::Gpointer;
use crate::list::List;
use crate::message::Message;
use crate::symbol::{Symbol, Tie};

/// Receiver of messages sent through a bound tie
pub trait MessageSink: Send + Sync {
    fn receive(&self, tie: Tie, message: &Message);
}

/// One optional closure per message kind
///
/// Mirrors a classic six-slot hook table: bang, float, symbol, pointer,
/// list and anything. Kinds without a closure are dropped.
#[derive(Default)]
pub struct MessageHooks {
    bang: Option<Box<dyn Fn(Tie) + Send + Sync>>,
    float: Option<Box<dyn Fn(Tie, f32) + Send + Sync>>,
    symbol: Option<Box<dyn Fn(Tie, Symbol) + Send + Sync>>,
    pointer: Option<Box<dyn Fn(Tie, Gpointer) + Send + Sync>>,
    list: Option<Box<dyn Fn(Tie, &List) + Send + Sync>>,
    anything: Option<Box<dyn Fn(Tie, Symbol, &List) + Send + Sync>>,
}

impl MessageHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_bang(mut self, hook: impl Fn(Tie) + Send + Sync + 'static) -> Self {
        self.bang = Some(Box::new(hook));
        self
    }

    pub fn on_float(mut self, hook: impl Fn(Tie, f32) + Send + Sync + 'static) -> Self {
        self.float = Some(Box::new(hook));
        self
    }

    pub fn on_symbol(mut self, hook: impl Fn(Tie, Symbol) + Send + Sync + 'static) -> Self {
        self.symbol = Some(Box::new(hook));
        self
    }

    pub fn on_pointer(mut self, hook: impl Fn(Tie, Gpointer) + Send + Sync + 'static) -> Self {
        self.pointer = Some(Box::new(hook));
        self
    }

    pub fn on_list(mut self, hook: impl Fn(Tie, &List) + Send + Sync + 'static) -> Self {
        self.list = Some(Box::new(hook));
        self
    }

    pub fn on_anything(
        mut self,
        hook: impl Fn(Tie, Symbol, &List) + Send + Sync + 'static,
    ) -> Self {
        self.anything = Some(Box::new(hook));
        self
    }
}

impl MessageSink for MessageHooks {
    fn receive(&self, tie: Tie, message: &Message) {
        match message {
            Message::Bang => {
                if let Some(hook) = &self.bang {
                    hook(tie);
                }
            }
            Message::Float(value) => {
                if let Some(hook) = &self.float {
                    hook(tie, *value);
                }
            }
            Message::Symbol(value) => {
                if let Some(hook) = &self.symbol {
                    hook(tie, *value);
                }
            }
            Message::Pointer(value) => {
                if let Some(hook) = &self.pointer {
                    hook(tie, *value);
                }
            }
            Message::List(list) => {
                if let Some(hook) = &self.list {
                    hook(tie, list);
                }
            }
            Message::Anything { selector, args } => {
                if let Some(hook) = &self.anything {
                    hook(tie, *selector, args);
                }
            }
        }
    }
}
