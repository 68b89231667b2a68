//! Message - a classified selector plus payload
//!
//! Every message crossing a tie is one of six kinds. The four reserved
//! selectors `bang`, `float`, `symbol` and `list` (plus `pointer`) map to
//! their own variant; any other selector becomes `Anything`, carrying the
//! selector and its full argument list.

use std::fmt;

use crate::atom::{Atom, Gpointer};
use crate::list::List;
use crate::symbol::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Bang,
    Float(f32),
    Symbol(Symbol),
    Pointer(Gpointer),
    List(List),
    Anything { selector: Symbol, args: List },
}

impl Message {
    /// Classify `selector` with `args` by exact match on the reserved selectors
    pub fn classify(selector: Symbol, args: List) -> Message {
        let first = args.first().copied().unwrap_or_default();
        match selector {
            Symbol::BANG => Message::Bang,
            Symbol::FLOAT => Message::Float(first.as_float()),
            Symbol::SYMBOL => Message::Symbol(first.as_symbol()),
            Symbol::LIST => Message::List(args),
            Symbol::POINTER => match first.as_pointer() {
                Some(pointer) => Message::Pointer(pointer),
                None => Message::Anything { selector, args },
            },
            _ => Message::Anything { selector, args },
        }
    }

    /// Interpret a bare atom sequence the way message boxes do
    ///
    /// Empty is a bang, a single float is a float, a leading float makes a
    /// list and a leading symbol is the selector.
    pub fn from_atoms(atoms: &[Atom]) -> Message {
        match atoms {
            [] => Message::Bang,
            [Atom::Float(f)] => Message::Float(*f),
            [Atom::Pointer(p)] => Message::Pointer(*p),
            [Atom::Symbol(selector), ..] => {
                Message::classify(*selector, List::from(&atoms[1..]))
            }
            _ => Message::List(List::from(atoms)),
        }
    }

    pub fn selector(&self) -> Symbol {
        match self {
            Message::Bang => Symbol::BANG,
            Message::Float(_) => Symbol::FLOAT,
            Message::Symbol(_) => Symbol::SYMBOL,
            Message::Pointer(_) => Symbol::POINTER,
            Message::List(_) => Symbol::LIST,
            Message::Anything { selector, .. } => *selector,
        }
    }

    /// Arguments following the selector
    pub fn arguments(&self) -> List {
        match self {
            Message::Bang => List::new(),
            Message::Float(f) => List::new().with(*f),
            Message::Symbol(s) => List::new().with(*s),
            Message::Pointer(p) => List::new().with(*p),
            Message::List(list) => list.clone(),
            Message::Anything { args, .. } => args.clone(),
        }
    }

    /// Float view used by objects with a numeric inlet
    pub(crate) fn as_float(&self) -> Option<f32> {
        match self {
            Message::Float(f) => Some(*f),
            Message::List(list) => list.first().filter(|a| a.is_float()).map(|a| a.as_float()),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Bang => f.write_str("bang"),
            Message::Float(v) => write!(f, "{}", v),
            Message::Symbol(s) => write!(f, "symbol {}", s),
            Message::Pointer(_) => f.write_str("(pointer)"),
            Message::List(list) => match list.first() {
                Some(Atom::Float(_)) => write!(f, "{}", list),
                Some(_) => write!(f, "list {}", list),
                None => f.write_str("list"),
            },
            Message::Anything { selector, args } if args.is_empty() => write!(f, "{}", selector),
            Message::Anything { selector, args } => write!(f, "{} {}", selector, args),
        }
    }
}
