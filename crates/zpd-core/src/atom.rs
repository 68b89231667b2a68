//! Atom - one element of a message
//!
//! Typed readers never fail: reading a float from a non-float atom yields
//! `0.0`, reading a symbol from a non-symbol atom yields the empty symbol.

use std::fmt;

use crate::symbol::Symbol;

/// Opaque, non-owning pointer handle carried by pointer atoms
///
/// The core never dereferences it. Two handles are equal when they carry
/// the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gpointer(usize);

impl Gpointer {
    pub fn new(address: usize) -> Self {
        Self(address)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    pub fn address(self) -> usize {
        self.0
    }
}

/// Kind tag of an atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    None,
    Float,
    Symbol,
    Pointer,
}

/// Tagged message element
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Atom {
    #[default]
    None,
    Float(f32),
    Symbol(Symbol),
    Pointer(Gpointer),
}

impl Atom {
    #[inline]
    pub fn kind(&self) -> AtomKind {
        match self {
            Atom::None => AtomKind::None,
            Atom::Float(_) => AtomKind::Float,
            Atom::Symbol(_) => AtomKind::Symbol,
            Atom::Pointer(_) => AtomKind::Pointer,
        }
    }

    /// Float payload, `0.0` for any other kind
    #[inline]
    pub fn as_float(&self) -> f32 {
        match self {
            Atom::Float(f) => *f,
            _ => 0.0,
        }
    }

    /// Symbol payload, the empty symbol for any other kind
    #[inline]
    pub fn as_symbol(&self) -> Symbol {
        match self {
            Atom::Symbol(s) => *s,
            _ => Symbol::EMPTY,
        }
    }

    #[inline]
    pub fn as_pointer(&self) -> Option<Gpointer> {
        match self {
            Atom::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Atom::None)
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Atom::Float(_))
    }

    #[inline]
    pub fn is_symbol(&self) -> bool {
        matches!(self, Atom::Symbol(_))
    }

    /// Parse a word from patch text: numbers become floats, everything else a symbol
    pub fn from_word(word: &str) -> Self {
        match parse_float(word) {
            Some(f) => Atom::Float(f),
            None => Atom::Symbol(Symbol::intern(word)),
        }
    }
}

/// Number syntax accepted in patch text
///
/// Rejects words Rust would parse but the patch language treats as symbols
/// (`inf`, `nan`, a lone sign).
fn parse_float(word: &str) -> Option<f32> {
    let first = word.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    if !word.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    word.parse::<f32>().ok()
}

impl From<f32> for Atom {
    fn from(value: f32) -> Self {
        Atom::Float(value)
    }
}

impl From<Symbol> for Atom {
    fn from(value: Symbol) -> Self {
        Atom::Symbol(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(Symbol::intern(value))
    }
}

impl From<Gpointer> for Atom {
    fn from(value: Gpointer) -> Self {
        Atom::Pointer(value)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::None => Ok(()),
            Atom::Float(v) => write!(f, "{}", v),
            Atom::Symbol(s) => write!(f, "{}", s),
            Atom::Pointer(_) => f.write_str("(pointer)"),
        }
    }
}
