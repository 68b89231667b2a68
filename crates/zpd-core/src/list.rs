//! List - ordered atoms carried as a message payload
//!
//! `with_size` pre-fills with none atoms for index-addressed filling;
//! `push` grows the list for hosts that build payloads incrementally.
//! Every indexed access past the end is an `IndexOutOfRange` error, never a
//! clamped read and never a none atom.

use std::fmt;

use crate::atom::{Atom, AtomKind, Gpointer};
use crate::error::{ZpdError, ZpdResult};
use crate::symbol::Symbol;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    atoms: Vec<Atom>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    /// List of `size` none atoms
    pub fn with_size(size: usize) -> Self {
        Self {
            atoms: vec![Atom::None; size],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn push(&mut self, atom: impl Into<Atom>) {
        self.atoms.push(atom.into());
    }

    /// Builder-style append
    pub fn with(mut self, atom: impl Into<Atom>) -> Self {
        self.push(atom);
        self
    }

    pub fn clear(&mut self) {
        self.atoms.clear();
    }

    fn check(&self, index: usize) -> ZpdResult<()> {
        if index < self.atoms.len() {
            Ok(())
        } else {
            Err(ZpdError::IndexOutOfRange {
                index,
                len: self.atoms.len(),
            })
        }
    }

    pub fn get(&self, index: usize) -> ZpdResult<Atom> {
        self.check(index)?;
        Ok(self.atoms[index])
    }

    pub fn kind(&self, index: usize) -> ZpdResult<AtomKind> {
        self.get(index).map(|a| a.kind())
    }

    pub fn get_float(&self, index: usize) -> ZpdResult<f32> {
        self.get(index).map(|a| a.as_float())
    }

    pub fn get_symbol(&self, index: usize) -> ZpdResult<Symbol> {
        self.get(index).map(|a| a.as_symbol())
    }

    pub fn get_pointer(&self, index: usize) -> ZpdResult<Option<Gpointer>> {
        self.get(index).map(|a| a.as_pointer())
    }

    pub fn set(&mut self, index: usize, atom: impl Into<Atom>) -> ZpdResult<()> {
        self.check(index)?;
        self.atoms[index] = atom.into();
        Ok(())
    }

    /// Store a float, turning the atom at `index` into a float atom
    pub fn set_float(&mut self, index: usize, value: f32) -> ZpdResult<()> {
        self.set(index, Atom::Float(value))
    }

    pub fn set_symbol(&mut self, index: usize, value: Symbol) -> ZpdResult<()> {
        self.set(index, Atom::Symbol(value))
    }

    pub fn set_pointer(&mut self, index: usize, value: Gpointer) -> ZpdResult<()> {
        self.set(index, Atom::Pointer(value))
    }

    pub fn first(&self) -> Option<&Atom> {
        self.atoms.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    pub fn as_slice(&self) -> &[Atom] {
        &self.atoms
    }
}

impl From<Vec<Atom>> for List {
    fn from(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }
}

impl From<&[Atom]> for List {
    fn from(atoms: &[Atom]) -> Self {
        Self {
            atoms: atoms.to_vec(),
        }
    }
}

impl FromIterator<Atom> for List {
    fn from_iter<I: IntoIterator<Item = Atom>>(iter: I) -> Self {
        Self {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", atom)?;
        }
        Ok(())
    }
}
