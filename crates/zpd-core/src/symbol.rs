//! Symbol and Tie interning
//!
//! Both handles are indices into process-wide, append-only intern tables.
//! Equality is index equality, so comparing two names never touches the
//! strings. The two namespaces use separate tables: a `Tie` and a `Symbol`
//! built from the same text are unrelated values.
//!
//! # Thread Safety
//!
//! The tables are the only state shared between instances. Lookups take a
//! read lock; interning a name that has not been seen before takes the
//! write lock. Interned strings are leaked into `'static` storage and never
//! freed, which keeps `name()` allocation-free but not lock-free: `name()`
//! takes the read lock and waits while another thread interns a new name.
//!
//! Message dispatch inside `perform` compares handles only. Selectors it
//! reacts to (`set` included) are reserved constants and message-box `$N`
//! arguments are resolved when the patch loads. The exceptions are `print`,
//! which formats names for the console, and retargeting a `send` through its
//! right inlet, which interns the new address.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Names pre-interned in the symbol table, in index order
const RESERVED_SYMBOLS: [&str; 7] = ["", "bang", "float", "symbol", "list", "pointer", "set"];

/// Names pre-interned in the tie table, in index order
const RESERVED_TIES: [&str; 1] = [""];

static SYMBOLS: OnceLock<Interner> = OnceLock::new();
static TIES: OnceLock<Interner> = OnceLock::new();

pub(crate) struct InternTable {
    index: HashMap<&'static str, u32>,
    names: Vec<&'static str>,
}

impl InternTable {
    fn insert(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let stored: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = self.names.len() as u32;
        self.names.push(stored);
        self.index.insert(stored, id);
        id
    }
}

/// Append-only string table guarded by a read/write lock
struct Interner {
    table: RwLock<InternTable>,
}

impl Interner {
    fn with_reserved(reserved: &[&'static str]) -> Self {
        let mut table = InternTable {
            index: HashMap::with_capacity(256),
            names: Vec::with_capacity(256),
        };
        for name in reserved {
            table.insert(name);
        }
        Self {
            table: RwLock::new(table),
        }
    }

    fn intern(&self, name: &str) -> u32 {
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = table.index.get(name) {
                return id;
            }
        }
        // insert() re-checks, another thread may have won the race
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name)
    }

    fn name_of(&self, id: u32) -> &'static str {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.names.get(id as usize).copied().unwrap_or("")
    }

    fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names
            .len()
    }
}

fn symbols() -> &'static Interner {
    SYMBOLS.get_or_init(|| Interner::with_reserved(&RESERVED_SYMBOLS))
}

/// Hold the symbol table's write lock, as a concurrent first-time intern would
#[cfg(test)]
pub(crate) fn lock_symbols_for_write() -> std::sync::RwLockWriteGuard<'static, InternTable> {
    symbols()
        .table
        .write()
        .unwrap_or_else(PoisonError::into_inner)
}

fn ties() -> &'static Interner {
    TIES.get_or_init(|| Interner::with_reserved(&RESERVED_TIES))
}

/// Force both intern tables into existence
pub(crate) fn init_tables() {
    let _ = symbols();
    let _ = ties();
}

/// Number of names interned so far as `(symbols, ties)`
pub fn table_sizes() -> (usize, usize) {
    (symbols().len(), ties().len())
}

/// Interned name used for selectors and symbol atoms
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Symbol(u32);

impl Symbol {
    /// The empty symbol (default value, read from non-symbol atoms)
    pub const EMPTY: Symbol = Symbol(0);
    /// Reserved `bang` selector
    pub const BANG: Symbol = Symbol(1);
    /// Reserved `float` selector
    pub const FLOAT: Symbol = Symbol(2);
    /// Reserved `symbol` selector
    pub const SYMBOL: Symbol = Symbol(3);
    /// Reserved `list` selector
    pub const LIST: Symbol = Symbol(4);
    /// Reserved `pointer` selector
    pub const POINTER: Symbol = Symbol(5);
    /// `set` selector understood by message boxes, atoms and GUIs
    pub const SET: Symbol = Symbol(6);

    /// Intern `name`, returning the same handle for equal strings
    pub fn intern(name: &str) -> Self {
        Symbol(symbols().intern(name))
    }

    /// The interned string
    pub fn name(self) -> &'static str {
        symbols().name_of(self.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Symbol::EMPTY
    }

    /// True for the five selectors with a dedicated message hook
    #[inline]
    pub fn is_reserved_selector(self) -> bool {
        self.0 >= Symbol::BANG.0 && self.0 <= Symbol::POINTER.0
    }

    /// Raw table index
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

impl From<&String> for Symbol {
    fn from(name: &String) -> Self {
        Symbol::intern(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.name())
    }
}

/// Interned routing address for send/receive bindings
///
/// A default `Tie` is empty: it names nothing and `is_empty()` is true.
/// GUI objects without a send or receive name report an empty tie.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tie(u32);

impl Tie {
    /// The empty (unbound) tie
    pub const EMPTY: Tie = Tie(0);

    /// Intern `name` in the tie namespace
    pub fn intern(name: &str) -> Self {
        Tie(ties().intern(name))
    }

    /// The interned address
    pub fn name(self) -> &'static str {
        ties().name_of(self.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Tie::EMPTY
    }

    /// Raw table index
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl From<&str> for Tie {
    fn from(name: &str) -> Self {
        Tie::intern(name)
    }
}

impl From<&String> for Tie {
    fn from(name: &String) -> Self {
        Tie::intern(name)
    }
}

impl fmt::Display for Tie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Tie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tie({:?})", self.name())
    }
}
