//! Patches and their objects
//!
//! A `Patch` is a loaded dataflow graph owned by one instance. It is read
//! from the text format, keeps its canvas geometry and per-load
//! dollar-zero, and exposes its objects through a forward walk
//! (`first_object` / `next_object`) or an iterator.
//!
//! ```text
//! #N canvas 100 100 85 60 10;          ← geometry and font
//! #X obj 10 10 r \$0-fromxpd;          ← object 0
//! #X obj 10 40 s \$0-toxpd1;           ← object 1
//! #X connect 0 0 1 0;                  ← object 0 outlet 0 → object 1 inlet 0
//! ```
//!
//! Objects hold their runtime state (`Node`), so introspection always
//! reflects the live value of a GUI.

mod gui;
pub(crate) mod parse;

pub use gui::{Gui, GuiKind};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

use crate::atom::Atom;
use crate::engine::node::{MessageSegment, Node, SegmentAtom};
use crate::error::{ZpdError, ZpdResult};
use crate::symbol::{Symbol, Tie};
use crate::types::FIRST_DOLLAR_ZERO;

use parse::{expand, expand_name, render, Record, Token};

/// Process-wide so ties built from `$0` never collide across instances
static NEXT_DOLLAR_ZERO: AtomicI32 = AtomicI32::new(FIRST_DOLLAR_ZERO);

fn next_dollar_zero() -> i32 {
    NEXT_DOLLAR_ZERO.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a patch inside its instance
///
/// Carries a generation so a handle kept after `close` is detected as stale
/// instead of addressing whatever patch reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch#{}.{}", self.slot, self.generation)
    }
}

/// Position of an object within its patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Bounding box relative to the owning patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A box in a patch
#[derive(Debug, Clone)]
pub struct Object {
    name: Symbol,
    text: String,
    bounds: Bounds,
    pub(crate) node: Node,
}

impl Object {
    /// Class name (`r`, `msg`, `text`, `hsl`, ...)
    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Box content as written
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn x(&self) -> i32 {
        self.bounds.x
    }

    pub fn y(&self) -> i32 {
        self.bounds.y
    }

    pub fn width(&self) -> i32 {
        self.bounds.width
    }

    pub fn height(&self) -> i32 {
        self.bounds.height
    }

    pub fn is_gui(&self) -> bool {
        matches!(self.node, Node::Gui(_))
    }

    pub fn gui(&self) -> Option<&Gui> {
        match &self.node {
            Node::Gui(gui) => Some(gui),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Connection {
    pub from: usize,
    pub outlet: usize,
    pub to: usize,
    pub inlet: usize,
}

/// Highest outlet or inlet index a connection may name
const MAX_PORT: usize = 1023;

impl Connection {
    /// Fields of a `#X connect` record, `None` if any is negative or too large
    fn from_record(record: &Record) -> Option<Connection> {
        let field = |index| usize::try_from(record.int(index)).ok();
        let connection = Connection {
            from: field(2)?,
            outlet: field(3)?,
            to: field(4)?,
            inlet: field(5)?,
        };
        (connection.outlet <= MAX_PORT && connection.inlet <= MAX_PORT).then_some(connection)
    }
}

/// Loaded patch
#[derive(Debug)]
pub struct Patch {
    name: String,
    path: PathBuf,
    dollar_zero: i32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    font_size: i32,
    objects: Vec<Object>,
    connections: Vec<Connection>,
    /// `[object][outlet]` → `(object, inlet)` targets, in connection order
    outgoing: Vec<Vec<Vec<(usize, usize)>>>,
    /// Creation problems, posted to the console after loading
    diagnostics: Vec<String>,
}

/// Character cell `(width, height)` for a font size
fn font_metrics(size: i32) -> (i32, i32) {
    const METRICS: [(i32, i32, i32); 6] = [
        (8, 5, 11),
        (10, 6, 13),
        (12, 7, 16),
        (16, 10, 19),
        (24, 14, 29),
        (36, 22, 44),
    ];
    METRICS
        .iter()
        .rev()
        .find(|(s, _, _)| *s <= size)
        .map_or((METRICS[0].1, METRICS[0].2), |&(_, w, h)| (w, h))
}

impl Patch {
    /// Read and build a patch file with a fresh dollar-zero
    pub(crate) fn open(path: &Path) -> ZpdResult<Patch> {
        let text = std::fs::read_to_string(path).map_err(|e| ZpdError::PatchOpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Patch::from_text(&name, path, &text, next_dollar_zero())
    }

    pub(crate) fn from_text(
        name: &str,
        path: &Path,
        text: &str,
        dollar_zero: i32,
    ) -> ZpdResult<Patch> {
        let records = parse::tokenize(text);
        let invalid = |line: usize, reason: &str| ZpdError::InvalidPatch {
            path: path.to_path_buf(),
            line,
            reason: reason.to_string(),
        };

        let header = records.first().ok_or_else(|| invalid(1, "empty file"))?;
        if header.word(0) != Some("#N") || header.word(1) != Some("canvas") {
            return Err(invalid(header.line, "missing canvas header"));
        }

        let mut patch = Patch {
            name: name.to_string(),
            path: path.to_path_buf(),
            dollar_zero,
            x: header.int(2),
            y: header.int(3),
            width: header.int(4),
            height: header.int(5),
            font_size: match header.int(6) {
                0 => 10,
                size => size,
            },
            objects: Vec::new(),
            connections: Vec::new(),
            outgoing: Vec::new(),
            diagnostics: Vec::new(),
        };

        let mut depth = 0usize;
        let mut pending = Vec::new();
        for record in &records[1..] {
            let head = (record.word(0).unwrap_or(""), record.word(1).unwrap_or(""));
            if head == ("#N", "canvas") {
                depth += 1;
                continue;
            }
            if depth > 0 {
                if head == ("#X", "restore") {
                    depth -= 1;
                    if depth == 0 {
                        patch.push_subpatch(record);
                    }
                }
                continue;
            }
            match head {
                ("#X", "obj") => patch.push_object(record),
                ("#X", "msg") => patch.push_message(record),
                ("#X", "text") => patch.push_comment(record),
                ("#X", kind @ ("floatatom" | "symbolatom" | "listbox")) => {
                    patch.push_atom_box(kind, record)
                }
                ("#X", "connect") => match Connection::from_record(record) {
                    Some(connection) => pending.push((record.line, connection)),
                    None => patch.diagnostics.push(format!(
                        "{}: connection on line {} has an invalid object or port index",
                        patch.name, record.line
                    )),
                },
                _ => {}
            }
        }

        patch.outgoing = vec![Vec::new(); patch.objects.len()];
        for (line, connection) in pending {
            if connection.from >= patch.objects.len() || connection.to >= patch.objects.len() {
                patch.diagnostics.push(format!(
                    "{}: connection {} {} {} {} (line {}) refers to a missing object",
                    patch.name,
                    connection.from,
                    connection.outlet,
                    connection.to,
                    connection.inlet,
                    line
                ));
                continue;
            }
            let outlets = &mut patch.outgoing[connection.from];
            if outlets.len() <= connection.outlet {
                outlets.resize(connection.outlet + 1, Vec::new());
            }
            outlets[connection.outlet].push((connection.to, connection.inlet));
            patch.connections.push(connection);
        }
        Ok(patch)
    }

    fn text_box(&self, x: i32, y: i32, text: &str, columns: Option<i32>) -> Bounds {
        let (char_width, char_height) = font_metrics(self.font_size);
        let columns = columns.unwrap_or_else(|| (text.chars().count() as i32).max(3));
        Bounds {
            x,
            y,
            width: columns.saturating_mul(char_width).saturating_add(4),
            height: char_height + 5,
        }
    }

    fn push(&mut self, name: &str, text: String, bounds: Bounds, node: Node) {
        self.objects.push(Object {
            name: Symbol::intern(name),
            text,
            bounds,
            node,
        });
    }

    fn push_object(&mut self, record: &Record) {
        let (x, y) = (record.int(2), record.int(3));
        let mut body: &[Token] = record.tokens.get(4..).unwrap_or(&[]);

        // trailing ", f N" sets the box width in characters
        let mut columns = None;
        if let [rest @ .., Token::Comma, Token::Word(f), Token::Word(n)] = body {
            if f == "f" {
                columns = n.parse::<i32>().ok();
                body = rest;
            }
        }

        let text = render(body);
        let class = body.first().and_then(Token::word).unwrap_or("");
        let args: Vec<Atom> = body
            .iter()
            .skip(1)
            .filter_map(Token::word)
            .map(|w| expand(w, self.dollar_zero))
            .collect();

        if let Some(kind) = GuiKind::from_class(class) {
            let (char_width, _) = font_metrics(self.font_size);
            let gui = Gui::parse(kind, &args, x, y, char_width);
            let (width, height) = gui.size();
            let bounds = Bounds {
                x,
                y,
                width,
                height,
            };
            self.push(class, text, bounds, Node::Gui(gui));
            return;
        }

        let bounds = self.text_box(x, y, &text, columns);
        let node = if class.is_empty() {
            Node::Inert
        } else {
            Node::create(class, &args).unwrap_or_else(|| {
                self.diagnostics.push(format!("{}\n... couldn't create", text));
                Node::Inert
            })
        };
        self.push(class, text, bounds, node);
    }

    fn push_message(&mut self, record: &Record) {
        let (x, y) = (record.int(2), record.int(3));
        let body = record.tokens.get(4..).unwrap_or(&[]);

        let mut segments = Vec::new();
        let mut current = MessageSegment {
            target: None,
            atoms: Vec::new(),
        };
        let mut awaiting_target = false;
        for token in body {
            match token {
                Token::Word(word) if awaiting_target => {
                    current.target = Some(Tie::intern(&expand_name(word, self.dollar_zero)));
                    awaiting_target = false;
                }
                Token::Word(word) => current
                    .atoms
                    .push(SegmentAtom::from_atom(expand(word, self.dollar_zero))),
                Token::Comma => {
                    let target = current.target;
                    segments.push(std::mem::replace(
                        &mut current,
                        MessageSegment {
                            target,
                            atoms: Vec::new(),
                        },
                    ));
                }
                Token::Semi => {
                    segments.push(std::mem::replace(
                        &mut current,
                        MessageSegment {
                            target: None,
                            atoms: Vec::new(),
                        },
                    ));
                    awaiting_target = true;
                }
            }
        }
        segments.push(current);
        segments.retain(|s| !s.atoms.is_empty());

        let text = render(body);
        let bounds = self.text_box(x, y, &text, None);
        self.push("msg", text, bounds, Node::MessageBox(segments));
    }

    fn push_comment(&mut self, record: &Record) {
        let (x, y) = (record.int(2), record.int(3));
        let text = render(record.tokens.get(4..).unwrap_or(&[]));
        let bounds = self.text_box(x, y, &text, None);
        self.push("text", text, bounds, Node::Inert);
    }

    fn push_atom_box(&mut self, kind: &str, record: &Record) {
        let (x, y) = (record.int(2), record.int(3));
        let columns = match record.int(4) {
            0 => 5,
            w => w,
        };
        let bounds = self.text_box(x, y, "", Some(columns));
        let node = match kind {
            "floatatom" => Node::FloatAtom(0.0),
            _ => Node::Inert,
        };
        self.push(kind, kind.to_string(), bounds, node);
    }

    fn push_subpatch(&mut self, record: &Record) {
        let (x, y) = (record.int(2), record.int(3));
        let body = record.tokens.get(4..).unwrap_or(&[]);
        let text = render(body);
        let class = body.first().and_then(Token::word).unwrap_or("pd").to_string();
        let bounds = self.text_box(x, y, &text, None);
        self.push(&class, text, bounds, Node::Inert);
    }

    /// File name the patch was loaded from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved path of the patch file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-load unique id, substituted for `$0`
    pub fn dollar_zero(&self) -> i32 {
        self.dollar_zero
    }

    /// Tie named `<dollar-zero><suffix>`, e.g. `tie_for("-fromxpd")`
    pub fn tie_for(&self, suffix: &str) -> Tie {
        Tie::intern(&format!("{}{}", self.dollar_zero, suffix))
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn font_size(&self) -> i32 {
        self.font_size
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn first_object(&self) -> Option<ObjectId> {
        (!self.objects.is_empty()).then_some(ObjectId(0))
    }

    pub fn next_object(&self, previous: ObjectId) -> Option<ObjectId> {
        let next = previous.0 + 1;
        (next < self.objects.len()).then_some(ObjectId(next))
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter()
    }

    /// Number of connections that survived validation
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub(crate) fn objects_slice(&self) -> &[Object] {
        &self.objects
    }

    pub(crate) fn object_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.objects.get_mut(index)
    }

    pub(crate) fn outgoing(&self, object: usize, outlet: usize) -> &[(usize, usize)] {
        self.outgoing
            .get(object)
            .and_then(|outlets| outlets.get(outlet))
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}
