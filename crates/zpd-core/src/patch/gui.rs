//! GUI objects: creation-argument metadata and value handling
//!
//! The nine IEM classes store their send/receive names, label, range and
//! state in their creation arguments. `Gui::parse` reads them by class;
//! missing trailing arguments fall back to the class defaults. The name
//! `empty` stands for "no name".

use crate::atom::Atom;
use crate::engine::Emission;
use crate::message::Message;
use crate::symbol::{Symbol, Tie};

/// The nine GUI kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuiKind {
    Bang = 0,
    HorizontalSlider = 1,
    VerticalSlider = 2,
    Toggle = 3,
    Number = 4,
    HorizontalRadio = 5,
    VerticalRadio = 6,
    VuMeter = 7,
    Panel = 8,
}

impl GuiKind {
    pub fn from_class(class: &str) -> Option<Self> {
        match class {
            "bng" => Some(GuiKind::Bang),
            "hsl" => Some(GuiKind::HorizontalSlider),
            "vsl" => Some(GuiKind::VerticalSlider),
            "tgl" => Some(GuiKind::Toggle),
            "nbx" => Some(GuiKind::Number),
            "hradio" => Some(GuiKind::HorizontalRadio),
            "vradio" => Some(GuiKind::VerticalRadio),
            "vu" => Some(GuiKind::VuMeter),
            "cnv" => Some(GuiKind::Panel),
            _ => None,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            GuiKind::Bang => "bng",
            GuiKind::HorizontalSlider => "hsl",
            GuiKind::VerticalSlider => "vsl",
            GuiKind::Toggle => "tgl",
            GuiKind::Number => "nbx",
            GuiKind::HorizontalRadio => "hradio",
            GuiKind::VerticalRadio => "vradio",
            GuiKind::VuMeter => "vu",
            GuiKind::Panel => "cnv",
        }
    }
}

/// Read-only view of a GUI object plus its live value
#[derive(Debug, Clone, PartialEq)]
pub struct Gui {
    kind: GuiKind,
    label: Symbol,
    send: Tie,
    receive: Tie,
    minimum: f32,
    maximum: f32,
    steps: u32,
    value: f32,
    label_x: i32,
    label_y: i32,
    width: i32,
    height: i32,
    log_scale: bool,
}

/// Positional creation arguments
struct Args<'a>(&'a [Atom]);

impl Args<'_> {
    fn float(&self, index: usize, default: f32) -> f32 {
        match self.0.get(index) {
            Some(Atom::Float(f)) => *f,
            _ => default,
        }
    }

    fn int(&self, index: usize, default: i32) -> i32 {
        self.float(index, default as f32) as i32
    }

    fn name(&self, index: usize) -> Option<String> {
        let name = match self.0.get(index)? {
            Atom::Symbol(s) => s.name().to_string(),
            Atom::Float(f) => f.to_string(),
            _ => return None,
        };
        (name != "empty" && !name.is_empty()).then_some(name)
    }

    fn tie(&self, index: usize) -> Tie {
        self.name(index).map_or(Tie::EMPTY, |n| Tie::intern(&n))
    }

    fn symbol(&self, index: usize) -> Symbol {
        self.name(index).map_or(Symbol::EMPTY, |n| Symbol::intern(&n))
    }
}

impl Gui {
    /// Build from creation arguments (already `$0`-expanded) at patch position `(x, y)`
    pub(crate) fn parse(kind: GuiKind, args: &[Atom], x: i32, y: i32, char_width: i32) -> Self {
        let a = Args(args);
        let mut gui = Gui {
            kind,
            label: Symbol::EMPTY,
            send: Tie::EMPTY,
            receive: Tie::EMPTY,
            minimum: 0.0,
            maximum: 0.0,
            steps: 0,
            value: 0.0,
            label_x: 0,
            label_y: 0,
            width: 15,
            height: 15,
            log_scale: false,
        };

        // Index of the send name; label offsets follow send, receive, label
        let names_at = match kind {
            GuiKind::Bang => {
                let size = a.int(0, 15);
                gui.width = size;
                gui.height = size;
                4
            }
            GuiKind::Toggle => {
                let size = a.int(0, 15);
                gui.width = size;
                gui.height = size;
                gui.maximum = a.float(13, 1.0);
                gui.value = a.float(12, 0.0);
                gui.steps = 2;
                2
            }
            GuiKind::Number => {
                let digits = a.int(0, 5);
                gui.height = a.int(1, 14);
                gui.width = digits
                    .saturating_mul(char_width)
                    .saturating_add(gui.height / 2)
                    .saturating_add(4);
                gui.minimum = a.float(2, -1.0e37);
                gui.maximum = a.float(3, 1.0e37);
                gui.log_scale = a.int(4, 0) != 0;
                gui.value = a.float(16, 0.0);
                6
            }
            GuiKind::HorizontalSlider | GuiKind::VerticalSlider => {
                let horizontal = kind == GuiKind::HorizontalSlider;
                gui.width = a.int(0, if horizontal { 128 } else { 15 });
                gui.height = a.int(1, if horizontal { 15 } else { 128 });
                gui.minimum = a.float(2, 0.0);
                gui.maximum = a.float(3, 127.0);
                gui.log_scale = a.int(4, 0) != 0;
                let length = if horizontal { gui.width } else { gui.height };
                gui.steps = length.max(2) as u32;
                gui.value = gui.slider_value(a.float(16, 0.0), length);
                6
            }
            GuiKind::HorizontalRadio | GuiKind::VerticalRadio => {
                let size = a.int(0, 15);
                let number = a.int(3, 8).max(1);
                if kind == GuiKind::HorizontalRadio {
                    gui.width = size.saturating_mul(number);
                    gui.height = size;
                } else {
                    gui.width = size;
                    gui.height = size.saturating_mul(number);
                }
                gui.maximum = (number - 1) as f32;
                gui.steps = number as u32;
                gui.value = a.float(14, 0.0);
                4
            }
            GuiKind::VuMeter => {
                gui.width = a.int(0, 15);
                gui.height = a.int(1, 120);
                gui.minimum = -100.0;
                gui.maximum = 12.0;
                gui.value = -100.0;
                // vu has no send name: receive, label, offsets
                gui.receive = a.tie(2);
                gui.label = a.symbol(3);
                gui.label_x = x.saturating_add(a.int(4, -1));
                gui.label_y = y.saturating_add(a.int(5, -8));
                return gui;
            }
            GuiKind::Panel => {
                gui.width = a.int(1, 100);
                gui.height = a.int(2, 60);
                3
            }
        };

        gui.send = a.tie(names_at);
        gui.receive = a.tie(names_at + 1);
        gui.label = a.symbol(names_at + 2);
        gui.label_x = x.saturating_add(a.int(names_at + 3, 0));
        gui.label_y = y.saturating_add(a.int(names_at + 4, -8));
        gui
    }

    /// Map a stored slider position (hundredths of a pixel) to a value
    fn slider_value(&self, position: f32, length: i32) -> f32 {
        let span = 100.0 * (length.saturating_sub(1).max(1) as f32);
        let k = (position / span).clamp(0.0, 1.0);
        if self.log_scale && self.minimum > 0.0 && self.maximum > 0.0 {
            self.minimum * (self.maximum / self.minimum).powf(k)
        } else {
            self.minimum + (self.maximum - self.minimum) * k
        }
    }

    pub fn kind(&self) -> GuiKind {
        self.kind
    }

    pub fn label(&self) -> Symbol {
        self.label
    }

    pub fn send_tie(&self) -> Tie {
        self.send
    }

    pub fn receive_tie(&self) -> Tie {
        self.receive
    }

    pub fn minimum(&self) -> f32 {
        self.minimum
    }

    pub fn maximum(&self) -> f32 {
        self.maximum
    }

    /// Number of distinct positions (0 for continuous or valueless GUIs)
    pub fn number_of_steps(&self) -> u32 {
        self.steps
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Label position relative to the patch
    pub fn label_x(&self) -> i32 {
        self.label_x
    }

    pub fn label_y(&self) -> i32 {
        self.label_y
    }

    pub(crate) fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn clamp(&self, value: f32) -> f32 {
        match self.kind {
            GuiKind::HorizontalSlider
            | GuiKind::VerticalSlider
            | GuiKind::HorizontalRadio
            | GuiKind::VerticalRadio
            | GuiKind::Number => {
                let (lo, hi) = if self.minimum <= self.maximum {
                    (self.minimum, self.maximum)
                } else {
                    (self.maximum, self.minimum)
                };
                value.clamp(lo, hi)
            }
            _ => value,
        }
    }

    fn output(&self, out: &mut Vec<Emission>) {
        let message = match self.kind {
            GuiKind::Bang => Message::Bang,
            _ => Message::Float(self.value),
        };
        if !self.send.is_empty() {
            out.push(Emission::Send(self.send, message.clone()));
        }
        out.push(Emission::Outlet(0, message));
    }

    /// Handle a message on the inlet (or through the receive name)
    pub(crate) fn receive(&mut self, msg: Message, out: &mut Vec<Emission>) {
        match self.kind {
            GuiKind::Panel => {}
            GuiKind::VuMeter => {
                if let Some(v) = msg.as_float() {
                    self.value = v;
                }
            }
            GuiKind::Bang => {
                if !is_set(&msg) {
                    self.output(out);
                }
            }
            _ => match msg {
                Message::Bang => {
                    if self.kind == GuiKind::Toggle {
                        self.value = if self.value != 0.0 { 0.0 } else { self.maximum };
                    }
                    self.output(out);
                }
                Message::Anything { selector, args } if selector == Symbol::SET => {
                    if let Some(Atom::Float(v)) = args.first() {
                        self.value = self.clamp(*v);
                    }
                }
                other => {
                    if let Some(v) = other.as_float() {
                        self.value = self.clamp(v);
                        self.output(out);
                    }
                }
            },
        }
    }
}

fn is_set(msg: &Message) -> bool {
    matches!(msg, Message::Anything { selector, .. } if *selector == Symbol::SET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::parse::expand;

    fn args(text: &str) -> Vec<Atom> {
        text.split_whitespace().map(|w| expand(w, 1005)).collect()
    }

    #[test]
    fn test_toggle_metadata() {
        let gui = Gui::parse(
            GuiKind::Toggle,
            &args("15 0 $0-tgl-out $0-tgl-in Gain 17 7 0 10 -262144 -1 -1 1 1"),
            40,
            20,
            7,
        );
        assert_eq!(gui.kind(), GuiKind::Toggle);
        assert_eq!(gui.send_tie().name(), "1005-tgl-out");
        assert_eq!(gui.receive_tie().name(), "1005-tgl-in");
        assert_eq!(gui.label().name(), "Gain");
        assert_eq!(gui.label_x(), 57);
        assert_eq!(gui.label_y(), 27);
        assert_eq!(gui.maximum(), 1.0);
        assert_eq!(gui.number_of_steps(), 2);
        assert_eq!(gui.value(), 1.0);
    }

    #[test]
    fn test_slider_value_from_position() {
        // Position 12700 on a 128 pixel slider is the top of the range
        let gui = Gui::parse(
            GuiKind::HorizontalSlider,
            &args("128 15 0 127 0 0 empty empty empty -2 -8 0 10 -262144 -1 -1 12700 1"),
            0,
            0,
            7,
        );
        assert!(gui.send_tie().is_empty());
        assert!(gui.label().is_empty());
        assert_eq!(gui.number_of_steps(), 128);
        assert!((gui.value() - 127.0).abs() < 1e-4);
        assert_eq!(gui.size(), (128, 15));
    }

    #[test]
    fn test_radio_range() {
        let gui = Gui::parse(
            GuiKind::VerticalRadio,
            &args("15 1 0 4 snd rcv empty 0 -8 0 10 -262144 -1 -1 2"),
            0,
            0,
            7,
        );
        assert_eq!(gui.minimum(), 0.0);
        assert_eq!(gui.maximum(), 3.0);
        assert_eq!(gui.number_of_steps(), 4);
        assert_eq!(gui.value(), 2.0);
        assert_eq!(gui.size(), (15, 60));
    }

    #[test]
    fn test_oversized_arguments_saturate() {
        let radio = Gui::parse(
            GuiKind::HorizontalRadio,
            &args("100000 1 0 100000 empty empty empty 0 -8 0 10 -262144 -1 -1 0"),
            0,
            0,
            7,
        );
        assert_eq!(radio.size(), (i32::MAX, 100000));
        assert_eq!(radio.number_of_steps(), 100000);

        let number = Gui::parse(GuiKind::Number, &args("2000000000 14"), 0, 0, 7);
        assert_eq!(number.size().0, i32::MAX);

        let slider = Gui::parse(GuiKind::HorizontalSlider, &args("-2147483648 15 0 127"), i32::MAX, 0, 7);
        assert_eq!(slider.value(), 0.0);
        assert_eq!(slider.label_x(), i32::MAX);
    }

    #[test]
    fn test_vu_has_no_send() {
        let gui = Gui::parse(GuiKind::VuMeter, &args("15 120 vu-in Level -1 -8 0 10 -66577 -1 1 0"), 5, 5, 7);
        assert!(gui.send_tie().is_empty());
        assert_eq!(gui.receive_tie().name(), "vu-in");
        assert_eq!(gui.label().name(), "Level");
    }

    #[test]
    fn test_defaults_when_arguments_missing() {
        let gui = Gui::parse(GuiKind::Bang, &[], 0, 0, 7);
        assert_eq!(gui.size(), (15, 15));
        assert!(gui.receive_tie().is_empty());
    }

    #[test]
    fn test_receive_clamps_and_forwards() {
        let mut gui = Gui::parse(
            GuiKind::HorizontalRadio,
            &args("15 1 0 8 radio-out empty empty 0 -8 0 10 -262144 -1 -1 0"),
            0,
            0,
            7,
        );
        let mut out = Vec::new();
        gui.receive(Message::Float(12.0), &mut out);
        assert_eq!(gui.value(), 7.0);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Emission::Send(tie, Message::Float(v)) if tie.name() == "radio-out" && *v == 7.0));
        assert!(matches!(&out[1], Emission::Outlet(0, Message::Float(v)) if *v == 7.0));

        out.clear();
        let set = Message::classify(Symbol::intern("set"), crate::list::List::new().with(3.0f32));
        gui.receive(set, &mut out);
        assert_eq!(gui.value(), 3.0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_toggle_bang_flips() {
        let mut gui = Gui::parse(GuiKind::Toggle, &args("15 0 empty empty empty 17 7 0 10 -262144 -1 -1 0 5"), 0, 0, 7);
        let mut out = Vec::new();
        gui.receive(Message::Bang, &mut out);
        assert_eq!(gui.value(), 5.0);
        gui.receive(Message::Bang, &mut out);
        assert_eq!(gui.value(), 0.0);
    }
}
