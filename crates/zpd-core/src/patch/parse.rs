//! Patch file tokenizer
//!
//! Splits the text format into records terminated by unescaped `;`.
//! Within a record, words are whitespace separated. An unescaped `,` is a
//! separate token. The escapes `\;` and `\,` produce separator tokens
//! inside the record (message boxes use them), and `\$` becomes a literal
//! `$` in the word.

use crate::atom::Atom;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Word(String),
    Comma,
    Semi,
}

impl Token {
    pub(crate) fn word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }
}

/// One `;`-terminated record with the line it started on
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Record {
    pub line: usize,
    pub tokens: Vec<Token>,
}

impl Record {
    /// Word at `index`, if it is a word
    pub(crate) fn word(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).and_then(Token::word)
    }

    /// Integer at `index`, 0 when missing or not numeric
    pub(crate) fn int(&self, index: usize) -> i32 {
        self.word(index)
            .and_then(|w| w.parse::<f32>().ok())
            .map(|f| f as i32)
            .unwrap_or(0)
    }
}

pub(crate) fn tokenize(text: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars();

    fn flush(word: &mut String, tokens: &mut Vec<Token>) {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(';') => {
                    flush(&mut word, &mut tokens);
                    tokens.push(Token::Semi);
                }
                Some(',') => {
                    flush(&mut word, &mut tokens);
                    tokens.push(Token::Comma);
                }
                Some('\n') => {
                    line += 1;
                    flush(&mut word, &mut tokens);
                }
                Some(other) => word.push(other),
                None => {}
            },
            ';' => {
                flush(&mut word, &mut tokens);
                if !tokens.is_empty() {
                    records.push(Record {
                        line: record_line,
                        tokens: std::mem::take(&mut tokens),
                    });
                }
            }
            ',' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Comma);
            }
            c if c.is_whitespace() => {
                if c == '\n' {
                    line += 1;
                }
                flush(&mut word, &mut tokens);
            }
            c => {
                if tokens.is_empty() && word.is_empty() {
                    record_line = line;
                }
                word.push(c);
            }
        }
    }

    flush(&mut word, &mut tokens);
    if !tokens.is_empty() {
        records.push(Record {
            line: record_line,
            tokens,
        });
    }
    records
}

/// Replace `$0` with the patch's dollar-zero and parse the result
pub(crate) fn expand(word: &str, dollar_zero: i32) -> Atom {
    if word.contains("$0") {
        Atom::from_word(&word.replace("$0", &dollar_zero.to_string()))
    } else {
        Atom::from_word(word)
    }
}

/// Text of a word as a name (numbers keep their written form)
pub(crate) fn expand_name(word: &str, dollar_zero: i32) -> String {
    word.replace("$0", &dollar_zero.to_string())
}

/// Render tokens back to the text shown in a box
pub(crate) fn render(tokens: &[Token]) -> String {
    let mut text = String::new();
    for token in tokens {
        let piece = match token {
            Token::Word(w) => w.as_str(),
            Token::Comma => ",",
            Token::Semi => ";",
        };
        if !text.is_empty() && !matches!(token, Token::Comma) {
            text.push(' ');
        }
        text.push_str(piece);
    }
    text
}
