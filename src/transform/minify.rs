// src/transform/minify.rs

//! A conservative JavaScript minifier.
//!
//! It strips comments (except `/*!` and `@license` ones) and collapses
//! whitespace. It never renames identifiers or reorders code, and keeps a
//! line break wherever removing it could change automatic semicolon
//! insertion. String, template and regex literals are copied verbatim.

use anyhow::{anyhow, bail, Result};

use crate::transform::{Artifact, Stage, StageFuture, StageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinifyOptions {
    /// Leave `"key":` object keys quoted. When false, keys that are valid
    /// identifiers lose their quotes.
    pub keep_quoted_props: bool,
    /// Emit `true`/`false` as `!0`/`!1`.
    pub compress_booleans: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            keep_quoted_props: false,
            compress_booleans: true,
        }
    }
}

impl MinifyOptions {
    /// Options for generated configuration that is read by dynamic key
    /// lookups: quoted keys and literal booleans survive.
    pub fn config() -> Self {
        Self {
            keep_quoted_props: true,
            compress_booleans: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Minify {
    options: MinifyOptions,
}

impl Minify {
    pub fn new(options: MinifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MinifyOptions {
        self.options
    }
}

impl Stage for Minify {
    fn name(&self) -> &str {
        "minify"
    }

    fn kind(&self) -> StageKind {
        StageKind::Minify
    }

    fn apply(&self, artifact: Artifact) -> StageFuture<'_> {
        Box::pin(async move {
            let content = minify(&artifact.content, &self.options)?;
            Ok(vec![artifact.with_content(content)])
        })
    }
}

/// Minify `source`.
pub fn minify(source: &str, options: &MinifyOptions) -> Result<String> {
    Minifier::new(source, *options).run()
}

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

/// Keywords whose parenthesised head is followed by a statement, so a `/`
/// after the closing `)` starts a regex literal.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Newline,
}

struct Minifier {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    out: String,
    options: MinifyOptions,
    /// Last significant character written.
    last: Option<char>,
    /// Last token written, if it was a word.
    last_word: String,
    /// One entry per open `(`: whether it follows a control keyword.
    parens: Vec<bool>,
    /// The last token was the `)` closing a control keyword's head.
    after_control_head: bool,
    gap: Gap,
}

impl Minifier {
    fn new(source: &str, options: MinifyOptions) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            out: String::with_capacity(source.len()),
            options,
            last: None,
            last_word: String::new(),
            parens: Vec::new(),
            after_control_head: false,
            gap: Gap::None,
        }
    }

    fn run(mut self) -> Result<String> {
        while let Some(c) = self.peek(0) {
            match c {
                c if c.is_whitespace() => {
                    if is_line_break(c) {
                        self.line += 1;
                        self.gap = Gap::Newline;
                    } else if self.gap == Gap::None {
                        self.gap = Gap::Space;
                    }
                    self.pos += 1;
                }
                '/' if self.peek(1) == Some('/') => {
                    while self.peek(0).is_some_and(|c| !is_line_break(c)) {
                        self.pos += 1;
                    }
                }
                '/' if self.peek(1) == Some('*') => self.block_comment()?,
                '/' if self.regex_allowed() => {
                    let literal = self.regex_literal()?;
                    self.emit(&literal);
                    self.last_word.clear();
                }
                '"' | '\'' => self.string(c)?,
                '`' => {
                    let literal = self.template()?;
                    self.emit(&literal);
                    self.last_word.clear();
                }
                c if is_word_char(c) => self.word(),
                c => {
                    self.pos += 1;
                    let closes_control_head = match c {
                        '(' => {
                            let control = CONTROL_KEYWORDS.contains(&self.last_word.as_str());
                            self.parens.push(control);
                            false
                        }
                        ')' => self.parens.pop().unwrap_or(false),
                        _ => false,
                    };
                    self.emit(c.encode_utf8(&mut [0; 4]));
                    self.after_control_head = closes_control_head;
                    self.last_word.clear();
                }
            }
        }

        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        Ok(self.out)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        Some(c)
    }

    /// Next character that is not whitespace, without consuming anything.
    fn next_significant(&self) -> Option<char> {
        self.chars[self.pos..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    fn emit(&mut self, token: &str) {
        let Some(next) = token.chars().next() else {
            return;
        };
        if let Some(prev) = self.last {
            if !self.out.ends_with('\n') {
                match self.gap {
                    Gap::Newline if needs_newline(prev, next) => self.out.push('\n'),
                    Gap::Newline | Gap::Space if self.needs_space(prev, next) => {
                        self.out.push(' ')
                    }
                    _ => {}
                }
            }
        }
        self.gap = Gap::None;
        self.after_control_head = false;
        self.out.push_str(token);
        self.last = token.chars().last();
    }

    fn needs_space(&self, prev: char, next: char) -> bool {
        (is_word_char(prev) && is_word_char(next))
            || (prev == '+' && next == '+')
            || (prev == '-' && next == '-')
            || (prev == '/' && (next == '/' || next == '*'))
            // `1 .toString()` must not become `1.toString()`.
            || (next == '.'
                && !self.last_word.is_empty()
                && self.last_word.chars().all(|c| c.is_ascii_digit()))
    }

    fn regex_allowed(&self) -> bool {
        match self.last {
            None => true,
            Some(')') => self.after_control_head,
            Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
            Some(c) if is_word_char(c) => REGEX_KEYWORDS.contains(&self.last_word.as_str()),
            _ => false,
        }
    }

    fn block_comment(&mut self) -> Result<()> {
        let start_line = self.line;
        let start = self.pos;
        self.pos += 2;
        loop {
            match self.bump() {
                Some('*') if self.peek(0) == Some('/') => {
                    self.pos += 1;
                    break;
                }
                Some(c) if is_line_break(c) => self.line += 1,
                Some(_) => {}
                None => bail!("unterminated comment starting on line {start_line}"),
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if text.starts_with("/*!") || text.contains("@license") {
            if !self.out.is_empty() && !self.out.ends_with('\n') {
                self.out.push('\n');
            }
            self.out.push_str(&text);
            self.out.push('\n');
            self.gap = Gap::None;
        } else if text.chars().any(is_line_break) {
            self.gap = Gap::Newline;
        } else if self.gap == Gap::None {
            self.gap = Gap::Space;
        }
        Ok(())
    }

    fn regex_literal(&mut self) -> Result<String> {
        let line = self.line;
        let mut literal = String::from('/');
        self.pos += 1;
        let mut in_class = false;

        loop {
            let c = self
                .bump()
                .filter(|c| !is_line_break(*c))
                .ok_or_else(|| anyhow!("unterminated regex literal on line {line}"))?;
            literal.push(c);
            match c {
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| anyhow!("unterminated regex literal on line {line}"))?;
                    literal.push(escaped);
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }

        while let Some(flag) = self.peek(0).filter(|c| c.is_ascii_alphabetic()) {
            literal.push(flag);
            self.pos += 1;
        }
        Ok(literal)
    }

    fn string(&mut self, quote: char) -> Result<()> {
        let line = self.line;
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.bump() {
                Some('\\') => {
                    if let Some(c) = self.bump() {
                        if is_line_break(c) {
                            self.line += 1;
                        }
                    }
                }
                Some(c) if c == quote => break,
                Some(c) if is_line_break(c) => {
                    bail!("unterminated string literal on line {line}")
                }
                Some(_) => {}
                None => bail!("unterminated string literal on line {line}"),
            }
        }

        let literal: String = self.chars[start..self.pos].iter().collect();
        let inner = &literal[1..literal.len() - 1];

        let is_object_key = matches!(self.last, Some('{') | Some(','))
            && self.next_significant() == Some(':');

        if !self.options.keep_quoted_props && is_object_key && is_identifier(inner) {
            let key = inner.to_string();
            self.emit(&key);
            self.last_word = key;
        } else {
            self.emit(&literal);
            self.last_word.clear();
        }
        Ok(())
    }

    fn template(&mut self) -> Result<String> {
        let line = self.line;
        let mut literal = String::from('`');
        self.pos += 1;
        loop {
            let c = self
                .bump()
                .ok_or_else(|| anyhow!("unterminated template literal starting on line {line}"))?;
            if is_line_break(c) {
                self.line += 1;
            }
            literal.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        literal.push(escaped);
                    }
                }
                '`' => break,
                '$' if self.peek(0) == Some('{') => {
                    literal.push('{');
                    self.pos += 1;
                    self.template_expression(&mut literal, line)?;
                }
                _ => {}
            }
        }
        Ok(literal)
    }

    /// Copy a `${ ... }` expression verbatim, up to and including its `}`.
    fn template_expression(&mut self, literal: &mut String, line: usize) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            let c = self
                .peek(0)
                .ok_or_else(|| anyhow!("unterminated template literal starting on line {line}"))?;
            match c {
                '`' => {
                    let nested = self.template()?;
                    literal.push_str(&nested);
                    continue;
                }
                '"' | '\'' => {
                    self.pos += 1;
                    literal.push(c);
                    loop {
                        let s = self.bump().ok_or_else(|| {
                            anyhow!("unterminated string literal on line {}", self.line)
                        })?;
                        literal.push(s);
                        if s == '\\' {
                            if let Some(escaped) = self.bump() {
                                literal.push(escaped);
                            }
                        } else if s == c {
                            break;
                        }
                    }
                    continue;
                }
                '{' => depth += 1,
                '}' => depth -= 1,
                c if is_line_break(c) => self.line += 1,
                _ => {}
            }
            literal.push(c);
            self.pos += 1;
        }
        Ok(())
    }

    fn word(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_word_char) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if self.options.compress_booleans && (word == "true" || word == "false") {
            let next = self.next_significant();
            let is_member = self.last == Some('.');
            let is_object_key =
                matches!(self.last, Some('{') | Some(',')) && next == Some(':');
            // `!0.toString()` and `!0[k]` would bind to the `0`.
            let is_accessed = matches!(next, Some('.') | Some('['));
            if !is_member && !is_object_key && !is_accessed {
                self.emit(if word == "true" { "!0" } else { "!1" });
                self.last_word.clear();
                return;
            }
        }

        self.emit(&word);
        self.last_word = word;
    }
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || (!c.is_ascii() && !c.is_whitespace())
}

/// Removing a line break between `prev` and `next` could change how
/// semicolons are inserted.
fn needs_newline(prev: char, next: char) -> bool {
    let ends_statement = is_word_char(prev) || ")]}\"'`+-/".contains(prev);
    let starts_statement = is_word_char(next) || "([{\"'`+-/!~".contains(next);
    ends_statement && starts_statement
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}
