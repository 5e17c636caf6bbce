// HTML tokenizer following the WHATWG tokenization states
// Reference: https://html.spec.whatwg.org/multipage/parsing.html#tokenization
//
// IMPLEMENTATION STATUS:
// ✅ Data state
// ✅ Tag open / end tag open / tag name states
// ✅ Attribute name and value states (quoted and unquoted)
// ✅ Self-closing start tag state
// ✅ Markup declaration open, comment and bogus comment states (simplified)
// ⚠️ DOCTYPE state - name parsed, public/system ids kept as raw text
// ⚠️ Character references - common named references and numeric references
// ✅ RAWTEXT for <script>, <style>, <noscript> (scripting enabled) and friends
// ✅ RCDATA for <title> and <textarea>
// ❌ Script data escape states

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Doctype {
        name: Option<String>,
        /// Everything between `<!DOCTYPE` and `>`, trimmed.
        raw: String,
    },
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Comment(String),
    Character(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenizerState {
    Data,
    RawText,
    TagOpen,
    EndTagOpen,
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    MarkupDeclarationOpen,
    Comment,
    BogusComment,
    Doctype,
}

/// Void elements never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is tokenized as raw text. `noscript` is parsed
/// the way a browser with scripting enabled does.
pub const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "xmp", "iframe", "noembed", "noframes",
];

/// Raw text elements whose character references are still decoded.
pub const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

fn is_text_only(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag) || RCDATA_ELEMENTS.contains(&tag)
}

const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
];

#[derive(Debug, Default)]
struct TagBuilder {
    name: String,
    end: bool,
    self_closing: bool,
    attributes: Vec<Attribute>,
    attr_name: String,
    attr_value: String,
    has_attr: bool,
}

impl TagBuilder {
    fn start_attribute(&mut self) {
        self.finish_attribute();
        self.has_attr = true;
    }

    fn finish_attribute(&mut self) {
        if !self.has_attr {
            return;
        }
        self.has_attr = false;
        let name = std::mem::take(&mut self.attr_name);
        let value = std::mem::take(&mut self.attr_value);
        // Duplicate attributes: the first one wins.
        if name.is_empty() || self.attributes.iter().any(|a| a.name == name) {
            return;
        }
        self.attributes.push(Attribute { name, value });
    }
}

pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
    state: TokenizerState,
    pending: VecDeque<Token>,
    tag: TagBuilder,
    text: String,
    raw_text_tag: Option<String>,
    done: bool,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            state: TokenizerState::Data,
            pending: VecDeque::new(),
            tag: TagBuilder::default(),
            text: String::new(),
            raw_text_tag: None,
            done: false,
        }
    }

    pub fn state(&self) -> TokenizerState {
        self.state
    }

    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                tracing::trace!(?token, "html token");
                return Some(token);
            }
            if self.done {
                return None;
            }
            self.step();
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            let eof = token == Token::Eof;
            tokens.push(token);
            if eof {
                break;
            }
        }
        tokens
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.input.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn reconsume(&mut self, c: Option<char>, state: TokenizerState) {
        if c.is_some() {
            self.pos -= 1;
        }
        self.state = state;
    }

    fn starts_with(&self, s: &str, ignore_case: bool) -> bool {
        let mut i = self.pos;
        for expected in s.chars() {
            match self.input.get(i) {
                Some(&c) if c == expected => {}
                Some(&c) if ignore_case && c.eq_ignore_ascii_case(&expected) => {}
                _ => return false,
            }
            i += 1;
        }
        true
    }

    fn emit_char(&mut self, c: char) {
        self.pending.push_back(Token::Character(c));
    }

    fn emit_str(&mut self, s: &str) {
        for c in s.chars() {
            self.emit_char(c);
        }
    }

    fn emit_eof(&mut self) {
        self.pending.push_back(Token::Eof);
        self.done = true;
    }

    fn begin_tag(&mut self, end: bool) {
        self.tag = TagBuilder {
            end,
            ..TagBuilder::default()
        };
    }

    fn emit_tag(&mut self) {
        let mut tag = std::mem::take(&mut self.tag);
        tag.finish_attribute();
        self.state = TokenizerState::Data;
        if tag.end {
            self.pending.push_back(Token::EndTag { name: tag.name });
            return;
        }
        if is_text_only(&tag.name) && !tag.self_closing {
            self.raw_text_tag = Some(tag.name.clone());
            self.state = TokenizerState::RawText;
        }
        self.pending.push_back(Token::StartTag {
            name: tag.name,
            attributes: tag.attributes,
            self_closing: tag.self_closing,
        });
    }

    fn emit_text_token(&mut self, doctype: bool) {
        let text = std::mem::take(&mut self.text);
        if doctype {
            let name = text.split_whitespace().next().map(|n| n.to_ascii_lowercase());
            let raw = text.trim().to_string();
            self.pending.push_back(Token::Doctype { name, raw });
        } else {
            self.pending.push_back(Token::Comment(text));
        }
        self.state = TokenizerState::Data;
    }

    /// Called after `&` has been consumed. Returns the decoded text, or `&`
    /// when nothing recognisable follows.
    fn consume_char_ref(&mut self, in_attribute: bool) -> String {
        if self.input.get(self.pos) == Some(&'#') {
            let start = self.pos;
            self.pos += 1;
            let hex = matches!(self.input.get(self.pos), Some('x') | Some('X'));
            if hex {
                self.pos += 1;
            }
            let radix = if hex { 16 } else { 10 };
            let digits_start = self.pos;
            while matches!(self.input.get(self.pos), Some(c) if c.is_digit(radix)) {
                self.pos += 1;
            }
            if self.pos == digits_start {
                self.pos = start;
                return "&".to_string();
            }
            let digits: String = self.input[digits_start..self.pos].iter().collect();
            if self.input.get(self.pos) == Some(&';') {
                self.pos += 1;
            }
            let c = u32::from_str_radix(&digits, radix)
                .ok()
                .and_then(char::from_u32)
                .filter(|&c| c != '\0')
                .unwrap_or('\u{fffd}');
            return c.to_string();
        }

        for &(name, c) in NAMED_REFERENCES {
            if !self.starts_with(name, false) {
                continue;
            }
            let after = self.pos + name.chars().count();
            match self.input.get(after) {
                Some(';') => {
                    self.pos = after + 1;
                    return c.to_string();
                }
                // Legacy references without a semicolon, outside attributes only.
                Some(n) if in_attribute && (n.is_ascii_alphanumeric() || *n == '=') => {}
                _ if !in_attribute && name != "apos" && name != "nbsp" => {
                    self.pos = after;
                    return c.to_string();
                }
                _ => {}
            }
        }
        "&".to_string()
    }

    fn step(&mut self) {
        use TokenizerState::*;

        match self.state {
            RawText => {
                self.consume_raw_text();
                return;
            }
            MarkupDeclarationOpen => {
                self.text.clear();
                if self.starts_with("--", false) {
                    self.pos += 2;
                    self.state = Comment;
                } else if self.starts_with("doctype", true) {
                    self.pos += 7;
                    self.state = Doctype;
                } else {
                    self.state = BogusComment;
                }
                return;
            }
            _ => {}
        }

        let c = self.next_char();
        match self.state {
            Data => match c {
                Some('<') => self.state = TagOpen,
                Some('&') => {
                    let decoded = self.consume_char_ref(false);
                    self.emit_str(&decoded);
                }
                Some(ch) => self.emit_char(ch),
                None => self.emit_eof(),
            },
            TagOpen => match c {
                Some('!') => self.state = MarkupDeclarationOpen,
                Some('/') => self.state = EndTagOpen,
                Some(ch) if ch.is_ascii_alphabetic() => {
                    self.begin_tag(false);
                    self.reconsume(c, TagName);
                }
                Some('?') => {
                    self.text.clear();
                    self.reconsume(c, BogusComment);
                }
                _ => {
                    self.emit_char('<');
                    self.reconsume(c, Data);
                }
            },
            EndTagOpen => match c {
                Some(ch) if ch.is_ascii_alphabetic() => {
                    self.begin_tag(true);
                    self.reconsume(c, TagName);
                }
                Some('>') => self.state = Data,
                None => {
                    self.emit_str("</");
                    self.emit_eof();
                }
                Some(_) => {
                    self.text.clear();
                    self.reconsume(c, BogusComment);
                }
            },
            TagName => match c {
                Some(ch) if ch.is_ascii_whitespace() => self.state = BeforeAttributeName,
                Some('/') => self.state = SelfClosingStartTag,
                Some('>') => self.emit_tag(),
                Some(ch) => self.tag.name.push(ch.to_ascii_lowercase()),
                None => self.emit_eof(),
            },
            BeforeAttributeName => match c {
                Some(ch) if ch.is_ascii_whitespace() => {}
                Some('/') | Some('>') | None => self.reconsume(c, AfterAttributeName),
                Some('=') => {
                    self.tag.start_attribute();
                    self.tag.attr_name.push('=');
                    self.state = AttributeName;
                }
                Some(_) => {
                    self.tag.start_attribute();
                    self.reconsume(c, AttributeName);
                }
            },
            AttributeName => match c {
                Some(ch) if ch.is_ascii_whitespace() => self.state = AfterAttributeName,
                Some('/') | Some('>') | None => self.reconsume(c, AfterAttributeName),
                Some('=') => self.state = BeforeAttributeValue,
                Some(ch) => self.tag.attr_name.push(ch.to_ascii_lowercase()),
            },
            AfterAttributeName => match c {
                Some(ch) if ch.is_ascii_whitespace() => {}
                Some('/') => self.state = SelfClosingStartTag,
                Some('=') => self.state = BeforeAttributeValue,
                Some('>') => self.emit_tag(),
                None => self.emit_eof(),
                Some(_) => {
                    self.tag.start_attribute();
                    self.reconsume(c, AttributeName);
                }
            },
            BeforeAttributeValue => match c {
                Some(ch) if ch.is_ascii_whitespace() => {}
                Some('"') => self.state = AttributeValueDoubleQuoted,
                Some('\'') => self.state = AttributeValueSingleQuoted,
                Some('>') => self.emit_tag(),
                _ => self.reconsume(c, AttributeValueUnquoted),
            },
            AttributeValueDoubleQuoted | AttributeValueSingleQuoted => {
                let quote = if self.state == AttributeValueDoubleQuoted { '"' } else { '\'' };
                match c {
                    Some(ch) if ch == quote => {
                        self.tag.finish_attribute();
                        self.state = AfterAttributeValueQuoted;
                    }
                    Some('&') => {
                        let decoded = self.consume_char_ref(true);
                        self.tag.attr_value.push_str(&decoded);
                    }
                    Some(ch) => self.tag.attr_value.push(ch),
                    None => self.emit_eof(),
                }
            }
            AttributeValueUnquoted => match c {
                Some(ch) if ch.is_ascii_whitespace() => {
                    self.tag.finish_attribute();
                    self.state = BeforeAttributeName;
                }
                Some('&') => {
                    let decoded = self.consume_char_ref(true);
                    self.tag.attr_value.push_str(&decoded);
                }
                Some('>') => self.emit_tag(),
                Some(ch) => self.tag.attr_value.push(ch),
                None => self.emit_eof(),
            },
            AfterAttributeValueQuoted => match c {
                Some(ch) if ch.is_ascii_whitespace() => self.state = BeforeAttributeName,
                Some('/') => self.state = SelfClosingStartTag,
                Some('>') => self.emit_tag(),
                None => self.emit_eof(),
                Some(_) => self.reconsume(c, BeforeAttributeName),
            },
            SelfClosingStartTag => match c {
                Some('>') => {
                    self.tag.self_closing = true;
                    self.emit_tag();
                }
                None => self.emit_eof(),
                Some(_) => self.reconsume(c, BeforeAttributeName),
            },
            Comment => match c {
                Some('-') if self.starts_with("->", false) => {
                    self.pos += 2;
                    self.emit_text_token(false);
                }
                Some(ch) => self.text.push(ch),
                None => {
                    self.emit_text_token(false);
                    self.emit_eof();
                }
            },
            BogusComment => match c {
                Some('>') => self.emit_text_token(false),
                Some(ch) => self.text.push(ch),
                None => {
                    self.emit_text_token(false);
                    self.emit_eof();
                }
            },
            Doctype => match c {
                Some('>') => self.emit_text_token(true),
                Some(ch) => self.text.push(ch),
                None => {
                    self.emit_text_token(true);
                    self.emit_eof();
                }
            },
            RawText | MarkupDeclarationOpen => unreachable!("handled before consuming input"),
        }
    }

    /// Emits everything up to the matching `</tag` as characters and leaves
    /// the end tag for the data state. RCDATA content has its character
    /// references decoded.
    fn consume_raw_text(&mut self) {
        let tag = self.raw_text_tag.take().unwrap_or_default();
        let decode = RCDATA_ELEMENTS.contains(&tag.as_str());
        let closing = format!("</{}", tag);
        while let Some(&c) = self.input.get(self.pos) {
            if c == '<' && self.at_closing_tag(&closing) {
                break;
            }
            self.pos += 1;
            if c == '&' && decode {
                let decoded = self.consume_char_ref(false);
                self.emit_str(&decoded);
            } else {
                self.emit_char(c);
            }
        }
        self.state = TokenizerState::Data;
    }

    fn at_closing_tag(&self, closing: &str) -> bool {
        if !self.starts_with(closing, true) {
            return false;
        }
        match self.input.get(self.pos + closing.chars().count()) {
            None | Some('>') | Some('/') => true,
            Some(c) => c.is_ascii_whitespace(),
        }
    }
}

impl Token {
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Token::StartTag { name, .. } | Token::EndTag { name } => Some(name),
            _ => None,
        }
    }
}
