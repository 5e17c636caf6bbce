#[derive(Debug, Clone, PartialEq)]
pub enum CssToken {
    Ident(String),
    Hash(String),      // #id
    Dot(String),       // .class
    Asterisk,          // *
    Plus,              // +
    Greater,           // >
    Tilde,             // ~
    Comma,             // ,
    Colon,             // :
    OpenBracket,       // [
    CloseBracket,      // ]
    OpenParen,         // (
    CloseParen,        // )
    String(String),
    Number(f32),
    Dimension {
        value: f32,
        unit: String,  // px, em, vw, ...
    },
    Percentage(f32),
    Delim(char),
    Whitespace,
}

pub struct CssTokenizer {
    input: Vec<char>,
    pos: usize,
}

impl CssTokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.pos + n).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn consume_while<F>(&mut self, test: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut result = String::new();
        while let Some(c) = self.peek() {
            if !test(c) {
                break;
            }
            result.push(c);
            self.next();
        }
        result
    }

    fn is_name_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
    }

    fn starts_number(&self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => matches!(self.peek_ahead(1), Some(d) if d.is_ascii_digit()),
            Some('-') | Some('+') => match self.peek_ahead(1) {
                Some(d) if d.is_ascii_digit() => true,
                Some('.') => matches!(self.peek_ahead(2), Some(d) if d.is_ascii_digit()),
                _ => false,
            },
            _ => false,
        }
    }

    pub fn next_token(&mut self) -> Option<CssToken> {
        match self.peek() {
            None => None,

            Some(c) if c.is_whitespace() => {
                self.consume_while(|c| c.is_whitespace());
                Some(CssToken::Whitespace)
            }

            // Comments
            Some('/') if self.peek_ahead(1) == Some('*') => {
                self.pos += 2;
                while self.peek().is_some()
                    && !(self.peek() == Some('*') && self.peek_ahead(1) == Some('/'))
                {
                    self.next();
                }
                self.pos = (self.pos + 2).min(self.input.len());
                self.next_token()
            }

            Some(quote @ ('"' | '\'')) => {
                self.next();
                let string = self.consume_while(|c| c != quote);
                self.next();
                Some(CssToken::String(string))
            }

            Some(_) if self.starts_number() => {
                let mut num_str = String::new();
                if let Some(sign @ ('-' | '+')) = self.peek() {
                    num_str.push(sign);
                    self.next();
                }
                num_str.push_str(&self.consume_while(|c| c.is_ascii_digit() || c == '.'));
                let num: f32 = num_str.parse().unwrap_or(0.0);

                if self.peek() == Some('%') {
                    self.next();
                    return Some(CssToken::Percentage(num));
                }
                if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
                    let unit = self.consume_while(|c| c.is_alphabetic());
                    return Some(CssToken::Dimension {
                        value: num,
                        unit: unit.to_ascii_lowercase(),
                    });
                }
                Some(CssToken::Number(num))
            }

            Some('#') => {
                self.next();
                let id = self.consume_while(Self::is_name_char);
                Some(CssToken::Hash(id))
            }

            Some('.') if matches!(self.peek_ahead(1), Some(c) if Self::is_name_char(c)) => {
                self.next();
                let class = self.consume_while(Self::is_name_char);
                Some(CssToken::Dot(class))
            }

            Some(c) if c.is_alphabetic() || c == '-' || c == '_' || !c.is_ascii() => {
                let ident = self.consume_while(Self::is_name_char);
                Some(CssToken::Ident(ident))
            }

            Some(c) => {
                self.next();
                Some(match c {
                    '*' => CssToken::Asterisk,
                    '+' => CssToken::Plus,
                    '>' => CssToken::Greater,
                    '~' => CssToken::Tilde,
                    ',' => CssToken::Comma,
                    ':' => CssToken::Colon,
                    '[' => CssToken::OpenBracket,
                    ']' => CssToken::CloseBracket,
                    '(' => CssToken::OpenParen,
                    ')' => CssToken::CloseParen,
                    other => CssToken::Delim(other),
                })
            }
        }
    }

    pub fn tokenize(&mut self) -> Vec<CssToken> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }
}

pub mod parser;
pub use parser::{
    parse_declarations, parse_selector_list, serialize_declarations, Combinator,
    CompoundSelector, CssItem, CssParser, Declaration, Rule, Selector, Specificity,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_selector_text() {
        let tokens = CssTokenizer::new("div > img.proxied, #hero").tokenize();
        assert_eq!(
            tokens,
            vec![
                CssToken::Ident("div".into()),
                CssToken::Whitespace,
                CssToken::Greater,
                CssToken::Whitespace,
                CssToken::Ident("img".into()),
                CssToken::Dot("proxied".into()),
                CssToken::Comma,
                CssToken::Whitespace,
                CssToken::Hash("hero".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_lengths() {
        let tokens = CssTokenizer::new("240px 50% -1.5em 0").tokenize();
        assert_eq!(tokens[0], CssToken::Dimension { value: 240.0, unit: "px".into() });
        assert_eq!(tokens[2], CssToken::Percentage(50.0));
        assert_eq!(tokens[4], CssToken::Dimension { value: -1.5, unit: "em".into() });
        assert_eq!(tokens[6], CssToken::Number(0.0));
    }

    #[test]
    fn skips_comments() {
        let tokens = CssTokenizer::new("/* hi */p").tokenize();
        assert_eq!(tokens, vec![CssToken::Ident("p".into())]);
    }
}
