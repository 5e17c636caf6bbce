use super::{CssToken, CssTokenizer};

/// One compound selector such as `img.proxied#hero`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Combinator {
    Descendant,  // div p
    Child,       // div > p
}

/// A complex selector: compounds joined by combinators, left to right.
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
}

/// (ids, classes, types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Selector {
    pub fn specificity(&self) -> Specificity {
        self.compounds.iter().fold(Specificity::default(), |acc, c| {
            Specificity(
                acc.0 + c.id.is_some() as u32,
                acc.1 + c.classes.len() as u32,
                acc.2 + c.tag.is_some() as u32,
            )
        })
    }

    /// The rightmost compound, the one matched against the subject element.
    pub fn subject(&self) -> &CompoundSelector {
        &self.compounds[self.compounds.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub enum CssItem {
    Rule(Rule),
    AtRule {
        name: String,
        prelude: String,
    },
}

/// Parses a selector list. Returns `None` when any selector in the list
/// uses syntax we do not support, which drops the whole rule.
pub fn parse_selector_list(text: &str) -> Option<Vec<Selector>> {
    let tokens = CssTokenizer::new(text).tokenize();
    let mut selectors = Vec::new();
    for group in tokens.split(|t| *t == CssToken::Comma) {
        selectors.push(parse_selector(group)?);
    }
    Some(selectors)
}

fn parse_selector(tokens: &[CssToken]) -> Option<Selector> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut current: Option<CompoundSelector> = None;
    let mut pending: Option<Combinator> = None;

    for token in tokens {
        match token {
            CssToken::Whitespace => {
                if let Some(compound) = current.take() {
                    compounds.push(compound);
                    pending = Some(Combinator::Descendant);
                }
            }
            CssToken::Greater => {
                if let Some(compound) = current.take() {
                    compounds.push(compound);
                }
                if compounds.is_empty() {
                    return None;
                }
                pending = Some(Combinator::Child);
            }
            CssToken::Ident(_) | CssToken::Asterisk | CssToken::Dot(_) | CssToken::Hash(_) => {
                if current.is_none() {
                    if let Some(combinator) = pending.take() {
                        combinators.push(combinator);
                    }
                }
                let compound = current.get_or_insert_with(CompoundSelector::default);
                match token {
                    CssToken::Ident(tag)
                        if compound.tag.is_none()
                            && compound.classes.is_empty()
                            && compound.id.is_none() =>
                    {
                        compound.tag = Some(tag.to_ascii_lowercase());
                    }
                    CssToken::Asterisk if compound.tag.is_none() => {}
                    CssToken::Dot(class) => compound.classes.push(class.clone()),
                    CssToken::Hash(id) if compound.id.is_none() => compound.id = Some(id.clone()),
                    _ => return None,
                }
            }
            // Pseudo classes, attribute selectors and sibling combinators.
            _ => return None,
        }
    }

    if let Some(compound) = current {
        compounds.push(compound);
    } else if pending == Some(Combinator::Child) {
        return None;
    }
    if compounds.is_empty() || combinators.len() + 1 != compounds.len() {
        return None;
    }
    Some(Selector { compounds, combinators })
}

/// Parses the body of a declaration block or an inline `style` attribute.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    split_top_level(text, ';')
        .into_iter()
        .filter_map(|chunk| {
            let (property, value) = chunk.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let mut value = value.trim();
            if property.is_empty() {
                return None;
            }
            let mut important = false;
            if let Some(pos) = value.rfind('!') {
                if value[pos + 1..].trim().eq_ignore_ascii_case("important") {
                    important = true;
                    value = value[..pos].trim_end();
                }
            }
            if value.is_empty() {
                return None;
            }
            Some(Declaration {
                property,
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| {
            if d.important {
                format!("{}: {} !important;", d.property, d.value)
            } else {
                format!("{}: {};", d.property, d.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits on `sep` outside quotes and parentheses, so `url(data:...;base64,...)`
/// stays in one piece.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Stylesheet parser working on source text: blocks are located by brace
/// matching, selectors go through `CssTokenizer`.
pub struct CssParser {
    source: String,
    pos: usize,
}

impl CssParser {
    pub fn new(css: &str) -> Self {
        Self {
            source: strip_comments(css),
            pos: 0,
        }
    }

    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    /// Index (relative to `pos`) of the brace closing the block opened just
    /// before `pos`.
    fn find_block_end(&self) -> Option<usize> {
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        for (i, c) in self.rest().char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '{') => depth += 1,
                (None, '}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn parse(&mut self) -> Vec<CssItem> {
        let mut items = Vec::new();

        loop {
            let skip = self.rest().len() - self.rest().trim_start().len();
            self.pos += skip;
            if self.rest().is_empty() {
                break;
            }

            if self.rest().starts_with('@') {
                items.push(self.parse_at_rule());
                continue;
            }

            let Some(open) = self.rest().find('{') else {
                break;
            };
            let prelude = self.rest()[..open].trim().to_string();
            self.pos += open + 1;
            let Some(close) = self.find_block_end() else {
                break;
            };
            let body = self.rest()[..close].to_string();
            self.pos += close + 1;

            match parse_selector_list(&prelude) {
                Some(selectors) => items.push(CssItem::Rule(Rule {
                    selectors,
                    declarations: parse_declarations(&body),
                })),
                None => {
                    tracing::debug!(selector = %prelude, "skipping rule with unsupported selector")
                }
            }
        }

        items
    }

    fn parse_at_rule(&mut self) -> CssItem {
        let rest = self.rest();
        let name_len = rest[1..]
            .find(|c: char| !(c.is_alphanumeric() || c == '-'))
            .unwrap_or(rest.len() - 1);
        let name = rest[1..1 + name_len].to_ascii_lowercase();

        let semi = rest.find(';');
        let brace = rest.find('{');
        let prelude_end = match (semi, brace) {
            (Some(s), Some(b)) => s.min(b),
            (Some(s), None) => s,
            (None, Some(b)) => b,
            (None, None) => rest.len(),
        };
        let prelude = rest[1 + name_len..prelude_end].trim().to_string();

        if brace == Some(prelude_end) {
            self.pos += prelude_end + 1;
            match self.find_block_end() {
                Some(close) => self.pos += close + 1,
                None => self.pos = self.source.len(),
            }
        } else {
            self.pos = (self.pos + prelude_end + 1).min(self.source.len());
        }

        CssItem::AtRule { name, prelude }
    }
}
