#![forbid(unsafe_code)]

//! CSS selector parsing and matching.
//!
//! Supported grammar:
//!
//! - selector lists separated by `,`
//! - descendant (whitespace) and child (`>`) combinators
//! - compound steps made of a type or `*`, `#id`, `.class`, attribute
//!   conditions (`[a]`, `[a=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`, `[a~=v]`, values
//!   quoted or bare) and `:not(<selector list>)`
//!
//! Matching walks ancestors without bound, like `Element.matches`: a
//! descendant step may be satisfied by a node above the query scope.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Empty selector or group | `""`, `"a,"` | `UnsupportedSelector` |
//! | Unbalanced brackets/quotes | `"[a"`, `"a:not(b"` | `UnsupportedSelector` |
//! | Unknown pseudo-class | `"a:hover"` | `UnsupportedSelector` |

use crate::document::Document;
use crate::error::{DomError, Result};
use crate::node::NodeId;

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<Vec<SelectorPart>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    step: SelectorStep,
    // Relation to the part on the left.
    combinator: Combinator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectorStep {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    negations: Vec<SelectorList>,
}

impl SelectorStep {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && !self.universal
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists(String),
    Eq(String, String),
    StartsWith(String, String),
    EndsWith(String, String),
    Contains(String, String),
    Includes(String, String),
}

impl SelectorList {
    /// Parse a selector list.
    pub fn parse(selector: &str) -> Result<Self> {
        let unsupported = || DomError::UnsupportedSelector(selector.to_string());
        let groups = split_top_level(selector, |ch| ch == ',').ok_or_else(unsupported)?;
        let mut parsed = Vec::with_capacity(groups.len());
        for group in groups {
            let group = group.trim();
            if group.is_empty() {
                return Err(unsupported());
            }
            parsed.push(parse_chain(group).ok_or_else(unsupported)?);
        }
        Ok(Self { groups: parsed })
    }

    /// Whether `node` matches any group of the list.
    pub(crate) fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node)
            && self
                .groups
                .iter()
                .any(|chain| matches_chain(doc, node, chain))
    }
}

fn matches_chain(doc: &Document, node: NodeId, chain: &[SelectorPart]) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !matches_step(doc, node, &last.step) {
        return false;
    }
    matches_ancestors(doc, node, rest, last.combinator)
}

// Match `rest` (right to left) against the ancestors of `node`, where
// `combinator` relates `node` to the last part of `rest`. Backtracks across
// descendant combinators.
fn matches_ancestors(
    doc: &Document,
    node: NodeId,
    rest: &[SelectorPart],
    combinator: Combinator,
) -> bool {
    let Some((last, remaining)) = rest.split_last() else {
        return true;
    };
    match combinator {
        Combinator::Child => doc.parent_of(node).is_some_and(|parent| {
            matches_step(doc, parent, &last.step)
                && matches_ancestors(doc, parent, remaining, last.combinator)
        }),
        Combinator::Descendant => {
            let mut cursor = doc.parent_of(node);
            while let Some(ancestor) = cursor {
                if matches_step(doc, ancestor, &last.step)
                    && matches_ancestors(doc, ancestor, remaining, last.combinator)
                {
                    return true;
                }
                cursor = doc.parent_of(ancestor);
            }
            false
        }
    }
}

fn matches_step(doc: &Document, node: NodeId, step: &SelectorStep) -> bool {
    let Some(element) = doc.element_node(node) else {
        return false;
    };
    if let Some(tag) = &step.tag {
        if !element.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.attribute("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !step.classes.iter().all(|class| element.has_class(class)) {
        return false;
    }
    let attrs_match = step.attrs.iter().all(|cond| match cond {
        AttrCondition::Exists(key) => element.attribute(key).is_some(),
        AttrCondition::Eq(key, value) => element.attribute(key) == Some(value.as_str()),
        AttrCondition::StartsWith(key, value) => element
            .attribute(key)
            .is_some_and(|attr| !value.is_empty() && attr.starts_with(value.as_str())),
        AttrCondition::EndsWith(key, value) => element
            .attribute(key)
            .is_some_and(|attr| !value.is_empty() && attr.ends_with(value.as_str())),
        AttrCondition::Contains(key, value) => element
            .attribute(key)
            .is_some_and(|attr| !value.is_empty() && attr.contains(value.as_str())),
        AttrCondition::Includes(key, value) => element
            .attribute(key)
            .is_some_and(|attr| attr.split_whitespace().any(|token| token == value)),
    });
    if !attrs_match {
        return false;
    }
    step.negations.iter().all(|inner| !inner.matches(doc, node))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split `input` on characters accepted by `is_separator` that sit outside
/// brackets, parentheses and quotes. Returns `None` when nesting is unbalanced.
fn split_top_level(input: &str, is_separator: impl Fn(char) -> bool) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth.checked_sub(1)?;
                current.push(ch);
            }
            ch if depth == 0 && is_separator(ch) => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(current);
    Some(parts)
}

fn parse_chain(group: &str) -> Option<Vec<SelectorPart>> {
    // Pad `>` so whitespace tokenization sees it as its own token.
    let mut tokens = Vec::new();
    for chunk in split_top_level(group, |ch| ch.is_ascii_whitespace())? {
        for (idx, piece) in split_top_level(&chunk, |ch| ch == '>')?.into_iter().enumerate() {
            if idx > 0 {
                tokens.push(">".to_string());
            }
            if !piece.is_empty() {
                tokens.push(piece);
            }
        }
    }

    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut pending: Option<Combinator> = None;
    for token in tokens {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return None;
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let step = parse_step(&token)?;
        let combinator = pending.take().unwrap_or(Combinator::Descendant);
        parts.push(SelectorPart { step, combinator });
    }
    if parts.is_empty() || pending.is_some() {
        return None;
    }
    Some(parts)
}

fn parse_step(token: &str) -> Option<SelectorStep> {
    let mut step = SelectorStep::default();
    let bytes = token.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() || i != 0 {
                    return None;
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(token, i + 1)?;
                if step.id.replace(id).is_some() {
                    return None;
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(token, i + 1)?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let close = find_close(token, i, b'[', b']')?;
                step.attrs.push(parse_attr(&token[i + 1..close])?);
                i = close + 1;
            }
            b':' => {
                let rest = &token[i + 1..];
                if !rest.starts_with("not(") {
                    return None;
                }
                let open = i + 4;
                let close = find_close(token, open, b'(', b')')?;
                let inner = SelectorList::parse(&token[open + 1..close]).ok()?;
                step.negations.push(inner);
                i = close + 1;
            }
            _ => {
                if i != 0 {
                    return None;
                }
                let (tag, next) = parse_ident(token, i)?;
                step.tag = Some(tag);
                i = next;
            }
        }
    }
    (!step.is_empty()).then_some(step)
}

fn parse_ident(token: &str, start: usize) -> Option<(String, usize)> {
    let end = token[start..]
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'))
        .map_or(token.len(), |offset| start + offset);
    (end > start).then(|| (token[start..end].to_string(), end))
}

// Index of the bracket closing the one at `open`, honoring quotes and nesting.
fn find_close(token: &str, open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let bytes = token.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (idx, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b if b == open_ch => depth += 1,
            b if b == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_attr(body: &str) -> Option<AttrCondition> {
    let body = body.trim();
    let Some(eq) = body.find('=') else {
        let (name, end) = parse_ident(body, 0)?;
        return (end == body.len()).then(|| AttrCondition::Exists(name.to_ascii_lowercase()));
    };

    let (raw_name, op) = match body[..eq].chars().last() {
        Some(op @ ('^' | '$' | '*' | '~')) => (&body[..eq - 1], Some(op)),
        _ => (&body[..eq], None),
    };
    let raw_name = raw_name.trim();
    let (name, end) = parse_ident(raw_name, 0)?;
    if end != raw_name.len() {
        return None;
    }
    let name = name.to_ascii_lowercase();
    let value = unquote(body[eq + 1..].trim())?;

    Some(match op {
        None => AttrCondition::Eq(name, value),
        Some('^') => AttrCondition::StartsWith(name, value),
        Some('$') => AttrCondition::EndsWith(name, value),
        Some('*') => AttrCondition::Contains(name, value),
        Some(_) => AttrCondition::Includes(name, value),
    })
}

fn unquote(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    match bytes.first() {
        Some(&q @ (b'"' | b'\'')) => {
            if bytes.len() < 2 || bytes[bytes.len() - 1] != q {
                return None;
            }
            Some(raw[1..raw.len() - 1].to_string())
        }
        _ => {
            let (ident, end) = parse_ident(raw, 0)?;
            (end == raw.len()).then_some(ident)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_compound_steps() {
        let list = SelectorList::parse(r#"button.primary#go[data-ref="count"]"#).unwrap();
        let step = &list.groups[0][0].step;
        assert_eq!(step.tag.as_deref(), Some("button"));
        assert_eq!(step.id.as_deref(), Some("go"));
        assert_eq!(step.classes, vec!["primary".to_string()]);
        assert_eq!(
            step.attrs,
            vec![AttrCondition::Eq("data-ref".into(), "count".into())]
        );
    }

    #[test]
    fn parses_not_with_descendant_combinator() {
        let list = SelectorList::parse(r#"[data-on]:not([data-controller="nested"] *)"#).unwrap();
        let step = &list.groups[0][0].step;
        assert_eq!(step.negations.len(), 1);
        assert_eq!(step.negations[0].groups[0].len(), 2);
    }

    #[test]
    fn parses_child_combinator_with_and_without_spaces() {
        let a = SelectorList::parse("ul > li").unwrap();
        let b = SelectorList::parse("ul>li").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.groups[0][1].combinator, Combinator::Child);
    }

    #[test]
    fn parses_groups() {
        let list = SelectorList::parse("a, b ,c").unwrap();
        assert_eq!(list.groups.len(), 3);
    }

    #[test]
    fn parses_attribute_operators() {
        let list = SelectorList::parse("[a^=x][b$='y'][c*=z][d~=w][e]").unwrap();
        assert_eq!(list.groups[0][0].step.attrs.len(), 5);
    }

    #[test]
    fn quoted_values_may_contain_separators() {
        let list = SelectorList::parse(r#"[title="a, b > c"]"#).unwrap();
        assert_eq!(list.groups.len(), 1);
        assert_eq!(
            list.groups[0][0].step.attrs,
            vec![AttrCondition::Eq("title".into(), "a, b > c".into())]
        );
    }

    #[test]
    fn rejects_malformed_selectors() {
        for bad in ["", "a,", "[a", "a:not(b", "a:hover", ">a", "a >", "a**", "[a=]"] {
            assert!(SelectorList::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    proptest! {
        #[test]
        fn parse_never_panics(input in "\\PC{0,40}") {
            let _ = SelectorList::parse(&input);
        }
    }
}
