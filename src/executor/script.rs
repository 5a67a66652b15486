//! Page-global lookup for server-rendered documents
//!
//! Pages of the tracker application publish their state through inline
//! scripts such as `tree.config.data = {...};` or
//! `window.ajaxHeaders = {"X-CSRF-TOKEN": "..."};`. This module parses a
//! property-access expression and resolves it against those assignments.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// One step of a property-access path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Parses `a.b["c"][0]` style expressions into path segments
///
/// A leading `window.` is dropped. Only plain property access is supported;
/// calls and operators are rejected.
pub fn parse_path(expression: &str) -> Result<Vec<Segment>, String> {
    let mut chars = expression.trim().chars().peekable();
    let mut segments = Vec::new();

    let first = read_identifier(&mut chars);
    if first.is_empty() {
        return Err(format!("expected an identifier in '{}'", expression));
    }
    segments.push(Segment::Key(first));

    loop {
        skip_whitespace(&mut chars);
        match chars.next() {
            None => break,
            Some('.') => {
                skip_whitespace(&mut chars);
                let name = read_identifier(&mut chars);
                if name.is_empty() {
                    return Err(format!("dangling '.' in '{}'", expression));
                }
                segments.push(Segment::Key(name));
            }
            Some('[') => {
                skip_whitespace(&mut chars);
                let segment = match chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        chars.next();
                        let mut key = String::new();
                        loop {
                            match chars.next() {
                                Some(c) if c == quote => break,
                                Some(c) => key.push(c),
                                None => {
                                    return Err(format!(
                                        "unterminated string in '{}'",
                                        expression
                                    ))
                                }
                            }
                        }
                        Segment::Key(key)
                    }
                    _ => {
                        let mut digits = String::new();
                        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                            digits.push(c);
                            chars.next();
                        }
                        let index = digits
                            .parse()
                            .map_err(|_| format!("invalid index in '{}'", expression))?;
                        Segment::Index(index)
                    }
                };
                skip_whitespace(&mut chars);
                if chars.next() != Some(']') {
                    return Err(format!("expected ']' in '{}'", expression));
                }
                segments.push(segment);
            }
            Some(other) => {
                return Err(format!(
                    "unsupported character '{}' in '{}'",
                    other, expression
                ))
            }
        }
    }

    if segments.len() > 1 && segments[0] == Segment::Key("window".to_string()) {
        segments.remove(0);
    }
    Ok(segments)
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_identifier(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(c) = chars.peek().copied() {
        let valid = c == '_' || c == '$' || c.is_alphanumeric();
        if !valid || (ident.is_empty() && c.is_ascii_digit()) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

/// Follows `path` into a JSON value
pub fn index_value<'v>(value: &'v Value, path: &[Segment]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match (current, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Array(items), Segment::Index(i)) => items.get(*i),
        (Value::Array(items), Segment::Key(key)) => {
            key.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        (Value::Object(map), Segment::Index(i)) => map.get(&i.to_string()),
        _ => None,
    })
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?:\b(?:var|let|const)\s+)?([A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*|\s*\[\s*(?:"[^"]*"|'[^']*'|\d+)\s*\])*)\s*="#,
        )
        .expect("assignment pattern is a valid regex")
    })
}

/// Collects the text of every inline script in the document
pub fn inline_scripts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("script") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|script| script.value().attr("src").is_none())
        .map(|script| script.text().collect::<String>())
        .collect()
}

/// Resolves a page-global from the inline scripts of `html`
///
/// The assignment whose target is the longest prefix of `path` wins; a later
/// assignment to the same target replaces an earlier one. The assigned value
/// must be a JSON literal. Returns `None` when the global is undefined.
pub fn resolve_global(html: &str, path: &[Segment]) -> Option<Value> {
    let mut best: Option<(usize, Value)> = None;

    for script in inline_scripts(html) {
        for captures in assignment_pattern().captures_iter(&script) {
            let (Some(whole), Some(target)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let rest = &script[whole.end()..];
            if rest.starts_with('=') || rest.starts_with('>') {
                continue;
            }
            let Ok(target) = parse_path(target.as_str()) else {
                continue;
            };
            if target.len() > path.len() || path[..target.len()] != target[..] {
                continue;
            }
            if best.as_ref().is_some_and(|(len, _)| *len > target.len()) {
                continue;
            }
            if let Some(value) = parse_assigned_value(rest) {
                best = Some((target.len(), value));
            }
        }
    }

    let (len, value) = best?;
    index_value(&value, &path[len..]).cloned()
}

/// Parses the JSON literal at the start of an assignment's right-hand side
fn parse_assigned_value(rest: &str) -> Option<Value> {
    let rest = rest.trim_start();
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    if let Some(Ok(value)) = stream.next() {
        return Some(value);
    }
    // Scalars directly followed by `;` are rejected by the stream reader
    let end = rest.find([';', '\n', ',', ')', '}']).unwrap_or(rest.len());
    serde_json::from_str(rest[..end].trim()).ok()
}
