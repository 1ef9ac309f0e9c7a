//! A small JSONPath subset
//!
//! Supported syntax:
//!
//! | Form          | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `$`           | root (optional)                           |
//! | `.key`        | object member                             |
//! | `['key']`     | object member, any characters             |
//! | `[n]`         | array element                             |
//! | `[*]`, `.*`   | every member or element                   |
//! | `..key`       | `key` at any depth                        |
//! | `..*`         | every descendant                          |
//!
//! A leading bare name is read as a member of the root, so `items[0]` and
//! `$.items[0]` are the same path.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct PathSyntaxError {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
    /// `..key`, or every descendant when `None`
    Descendant(Option<String>),
}

/// One concrete step from a node to a child
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// Concrete route from the root to one node
pub type Location = Vec<Step>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expression: &str) -> Result<Self, PathSyntaxError> {
        Parser::new(expression.trim()).parse()
    }

    /// True for `$` or the empty path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every node the path selects, in document order
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        self.walk(root).into_iter().map(|(_, value)| value).collect()
    }

    /// Every node the path selects, with its concrete location
    pub fn locate(&self, root: &Value) -> Vec<Location> {
        self.walk(root).into_iter().map(|(location, _)| location).collect()
    }

    /// Delete every selected node, returning how many were removed
    ///
    /// The root itself is never removed.
    pub fn remove_from(&self, root: &mut Value) -> usize {
        let mut locations = self.locate(root);
        locations.sort();
        locations.dedup();

        // Deepest and highest-index first so earlier removals don't shift later ones
        locations
            .iter()
            .rev()
            .filter(|location| remove_at(root, location))
            .count()
    }

    fn walk<'a>(&self, root: &'a Value) -> Vec<(Location, &'a Value)> {
        let mut current = vec![(Location::new(), root)];

        for segment in &self.segments {
            let mut next = Vec::new();
            for (location, node) in current {
                match segment {
                    Segment::Key(key) => {
                        if let Some(child) = node.as_object().and_then(|map| map.get(key)) {
                            next.push((extend(&location, Step::Key(key.clone())), child));
                        }
                    }
                    Segment::Index(index) => {
                        if let Some(child) = node.as_array().and_then(|items| items.get(*index)) {
                            next.push((extend(&location, Step::Index(*index)), child));
                        }
                    }
                    Segment::Wildcard => push_children(&location, node, &mut next),
                    Segment::Descendant(name) => {
                        collect_descendants(&location, node, name.as_deref(), &mut next)
                    }
                }
            }
            current = next;
        }

        current
    }
}

fn extend(location: &Location, step: Step) -> Location {
    let mut extended = location.clone();
    extended.push(step);
    extended
}

fn push_children<'a>(location: &Location, node: &'a Value, out: &mut Vec<(Location, &'a Value)>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                out.push((extend(location, Step::Key(key.clone())), child));
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                out.push((extend(location, Step::Index(index)), child));
            }
        }
        _ => {}
    }
}

fn collect_descendants<'a>(
    location: &Location,
    node: &'a Value,
    name: Option<&str>,
    out: &mut Vec<(Location, &'a Value)>,
) {
    if let Some(name) = name {
        if let Some(child) = node.as_object().and_then(|map| map.get(name)) {
            out.push((extend(location, Step::Key(name.to_string())), child));
        }
    }

    let mut children = Vec::new();
    push_children(location, node, &mut children);
    for (child_location, child) in children {
        if name.is_none() {
            out.push((child_location.clone(), child));
        }
        collect_descendants(&child_location, child, name, out);
    }
}

fn remove_at(root: &mut Value, location: &[Step]) -> bool {
    let Some((last, parents)) = location.split_last() else {
        return false;
    };

    let mut node = root;
    for step in parents {
        let child = match (step, node) {
            (Step::Key(key), Value::Object(map)) => map.get_mut(key),
            (Step::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        };
        match child {
            Some(child) => node = child,
            None => return false,
        }
    }

    match (last, node) {
        (Step::Key(key), Value::Object(map)) => map.shift_remove(key).is_some(),
        (Step::Index(index), Value::Array(items)) if *index < items.len() => {
            items.remove(*index);
            true
        }
        _ => false,
    }
}

/// Path text for a member of `parent`
pub fn child_key(parent: &str, key: &str) -> String {
    let is_plain = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '$')
        && !key.starts_with(|c: char| c.is_ascii_digit() || c == '-');
    if is_plain {
        format!("{parent}.{key}")
    } else {
        let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
        format!("{parent}['{escaped}']")
    }
}

/// Path text for an element of `parent`
pub fn child_index(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(expression: &str) -> Self {
        Self {
            chars: expression.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> PathSyntaxError {
        PathSyntaxError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<JsonPath, PathSyntaxError> {
        let mut segments = Vec::new();

        match self.peek() {
            Some('$') => self.pos += 1,
            Some(c) if c != '.' && c != '[' => segments.push(Segment::Key(self.name()?)),
            _ => {}
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    if self.peek() == Some('.') {
                        self.pos += 1;
                        segments.push(self.descendant()?);
                    } else if self.peek() == Some('*') {
                        self.pos += 1;
                        segments.push(Segment::Wildcard);
                    } else {
                        segments.push(Segment::Key(self.name()?));
                    }
                }
                '[' => segments.push(self.bracket()?),
                other => return Err(self.error(format!("unexpected '{other}'"))),
            }
        }

        Ok(JsonPath { segments })
    }

    fn descendant(&mut self) -> Result<Segment, PathSyntaxError> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok(Segment::Descendant(None))
            }
            Some('[') => match self.bracket()? {
                Segment::Key(key) => Ok(Segment::Descendant(Some(key))),
                _ => Err(self.error("expected a quoted name after '..'")),
            },
            _ => Ok(Segment::Descendant(Some(self.name()?))),
        }
    }

    fn name(&mut self) -> Result<String, PathSyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '.' | '[' | ']' | '\'' | '"') || c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a field name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn bracket(&mut self) -> Result<Segment, PathSyntaxError> {
        // Consume '['
        self.pos += 1;
        self.skip_whitespace();

        let segment = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Segment::Wildcard
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                Segment::Key(self.quoted(quote)?)
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let index = digits
                    .parse()
                    .map_err(|_| self.error(format!("index '{digits}' is too large")))?;
                Segment::Index(index)
            }
            Some(other) => return Err(self.error(format!("unexpected '{other}' in brackets"))),
            None => return Err(self.error("unclosed '['")),
        };

        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(segment)
    }

    fn quoted(&mut self, quote: char) -> Result<String, PathSyntaxError> {
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated quoted name")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => text.push(c),
                        None => return Err(self.error("unterminated quoted name")),
                    }
                }
                Some(c) if c == quote => break,
                Some(c) => text.push(c),
            }
            self.pos += 1;
        }
        // Closing quote
        self.pos += 1;
        Ok(text)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }
}
