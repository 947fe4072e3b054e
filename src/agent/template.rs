//! Prompt templates
//!
//! A template is parsed once into literal text and named slots. Unknown slot
//! names and unbalanced braces are rejected at parse time, so rendering can
//! never fail. `{{` and `}}` produce literal braces.

use std::fmt;
use std::str::FromStr;

use crate::core::{DuetError, Result};

/// A substitution point in a prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Name of the agent whose turn it is
    ActorName,
    /// Name of the agent that will answer next
    ReactorName,
    /// The speaking agent's instructions
    Instructions,
    /// The task under discussion
    Task,
    /// The speaking agent's response schema hint
    Schema,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::ActorName,
        Placeholder::ReactorName,
        Placeholder::Instructions,
        Placeholder::Task,
        Placeholder::Schema,
    ];

    /// Name as written between braces
    pub fn as_str(&self) -> &'static str {
        match self {
            Placeholder::ActorName => "actor_name",
            Placeholder::ReactorName => "reactor_name",
            Placeholder::Instructions => "instructions",
            Placeholder::Task => "task",
            Placeholder::Schema => "schema",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.as_str())
    }
}

impl FromStr for Placeholder {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self> {
        Placeholder::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                DuetError::template(format!(
                    "unknown placeholder {{{}}}; expected one of {}",
                    s,
                    Placeholder::ALL
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Values for every placeholder
#[derive(Debug, Clone, Copy)]
pub struct PromptBindings<'a> {
    pub actor_name: &'a str,
    pub reactor_name: &'a str,
    pub instructions: &'a str,
    pub task: &'a str,
    pub schema: &'a str,
}

impl<'a> PromptBindings<'a> {
    fn get(&self, placeholder: Placeholder) -> &'a str {
        match placeholder {
            Placeholder::ActorName => self.actor_name,
            Placeholder::ReactorName => self.reactor_name,
            Placeholder::Instructions => self.instructions,
            Placeholder::Task => self.task,
            Placeholder::Schema => self.schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template string
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(DuetError::template(format!(
                            "unclosed '{{' at byte {}",
                            pos
                        )));
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Slot(name.trim().parse()?));
                }
                '}' => {
                    return Err(DuetError::template(format!(
                        "unmatched '}}' at byte {}",
                        pos
                    )));
                }
                _ => text.push(c),
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { segments })
    }

    /// Substitute the bindings into the template
    pub fn render(&self, bindings: &PromptBindings<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(placeholder) => out.push_str(bindings.get(*placeholder)),
            }
        }
        out
    }
}

impl FromStr for PromptTemplate {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
