//! Command templates
//!
//! A template is a command line with `{name}` placeholders. `{{` and `}}`
//! stand for literal braces. Rendering substitutes a scenario's values and
//! then splits the result into an argument vector with shell quoting rules,
//! so `"a b"` stays a single argument.

use thiserror::Error;

use crate::types::Scenario;

/// Errors from parsing or rendering a command template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unmatched `{brace}` at byte {offset}")]
    UnmatchedBrace { brace: char, offset: usize },

    #[error("empty placeholder `{{}}` at byte {offset}")]
    EmptyPlaceholder { offset: usize },

    #[error("placeholder `{{{name}}}` has no value in this scenario")]
    Unresolved { name: String },

    #[error("unbalanced quoting in `{command}`")]
    Unbalanced { command: String },

    #[error("command is empty after substitution")]
    EmptyCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    segments: Vec<Segment>,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if c == '{' {
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnmatchedBrace { brace: '{', offset });
                    }
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder { offset });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => return Err(TemplateError::UnmatchedBrace { brace: '}', offset }),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Placeholder names in template order, duplicates included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute scenario values. Unused scenario keys are ignored.
    pub fn substitute(&self, scenario: &Scenario) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = scenario
                        .get(name)
                        .ok_or_else(|| TemplateError::Unresolved { name: name.clone() })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Substitute and tokenize into an argument vector.
    pub fn render(&self, scenario: &Scenario) -> Result<Vec<String>, TemplateError> {
        let command = self.substitute(scenario)?;
        let argv = shlex::split(&command).ok_or(TemplateError::Unbalanced { command })?;
        if argv.is_empty() {
            return Err(TemplateError::EmptyCommand);
        }
        Ok(argv)
    }
}

/// A concrete command for one scenario, ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Position in the flattened scenario list; becomes the record `id`.
    pub id: usize,
    pub argv: Vec<String>,
}

impl Invocation {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Arguments joined by single spaces, without re-quoting.
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}
