//! Prompt assembly: named-placeholder templates and plain-text transcripts.
//!
//! Placeholders are written `{name}` where `name` matches
//! `[A-Za-z_][A-Za-z0-9_]*`. Any other brace text (`{}`, `{ x }`, `{1a}`) is
//! literal. Substitution is a single left-to-right pass, so a variable value
//! that itself looks like a placeholder is emitted verbatim.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::chat::Turn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// A placeholder has no value in the variable map.
    #[error("missing template variable: {0}")]
    MissingVariable(String),
}

/// Movie recommendation prompt; variables: `type`, `year`, `lang`.
pub const RECOMMEND_TEMPLATE: &str = "I want to watch a {type} movie tonight with good rating, \
looking for movies around this year {year}. The language I'm looking for is {lang}. \
Suggest one specific movie and tell me the cast and length of the movie.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Parsed, immutable prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    raw: String,
    segments: Vec<Segment>,
    variables: BTreeSet<String>,
}

impl PromptTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = parse_segments(&raw);
        let variables = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.clone()),
                Segment::Literal(_) => None,
            })
            .collect();

        Self {
            raw,
            segments,
            variables,
        }
    }

    /// The built-in movie recommendation template.
    pub fn recommend() -> Self {
        Self::new(RECOMMEND_TEMPLATE)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Names of all placeholders, sorted and de-duplicated.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// Renders the template with `variables`.
    ///
    /// Extra variables are ignored.
    ///
    /// # Errors
    /// [`PromptError::MissingVariable`] naming the first missing placeholder
    /// (in sorted order).
    pub fn render(&self, variables: &HashMap<String, String>) -> Result<String, PromptError> {
        if let Some(missing) = self.variables.iter().find(|v| !variables.contains_key(*v)) {
            return Err(PromptError::MissingVariable(missing.clone()));
        }

        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(&variables[name]),
            }
        }
        Ok(out)
    }
}

/// Renders `template` with `variables`. See [`PromptTemplate::render`].
pub fn assemble(
    template: &PromptTemplate,
    variables: &HashMap<String, String>,
) -> Result<String, PromptError> {
    template.render(variables)
}

/// Flattens a conversation into one prompt string.
///
/// Each turn becomes `"<role>: <text>"`, lines are joined with `\n`, and the
/// new user line comes last:
///
/// ```
/// use ai_llm_service::{Turn, prompt::assemble_with_history};
///
/// let history = [Turn::user("hi"), Turn::assistant("hello")];
/// assert_eq!(
///     assemble_with_history("bye", &history),
///     "user: hi\nassistant: hello\nuser: bye"
/// );
/// ```
pub fn assemble_with_history(user_text: &str, history: &[Turn]) -> String {
    history
        .iter()
        .map(|t| format!("{}: {}", t.role(), t.text()))
        .chain(std::iter::once(format!("user: {user_text}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same as [`assemble_with_history`] when the new user turn is already the
/// last element of `messages`.
pub(crate) fn render_transcript(messages: &[Turn]) -> String {
    messages
        .iter()
        .map(|t| format!("{}: {}", t.role(), t.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_segments(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let name_len = match after.chars().next() {
            Some(c) if is_name_start(c) => after
                .char_indices()
                .find(|(_, c)| !is_name_char(*c))
                .map(|(i, _)| i)
                .unwrap_or(after.len()),
            _ => 0,
        };

        if name_len > 0 && after[name_len..].starts_with('}') {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(after[..name_len].to_string()));
            rest = &after[name_len + 1..];
        } else {
            literal.push('{');
            rest = after;
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_all_placeholders() {
        let t = PromptTemplate::new("{a},{b}");
        assert_eq!(t.variables().collect::<Vec<_>>(), ["a", "b"]);

        let out = assemble(&t, &vars(&[("a", "x"), ("b", "y")])).unwrap();
        assert_eq!(out, "x,y");
    }

    #[test]
    fn missing_variable_is_reported() {
        let t = PromptTemplate::new("{a},{b}");
        let err = assemble(&t, &vars(&[("a", "x")])).unwrap_err();
        assert_eq!(err, PromptError::MissingVariable("b".into()));
    }

    #[test]
    fn values_are_not_re_expanded() {
        let t = PromptTemplate::new("say {a} then {b}");
        let out = t.render(&vars(&[("a", "{b}"), ("b", "ok")])).unwrap();
        assert_eq!(out, "say {b} then ok");
    }

    #[test]
    fn non_placeholder_braces_are_literal() {
        let t = PromptTemplate::new("json {} and { a } and {1x} and {open");
        assert_eq!(t.variables().count(), 0);
        assert_eq!(t.render(&HashMap::new()).unwrap(), t.raw());
    }

    #[test]
    fn repeated_placeholder_and_unicode_literals() {
        let t = PromptTemplate::new("ñ{x}–{x}{y_1}");
        let out = t.render(&vars(&[("x", "é"), ("y_1", "!")])).unwrap();
        assert_eq!(out, "ñé–é!");
    }

    #[test]
    fn recommend_template_renders_verbatim_values() {
        let t = PromptTemplate::recommend();
        assert_eq!(t.variables().collect::<Vec<_>>(), ["lang", "type", "year"]);

        let out = t
            .render(&vars(&[("type", "comedy"), ("year", "2020"), ("lang", "English")]))
            .unwrap();
        assert!(out.contains("comedy"));
        assert!(out.contains("2020"));
        assert!(out.contains("English"));
        assert!(!out.contains('{') && !out.contains('}'));
    }

    #[test]
    fn transcript_format() {
        let history = [Turn::user("hi"), Turn::assistant("hello")];
        assert_eq!(
            assemble_with_history("bye", &history),
            "user: hi\nassistant: hello\nuser: bye"
        );
        assert_eq!(assemble_with_history("solo", &[]), "user: solo");

        let mut all = history.to_vec();
        all.push(Turn::user("bye"));
        assert_eq!(render_transcript(&all), assemble_with_history("bye", &history));
    }
}
