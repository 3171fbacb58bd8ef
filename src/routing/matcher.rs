//! Wildcard path patterns.
//!
//! # Responsibilities
//! - Compile a route path containing `*` markers into a token program
//! - Match a concrete request path against a compiled program
//! - Capture wildcard-matched substrings, indexed left to right
//!
//! # Pattern Syntax
//! - `*` matches zero or more characters within one path segment (no `/`)
//! - `**` (or any longer run of `*`) matches zero or more characters across segments
//! - `\` escapes the next character, so `\*` is a literal star
//!
//! # Design Decisions
//! - Matching is case-sensitive and deterministic
//! - No backtracking: a `*` stops at the first occurrence of the next literal,
//!   a `**` at the last occurrence; the final literal of a pattern must end the path
//! - Capture 0 is always the full candidate path
//! - Every wildcard records exactly one group, possibly empty

use std::fmt;

/// Marker character for wildcards.
pub const WILDCARD: char = '*';

const ESCAPE: char = '\\';
const SEPARATOR: char = '/';

/// Compiles and matches path patterns.
pub trait PathMatcher: Send + Sync + fmt::Debug {
    /// Returns true if the pattern contains no wildcard marker.
    fn is_literal(&self, pattern: &str) -> bool {
        self.literal_text(pattern).is_some()
    }

    /// The path a wildcard-free pattern matches, or `None` for wildcard patterns.
    fn literal_text(&self, pattern: &str) -> Option<String> {
        (!pattern.contains(WILDCARD)).then(|| pattern.to_string())
    }

    /// Translate a pattern into a matchable program. Purely structural.
    fn compile(&self, pattern: &str) -> CompiledPattern;

    /// Match `candidate` against `pattern`, returning captures on success.
    fn matches(&self, pattern: &CompiledPattern, candidate: &str) -> Option<Captures>;
}

/// One instruction of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    /// `*`: stays within a segment.
    Segment,
    /// `**`: may span separators.
    Path,
}

/// A compiled wildcard pattern. Immutable and safe to share across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    source: String,
    tokens: Vec<Token>,
}

impl CompiledPattern {
    /// The pattern this program was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of wildcard tokens in the program.
    pub fn wildcard_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| !matches!(t, Token::Literal(_)))
            .count()
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => write!(f, "[{}]", text)?,
                Token::Segment => f.write_str("<*>")?,
                Token::Path => f.write_str("<**>")?,
            }
        }
        Ok(())
    }
}

/// Groups captured by a successful match.
///
/// Index 0 holds the full candidate path; wildcard captures follow in
/// left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<String>,
}

impl Captures {
    fn new(full: &str) -> Self {
        Self {
            groups: vec![full.to_string()],
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).map(String::as_str)
    }

    /// Number of groups, including the full path at index 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns true if at least one wildcard group was captured.
    pub fn has_wildcard_groups(&self) -> bool {
        self.groups.len() > 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.groups.iter().map(String::as_str).enumerate()
    }
}

/// The default `*`/`**` matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardMatcher;

impl WildcardMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl PathMatcher for WildcardMatcher {
    fn literal_text(&self, pattern: &str) -> Option<String> {
        match self.compile(pattern).tokens.as_slice() {
            [] => Some(String::new()),
            [Token::Literal(text)] => Some(text.clone()),
            _ => None,
        }
    }

    fn compile(&self, pattern: &str) -> CompiledPattern {
        let mut tokens: Vec<Token> = Vec::new();
        let mut escaped = false;

        for ch in pattern.chars() {
            if escaped {
                push_literal(&mut tokens, ch);
                escaped = false;
                continue;
            }
            match ch {
                ESCAPE => escaped = true,
                WILDCARD => match tokens.last_mut() {
                    // Adjacent stars collapse into a single multi-segment wildcard
                    Some(last) if matches!(last, Token::Segment | Token::Path) => *last = Token::Path,
                    _ => tokens.push(Token::Segment),
                },
                _ => push_literal(&mut tokens, ch),
            }
        }
        if escaped {
            push_literal(&mut tokens, ESCAPE);
        }

        CompiledPattern {
            source: pattern.to_string(),
            tokens,
        }
    }

    fn matches(&self, pattern: &CompiledPattern, candidate: &str) -> Option<Captures> {
        let mut captures = Captures::new(candidate);
        let tokens = pattern.tokens.as_slice();
        let mut cursor = 0;
        let mut index = 0;

        // Leading literal is anchored at the start of the path
        if let Some(Token::Literal(text)) = tokens.first() {
            if !candidate.starts_with(text.as_str()) {
                return None;
            }
            cursor = text.len();
            index = 1;
        }

        if index == tokens.len() {
            return (cursor == candidate.len()).then_some(captures);
        }

        while index < tokens.len() {
            let wildcard = &tokens[index];
            let anchor = match tokens.get(index + 1) {
                Some(Token::Literal(text)) => Some(text.as_str()),
                Some(_) => return None,
                None => None,
            };

            let rest = &candidate[cursor..];
            let Some(anchor) = anchor else {
                // Trailing wildcard consumes the remainder
                if *wildcard == Token::Segment && rest.contains(SEPARATOR) {
                    return None;
                }
                captures.groups.push(rest.to_string());
                return Some(captures);
            };

            let is_last = index + 2 == tokens.len();
            let offset = if is_last {
                if !rest.ends_with(anchor) {
                    return None;
                }
                rest.len() - anchor.len()
            } else if *wildcard == Token::Path {
                rest.rfind(anchor)?
            } else {
                rest.find(anchor)?
            };

            let captured = &rest[..offset];
            if *wildcard == Token::Segment && captured.contains(SEPARATOR) {
                return None;
            }
            captures.groups.push(captured.to_string());
            cursor += offset + anchor.len();
            index += 2;
        }

        (cursor == candidate.len()).then_some(captures)
    }
}

fn push_literal(tokens: &mut Vec<Token>, ch: char) {
    match tokens.last_mut() {
        Some(Token::Literal(text)) => text.push(ch),
        _ => tokens.push(Token::Literal(ch.to_string())),
    }
}
