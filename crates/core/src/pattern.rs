use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Year,
        Component::Month,
        Component::Day,
        Component::Hour,
        Component::Minute,
        Component::Second,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Component::Year => "year",
            Component::Month => "month",
            Component::Day => "day",
            Component::Hour => "hour",
            Component::Minute => "minute",
            Component::Second => "second",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn from_letter(ch: char) -> Option<Self> {
        match ch.to_ascii_lowercase() {
            'y' => Some(Component::Year),
            'm' => Some(Component::Month),
            'd' => Some(Component::Day),
            'h' => Some(Component::Hour),
            'n' => Some(Component::Minute),
            's' => Some(Component::Second),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    Literal(String),
    /// `separator` is the character split off the preceding literal; it may be
    /// missing from a name. After the first slot it also makes the slot and
    /// everything after it optional.
    Slot {
        component: Component,
        width: usize,
        separator: Option<char>,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("パターンが空です")]
    Empty,
    #[error("パターンに日時トークンがありません (yyyy, yy, mm, dd, hh, nn, ss)")]
    NoPlaceholder,
    #[error("曖昧なトークンです: {token} (位置 {position})")]
    AmbiguousToken { token: String, position: usize },
    #[error("同じ要素が複数回指定されています: {component}")]
    DuplicateComponent { component: Component },
    #[error("照合式を生成できませんでした: {0}")]
    Build(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extraction {
    values: BTreeMap<Component, String>,
}

impl Extraction {
    pub fn get(&self, component: Component) -> Option<&str> {
        self.values.get(&component).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Component, &str)> + '_ {
        self.values.iter().map(|(c, v)| (*c, v.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(Component, S)> for Extraction {
    fn from_iter<I: IntoIterator<Item = (Component, S)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(c, v)| (c, v.into())).collect(),
        }
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (component, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{component}={value}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Matcher {
    source: String,
    tokens: Vec<PatternToken>,
    regex: Regex,
}

impl Matcher {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    /// Components in the order they appear in the pattern.
    pub fn components(&self) -> impl Iterator<Item = Component> + '_ {
        self.tokens.iter().filter_map(|token| match token {
            PatternToken::Slot { component, .. } => Some(*component),
            PatternToken::Literal(_) => None,
        })
    }

    pub fn contains(&self, component: Component) -> bool {
        self.components().any(|c| c == component)
    }

    pub fn extract(&self, file_name: &str) -> Option<Extraction> {
        let captures = self.regex.captures(file_name)?;
        let values = self
            .components()
            .filter_map(|c| captures.name(c.name()).map(|m| (c, m.as_str().to_string())))
            .collect();
        Some(Extraction { values })
    }
}

/// Compiles a token pattern such as `yyyymmdd_hhnnss` into a [`Matcher`].
///
/// Placeholder letters are read in runs: a single letter is literal text, a
/// run of exactly the token length is a placeholder, and any other run length
/// (`yyy`, `mmmm`) is rejected as ambiguous.
pub fn compile_pattern(pattern: &str) -> Result<Matcher, PatternError> {
    let tokens = tokenize_pattern(pattern)?;
    let regex = build_regex(&tokens)?;
    Ok(Matcher {
        source: pattern.to_string(),
        tokens,
        regex,
    })
}

fn tokenize_pattern(input: &str) -> Result<Vec<PatternToken>, PatternError> {
    if input.is_empty() {
        return Err(PatternError::Empty);
    }

    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut seen = BTreeSet::<Component>::new();
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        let Some(component) = Component::from_letter(ch) else {
            literal.push(ch);
            i += 1;
            continue;
        };

        let run = chars[i..]
            .iter()
            .take_while(|c| c.eq_ignore_ascii_case(&ch))
            .count();
        if run == 1 {
            literal.push(ch);
            i += 1;
            continue;
        }

        let width = slot_width(component, run).ok_or_else(|| PatternError::AmbiguousToken {
            token: chars[i..i + run].iter().collect(),
            position: i,
        })?;

        if !seen.insert(component) {
            return Err(PatternError::DuplicateComponent { component });
        }

        let separator = split_separator(&mut literal);
        if !literal.is_empty() {
            tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(PatternToken::Slot {
            component,
            width,
            separator,
        });
        i += run;
    }

    if !literal.is_empty() {
        tokens.push(PatternToken::Literal(literal));
    }

    if seen.is_empty() {
        return Err(PatternError::NoPlaceholder);
    }

    Ok(tokens)
}

fn slot_width(component: Component, run: usize) -> Option<usize> {
    match (component, run) {
        (Component::Year, 4) => Some(4),
        (_, 2) => Some(2),
        _ => None,
    }
}

fn split_separator(literal: &mut String) -> Option<char> {
    let last = literal.chars().last()?;
    if last.is_alphanumeric() {
        return None;
    }
    literal.pop();
    Some(last)
}

fn build_regex(tokens: &[PatternToken]) -> Result<Regex, PatternError> {
    let mut expr = String::from("^");
    let mut open_groups = 0usize;
    let mut first_slot = true;

    for token in tokens {
        match token {
            PatternToken::Literal(text) => expr.push_str(&regex::escape(text)),
            PatternToken::Slot {
                component,
                width,
                separator,
            } => {
                if let Some(sep) = separator {
                    // the first slot is always required
                    if !first_slot {
                        expr.push_str("(?:");
                        open_groups += 1;
                    }
                    expr.push_str(&regex::escape(&sep.to_string()));
                    expr.push('?');
                }
                first_slot = false;
                expr.push_str(&format!("(?P<{}>[0-9]{{{}}})", component.name(), width));
            }
        }
    }
    expr.push_str(&")?".repeat(open_groups));

    Regex::new(&expr).map_err(|err| PatternError::Build(err.to_string()))
}
