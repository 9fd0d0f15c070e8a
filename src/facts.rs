//! Logical facts exchanged with the solver.
//!
//! A fact is a predicate name applied to integer or string terms, rendered
//! in the solver's text syntax as `name(1,"text")`. Facts are totally
//! ordered so a [`FactSet`] always iterates, renders and hashes the same
//! way for the same content.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::precision::PrecisionCodec;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Int(i64),
    Str(String),
}

impl Term {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(value) => Some(*value),
            Term::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Term::Str(value) => Some(value.as_str()),
            Term::Int(_) => None,
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::Str(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::Str(value)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Int(value) => write!(f, "{}", value),
            Term::Str(value) => {
                f.write_str("\"")?;
                for c in value.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fact {
    pub name: String,
    pub args: Vec<Term>,
}

impl Fact {
    pub fn new(name: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn is(&self, name: &str, arity: usize) -> bool {
        self.name == name && self.args.len() == arity
    }

    pub fn int(&self, index: usize) -> Option<i64> {
        self.args.get(index).and_then(Term::as_int)
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Term::as_str)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactParseError {
    #[error("empty fact")]
    Empty,

    #[error("invalid predicate name at offset {0}")]
    Name(usize),

    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),

    #[error("invalid term at offset {0}")]
    Term(usize),

    #[error("unexpected trailing input at offset {0}")]
    Trailing(usize),
}

impl FromStr for Fact {
    type Err = FactParseError;

    /// Parses `name`, `name(args)`, with or without a trailing period.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix('.').unwrap_or(s).trim_end();
        if s.is_empty() {
            return Err(FactParseError::Empty);
        }
        let chars: Vec<char> = s.chars().collect();
        let mut pos = 0;

        while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
            pos += 1;
        }
        let name: String = chars[..pos].iter().collect();
        if !is_predicate_name(&name) {
            return Err(FactParseError::Name(0));
        }
        if pos == chars.len() {
            return Ok(Fact::new(name, Vec::new()));
        }
        if chars[pos] != '(' {
            return Err(FactParseError::Name(pos));
        }
        pos += 1;

        let mut args = Vec::new();
        loop {
            let (term, next) = parse_term(&chars, pos)?;
            args.push(term);
            pos = next;
            match chars.get(pos) {
                Some(',') => pos += 1,
                Some(')') => {
                    pos += 1;
                    break;
                }
                _ => return Err(FactParseError::Term(pos)),
            }
        }
        if pos != chars.len() {
            return Err(FactParseError::Trailing(pos));
        }
        Ok(Fact::new(name, args))
    }
}

/// Whether `name` can be written as a predicate: a lowercase letter or `_`
/// followed by letters, digits and `_`.
pub fn is_predicate_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn parse_term(chars: &[char], start: usize) -> Result<(Term, usize), FactParseError> {
    let mut pos = start;
    match chars.get(pos) {
        Some('"') => {
            pos += 1;
            let mut value = String::new();
            loop {
                match chars.get(pos) {
                    None => return Err(FactParseError::UnterminatedString(start)),
                    Some('"') => return Ok((Term::Str(value), pos + 1)),
                    Some('\\') => {
                        match chars.get(pos + 1) {
                            Some('n') => value.push('\n'),
                            Some(&c) => value.push(c),
                            None => return Err(FactParseError::UnterminatedString(start)),
                        }
                        pos += 2;
                    }
                    Some(&c) => {
                        value.push(c);
                        pos += 1;
                    }
                }
            }
        }
        Some(_) => {
            if chars.get(pos) == Some(&'-') {
                pos += 1;
            }
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            text.parse::<i64>()
                .map(|value| (Term::Int(value), pos))
                .map_err(|_| FactParseError::Term(start))
        }
        None => Err(FactParseError::Term(start)),
    }
}

/// Order-independent, deduplicated collection of facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    facts: BTreeSet<Fact>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fact: Fact) -> bool {
        self.facts.insert(fact)
    }

    pub fn extend(&mut self, facts: impl IntoIterator<Item = Fact>) {
        self.facts.extend(facts);
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    /// Iterates in canonical (sorted) order.
    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, Fact> {
        self.facts.iter()
    }

    pub fn named<'a>(&'a self, name: &'a str, arity: usize) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.iter().filter(move |fact| fact.is(name, arity))
    }

    /// Canonical text: one fact per line, each terminated by a period.
    pub fn to_program(&self) -> String {
        let mut out = String::new();
        for fact in &self.facts {
            out.push_str(&fact.to_string());
            out.push_str(".\n");
        }
        out
    }

    /// Parses text produced by [`to_program`](Self::to_program).
    ///
    /// Blank lines and `%` comments are ignored.
    pub fn parse_program(text: &str) -> Result<Self, FactParseError> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('%'))
            .map(Fact::from_str)
            .collect()
    }
}

impl FromIterator<Fact> for FactSet {
    fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = &'a Fact;
    type IntoIter = std::collections::btree_set::Iter<'a, Fact>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}

// Predicate names shared by the compiler, the solver rules and extraction.
pub const ROUTE: &str = "route";
pub const ROUTE_DISTANCE: &str = "routeDistance";
pub const ROUTE_PAIR_DISTANCE: &str = "routePairDistance";
pub const EXCHANGE: &str = "exchange";
pub const EXCHANGE_PAIR_DISTANCE: &str = "exchangePairDistance";
pub const ASCENT: &str = "ascent";
pub const DESCENT: &str = "descent";
pub const LAST_RUN: &str = "lastRun";
pub const DISTANCE_PRECISION: &str = "distancePrecision";
pub const DURATION_PRECISION: &str = "durationPrecision";
pub const SLOT_ASSIGNMENT: &str = "slotAssignment";
pub const DAY_DIST_RANGE: &str = "dayDistRange";
pub const OBJECTIVE: &str = "objective";

pub fn route(id: &str, name: &str, start: &str, end: &str) -> Fact {
    Fact::new(ROUTE, vec![id.into(), name.into(), start.into(), end.into()])
}

pub fn route_distance(id: &str, miles: f64, codec: &PrecisionCodec) -> Fact {
    Fact::new(ROUTE_DISTANCE, vec![id.into(), codec.encode(miles).into()])
}

pub fn route_pair_distance(a: &str, b: &str, encoded: i64) -> Fact {
    Fact::new(ROUTE_PAIR_DISTANCE, vec![a.into(), b.into(), encoded.into()])
}

pub fn exchange(id: &str, name: &str) -> Fact {
    Fact::new(EXCHANGE, vec![id.into(), name.into()])
}

pub fn exchange_pair_distance(a: &str, b: &str, encoded: i64) -> Fact {
    Fact::new(EXCHANGE_PAIR_DISTANCE, vec![a.into(), b.into(), encoded.into()])
}

pub fn ascent(id: &str, feet: u32) -> Fact {
    Fact::new(ASCENT, vec![id.into(), i64::from(feet).into()])
}

pub fn descent(id: &str, feet: u32) -> Fact {
    Fact::new(DESCENT, vec![id.into(), i64::from(feet).into()])
}

pub fn last_run(id: &str, rank: i64) -> Fact {
    Fact::new(LAST_RUN, vec![id.into(), rank.into()])
}

pub fn distance_precision(precision: i32) -> Fact {
    Fact::new(DISTANCE_PRECISION, vec![i64::from(precision).into()])
}

pub fn duration_precision(precision: i32) -> Fact {
    Fact::new(DURATION_PRECISION, vec![i64::from(precision).into()])
}

pub fn slot_assignment(day: i64, slot: i64, route_id: &str) -> Fact {
    Fact::new(SLOT_ASSIGNMENT, vec![day.into(), slot.into(), route_id.into()])
}

pub fn day_dist_range(day: i64, lower: f64, upper: f64, codec: &PrecisionCodec) -> Fact {
    Fact::new(
        DAY_DIST_RANGE,
        vec![day.into(), codec.encode(lower).into(), codec.encode(upper).into()],
    )
}

pub fn objective(index: i64, name: &str) -> Fact {
    Fact::new(OBJECTIVE, vec![index.into(), name.into()])
}

/// Generic `tag(entity, value)` fact for an exploded attribute.
pub fn attribute(tag: &str, entity: &str, value: Term) -> Fact {
    Fact::new(tag, vec![entity.into(), value])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fact() {
        let fact = route("r1", "Green \"Lake\"", "x1", "x2");
        assert_eq!(fact.to_string(), r#"route("r1","Green \"Lake\"","x1","x2")"#);
        assert_eq!(distance_precision(2).to_string(), "distancePrecision(2)");
        assert_eq!(Fact::new("done", vec![]).to_string(), "done");
    }

    #[test]
    fn test_parse_fact() {
        let fact: Fact = r#"slotAssignment(1,-2,"r\"1")."#.parse().unwrap();
        assert_eq!(fact.name, "slotAssignment");
        assert_eq!(fact.int(0), Some(1));
        assert_eq!(fact.int(1), Some(-2));
        assert_eq!(fact.text(2), Some("r\"1"));
    }

    #[test]
    fn test_parse_atom_without_args() {
        let fact: Fact = "done.".parse().unwrap();
        assert!(fact.is("done", 0));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Fact>(), Err(FactParseError::Empty));
        assert_eq!("Route(1)".parse::<Fact>(), Err(FactParseError::Name(0)));
        assert!(matches!(
            r#"route("abc)"#.parse::<Fact>(),
            Err(FactParseError::UnterminatedString(_))
        ));
        assert!(matches!("route(1,x)".parse::<Fact>(), Err(FactParseError::Term(_))));
        assert!(matches!("route(1) z".parse::<Fact>(), Err(FactParseError::Trailing(_))));
    }

    #[test]
    fn test_fact_set_is_order_independent() {
        let a: FactSet = vec![exchange("b", "B"), exchange("a", "A")].into_iter().collect();
        let b: FactSet = vec![exchange("a", "A"), exchange("b", "B"), exchange("a", "A")]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_program(), b.to_program());
    }

    #[test]
    fn test_program_parses_back() {
        let facts: FactSet = vec![
            route("r1", "Leg\n1", "a", "b"),
            route_distance("r1", 3.14159, &PrecisionCodec::new(2)),
            last_run("r1", -1),
        ]
        .into_iter()
        .collect();
        let text = facts.to_program();
        assert!(text.lines().all(|line| line.ends_with('.')));
        let parsed = FactSet::parse_program(&format!("% header\n\n{}", text)).unwrap();
        assert_eq!(parsed, facts);
    }

    #[test]
    fn test_named_filters_by_arity() {
        let facts: FactSet = vec![exchange("a", "A"), Fact::new(EXCHANGE, vec!["b".into()])]
            .into_iter()
            .collect();
        assert_eq!(facts.named(EXCHANGE, 2).count(), 1);
    }
}
