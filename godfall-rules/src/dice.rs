//! Dice formulas
//!
//! Parses and evaluates formulas like `1d20 + 3`, `2d20kh1 + @dex` or
//! `2d6 - 1 + str`. Terms are dice (`NdM`, optionally `khK` / `klK`),
//! integer literals and named bindings, joined by `+` and `-`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use rand::{Rng, rngs::ThreadRng};
use thiserror::Error;

/// Named numeric values a formula may reference.
pub type Bindings = BTreeMap<String, i32>;

const MAX_DICE_PER_TERM: u32 = 1000;

/// Source of individual die results.
pub trait DieSource {
    /// A uniformly distributed result in `[1, faces]`.
    fn roll_die(&mut self, faces: u16) -> u16;
}

/// [`DieSource`] backed by a `rand` generator.
pub struct RandomDice<R> {
    rng: R,
}

impl RandomDice<ThreadRng> {
    pub fn thread() -> Self {
        Self { rng: rand::rng() }
    }
}

impl<R: Rng> RandomDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DieSource for RandomDice<R> {
    fn roll_die(&mut self, faces: u16) -> u16 {
        self.rng.random_range(1..=faces.max(1))
    }
}

/// Replays a fixed list of results, cycling when exhausted. Results are
/// clamped into the rolled die's range.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    results: Vec<u16>,
    position: usize,
}

impl ScriptedDice {
    pub fn new(results: impl Into<Vec<u16>>) -> Self {
        Self {
            results: results.into(),
            position: 0,
        }
    }

    pub fn rolled(&self) -> usize {
        self.position
    }
}

impl DieSource for ScriptedDice {
    fn roll_die(&mut self, faces: u16) -> u16 {
        let result = match self.results.is_empty() {
            true => 1,
            false => self.results[self.position % self.results.len()],
        };
        self.position += 1;

        result.clamp(1, faces.max(1))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Empty formula")]
    Empty,

    #[error("Invalid term '{0}'")]
    InvalidTerm(String),

    #[error("Invalid dice '{0}': count and faces must be at least 1")]
    InvalidDice(String),

    #[error("Invalid keep modifier in '{0}'")]
    InvalidKeep(String),

    #[error("Too many dice in '{0}'")]
    TooManyDice(String),

    #[error("Unknown variable '{0}'")]
    UnboundVariable(String),

    #[error("Result of '{0}' is out of range")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn apply(self, value: i32) -> Option<i32> {
        match self {
            Sign::Plus => Some(value),
            Sign::Minus => value.checked_neg(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Keep {
    Highest(u32),
    Lowest(u32),
}

impl Keep {
    fn count(self) -> u32 {
        match self {
            Keep::Highest(count) | Keep::Lowest(count) => count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct DiceTerm {
    pub count: u32,
    pub faces: u16,
    pub keep: Option<Keep>,
}

impl DiceTerm {
    fn kept_dice(&self) -> u32 {
        self.keep.map(Keep::count).unwrap_or(self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Term {
    Dice(DiceTerm),
    Constant(i32),
    Binding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FormulaTerm {
    pub sign: Sign,
    pub term: Term,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct DiceFormula {
    pub terms: Vec<FormulaTerm>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct DieResult {
    pub value: u16,
    pub kept: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct DiceTermResult {
    pub term: DiceTerm,
    pub results: Vec<DieResult>,
}

impl DiceTermResult {
    pub fn subtotal(&self) -> i32 {
        self.results
            .iter()
            .filter(|result| result.kept)
            .map(|result| i32::from(result.value))
            .sum()
    }

    /// The face of the single kept die, if exactly one die counts.
    pub fn natural(&self) -> Option<u16> {
        let mut kept = self.results.iter().filter(|result| result.kept);
        match (kept.next(), kept.next()) {
            (Some(result), None) => Some(result.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RollOutcome {
    pub formula: String,
    pub dice: Vec<DiceTermResult>,
    pub total: i32,
    /// Kept face of the first dice term.
    pub natural: Option<u16>,
    pub is_critical: bool,
    pub is_fumble: bool,
    pub target: Option<i32>,
    pub pass: Option<bool>,
}

impl RollOutcome {
    pub fn with_target(mut self, target: i32) -> Self {
        self.target = Some(target);
        self.pass = Some(self.total >= target);
        self
    }
}

impl DiceFormula {
    pub fn parse(formula: &str) -> Result<Self, FormulaError> {
        let formula = formula.trim().to_lowercase();
        if formula.is_empty() {
            return Err(FormulaError::Empty);
        }

        let mut terms = vec![];
        let mut sign = Sign::Plus;
        let mut signed = false;
        let mut current = String::new();

        for character in formula.chars() {
            match character {
                '+' | '-' => {
                    let token = current.trim();
                    if token.is_empty() {
                        // only a single leading sign may stand without a term
                        if !terms.is_empty() || signed {
                            return Err(FormulaError::InvalidTerm(formula.clone()));
                        }
                    } else {
                        terms.push(FormulaTerm {
                            sign,
                            term: parse_term(token)?,
                        });
                        current.clear();
                    }

                    signed = true;
                    sign = match character {
                        '-' => Sign::Minus,
                        _ => Sign::Plus,
                    };
                }
                _ => current.push(character),
            }
        }

        let token = current.trim();
        if token.is_empty() {
            return Err(FormulaError::InvalidTerm(formula.clone()));
        }
        terms.push(FormulaTerm {
            sign,
            term: parse_term(token)?,
        });

        Ok(Self { terms })
    }

    /// Same formula with every dice term's count (and keep count) doubled;
    /// flat terms are untouched.
    pub fn double_dice(&self) -> Self {
        let terms = self
            .terms
            .iter()
            .map(|formula_term| match &formula_term.term {
                Term::Dice(dice) => FormulaTerm {
                    sign: formula_term.sign,
                    term: Term::Dice(DiceTerm {
                        count: dice.count * 2,
                        faces: dice.faces,
                        keep: dice.keep.map(|keep| match keep {
                            Keep::Highest(count) => Keep::Highest(count * 2),
                            Keep::Lowest(count) => Keep::Lowest(count * 2),
                        }),
                    }),
                },
                _ => formula_term.clone(),
            })
            .collect();

        Self { terms }
    }

    pub fn with_constant(mut self, value: i32) -> Self {
        if value != 0 {
            self.terms.push(FormulaTerm {
                sign: if value < 0 { Sign::Minus } else { Sign::Plus },
                term: Term::Constant(value.saturating_abs()),
            });
        }
        self
    }

    pub fn evaluate(
        &self,
        bindings: &Bindings,
        dice: &mut impl DieSource,
    ) -> Result<RollOutcome, FormulaError> {
        // resolve every binding before consuming any dice
        for formula_term in &self.terms {
            if let Term::Binding(name) = &formula_term.term {
                if !bindings.contains_key(name) {
                    return Err(FormulaError::UnboundVariable(name.clone()));
                }
            }
        }

        let mut total: i32 = 0;
        let mut dice_results = vec![];

        for formula_term in &self.terms {
            let value = match &formula_term.term {
                Term::Constant(value) => *value,
                Term::Binding(name) => bindings.get(name).copied().unwrap_or_default(),
                Term::Dice(term) => {
                    let result = roll_term(term, dice);
                    let subtotal = result.subtotal();
                    dice_results.push(result);
                    subtotal
                }
            };

            total = formula_term
                .sign
                .apply(value)
                .and_then(|value| total.checked_add(value))
                .ok_or_else(|| FormulaError::Overflow(self.to_string()))?;
        }

        let primary = dice_results.first();
        let natural = primary.and_then(DiceTermResult::natural);
        let natural_d20 = primary
            .filter(|primary| primary.term.faces == 20)
            .and(natural);

        let outcome = RollOutcome {
            formula: self.to_string(),
            dice: dice_results,
            total,
            natural,
            is_critical: natural_d20 == Some(20),
            is_fumble: natural_d20 == Some(1),
            target: None,
            pass: None,
        };

        tracing::debug!(
            formula = %outcome.formula,
            total = outcome.total,
            natural = ?outcome.natural,
            "evaluated dice formula"
        );

        Ok(outcome)
    }
}

impl FromStr for DiceFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.faces)?;
        match self.keep {
            Some(Keep::Highest(count)) => write!(f, "kh{count}"),
            Some(Keep::Lowest(count)) => write!(f, "kl{count}"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, formula_term) in self.terms.iter().enumerate() {
            match (index, formula_term.sign) {
                (0, Sign::Plus) => {}
                (0, Sign::Minus) => f.write_str("-")?,
                (_, Sign::Plus) => f.write_str(" + ")?,
                (_, Sign::Minus) => f.write_str(" - ")?,
            }

            match &formula_term.term {
                Term::Dice(dice) => write!(f, "{dice}")?,
                Term::Constant(value) => write!(f, "{value}")?,
                Term::Binding(name) => write!(f, "@{name}")?,
            }
        }

        Ok(())
    }
}

/// Parses and evaluates `formula` in one step.
pub fn evaluate(
    formula: &str,
    bindings: &Bindings,
    dice: &mut impl DieSource,
) -> Result<RollOutcome, FormulaError> {
    DiceFormula::parse(formula)?.evaluate(bindings, dice)
}

fn roll_term(term: &DiceTerm, dice: &mut impl DieSource) -> DiceTermResult {
    let values: Vec<u16> = (0..term.count)
        .map(|_| dice.roll_die(term.faces))
        .collect();

    let mut order: Vec<usize> = (0..values.len()).collect();
    match term.keep {
        Some(Keep::Highest(_)) => order.sort_by(|a, b| values[*b].cmp(&values[*a])),
        Some(Keep::Lowest(_)) => order.sort_by_key(|index| values[*index]),
        None => {}
    }

    let mut kept = vec![false; values.len()];
    for index in order.into_iter().take(term.kept_dice() as usize) {
        kept[index] = true;
    }

    DiceTermResult {
        term: *term,
        results: values
            .into_iter()
            .zip(kept)
            .map(|(value, kept)| DieResult { value, kept })
            .collect(),
    }
}

fn parse_term(token: &str) -> Result<Term, FormulaError> {
    if token.chars().any(char::is_whitespace) {
        return Err(FormulaError::InvalidTerm(token.to_string()));
    }

    if let Some(name) = token.strip_prefix('@') {
        return parse_binding(name, token);
    }

    if token.chars().all(|c| c.is_ascii_digit()) {
        let value = token
            .parse()
            .map_err(|_| FormulaError::InvalidTerm(token.to_string()))?;
        return Ok(Term::Constant(value));
    }

    if let Some(d_pos) = token.find('d') {
        let count = &token[..d_pos];
        let rest = &token[d_pos + 1..];
        let is_dice = count.chars().all(|c| c.is_ascii_digit())
            && rest.starts_with(|c: char| c.is_ascii_digit());

        if is_dice {
            return parse_dice(count, rest, token).map(Term::Dice);
        }
    }

    parse_binding(token, token)
}

fn parse_binding(name: &str, token: &str) -> Result<Term, FormulaError> {
    let mut characters = name.chars();
    let valid = characters
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && characters.all(|c| c.is_ascii_alphanumeric() || c == '_');

    match valid {
        true => Ok(Term::Binding(name.to_string())),
        false => Err(FormulaError::InvalidTerm(token.to_string())),
    }
}

fn parse_dice(count: &str, rest: &str, token: &str) -> Result<DiceTerm, FormulaError> {
    let count: u32 = match count.is_empty() {
        true => 1,
        false => count
            .parse()
            .map_err(|_| FormulaError::TooManyDice(token.to_string()))?,
    };

    let faces_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let faces: u16 = rest[..faces_end]
        .parse()
        .map_err(|_| FormulaError::InvalidDice(token.to_string()))?;

    if count == 0 || faces == 0 {
        return Err(FormulaError::InvalidDice(token.to_string()));
    }

    if count > MAX_DICE_PER_TERM {
        return Err(FormulaError::TooManyDice(token.to_string()));
    }

    let suffix = &rest[faces_end..];
    let keep = if suffix.is_empty() {
        None
    } else if let Some(kept) = suffix.strip_prefix("kh") {
        Some(Keep::Highest(parse_keep_count(kept, count, token)?))
    } else if let Some(kept) = suffix.strip_prefix("kl") {
        Some(Keep::Lowest(parse_keep_count(kept, count, token)?))
    } else {
        return Err(FormulaError::InvalidTerm(token.to_string()));
    };

    Ok(DiceTerm { count, faces, keep })
}

fn parse_keep_count(kept: &str, count: u32, token: &str) -> Result<u32, FormulaError> {
    if kept.is_empty() || !kept.chars().all(|c| c.is_ascii_digit()) {
        return Err(FormulaError::InvalidKeep(token.to_string()));
    }

    match kept.parse::<u32>() {
        Ok(kept) if kept >= 1 && kept <= count => Ok(kept),
        _ => Err(FormulaError::InvalidKeep(token.to_string())),
    }
}
