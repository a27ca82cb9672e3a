//! Save formulas such as `WIS vs DC 15` or `DEX vs 10 + INT`.

use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::abilities::{AbilityModifiers, AbilityType};

static ABILITY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(str|dex|con|int|wis|cha)\b").unwrap());
static VERSUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bvs\.?").unwrap());
static DC_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bdc\b").unwrap());

pub const DEFAULT_SAVE_DC: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DcTerm {
    Number(i32),
    Ability(AbilityType),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SaveExpression {
    pub ability: AbilityType,
    pub terms: Vec<DcTerm>,
}

impl SaveExpression {
    /// `None` means no save is configured.
    pub fn parse(text: &str) -> Option<Self> {
        Self::parse_with_default(text, DEFAULT_SAVE_DC)
    }

    /// Like [`SaveExpression::parse`], falling back to `default_dc` when the
    /// right-hand side is missing or yields no usable term.
    pub fn parse_with_default(text: &str, default_dc: i32) -> Option<Self> {
        let ability = ABILITY_TOKEN
            .find(text)
            .and_then(|token| AbilityType::from_ability_str(token.as_str()))?;

        let rhs = VERSUS
            .splitn(text, 2)
            .nth(1)
            .map(str::trim)
            .unwrap_or_default();
        let rhs = DC_WORD.replace(rhs, "");

        let mut terms: Vec<DcTerm> = rhs
            .split('+')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(parse_dc_term)
            .collect();

        if terms.is_empty() {
            terms.push(DcTerm::Number(default_dc));
        }

        Some(Self { ability, terms })
    }
}

impl fmt::Display for SaveExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs ", self.ability)?;
        for (index, term) in self.terms.iter().enumerate() {
            if index > 0 {
                f.write_str(" + ")?;
            }
            match term {
                DcTerm::Number(value) => write!(f, "{value}")?,
                DcTerm::Ability(ability) => write!(f, "{ability}")?,
            }
        }
        Ok(())
    }
}

/// Sums literal terms and resolves ability terms against `modifiers`,
/// saturating at the bounds of `i32`.
pub fn compute_dc(modifiers: Option<&AbilityModifiers>, expression: &SaveExpression) -> i32 {
    expression
        .terms
        .iter()
        .map(|term| match term {
            DcTerm::Number(value) => *value,
            DcTerm::Ability(ability) => match modifiers {
                Some(modifiers) => i32::from(*modifiers.get(*ability)),
                None => {
                    tracing::warn!(%ability, "no modifier table for save DC term, using 0");
                    0
                }
            },
        })
        .fold(0i32, i32::saturating_add)
}

fn parse_dc_term(token: &str) -> Option<DcTerm> {
    if let Some(ability) = AbilityType::from_ability_str(token).filter(|_| token.len() == 3) {
        return Some(DcTerm::Ability(ability));
    }

    leading_integer(token).map(DcTerm::Number)
}

/// Parses the integer prefix of `token`, so `15ft` reads as 15.
fn leading_integer(token: &str) -> Option<i32> {
    let digits_end = token
        .char_indices()
        .find(|(index, c)| !(c.is_ascii_digit() || (*index == 0 && (*c == '-' || *c == '+'))))
        .map(|(index, _)| index)
        .unwrap_or(token.len());

    token[..digits_end].parse().ok()
}
