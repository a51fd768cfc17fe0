//! Declarative value-replacement rules.
//!
//! A [`Rule`] pairs a column with a [`Condition`] selecting the cells to
//! rewrite and a [`Fill`] describing the new value. Rule lists are plain
//! data so dataset pipelines can declare them up front and apply them with
//! [`apply_rules`] in order.

use log::debug;

use crate::{
    data::{Value, is_blank, is_valid_number},
    enrich::stats::{CentralTendency, central_tendency},
    error::Result,
    table::{Replacement, Table},
};

pub const WEEKDAYS: [&str; 7] = [
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

/// Which cells of the column a rule rewrites.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Null or empty text.
    Blank,
    /// Text exactly equal to the given value.
    Equals(String),
    /// All-digit text whose value is greater than the bound.
    DigitsAbove(i64),
    /// All-digit text whose value is less than the bound.
    DigitsBelow(i64),
    /// Any numeric value greater than the bound.
    NumberAbove(f64),
    /// Any numeric value less than the bound.
    NumberBelow(f64),
    /// Null or not parseable as a finite number.
    NotNumber,
    /// A weekday code `1` (Monday) through `7` (Sunday).
    WeekdayCode,
    Always,
}

/// Value written into the selected cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Constant(Value),
    /// Mean or median of the column's valid values, computed once before
    /// any cell is rewritten.
    CentralTendency(CentralTendency),
    /// Weekday name for a weekday code.
    WeekdayName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub column: String,
    pub condition: Condition,
    pub fill: Fill,
}

impl Rule {
    pub fn new(column: impl Into<String>, condition: Condition, fill: Fill) -> Self {
        Rule {
            column: column.into(),
            condition,
            fill,
        }
    }

    /// Blank cells become `value`.
    pub fn blank(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::new(column, Condition::Blank, Fill::Constant(value.into()))
    }

    /// Null or non-numeric cells become the column's mean or median.
    pub fn impute(column: impl Into<String>, method: CentralTendency) -> Self {
        Rule::new(column, Condition::NotNumber, Fill::CentralTendency(method))
    }
}

fn digits_value(value: Option<&Value>) -> Option<Result<i64, ()>> {
    let text = value?.as_str()?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // An all-digit string that overflows is larger than any bound.
    Some(text.parse::<i64>().map_err(|_| ()))
}

/// Zero-based weekday for a code `"1"`..`"7"` (surrounding whitespace allowed).
pub fn weekday_index(value: Option<&Value>) -> Option<usize> {
    let code = match value? {
        Value::String(s) => s.trim().parse::<usize>().ok()?,
        Value::Integer(i) => usize::try_from(*i).ok()?,
        Value::Float(_) => return None,
    };
    (1..=7).contains(&code).then(|| code - 1)
}

pub fn weekday_name(value: Option<&Value>) -> Option<&'static str> {
    weekday_index(value).map(|idx| WEEKDAYS[idx])
}

impl Condition {
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Blank => is_blank(value),
            Condition::Equals(expected) => value.and_then(Value::as_str) == Some(expected.as_str()),
            Condition::DigitsAbove(bound) => match digits_value(value) {
                Some(Ok(number)) => number > *bound,
                Some(Err(())) => true,
                None => false,
            },
            Condition::DigitsBelow(bound) => {
                matches!(digits_value(value), Some(Ok(number)) if number < *bound)
            }
            Condition::NumberAbove(bound) => value
                .and_then(Value::as_number)
                .is_some_and(|number| number > *bound),
            Condition::NumberBelow(bound) => value
                .and_then(Value::as_number)
                .is_some_and(|number| number < *bound),
            Condition::NotNumber => !is_valid_number(value),
            Condition::WeekdayCode => weekday_index(value).is_some(),
            Condition::Always => true,
        }
    }
}

/// Applies one rule; returns the number of rewritten cells.
pub fn apply_rule(table: &mut Table, rule: &Rule) -> Result<usize> {
    let replacement = match &rule.fill {
        Fill::Constant(value) => Replacement::Value(Some(value.clone())),
        Fill::CentralTendency(method) => {
            let value = central_tendency(table, &rule.column, *method)?;
            Replacement::Value(Some(Value::Float(value)))
        }
        Fill::WeekdayName => Replacement::with(|current| {
            weekday_name(current)
                .map(Value::from)
                .or_else(|| current.cloned())
        }),
    };
    let condition = &rule.condition;
    table.replace_column_values(&rule.column, |value| condition.matches(value), replacement)
}

/// Applies `rules` in order, stopping at the first failure.
pub fn apply_rules(table: &mut Table, rules: &[Rule]) -> Result<()> {
    for rule in rules {
        let replaced = apply_rule(table, rule)?;
        debug!(
            "Rule {:?} -> {:?} on '{}' replaced {replaced} value(s) in '{}'",
            rule.condition,
            rule.fill,
            rule.column,
            table.name()
        );
    }
    Ok(())
}
