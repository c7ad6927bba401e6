use crate::error::ConditionFault;
use std::str::FromStr;
use vitalmon_common::types::{Indicator, MeasurementSnapshot, Reading};

/// Tolerance used by [`Comparator::Equal`] on decimal indicators.
pub const EQUAL_EPSILON: f64 = 1e-6;

/// Operator name as written in a rule definition, before thresholds are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Equal,
    OutsideRange,
    InsideRange,
}

impl Operator {
    pub fn is_range(&self) -> bool {
        matches!(self, Self::OutsideRange | Self::InsideRange)
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater_than" | "gt" | ">" => Ok(Self::GreaterThan),
            "greater_equal" | "gte" | ">=" => Ok(Self::GreaterEqual),
            "less_than" | "lt" | "<" => Ok(Self::LessThan),
            "less_equal" | "lte" | "<=" => Ok(Self::LessEqual),
            "equal" | "eq" | "==" => Ok(Self::Equal),
            "outside_range" | "outside" => Ok(Self::OutsideRange),
            "inside_range" | "inside" | "between" => Ok(Self::InsideRange),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::GreaterEqual => write!(f, "greater_equal"),
            Self::LessThan => write!(f, "less_than"),
            Self::LessEqual => write!(f, "less_equal"),
            Self::Equal => write!(f, "equal"),
            Self::OutsideRange => write!(f, "outside_range"),
            Self::InsideRange => write!(f, "inside_range"),
        }
    }
}

/// A comparison with its threshold(s) attached.
///
/// Range bounds are inclusive on the inside: `InsideRange` matches
/// `low <= v <= high`, `OutsideRange` matches `v < low || v > high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparator {
    GreaterThan(f64),
    GreaterEqual(f64),
    LessThan(f64),
    LessEqual(f64),
    Equal(f64),
    OutsideRange { low: f64, high: f64 },
    InsideRange { low: f64, high: f64 },
}

impl Comparator {
    /// `decimal` selects epsilon equality for [`Comparator::Equal`].
    pub fn check(&self, value: f64, decimal: bool) -> bool {
        match *self {
            Self::GreaterThan(t) => value > t,
            Self::GreaterEqual(t) => value >= t,
            Self::LessThan(t) => value < t,
            Self::LessEqual(t) => value <= t,
            Self::Equal(t) if decimal => (value - t).abs() <= EQUAL_EPSILON,
            Self::Equal(t) => value == t,
            Self::OutsideRange { low, high } => value < low || value > high,
            Self::InsideRange { low, high } => low <= value && value <= high,
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            Self::GreaterThan(_) => Operator::GreaterThan,
            Self::GreaterEqual(_) => Operator::GreaterEqual,
            Self::LessThan(_) => Operator::LessThan,
            Self::LessEqual(_) => Operator::LessEqual,
            Self::Equal(_) => Operator::Equal,
            Self::OutsideRange { .. } => Operator::OutsideRange,
            Self::InsideRange { .. } => Operator::InsideRange,
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan(t) => write!(f, "> {t}"),
            Self::GreaterEqual(t) => write!(f, ">= {t}"),
            Self::LessThan(t) => write!(f, "< {t}"),
            Self::LessEqual(t) => write!(f, "<= {t}"),
            Self::Equal(t) => write!(f, "= {t}"),
            Self::OutsideRange { low, high } => write!(f, "outside [{low}, {high}]"),
            Self::InsideRange { low, high } => write!(f, "inside [{low}, {high}]"),
        }
    }
}

/// A single threshold test over one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub indicator: Indicator,
    pub comparator: Comparator,
}

impl Condition {
    pub fn new(indicator: Indicator, comparator: Comparator) -> Self {
        Self {
            indicator,
            comparator,
        }
    }

    /// Returns the matching reading, `None` on no match or missing data.
    pub fn check(&self, snapshot: &MeasurementSnapshot) -> Result<Option<Reading>, ConditionFault> {
        let Some(reading) = snapshot.reading(self.indicator) else {
            return Ok(None);
        };
        if !reading.is_finite() {
            return Err(ConditionFault::NonFiniteReading {
                indicator: self.indicator,
                value: reading.as_f64(),
            });
        }
        let matched = self
            .comparator
            .check(reading.as_f64(), self.indicator.is_decimal());
        Ok(matched.then_some(reading))
    }

    /// `false` whenever the indicator is absent, regardless of comparator.
    pub fn matches(&self, snapshot: &MeasurementSnapshot) -> bool {
        matches!(self.check(snapshot), Ok(Some(_)))
    }

    /// Human-readable threshold, e.g. `systolic_pressure > 140`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.indicator, self.comparator)
    }
}
