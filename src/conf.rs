use std::fmt::Display;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::expr::Expression;
use crate::utils::Tree;

/// Size measure used to bound rewrites.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub enum Measure {
    /// Number of operations, see [`Expression::count_ops`].
    #[default]
    CountOps,
    /// Number of nodes.
    NodeCount,
    Depth,
    #[serde(skip)]
    Custom(fn(&Expression) -> f64),
}

impl Measure {
    #[must_use]
    pub fn of(&self, expr: &Expression) -> f64 {
        match self {
            Measure::CountOps => expr.count_ops() as f64,
            Measure::NodeCount => expr.size() as f64,
            Measure::Depth => expr.depth() as f64,
            Measure::Custom(f) => f(expr),
        }
    }
}

/// Settings of [`Expression::simplify_with`].
///
/// A local rewrite is kept only if `measure(new) <= ratio * measure(old)`.
#[derive(Clone, Debug, Serialize, Deserialize, Builder)]
pub struct SimplifyConf {
    #[builder(default = 1.7)]
    pub ratio: f64,
    #[builder(default)]
    pub measure: Measure,
}

impl Default for SimplifyConf {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SimplifyConf {
    /// Accepts every rewrite no matter how much it grows the tree.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::builder().ratio(f64::INFINITY).build()
    }

    #[must_use]
    pub fn accepts(&self, before: &Expression, after: &Expression) -> bool {
        self.measure.of(after) <= self.ratio * self.measure.of(before)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl Display for OptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptLevel::None => write!(f, "none"),
            OptLevel::Speed => write!(f, "speed"),
            OptLevel::SpeedAndSize => write!(f, "speed_and_size"),
        }
    }
}

impl FromStr for OptLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => Ok(Self::None),
            "speed" => Ok(Self::Speed),
            "speed_and_size" => Ok(Self::SpeedAndSize),
            _ => Err(format!("unknown optimization level {s}")),
        }
    }
}

/// Settings of the Cranelift backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Builder, Default)]
pub struct JitConf {
    #[builder(default)]
    pub opt_level: OptLevel,
    #[builder(default = false)]
    pub verify: bool,
}
