//! Hyperparameter search spaces and trial assignments

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Domain of one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamRange {
    /// Uniform over [low, high].
    Float { low: f64, high: f64 },
    /// Log-uniform over [low, high]; both bounds must be positive.
    LogFloat { low: f64, high: f64 },
    /// Uniform integer over [low, high] inclusive.
    Int { low: i64, high: i64 },
    /// Uniform over a fixed set of choices.
    Choice(Vec<String>),
}

/// One sampled hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Str(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Str(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// One candidate hyperparameter assignment. Ordered by name for stable display and
/// serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    values: BTreeMap<String, ParamValue>,
}

impl TrialParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl fmt::Display for TrialParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.values {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Named collection of parameter ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    params: Vec<(String, ParamRange)>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform float parameter.
    pub fn float(mut self, name: &str, low: f64, high: f64) -> Self {
        self.params.push((name.to_string(), ParamRange::Float { low, high }));
        self
    }

    /// Add a log-uniform float parameter.
    pub fn log_float(mut self, name: &str, low: f64, high: f64) -> Self {
        self.params.push((name.to_string(), ParamRange::LogFloat { low, high }));
        self
    }

    /// Add an integer parameter with inclusive bounds.
    pub fn int(mut self, name: &str, low: i64, high: i64) -> Self {
        self.params.push((name.to_string(), ParamRange::Int { low, high }));
        self
    }

    /// Add a categorical parameter.
    pub fn choice(mut self, name: &str, choices: &[&str]) -> Self {
        self.params.push((
            name.to_string(),
            ParamRange::Choice(choices.iter().map(|c| c.to_string()).collect()),
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Draw one random assignment from the space.
    pub fn sample(&self, rng: &mut StdRng) -> TrialParams {
        let mut trial = TrialParams::new();
        for (name, range) in &self.params {
            let value = match range {
                ParamRange::Float { low, high } => ParamValue::Float(rng.gen_range(*low..=*high)),
                ParamRange::LogFloat { low, high } => {
                    let sampled = rng.gen_range(low.ln()..=high.ln());
                    ParamValue::Float(sampled.exp())
                }
                ParamRange::Int { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
                ParamRange::Choice(choices) => {
                    let idx = rng.gen_range(0..choices.len());
                    ParamValue::Str(choices[idx].clone())
                }
            };
            trial.insert(name, value);
        }
        trial
    }
}
