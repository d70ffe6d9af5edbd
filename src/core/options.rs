//! Compiler tuning options.
//!
//! Callers hand over raw strings ([`RawTuning`]); the resolver turns them into
//! validated [`TuningOptions`]. Every enumerated option has a closed set of
//! accepted tokens and anything outside it is rejected with
//! [`JuliacError::InvalidOption`] before any process is spawned.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{JuliacError, Result};

/// An option whose value comes from a closed set of tokens.
pub trait Enumerated: Sized + Copy {
    /// All accepted tokens, in display order.
    const ACCEPTED: &'static [&'static str];

    fn from_token(token: &str) -> Option<Self>;

    fn as_token(&self) -> &'static str;
}

/// Parse `value` for the option named `field`, rejecting anything outside the set.
///
/// Tokens match exactly; surrounding whitespace is not stripped.
pub fn parse_enumerated<T: Enumerated>(field: &'static str, value: &str) -> Result<T> {
    T::from_token(value).ok_or_else(|| JuliacError::InvalidOption {
        field,
        value: value.to_string(),
        expected: T::ACCEPTED.join(", "),
    })
}

/// `--compile`: JIT / ahead-of-time compilation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    Yes,
    No,
    All,
    Min,
}

impl Enumerated for CompileMode {
    const ACCEPTED: &'static [&'static str] = &["yes", "no", "all", "min"];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "yes" => Some(CompileMode::Yes),
            "no" => Some(CompileMode::No),
            "all" => Some(CompileMode::All),
            "min" => Some(CompileMode::Min),
            _ => None,
        }
    }

    fn as_token(&self) -> &'static str {
        match self {
            CompileMode::Yes => "yes",
            CompileMode::No => "no",
            CompileMode::All => "all",
            CompileMode::Min => "min",
        }
    }
}

/// `-O`: optimization level 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OptLevel(u8);

impl OptLevel {
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Enumerated for OptLevel {
    const ACCEPTED: &'static [&'static str] = &["0", "1", "2", "3"];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "0" => Some(OptLevel(0)),
            "1" => Some(OptLevel(1)),
            "2" => Some(OptLevel(2)),
            "3" => Some(OptLevel(3)),
            _ => None,
        }
    }

    fn as_token(&self) -> &'static str {
        Self::ACCEPTED[self.0 as usize]
    }
}

/// `-g`: debug info level 0 through 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DebugLevel(u8);

impl DebugLevel {
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Enumerated for DebugLevel {
    const ACCEPTED: &'static [&'static str] = &["0", "1", "2"];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "0" => Some(DebugLevel(0)),
            "1" => Some(DebugLevel(1)),
            "2" => Some(DebugLevel(2)),
            _ => None,
        }
    }

    fn as_token(&self) -> &'static str {
        Self::ACCEPTED[self.0 as usize]
    }
}

/// A yes/no switch (`--inline`, `--check-bounds`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Yes,
    No,
}

impl Enumerated for Switch {
    const ACCEPTED: &'static [&'static str] = &["yes", "no"];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "yes" => Some(Switch::Yes),
            "no" => Some(Switch::No),
            _ => None,
        }
    }

    fn as_token(&self) -> &'static str {
        match self {
            Switch::Yes => "yes",
            Switch::No => "no",
        }
    }
}

/// `--math-mode`: floating-point optimization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathMode {
    Ieee,
    Fast,
}

impl Enumerated for MathMode {
    const ACCEPTED: &'static [&'static str] = &["ieee", "fast"];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ieee" => Some(MathMode::Ieee),
            "fast" => Some(MathMode::Fast),
            _ => None,
        }
    }

    fn as_token(&self) -> &'static str {
        match self {
            MathMode::Ieee => "ieee",
            MathMode::Fast => "fast",
        }
    }
}

/// `--depwarn`: deprecation warning severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepWarn {
    Yes,
    No,
    Error,
}

impl Enumerated for DepWarn {
    const ACCEPTED: &'static [&'static str] = &["yes", "no", "error"];

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "yes" => Some(DepWarn::Yes),
            "no" => Some(DepWarn::No),
            "error" => Some(DepWarn::Error),
            _ => None,
        }
    }

    fn as_token(&self) -> &'static str {
        match self {
            DepWarn::Yes => "yes",
            DepWarn::No => "no",
            DepWarn::Error => "error",
        }
    }
}

/// A scalar option value as written in a config file.
///
/// Lets `optimize = 2` and `optimize = "2"` mean the same thing. Any TOML
/// scalar loads, so `inline = true` is rejected by validation with the
/// option's name instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

/// Unvalidated tuning options, as supplied by the CLI or a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTuning {
    pub sysimage: Option<PathBuf>,
    pub compile: Option<Scalar>,
    pub cpu_target: Option<String>,
    pub optimize: Option<Scalar>,
    pub debug: Option<Scalar>,
    pub inline: Option<Scalar>,
    pub check_bounds: Option<Scalar>,
    pub math_mode: Option<Scalar>,
    pub depwarn: Option<Scalar>,
}

impl RawTuning {
    /// Merge another set of options into this one (other takes precedence).
    pub fn merge(&mut self, other: RawTuning) {
        if other.sysimage.is_some() {
            self.sysimage = other.sysimage;
        }
        if other.compile.is_some() {
            self.compile = other.compile;
        }
        if other.cpu_target.is_some() {
            self.cpu_target = other.cpu_target;
        }
        if other.optimize.is_some() {
            self.optimize = other.optimize;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
        if other.inline.is_some() {
            self.inline = other.inline;
        }
        if other.check_bounds.is_some() {
            self.check_bounds = other.check_bounds;
        }
        if other.math_mode.is_some() {
            self.math_mode = other.math_mode;
        }
        if other.depwarn.is_some() {
            self.depwarn = other.depwarn;
        }
    }

    /// Validate every enumerated value.
    pub fn validate(&self) -> Result<TuningOptions> {
        fn field<T: Enumerated>(name: &'static str, raw: &Option<Scalar>) -> Result<Option<T>> {
            raw.as_ref()
                .map(|v| parse_enumerated(name, &v.to_string()))
                .transpose()
        }

        Ok(TuningOptions {
            sysimage: self.sysimage.clone(),
            compile: field("compile", &self.compile)?,
            cpu_target: self.cpu_target.clone(),
            optimize: field("optimize", &self.optimize)?,
            debug: field("debug", &self.debug)?,
            inline: field("inline", &self.inline)?,
            check_bounds: field("check_bounds", &self.check_bounds)?,
            math_mode: field("math_mode", &self.math_mode)?,
            depwarn: field("depwarn", &self.depwarn)?,
        })
    }
}

/// Validated tuning options. `None` leaves the runtime's default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningOptions {
    pub sysimage: Option<PathBuf>,
    pub compile: Option<CompileMode>,
    pub cpu_target: Option<String>,
    pub optimize: Option<OptLevel>,
    pub debug: Option<DebugLevel>,
    pub inline: Option<Switch>,
    pub check_bounds: Option<Switch>,
    pub math_mode: Option<MathMode>,
    pub depwarn: Option<DepWarn>,
}

impl TuningOptions {
    /// Runtime command-line flags, in a fixed order.
    ///
    /// Unset options produce no flag at all.
    pub fn runtime_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        if let Some(ref cpu) = self.cpu_target {
            flags.push(format!("-C{}", cpu));
        }
        if let Some(ref image) = self.sysimage {
            flags.push(format!("-J{}", image.display()));
        }
        if let Some(mode) = self.compile {
            flags.push(format!("--compile={}", mode.as_token()));
        }
        if let Some(level) = self.depwarn {
            flags.push(format!("--depwarn={}", level.as_token()));
        }
        if let Some(level) = self.optimize {
            flags.push(format!("-O{}", level.as_token()));
        }
        if let Some(level) = self.debug {
            flags.push(format!("-g{}", level.as_token()));
        }
        if let Some(inline) = self.inline {
            flags.push(format!("--inline={}", inline.as_token()));
        }
        if let Some(check) = self.check_bounds {
            flags.push(format!("--check-bounds={}", check.as_token()));
        }
        if let Some(mode) = self.math_mode {
            flags.push(format!("--math-mode={}", mode.as_token()));
        }

        flags
    }
}
