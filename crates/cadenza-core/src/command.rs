//! One parsed G-code line in controller terms: an optional op code plus
//! its letter parameters.

use crate::{
    coordinates::{Axis, Coordinates},
    error::{MachineError, Result},
};
use cadenza_gcode::Statement;
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Code {
    G(u32),
    M(u32),
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::G(n) => write!(f, "G{n}"),
            Code::M(n) => write!(f, "M{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    line: usize,
    code: Option<Code>,
    params: BTreeMap<char, f64>,
}

impl Command {
    pub fn new(code: Option<Code>) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, letter: char, value: f64) -> Self {
        self.params.insert(letter.to_ascii_uppercase(), value);
        self
    }

    /// Convert a parsed statement. Comment-only and `N`-only lines give
    /// `Ok(None)`. Coordinates without an op code imply `G1`.
    pub fn from_statement(statement: &Statement) -> Result<Option<Self>> {
        let malformed = |reason: String| MachineError::MalformedCommand {
            line: statement.line,
            reason,
        };

        let mut code = None;
        let mut params = BTreeMap::new();
        for word in &statement.words {
            match word.letter {
                'N' => {}
                letter @ ('G' | 'M') => {
                    let number = word.value.as_code().ok_or_else(|| {
                        malformed(format!("non-integer command word {letter}{}", word.value))
                    })?;
                    let parsed = if letter == 'G' {
                        Code::G(number)
                    } else {
                        Code::M(number)
                    };
                    if let Some(previous) = code.replace(parsed) {
                        return Err(malformed(format!(
                            "several command words ({previous}, {parsed})"
                        )));
                    }
                }
                letter => {
                    if params.insert(letter, word.value.as_f64()).is_some() {
                        return Err(malformed(format!("duplicate {letter} word")));
                    }
                }
            }
        }

        if code.is_none() && params.is_empty() {
            return Ok(None);
        }

        let mut command = Self {
            line: statement.line,
            code,
            params,
        };
        if command.code.is_none() && command.has_coordinates() {
            command.code = Some(Code::G(1));
        }
        Ok(Some(command))
    }

    /// Source line, zero when built by hand.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn code(&self) -> Option<Code> {
        self.code
    }

    pub fn has(&self, letter: char) -> bool {
        self.params.contains_key(&letter)
    }

    pub fn get(&self, letter: char) -> Option<f64> {
        self.params.get(&letter).copied()
    }

    pub fn has_coordinates(&self) -> bool {
        self.axes().next().is_some()
    }

    /// Named axes scaled by `scale`; unnamed axes keep `default`.
    pub fn coordinates(&self, default: Coordinates, scale: f64) -> Coordinates {
        self.axes()
            .fold(default, |acc, (axis, value)| acc.with(axis, value * scale))
    }

    fn axes(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        self.params
            .iter()
            .filter_map(|(&letter, &value)| Some((Axis::from_letter(letter)?, value)))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(code) = self.code {
            write!(f, "{code}")?;
            sep = " ";
        }
        for (letter, value) in &self.params {
            write!(f, "{sep}{letter}{value}")?;
            sep = " ";
        }
        Ok(())
    }
}
