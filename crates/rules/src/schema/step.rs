//! Step identifiers of the io-dependency map.

use std::fmt;
use std::str::FromStr;

/// A node of the dependency graph: `R`, `A<n>` or `I<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepRef {
    Root,
    Algorithm(u32),
    Input(u32),
}

impl StepRef {
    pub fn is_root(&self) -> bool {
        matches!(self, StepRef::Root)
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRef::Root => write!(f, "R"),
            StepRef::Algorithm(n) => write!(f, "A{n}"),
            StepRef::Input(n) => write!(f, "I{n}"),
        }
    }
}

impl FromStr for StepRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "R" {
            return Ok(StepRef::Root);
        }
        let mut chars = s.chars();
        let prefix = chars.next();
        let index = chars.as_str();
        let parse_index = || {
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid step id: '{s}'"));
            }
            index
                .parse::<u32>()
                .map_err(|_| format!("invalid step id: '{s}'"))
        };
        match prefix {
            Some('A') => Ok(StepRef::Algorithm(parse_index()?)),
            Some('I') => Ok(StepRef::Input(parse_index()?)),
            _ => Err(format!("invalid step id: '{s}'")),
        }
    }
}
