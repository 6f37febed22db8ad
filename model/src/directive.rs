//! Package prefix directives
//!
//! A package line may start with a single character that overrides the
//! normal merge precedence for that package:
//!
//! | char | directive | effect |
//! |------|-----------|--------|
//! | `+`  | Add       | replace any existing entry |
//! | `=`  | Pin       | replace any existing entry and lock the key |
//! | `-`  | Remove    | drop any existing entry |
//! | `?`  | Upgrade   | replace an existing entry, or add |
//! | `~`  | Fallback  | add only when nothing is present |

use crate::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    Add,
    Pin,
    Remove,
    Upgrade,
    Fallback,
}

impl Directive {
    /// All directive characters, in table order
    pub const CHARS: [char; 5] = ['+', '=', '-', '?', '~'];

    /// Parse a prefix character
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            '+' => Ok(Directive::Add),
            '=' => Ok(Directive::Pin),
            '-' => Ok(Directive::Remove),
            '?' => Ok(Directive::Upgrade),
            '~' => Ok(Directive::Fallback),
            other => Err(ModelError::InvalidDirective(other)),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Directive::Add => '+',
            Directive::Pin => '=',
            Directive::Remove => '-',
            Directive::Upgrade => '?',
            Directive::Fallback => '~',
        }
    }

    /// Split a leading directive off a package specification string
    pub fn strip(spec: &str) -> (Option<Self>, &str) {
        let mut chars = spec.chars();
        match chars.next().map(Self::from_char) {
            Some(Ok(directive)) => (Some(directive), chars.as_str()),
            _ => (None, spec),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Directive {
    type Error = ModelError;

    fn try_from(c: char) -> Result<Self> {
        Self::from_char(c)
    }
}
