//! Interned operation identifiers.
//!
//! Operation kinds arrive as strings in program text. The registry interns
//! each kind once at startup and hands out a dense [`OpId`] so dispatch is an
//! index lookup rather than a string comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense identifier of a registered operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpId(pub u32);

impl OpId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_id_display() {
        assert_eq!(format!("{}", OpId(7)), "7");
    }

    #[test]
    fn op_id_index() {
        assert_eq!(OpId(3).index(), 3);
    }
}
