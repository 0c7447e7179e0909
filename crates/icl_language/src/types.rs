//! The symbolic type lattice.
//!
//! ICL types form a fixed six-member set. There is no inference beyond this
//! lattice: `Any` is top-compatible with every type in both directions,
//! everything else compares by equality.

use serde::Serialize;
use std::fmt;

/// A symbolic ICL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SemType {
    Num,
    Str,
    Bool,
    Any,
    Fn,
    Void,
}

impl SemType {
    /// Compatibility: reflexive, `Any` symmetric, otherwise equality.
    pub fn compatible(self, other: SemType) -> bool {
        self == other || self == SemType::Any || other == SemType::Any
    }

    /// Parses a type-annotation identifier.
    pub fn parse(name: &str) -> Option<SemType> {
        Some(match name {
            "Num" => SemType::Num,
            "Str" => SemType::Str,
            "Bool" => SemType::Bool,
            "Any" => SemType::Any,
            "Fn" => SemType::Fn,
            "Void" => SemType::Void,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            SemType::Num => "Num",
            SemType::Str => "Str",
            SemType::Bool => "Bool",
            SemType::Any => "Any",
            SemType::Fn => "Fn",
            SemType::Void => "Void",
        }
    }
}

impl fmt::Display for SemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_is_reflexive() {
        for ty in [
            SemType::Num,
            SemType::Str,
            SemType::Bool,
            SemType::Any,
            SemType::Fn,
            SemType::Void,
        ] {
            assert!(ty.compatible(ty));
        }
    }

    #[test]
    fn any_is_compatible_both_ways() {
        assert!(SemType::Any.compatible(SemType::Num));
        assert!(SemType::Num.compatible(SemType::Any));
        assert!(SemType::Any.compatible(SemType::Void));
    }

    #[test]
    fn distinct_bases_are_incompatible() {
        assert!(!SemType::Num.compatible(SemType::Str));
        assert!(!SemType::Bool.compatible(SemType::Num));
        assert!(!SemType::Fn.compatible(SemType::Void));
    }

    #[test]
    fn parse_round_trips_names() {
        for name in ["Num", "Str", "Bool", "Any", "Fn", "Void"] {
            assert_eq!(SemType::parse(name).unwrap().name(), name);
        }
        assert_eq!(SemType::parse("Int"), None);
        assert_eq!(SemType::parse("num"), None);
    }
}
