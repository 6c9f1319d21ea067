//! Type compatibility ranking.

use crate::types::Type;

/// How well a declared type fits a candidate.
///
/// Ordered so the best candidate is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    NoMatch,
    Compatible,
    ExactMatch,
}

impl MatchRank {
    pub fn is_match(self) -> bool {
        self != MatchRank::NoMatch
    }
}

/// Ranks `declared` against `candidate`.
///
/// A concrete `declared` type matches exactly when the types are equal and is
/// compatible when a `declared` value can stand in for `candidate` through its
/// interfaces, base chain or array element type.
///
/// A generic parameter `declared` type matches only an unbound generic
/// parameter of the same name. An array of a generic parameter matches only an
/// array whose element is that parameter, never the bare parameter.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{match_type, MatchRank, Type};
///
/// let t = Type::generic_parameter("T", 0);
/// assert_eq!(match_type(&t, &Type::generic_parameter("T", 0)), MatchRank::ExactMatch);
/// assert_eq!(match_type(&t.make_array(), &t), MatchRank::NoMatch);
/// assert_eq!(match_type(&Type::of::<u8>(), &Type::of::<u8>()), MatchRank::ExactMatch);
/// assert_eq!(match_type(&Type::of::<u8>(), &t), MatchRank::NoMatch);
/// ```
pub fn match_type(declared: &Type, candidate: &Type) -> MatchRank {
    if let Some(name) = declared.generic_parameter_name() {
        return rank_bool(candidate.generic_parameter_name() == Some(name));
    }
    if let Some(name) = declared
        .element_type()
        .and_then(Type::generic_parameter_name)
    {
        let element = candidate
            .element_type()
            .and_then(Type::generic_parameter_name);
        return rank_bool(element == Some(name));
    }

    if declared == candidate {
        MatchRank::ExactMatch
    } else if !candidate.is_generic_parameter() && candidate.is_assignable_from(declared) {
        MatchRank::Compatible
    } else {
        MatchRank::NoMatch
    }
}

fn rank_bool(exact: bool) -> MatchRank {
    if exact {
        MatchRank::ExactMatch
    } else {
        MatchRank::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeBuilder;

    #[test]
    fn ranks_are_ordered() {
        assert!(MatchRank::NoMatch < MatchRank::Compatible);
        assert!(MatchRank::Compatible < MatchRank::ExactMatch);
        assert!(!MatchRank::NoMatch.is_match());
    }

    #[test]
    fn generic_parameter_names_must_agree() {
        let t = Type::generic_parameter("T", 0);
        let u = Type::generic_parameter("U", 0);
        assert_eq!(match_type(&t, &u), MatchRank::NoMatch);
        assert_eq!(match_type(&t, &Type::of::<u8>()), MatchRank::NoMatch);
    }

    #[test]
    fn array_shaped_reference_needs_array_of_parameter() {
        let t = Type::generic_parameter("T", 0);
        assert_eq!(match_type(&t.make_array(), &t.make_array()), MatchRank::ExactMatch);
        assert_eq!(
            match_type(&t.make_array(), &Type::of::<u8>().make_array()),
            MatchRank::NoMatch
        );
        assert_eq!(match_type(&t, &t.make_array()), MatchRank::NoMatch);
    }

    #[test]
    fn interface_implementations_are_compatible() {
        let context = TypeBuilder::interface("IDbContext").build().unwrap();
        let sql = TypeBuilder::class("SqlContext")
            .implements(context.clone())
            .build()
            .unwrap();

        assert_eq!(match_type(&sql, &context), MatchRank::Compatible);
        assert_eq!(match_type(&context, &sql), MatchRank::NoMatch);
        assert_eq!(
            match_type(&sql.make_array(), &context.make_array()),
            MatchRank::Compatible
        );
    }
}
