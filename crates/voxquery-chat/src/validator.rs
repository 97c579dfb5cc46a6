//! Syntax validation of generated queries.
//!
//! [`SyntaxChecker`] is the parsing predicate; [`QueryValidator`] wraps it so
//! that parse errors, empty parses, and panics all read as "not valid".

use std::panic::{self, AssertUnwindSafe};

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// A syntax-only check on candidate query text.
pub trait SyntaxChecker: Send + Sync {
    /// `Ok(true)` if the text parses into at least one statement,
    /// `Ok(false)` if it parses into nothing, `Err` with the parser's
    /// message otherwise.
    fn check(&self, candidate: &str) -> Result<bool, String>;
}

/// SQL syntax check using `sqlparser`'s generic dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlSyntaxChecker;

impl SyntaxChecker for SqlSyntaxChecker {
    fn check(&self, candidate: &str) -> Result<bool, String> {
        let statements =
            Parser::parse_sql(&GenericDialect {}, candidate).map_err(|e| e.to_string())?;
        Ok(!statements.is_empty())
    }
}

/// Fail-closed wrapper around a [`SyntaxChecker`].
#[derive(Debug, Clone, Default)]
pub struct QueryValidator<C = SqlSyntaxChecker> {
    checker: C,
}

impl<C: SyntaxChecker> QueryValidator<C> {
    pub fn new(checker: C) -> Self {
        Self { checker }
    }

    /// Whether `candidate` is syntactically valid. Never panics.
    pub fn is_valid(&self, candidate: &str) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| self.checker.check(candidate))) {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                tracing::warn!(candidate_len = candidate.len(), "Query parsed to no statements");
                false
            }
            Ok(Err(message)) => {
                tracing::warn!(error = %message, "Query failed syntax validation");
                false
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(error = %message, "Syntax checker panicked; treating query as invalid");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingChecker;

    impl SyntaxChecker for PanickingChecker {
        fn check(&self, _candidate: &str) -> Result<bool, String> {
            panic!("parser blew up");
        }
    }

    struct FixedChecker(Result<bool, String>);

    impl SyntaxChecker for FixedChecker {
        fn check(&self, _candidate: &str) -> Result<bool, String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_valid_select() {
        let validator = QueryValidator::<SqlSyntaxChecker>::default();
        assert!(validator.is_valid("SELECT region, SUM(revenue) FROM sales GROUP BY region;"));
        assert!(validator.is_valid(
            "SELECT region, SUM(revenue) FROM sales WHERE year = 2023 GROUP BY region"
        ));
    }

    #[test]
    fn test_prose_is_invalid() {
        let validator = QueryValidator::new(SqlSyntaxChecker);
        assert!(!validator.is_valid("not sql at all"));
        assert!(!validator.is_valid("Here is your query: SELECT 1"));
    }

    #[test]
    fn test_empty_parse_is_invalid() {
        let validator = QueryValidator::new(SqlSyntaxChecker);
        assert!(!validator.is_valid(""));
        assert_eq!(SqlSyntaxChecker.check(""), Ok(false));
    }

    #[test]
    fn test_checker_outcomes_map_fail_closed() {
        assert!(QueryValidator::new(FixedChecker(Ok(true))).is_valid("x"));
        assert!(!QueryValidator::new(FixedChecker(Ok(false))).is_valid("x"));
        assert!(!QueryValidator::new(FixedChecker(Err("bad token".into()))).is_valid("x"));
    }

    #[test]
    fn test_panicking_checker_is_invalid() {
        let validator = QueryValidator::new(PanickingChecker);
        assert!(!validator.is_valid("SELECT 1"));
    }
}
