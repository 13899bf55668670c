//! Checker trait definition and checker registry.
//!
//! Every checker implements the [`Checker`] trait: given a fully resolved
//! [`CheckerContext`], produce one [`CheckResult`]. Checkers are stateless —
//! all context arrives via parameters — and must be `Send + Sync` so the
//! dispatcher may exercise them from worker threads in tests.
//!
//! The registry maps item ids to checker implementations. Projects register
//! specialized checkers for particular item families; the data-driven
//! [`GenericChecker`](generic::GenericChecker) handles everything else by
//! interpreting the item config alone.

pub mod generic;

use crate::checker::{CheckError, CheckerContext};
use crate::types::CheckResult;

/// Every checker implements this trait.
pub trait Checker: Send + Sync {
    /// Unique name of this checker (used in error messages).
    fn name(&self) -> &'static str;

    /// Whether this checker claims the given item id.
    fn handles(&self, _item_id: &str) -> bool {
        true
    }

    /// Run the check and produce the complete result.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckError`] for parsing or execution failures; the
    /// lifecycle maps it to an execution-error result.
    fn execute_check(&self, ctx: &CheckerContext) -> Result<CheckResult, CheckError>;
}

/// Build the checker registry, most specific first.
#[must_use]
pub fn build_checker_registry() -> Vec<Box<dyn Checker>> {
    vec![Box::new(generic::GenericChecker)]
}

/// Select the checker responsible for an item id.
#[must_use]
pub fn checker_for(item_id: &str) -> Box<dyn Checker> {
    build_checker_registry()
        .into_iter()
        .find(|checker| checker.handles(item_id))
        .unwrap_or_else(|| Box::new(generic::GenericChecker))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_generic_fallback() {
        let registry = build_checker_registry();
        assert!(!registry.is_empty());
        assert_eq!(checker_for("IMP-5-0-0-00").name(), "generic");
        assert_eq!(checker_for("anything").name(), "generic");
    }
}
