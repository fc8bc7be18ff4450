//! Invariant checks for the interface and block data structures.
//!
//! Setup objects (interface maps, numbering, monolithic layout) implement
//! [`DebugInvariants`]. Checks run automatically in debug builds and when
//! the `check-invariants` or `strict-invariants` features are enabled.

use crate::fsi_error::FsiError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), FsiError>;
}

/// Validate a group of setup objects, stopping at the first failure.
pub fn validate_all(items: &[&dyn DebugInvariants]) -> Result<(), FsiError> {
    items.iter().try_for_each(|item| item.validate_invariants())
}

/// Run a fallible check and panic on error when invariant checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[fsi invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
