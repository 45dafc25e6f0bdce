//! SignalDetector — signal definitions as data, evaluated generically.
//!
//! - `expr`: condition tree and its text syntax
//! - `registry`: caller-owned registry of named definitions
//! - `detector`: inner-join evaluation over indicator frames

pub mod detector;
pub mod expr;
pub mod registry;

pub use detector::{detect, detect_expr};
pub use expr::{Comparison, ExprError, Operand, SeriesRef, SignalExpr};
pub use registry::{RegistryError, SignalDefinition, SignalRegistry};
