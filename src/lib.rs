pub mod errors;
pub mod context;
pub mod comparison;
pub mod option;
pub mod sorter;
pub mod registry;
pub mod evaluator;
pub mod engine;
pub mod schedule;
pub mod session;
pub mod config;

use context::RenderContext;
use option::OptionDescriptor;
use registry::OptionValueLookup;

/// Order options for display by ascending priority.
pub fn sort(options: Vec<OptionDescriptor>) -> Vec<OptionDescriptor> {
    sorter::sort_by_priority(options)
}

/// Whether `option` is currently shown in `context`.
pub fn is_visible<L: OptionValueLookup + ?Sized>(option: &OptionDescriptor, context: RenderContext, lookup: &L) -> bool {
    evaluator::is_visible(option, context, lookup)
}

/// Re-export the most-used types.
pub use comparison::{FieldValue, RequiredValues};
pub use config::{EngineConfig, PageFixture};
pub use engine::{Decision, DependentMarkup, Trigger, VisibilityEngine};
pub use errors::{EngineError, Result};
pub use registry::{Control, ControlKind, PageRegistry};
