use tracing::trace;

use crate::comparison::FieldValue;
use crate::context::RenderContext;
use crate::option::{Dependency, OptionDescriptor};
use crate::registry::{Control, OptionValueLookup};

/// Which lookup located the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStep {
    Primary,
    PageName,
    FieldSuffix,
}

/// Outcome of resolving a dependent's controller.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub control: Option<&'a Control>,
    pub step: Option<LookupStep>,
    /// Normalized value; `Bool(false)` when no control was found.
    pub value: FieldValue,
}

impl Resolution<'_> {
    pub fn is_absent(&self) -> bool {
        self.control.is_none()
    }
}

/// Find the controller of `dependency` and read its current value.
///
/// Lookups run in order and stop at the first hit: the primary lookup
/// (scoped to the dependent's container when embedded, by page name on the
/// settings page), then by page name, then by field-identifier suffix.
pub fn resolve_controller<'a, L>(
    dependent: &OptionDescriptor,
    dependency: &Dependency,
    context: RenderContext,
    lookup: &'a L,
) -> Resolution<'a>
where
    L: OptionValueLookup + ?Sized,
{
    let key = dependency.controller_key.as_str();
    let primary = match context {
        RenderContext::Embedded => dependent
            .container
            .as_deref()
            .and_then(|container| lookup.scoped(container, key)),
        RenderContext::SettingsPage => lookup.by_name(key),
    };

    let found = primary
        .map(|c| (c, LookupStep::Primary))
        .or_else(|| lookup.by_name(key).map(|c| (c, LookupStep::PageName)))
        .or_else(|| lookup.by_field_suffix(key).map(|c| (c, LookupStep::FieldSuffix)));

    match found {
        Some((control, step)) => {
            let value = control.current_value();
            trace!(dependent = %dependent.key, controller = key, ?step, ?value, "controller resolved");
            Resolution { control: Some(control), step: Some(step), value }
        }
        None => {
            trace!(dependent = %dependent.key, controller = key, "controller absent");
            Resolution { control: None, step: None, value: FieldValue::Bool(false) }
        }
    }
}

/// Decide whether `dependent` should currently be shown.
///
/// On the settings page the value must be a member of the required set and
/// the controller's own group must be shown (one level, no ancestors). In
/// embedded editors the value may instead equal a scalar payload, and group
/// visibility is not consulted. Options without a dependency always show.
pub fn is_visible<L>(dependent: &OptionDescriptor, context: RenderContext, lookup: &L) -> bool
where
    L: OptionValueLookup + ?Sized,
{
    let Some(dependency) = dependent.dependency.as_ref() else {
        return true;
    };
    let resolution = resolve_controller(dependent, dependency, context, lookup);
    let required = &dependency.required;
    let member = required.contains(&resolution.value);

    let visible = match context {
        RenderContext::SettingsPage => {
            member
                && match resolution.control {
                    Some(control) => control
                        .group
                        .as_deref()
                        .is_some_and(|group| lookup.is_group_visible(group)),
                    // Nothing to inspect for a missing controller.
                    None => true,
                }
        }
        RenderContext::Embedded => member || required.equals_scalar(&resolution.value),
    };
    trace!(dependent = %dependent.key, ?context, visible, "visibility evaluated");
    visible
}
