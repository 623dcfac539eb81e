use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::comparison::FieldValue;

/// Read access to the controls currently rendered on a page.
///
/// The evaluator only ever talks to this trait, so any host surface (a live
/// document, a test fixture) can back it.
pub trait OptionValueLookup {
    /// A control named `key` inside the grouping `container`.
    fn scoped(&self, container: &str, key: &str) -> Option<&Control>;
    /// A control anywhere on the page whose name is `key`.
    fn by_name(&self, key: &str) -> Option<&Control>;
    /// A control whose secondary field identifier ends with `key`.
    fn by_field_suffix(&self, key: &str) -> Option<&Control>;
    /// Whether the grouping element `group` is currently shown.
    fn is_group_visible(&self, group: &str) -> bool;
}

/// Receives the show/hide decisions of an evaluation pass.
pub trait Presenter {
    fn apply(&mut self, element: &str, visible: bool);
}

/// A page that can both be queried and updated.
pub trait Surface: OptionValueLookup + Presenter {}

impl<T: OptionValueLookup + Presenter + ?Sized> Surface for T {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Toggle { checked: bool },
    Select { value: String },
    Text { value: String },
}

/// One input element that may act as a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Page-global `name`.
    #[serde(default)]
    pub name: Option<String>,
    /// Name used inside embedded editors, unique only within `container`.
    #[serde(default)]
    pub scoped_name: Option<String>,
    /// Secondary field identifier, matched by suffix as a last resort.
    #[serde(default)]
    pub field: Option<String>,
    /// Immediate grouping element wrapping this control.
    #[serde(default)]
    pub group: Option<String>,
    /// Enclosing editor container (embedded contexts).
    #[serde(default)]
    pub container: Option<String>,
    pub kind: ControlKind,
}

impl Control {
    pub fn new(kind: ControlKind) -> Self {
        Self { name: None, scoped_name: None, field: None, group: None, container: None, kind }
    }

    pub fn toggle(name: &str, checked: bool) -> Self {
        Self::new(ControlKind::Toggle { checked }).named(name)
    }

    pub fn select(name: &str, value: &str) -> Self {
        Self::new(ControlKind::Select { value: value.to_string() }).named(name)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn scoped(mut self, container: &str, scoped_name: &str) -> Self {
        self.container = Some(container.to_string());
        self.scoped_name = Some(scoped_name.to_string());
        self
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Toggles report their checked state; everything else its text.
    pub fn current_value(&self) -> FieldValue {
        match &self.kind {
            ControlKind::Toggle { checked } => FieldValue::Bool(*checked),
            ControlKind::Select { value } | ControlKind::Text { value } => FieldValue::normalize(value),
        }
    }

    /// Replace the control's value with user input.
    pub fn set_input(&mut self, input: &str) {
        match &mut self.kind {
            ControlKind::Toggle { checked } => *checked = input == "true" || input == "on",
            ControlKind::Select { value } | ControlKind::Text { value } => *value = input.to_string(),
        }
    }
}

/// In-memory page: controls in document order plus group visibility.
#[derive(Debug, Clone, Default)]
pub struct PageRegistry {
    controls: Vec<Control>,
    groups: HashMap<String, bool>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, control: Control) {
        self.controls.push(control);
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.register(control);
        self
    }

    pub fn set_group_visible(&mut self, group: &str, visible: bool) {
        self.groups.insert(group.to_string(), visible);
    }

    pub fn with_group(mut self, group: &str, visible: bool) -> Self {
        self.set_group_visible(group, visible);
        self
    }

    /// Update the first control named `name`. Returns false if none matched.
    pub fn set_input(&mut self, name: &str, input: &str) -> bool {
        match self.controls.iter_mut().find(|c| c.name.as_deref() == Some(name)) {
            Some(control) => {
                control.set_input(input);
                true
            }
            None => false,
        }
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut [Control] {
        &mut self.controls
    }

    /// Recorded visibility of an element or group; `None` if never seen.
    pub fn visibility(&self, element: &str) -> Option<bool> {
        self.groups.get(element).copied()
    }
}

impl OptionValueLookup for PageRegistry {
    fn scoped(&self, container: &str, key: &str) -> Option<&Control> {
        self.controls
            .iter()
            .find(|c| c.container.as_deref() == Some(container) && c.scoped_name.as_deref() == Some(key))
    }

    fn by_name(&self, key: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.name.as_deref() == Some(key))
    }

    fn by_field_suffix(&self, key: &str) -> Option<&Control> {
        self.controls
            .iter()
            .find(|c| c.field.as_deref().is_some_and(|f| f.ends_with(key)))
    }

    // Groups the page never declared are treated as shown.
    fn is_group_visible(&self, group: &str) -> bool {
        self.groups.get(group).copied().unwrap_or(true)
    }
}

impl Presenter for PageRegistry {
    fn apply(&mut self, element: &str, visible: bool) {
        self.groups.insert(element.to_string(), visible);
    }
}
