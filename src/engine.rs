use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::RenderContext;
use crate::errors::EngineError;
use crate::evaluator::is_visible;
use crate::option::{coerce_priority, Dependency, OptionDescriptor};
use crate::registry::Surface;

/// =========================
/// Events
/// =========================

/// Everything that can cause a re-evaluation. None of these are produced by
/// the engine itself; the host forwards them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The target container exists; run the first pass.
    Ready,
    /// An input named `key` changed.
    Changed { key: String },
    /// The host form was saved; a delayed re-check follows.
    Saved,
    /// The delayed re-check after a save.
    Recheck,
}

/// =========================
/// Bindings
/// =========================

/// Attributes of one dependent element as emitted by the rendering host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentMarkup {
    pub element: String,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub priority: Value,
    /// `data-dep`
    pub dep: String,
    /// `data-dep_val`, JSON-encoded
    pub dep_val: String,
}

/// A dependent element tied to its rule.
#[derive(Debug)]
pub enum Binding {
    Ready { element: String, option: OptionDescriptor },
    /// Its markup could not be decoded; always hidden.
    Broken { element: String, error: EngineError },
}

impl Binding {
    pub fn element(&self) -> &str {
        match self {
            Binding::Ready { element, .. } | Binding::Broken { element, .. } => element,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub element: String,
    pub visible: bool,
}

/// =========================
/// Engine
/// =========================

/// Re-evaluates every dependent element against the current page state.
///
/// Holds no state between passes besides its bindings, so calling
/// [`VisibilityEngine::evaluate_all`] again with unchanged inputs yields the
/// same decisions.
#[derive(Debug, Default)]
pub struct VisibilityEngine {
    bindings: Vec<Binding>,
}

impl VisibilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every option that has a dependency, using its key as element id.
    pub fn from_options<'a>(options: impl IntoIterator<Item = &'a OptionDescriptor>) -> Self {
        let mut engine = Self::new();
        for option in options.into_iter().filter(|o| o.dependency.is_some()) {
            engine.bind(option.key.clone(), option.clone());
        }
        engine
    }

    pub fn bind(&mut self, element: impl Into<String>, option: OptionDescriptor) {
        self.bindings.push(Binding::Ready { element: element.into(), option });
    }

    /// Bind raw host markup. A payload that fails to decode only affects this
    /// element; returns whether the binding is usable.
    pub fn bind_markup(&mut self, markup: DependentMarkup) -> bool {
        let DependentMarkup { element, container, priority, dep, dep_val } = markup;
        match Dependency::from_attributes(&element, &dep, &dep_val) {
            Ok(dependency) => {
                let option = OptionDescriptor {
                    key: element.clone(),
                    priority: coerce_priority(&priority),
                    dependency: Some(dependency),
                    container,
                };
                self.bindings.push(Binding::Ready { element, option });
                true
            }
            Err(error) => {
                warn!(%element, %error, "dependent markup rejected; element stays hidden");
                self.bindings.push(Binding::Broken { element, error });
                false
            }
        }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Distinct controller keys, in first-seen order.
    pub fn controller_keys(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter_map(|b| match b {
                Binding::Ready { option, .. } => option.dependency.as_ref(),
                Binding::Broken { .. } => None,
            })
            .map(|d| d.controller_key.as_str())
            .unique()
            .collect()
    }

    /// Whether a change to the input reported as `key` can affect a
    /// dependent. Inputs found by field-identifier suffix report their field
    /// identifier, so a key ending in a controller key also counts.
    pub fn is_controller(&self, key: &str) -> bool {
        self.controller_keys()
            .iter()
            .any(|controller| key == *controller || key.ends_with(controller))
    }

    /// Evaluate all bindings and apply the decisions to `surface`.
    ///
    /// A decision may hide or show a group that an earlier binding read in
    /// the same pass, so passes repeat until the decisions settle, at most
    /// `bindings.len() + 1` times. Each binding still checks only its
    /// controller's immediate group.
    pub fn evaluate_all<S>(&self, context: RenderContext, surface: &mut S) -> Vec<Decision>
    where
        S: Surface + ?Sized,
    {
        let max_passes = self.bindings.len() + 1;
        let mut decisions = self.pass(context, surface);
        let mut passes = 1;
        while passes < max_passes {
            let next = self.pass(context, surface);
            passes += 1;
            if next == decisions {
                break;
            }
            decisions = next;
        }
        debug!(
            ?context,
            passes,
            evaluated = decisions.len(),
            shown = decisions.iter().filter(|d| d.visible).count(),
            "visibility pass complete"
        );
        decisions
    }

    // One sweep in registration order, applying each decision as it is made.
    fn pass<S>(&self, context: RenderContext, surface: &mut S) -> Vec<Decision>
    where
        S: Surface + ?Sized,
    {
        let mut decisions = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let visible = match binding {
                Binding::Ready { option, .. } => is_visible(option, context, &*surface),
                Binding::Broken { .. } => false,
            };
            surface.apply(binding.element(), visible);
            decisions.push(Decision { element: binding.element().to_string(), visible });
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{FieldValue, RequiredValues};
    use crate::registry::{Control, PageRegistry};
    use pretty_assertions::assert_eq;

    fn markup(element: &str, dep: &str, dep_val: &str) -> DependentMarkup {
        DependentMarkup {
            element: element.into(),
            container: None,
            priority: Value::Null,
            dep: dep.into(),
            dep_val: dep_val.into(),
        }
    }

    #[test]
    fn broken_markup_is_isolated() {
        let mut engine = VisibilityEngine::new();
        assert!(engine.bind_markup(markup("a", "float_style", r#"["boxed"]"#)));
        assert!(!engine.bind_markup(markup("b", "float_style", "[boxed")));
        assert!(engine.bind_markup(markup("c", "float_style", r#"["boxed"]"#)));

        let mut page = PageRegistry::new()
            .with_control(Control::select("float_style", "boxed").in_group("grid"))
            .with_group("grid", true);
        let out = engine.evaluate_all(RenderContext::SettingsPage, &mut page);
        assert_eq!(
            out,
            vec![
                Decision { element: "a".into(), visible: true },
                Decision { element: "b".into(), visible: false },
                Decision { element: "c".into(), visible: true },
            ]
        );
        assert_eq!(page.visibility("b"), Some(false));
    }

    #[test]
    fn controller_keys_are_deduplicated() {
        let mut engine = VisibilityEngine::new();
        engine.bind_markup(markup("a", "float_style", "[1]"));
        engine.bind_markup(markup("b", "location", "[true]"));
        engine.bind_markup(markup("c", "float_style", "[2]"));
        engine.bind_markup(markup("d", "broken", "{"));
        assert_eq!(engine.controller_keys(), vec!["float_style", "location"]);
        assert!(engine.is_controller("location"));
        assert!(!engine.is_controller("broken"));
        assert!(engine.is_controller("widget-swp_popular_posts_widget[2]float_style"));
        assert!(!engine.is_controller("float_style_source"));
    }

    #[test]
    fn from_options_skips_independent_options() {
        let opts = vec![
            OptionDescriptor::new("plain"),
            OptionDescriptor::new("dep").depends_on("plain", RequiredValues::Set(vec![FieldValue::Bool(true)])),
        ];
        let engine = VisibilityEngine::from_options(&opts);
        assert_eq!(engine.bindings().len(), 1);
        assert_eq!(engine.bindings()[0].element(), "dep");
    }

    #[test]
    fn decisions_propagate_one_level_within_a_pass() {
        // grid_size wraps the `size` control and is itself a dependent.
        let mut engine = VisibilityEngine::new();
        engine.bind_markup(markup("grid_size", "mode", r#"["custom"]"#));
        engine.bind_markup(markup("size_detail", "size", r#"["large"]"#));

        let mut page = PageRegistry::new()
            .with_control(Control::select("mode", "default").in_group("grid_mode"))
            .with_control(Control::select("size", "large").in_group("grid_size"))
            .with_group("grid_mode", true)
            .with_group("grid_size", true);

        let out = engine.evaluate_all(RenderContext::SettingsPage, &mut page);
        assert_eq!(out.iter().map(|d| d.visible).collect::<Vec<_>>(), vec![false, false]);

        page.set_input("mode", "custom");
        let out = engine.evaluate_all(RenderContext::SettingsPage, &mut page);
        assert_eq!(out.iter().map(|d| d.visible).collect::<Vec<_>>(), vec![true, true]);
    }

    #[test]
    fn markup_priority_is_lenient() {
        let mut engine = VisibilityEngine::new();
        let mut m = markup("a", "x", "[]");
        m.priority = Value::String("9".into());
        engine.bind_markup(m);
        match &engine.bindings()[0] {
            Binding::Ready { option, .. } => assert_eq!(option.priority, 9),
            other => panic!("unexpected binding: {other:?}"),
        }
    }
}
