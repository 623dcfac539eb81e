use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::engine::{DependentMarkup, VisibilityEngine};
use crate::errors::{EngineError, Result};
use crate::option::OptionDescriptor;
use crate::registry::{Control, PageRegistry};

/// Engine knobs, loadable from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay of the one-shot re-check after a save.
    pub recheck_delay_ms: u64,
    /// Location fragment identifying the settings page.
    pub settings_page_marker: String,
    /// Container whose insertion starts the first pass.
    pub form_container: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recheck_delay_ms: 600,
            settings_page_marker: "page=social-warfare".to_string(),
            form_container: "swp_popular_posts_widget".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn recheck_delay(&self) -> Duration {
        Duration::from_millis(self.recheck_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.form_container.trim().is_empty() {
            return Err(EngineError::Config("form_container must not be empty".into()));
        }
        Ok(())
    }
}

/// A page snapshot handed over by the rendering host: the options, the
/// controls currently on the page and the dependent elements' raw markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFixture {
    pub location: Option<String>,
    pub context: Option<RenderContext>,
    pub options: Vec<OptionDescriptor>,
    pub controls: Vec<Control>,
    pub groups: BTreeMap<String, bool>,
    pub markup: Vec<DependentMarkup>,
}

impl PageFixture {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Explicit context wins; otherwise detect it from the location.
    pub fn context(&self, config: &EngineConfig) -> RenderContext {
        self.context.unwrap_or_else(|| {
            let location = self.location.as_deref().unwrap_or_default();
            RenderContext::from_location(location, &config.settings_page_marker)
        })
    }

    pub fn registry(&self) -> PageRegistry {
        let mut page = PageRegistry::new();
        for control in &self.controls {
            page.register(control.clone());
        }
        for (group, visible) in &self.groups {
            page.set_group_visible(group, *visible);
        }
        page
    }

    /// Options with dependencies first, then raw markup bindings.
    pub fn engine(&self) -> VisibilityEngine {
        let mut engine = VisibilityEngine::from_options(&self.options);
        for markup in &self.markup {
            engine.bind_markup(markup.clone());
        }
        engine
    }
}
