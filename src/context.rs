use serde::{Deserialize, Serialize};

/// Rendering environment an option surface lives in.
///
/// The two contexts apply different visibility rules; see
/// [`crate::evaluator::is_visible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RenderContext {
    /// The plugin's own settings page.
    SettingsPage,
    /// Any host editor that embeds the options, e.g. a widget form.
    Embedded,
}

impl RenderContext {
    /// Detect the context from the page location.
    pub fn from_location(location: &str, settings_marker: &str) -> Self {
        if !settings_marker.is_empty() && location.contains(settings_marker) {
            RenderContext::SettingsPage
        } else {
            RenderContext::Embedded
        }
    }
}
