//! Built-in plugin set.
//!
//! Block plugins come first, then inline plugins. Within each group the
//! order is the detection order used when two patterns match at the same
//! position.

use std::sync::Arc;

use super::types::Plugin;
use crate::plugins::{
    DatePlugin, EmojiPlugin, ExpandPlugin, LayoutPlugin, MediaPlugin, MentionPlugin, PanelPlugin,
    StatusPlugin,
};

/// Creates the built-in plugins in registration order.
///
/// # Example
///
/// ```
/// use adfmark_engine::registry::defaults::builtin_plugins;
///
/// let names: Vec<String> = builtin_plugins().iter().map(|p| p.name().to_string()).collect();
/// assert!(names.contains(&"panel".to_string()));
/// assert!(names.contains(&"emoji".to_string()));
/// ```
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(PanelPlugin),
        Arc::new(ExpandPlugin),
        Arc::new(MediaPlugin),
        Arc::new(LayoutPlugin),
        Arc::new(StatusPlugin),
        Arc::new(DatePlugin),
        Arc::new(MentionPlugin),
        Arc::new(EmojiPlugin),
    ]
}
