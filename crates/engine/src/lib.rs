#![deny(missing_docs)]
//! adfmark engine: plugin registry, block and inline parsing, the block
//! converter, caching, and metrics.
//!
//! The free functions here share one process-wide [`Converter`] built with
//! the default [`ConverterConfig`] and the global [`PluginRegistry`].

/// Bounded LRU document cache.
pub mod cache;
/// Converter configuration and truncation limits.
pub mod config;
/// Conversion entry point with failure recovery.
pub mod converter;
/// Conversion counters and timings.
pub mod metrics;
/// Block scanner and inline parser.
pub mod parser;
/// Built-in node-type plugins.
pub mod plugins;
/// Plugin registry and plugin interface.
pub mod registry;
/// Block record to node conversion.
pub mod renderer;

use std::sync::Arc;

use once_cell::sync::Lazy;

pub use adfmark_core::{ConvertError, Document, Mark, Node, NodeType, PluginError};
pub use config::{ConverterConfig, Limits};
pub use converter::{Converter, error_document};
pub use metrics::MetricsSnapshot;
pub use registry::{InlineSegment, Parsed, Plugin, PluginInput, PluginRegistry, RenderContext};

static DEFAULT_CONVERTER: Lazy<Converter> = Lazy::new(Converter::default);

/// The shared converter behind the free functions.
pub fn default_converter() -> &'static Converter {
    &DEFAULT_CONVERTER
}

/// Converts markdown with the shared converter.
///
/// ```
/// let doc = adfmark_engine::convert(":::panel type=\"warning\"\nHello\n:::");
/// assert_eq!(doc.content[0].attr_str("panelType"), Some("warning"));
/// ```
pub fn convert(markdown: &str) -> Document {
    DEFAULT_CONVERTER.convert(markdown)
}

/// Metrics of the shared converter.
pub fn metrics() -> MetricsSnapshot {
    DEFAULT_CONVERTER.metrics()
}

/// Adds a plugin to the global registry, replacing one with the same name.
pub fn register(plugin: Arc<dyn Plugin>) {
    PluginRegistry::global().register(plugin);
}

/// Removes a plugin from the global registry.
pub fn unregister(name: &str) -> bool {
    PluginRegistry::global().unregister(name)
}

/// Block plugins in the global registry.
pub fn block_plugins() -> Vec<Arc<dyn Plugin>> {
    PluginRegistry::global().block_plugins()
}

/// Inline plugins in the global registry.
pub fn inline_plugins() -> Vec<Arc<dyn Plugin>> {
    PluginRegistry::global().inline_plugins()
}
