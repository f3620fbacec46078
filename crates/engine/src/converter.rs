//! Conversion entry point: cache lookup, the pipeline, and failure recovery.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use adfmark_core::{ConvertError, Document, Node, NodeType};
use log::{debug, warn};

use crate::cache::{CacheKey, DocumentCache};
use crate::config::ConverterConfig;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::plugins::panel_node;
use crate::registry::PluginRegistry;
use crate::renderer::render_document;

/// Input characters quoted in an error document.
pub const ERROR_EXCERPT_CHARS: usize = 500;

/// Converts extended markdown into documents.
///
/// `convert` never fails: a pipeline error or panic becomes an error
/// document, counted in the metrics.
///
/// ```
/// use adfmark_engine::{Converter, ConverterConfig};
///
/// let converter = Converter::new(ConverterConfig::default());
/// let doc = converter.convert("Hello **world**");
/// assert_eq!(doc.content.len(), 1);
/// ```
#[derive(Debug)]
pub struct Converter {
    config: ConverterConfig,
    registry: Arc<PluginRegistry>,
    cache: DocumentCache,
    metrics: MetricsCollector,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl Converter {
    /// A converter using the process-wide plugin registry.
    pub fn new(config: ConverterConfig) -> Self {
        Self::with_registry(config, PluginRegistry::global())
    }

    /// A converter using its own registry.
    pub fn with_registry(config: ConverterConfig, registry: Arc<PluginRegistry>) -> Self {
        Self {
            cache: DocumentCache::new(config.cache_size),
            config,
            registry,
            metrics: MetricsCollector::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Registry consulted by this converter.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Converts `markdown`. Blank input yields the empty document.
    pub fn convert(&self, markdown: &str) -> Document {
        let started = Instant::now();
        if markdown.trim().is_empty() {
            self.metrics.record_conversion(started.elapsed(), markdown.len());
            return Document::empty();
        }

        let generation = self.registry.generation();
        let key = CacheKey::new(markdown, generation);
        if let Some(doc) = self.cache.get(&key) {
            debug!("cache hit for {} bytes", markdown.len());
            self.metrics.record_hit();
            self.metrics.record_conversion(started.elapsed(), markdown.len());
            return doc;
        }
        self.metrics.record_miss();

        let doc = match self.run_pipeline(markdown) {
            Ok(doc) => {
                self.metrics.record_nodes(&doc);
                // a plugin change mid-conversion makes the result unsafe to reuse
                if self.registry.generation() == generation {
                    self.cache.insert(key, doc.clone());
                }
                doc
            }
            Err(err) => {
                warn!(
                    "conversion failed for input of {} bytes: {err}",
                    markdown.len()
                );
                self.metrics.record_error();
                error_document(&err.to_string(), markdown)
            }
        };

        self.metrics.record_conversion(started.elapsed(), markdown.len());
        doc
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Drops every cached document.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached documents.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Zeroes the metrics.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn run_pipeline(&self, markdown: &str) -> Result<Document, ConvertError> {
        let registry = self.registry.as_ref();
        let limits = self.config.limits();
        panic::catch_unwind(AssertUnwindSafe(|| {
            render_document(markdown, registry, limits)
        }))
        .unwrap_or_else(|payload| Err(ConvertError::Internal(panic_message(payload.as_ref()))))
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("panic with a non-string payload")
    }
}

/// The single-panel document returned when conversion fails.
pub fn error_document(message: &str, input: &str) -> Document {
    let excerpt: String = input.chars().take(ERROR_EXCERPT_CHARS).collect();
    let code = if excerpt.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(excerpt)]
    };
    let content = vec![
        Node::paragraph(vec![Node::text(format!("Conversion failed: {message}"))]),
        Node::container(NodeType::CodeBlock, code),
    ];
    Document::new(vec![panel_node("error", content)])
}
