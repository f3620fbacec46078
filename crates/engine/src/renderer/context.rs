//! Per-conversion state: the registry snapshot in use, limits, and depth.

use adfmark_core::{ConvertError, Node};
use log::debug;

use super::depth_notice;
use super::render::render_record;
use crate::config::Limits;
use crate::parser::{parse_blocks, parse_inline};
use crate::registry::{PluginRegistry, RenderContext};

/// Tracks the state of one conversion as it descends into containers.
///
/// Created per `convert` call and dropped with it.
pub struct Context<'a> {
    registry: &'a PluginRegistry,
    limits: Limits,
    depth: usize,
}

impl<'a> Context<'a> {
    /// Creates a root context.
    pub fn new(registry: &'a PluginRegistry, limits: Limits) -> Self {
        Self {
            registry,
            limits,
            depth: 0,
        }
    }

    /// The registry this conversion runs against.
    pub fn registry(&self) -> &'a PluginRegistry {
        self.registry
    }

    /// Parses and converts `markdown` at the current depth.
    pub fn convert_blocks(&mut self, markdown: &str) -> Result<Vec<Node>, ConvertError> {
        let records = parse_blocks(markdown, self.registry);
        let mut nodes = Vec::with_capacity(records.len());
        for record in records {
            nodes.extend(render_record(record, self)?);
        }
        Ok(nodes)
    }

    /// Runs `f` one level deeper. Returns `None` when the depth limit is reached.
    pub fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if self.depth >= self.limits.max_nesting_depth {
            debug!(
                "nesting depth limit {} reached",
                self.limits.max_nesting_depth
            );
            return None;
        }
        self.depth += 1;
        let mut descent = Descent(self);
        Some(f(&mut *descent.0))
    }
}

/// Steps the depth back up when dropped, unwinding included.
struct Descent<'c, 'a>(&'c mut Context<'a>);

impl Drop for Descent<'_, '_> {
    fn drop(&mut self) {
        self.0.depth -= 1;
    }
}

impl RenderContext for Context<'_> {
    fn render_blocks(&mut self, markdown: &str) -> Result<Vec<Node>, ConvertError> {
        let max = self.limits.max_nesting_depth;
        self.descend(|ctx| ctx.convert_blocks(markdown))
            .unwrap_or_else(|| Ok(vec![depth_notice(max)]))
    }

    fn render_inline(&mut self, text: &str) -> Vec<Node> {
        let registry = self.registry;
        parse_inline(text, registry, self)
    }

    fn limits(&self) -> &Limits {
        &self.limits
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
