//! Plugin registry: the set of node-type handlers consulted during conversion.
//!
//! Readers take a snapshot (an `Arc` of the plugin list) and work against it,
//! so a concurrent `register` never changes the plugins seen by a conversion
//! already in flight. Every change bumps a generation counter that the
//! converter folds into its cache key.

pub mod defaults;
pub mod types;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use adfmark_core::directives::DirectiveOpening;
use adfmark_core::{ConvertError, Node, PluginError};
use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

pub use defaults::builtin_plugins;

use crate::converter::panic_message;
pub use types::{InlineSegment, Parsed, Plugin, PluginInput, RenderContext};

type PluginList = Arc<Vec<Arc<dyn Plugin>>>;

static GLOBAL: Lazy<Arc<PluginRegistry>> = Lazy::new(|| Arc::new(PluginRegistry::with_builtins()));

/// Ordered, name-keyed collection of plugins.
pub struct PluginRegistry {
    plugins: RwLock<PluginList>,
    generation: AtomicU64,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .field("generation", &self.generation())
            .finish()
    }
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(Arc::new(Vec::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// A registry holding the built-in plugins.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for plugin in builtin_plugins() {
            registry.register(plugin);
        }
        registry
    }

    /// The process-wide registry, created with the built-ins on first use.
    pub fn global() -> Arc<PluginRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Adds a plugin. A plugin with the same name is replaced in place,
    /// keeping its position in the detection order.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let mut guard = self.plugins.write();
        let mut next: Vec<Arc<dyn Plugin>> = guard.as_ref().clone();
        match next.iter().position(|p| p.name() == plugin.name()) {
            Some(index) => {
                warn!("replacing registered plugin `{}`", plugin.name());
                next[index] = plugin;
            }
            None => {
                debug!("registered plugin `{}`", plugin.name());
                next.push(plugin);
            }
        }
        *guard = Arc::new(next);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Removes a plugin by name. Returns whether one was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut guard = self.plugins.write();
        if !guard.iter().any(|p| p.name() == name) {
            return false;
        }
        let next: Vec<Arc<dyn Plugin>> = guard
            .iter()
            .filter(|p| p.name() != name)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("unregistered plugin `{name}`");
        true
    }

    /// Looks up a plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.snapshot().iter().find(|p| p.name() == name).cloned()
    }

    /// The current plugin list, in registration order.
    pub fn snapshot(&self) -> PluginList {
        Arc::clone(&self.plugins.read())
    }

    /// Names of all registered plugins, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|p| p.name().to_string()).collect()
    }

    /// Plugins that handle `:::` blocks.
    pub fn block_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.snapshot().iter().filter(|p| p.is_block()).cloned().collect()
    }

    /// Plugins that handle inline text.
    pub fn inline_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.snapshot().iter().filter(|p| p.is_inline()).cloned().collect()
    }

    /// Changes every time the plugin set changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// True when some block plugin's pattern matches the opener line.
    pub fn claims_block(&self, opener: &str) -> bool {
        let opener = opener.trim();
        self.snapshot()
            .iter()
            .any(|p| p.block_pattern().is_some_and(|re| re.is_match(opener)))
    }

    /// Runs the block plugins whose pattern matches `opener`, in order.
    ///
    /// The first plugin that parses, renders, and validates wins. A plugin
    /// that declines or fails is skipped; `None` means no plugin produced a
    /// node and the caller keeps the source text.
    pub fn process_block_text(
        &self,
        opening: &DirectiveOpening,
        opener: &str,
        body: &str,
        ctx: &mut dyn RenderContext,
    ) -> Option<Node> {
        let opener = opener.trim();
        for plugin in self.snapshot().iter() {
            let Some(pattern) = plugin.block_pattern() else {
                continue;
            };
            if !pattern.is_match(opener) {
                continue;
            }
            let input = PluginInput::Block { opening, body };
            match run_plugin(plugin.as_ref(), input, ctx) {
                Ok(Some(node)) => return Some(node),
                Ok(None) => {}
                Err(err) => warn!("skipped block plugin: {err}"),
            }
        }
        None
    }

    /// Replaces inline plugin matches in `text` with rendered nodes.
    ///
    /// At each position the earliest match across all inline plugins is
    /// tried; ties go to the plugin registered first. When that plugin
    /// declines or fails, the scan moves one character on and the matched
    /// text stays literal.
    pub fn process_inline_text(
        &self,
        text: &str,
        ctx: &mut dyn RenderContext,
    ) -> Vec<InlineSegment> {
        let plugins: Vec<Arc<dyn Plugin>> = self
            .snapshot()
            .iter()
            .filter(|p| p.is_inline())
            .cloned()
            .collect();
        if plugins.is_empty() || text.is_empty() {
            return vec![InlineSegment::Text(text.to_string())];
        }

        let mut segments = Vec::new();
        let mut pending = String::new();
        let mut cursor = 0;
        let mut flushed = 0;

        while cursor < text.len() {
            let earliest = plugins
                .iter()
                .filter_map(|plugin| {
                    let pattern = plugin.inline_pattern()?;
                    let caps = pattern.captures_at(text, cursor)?;
                    let whole = caps.get(0)?;
                    Some((whole.start(), whole.end(), plugin, caps))
                })
                .filter(|(start, end, _, _)| end > start)
                .min_by_key(|(start, _, _, _)| *start);

            let Some((start, end, plugin, caps)) = earliest else {
                break;
            };

            let input = PluginInput::Inline {
                captures: &caps,
                haystack: text,
            };
            match run_plugin(plugin.as_ref(), input, ctx) {
                Ok(Some(node)) => {
                    pending.push_str(&text[flushed..start]);
                    if !pending.is_empty() {
                        segments.push(InlineSegment::Text(std::mem::take(&mut pending)));
                    }
                    segments.push(InlineSegment::Node(node));
                    cursor = end;
                    flushed = end;
                }
                Ok(None) => cursor = next_char(text, start),
                Err(err) => {
                    warn!("skipped inline plugin: {err}");
                    cursor = next_char(text, start);
                }
            }
        }

        pending.push_str(&text[flushed..]);
        if !pending.is_empty() {
            segments.push(InlineSegment::Text(pending));
        }
        segments
    }
}

/// Parses, renders and validates one match. An error or a panic inside the
/// plugin is reported against the plugin's name.
fn run_plugin(
    plugin: &dyn Plugin,
    input: PluginInput<'_>,
    ctx: &mut dyn RenderContext,
) -> Result<Option<Node>, ConvertError> {
    let steps = AssertUnwindSafe(|| -> Result<Option<Node>, PluginError> {
        let Some(parsed) = plugin.parse(input)? else {
            return Ok(None);
        };
        let node = plugin.render(parsed, ctx)?;
        plugin.validate(&node)?;
        Ok(Some(node))
    });
    match panic::catch_unwind(steps) {
        Ok(result) => result.map_err(|err| ConvertError::from_plugin(plugin.name(), err)),
        Err(payload) => Err(ConvertError::Plugin {
            name: plugin.name().to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn next_char(text: &str, at: usize) -> usize {
    at + text[at..].chars().next().map_or(1, char::len_utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use adfmark_core::NodeType;
    use once_cell::sync::Lazy;
    use regex::Regex;

    struct NullContext(Limits);

    impl RenderContext for NullContext {
        fn render_blocks(&mut self, markdown: &str) -> Result<Vec<Node>, ConvertError> {
            Ok(vec![Node::paragraph(vec![Node::text(markdown)])])
        }
        fn render_inline(&mut self, text: &str) -> Vec<Node> {
            vec![Node::text(text)]
        }
        fn limits(&self) -> &Limits {
            &self.0
        }
        fn depth(&self) -> usize {
            0
        }
    }

    static SHOUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!(\w+)!").expect("valid regex"));

    /// Renders `!word!` as an emoji node; declines `!skip!`, fails on `!fail!`,
    /// panics on `!panic!`.
    struct Shout(&'static str);

    impl Plugin for Shout {
        fn name(&self) -> &str {
            self.0
        }
        fn inline_pattern(&self) -> Option<&Regex> {
            Some(&SHOUT_RE)
        }
        fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
            let PluginInput::Inline { captures, .. } = input else {
                return Ok(None);
            };
            match &captures[1] {
                "skip" => Ok(None),
                "fail" => Err(PluginError::syntax("no")),
                "panic" => panic!("shout cannot parse this"),
                word => Ok(Some(Parsed::with_body(word))),
            }
        }
        fn render(&self, parsed: Parsed, _: &mut dyn RenderContext) -> Result<Node, PluginError> {
            Ok(Node::leaf(NodeType::Emoji).with_attr("text", format!("{}:{}", self.0, parsed.body)))
        }
    }

    fn ctx() -> NullContext {
        NullContext(Limits::default())
    }

    #[test]
    fn register_replaces_by_name() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("a")));
        registry.register(Arc::new(Shout("b")));
        let before = registry.generation();
        registry.register(Arc::new(Shout("a")));
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.generation() > before);
    }

    #[test]
    fn unregister_reports_presence() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("a")));
        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn snapshot_is_stable_across_register() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("a")));
        let snapshot = registry.snapshot();
        registry.register(Arc::new(Shout("b")));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn inline_matches_become_nodes() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("a")));
        let segments = registry.process_inline_text("x !hi! y", &mut ctx());
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], InlineSegment::Text("x ".into()));
        assert!(matches!(&segments[1], InlineSegment::Node(n) if n.attr_str("text") == Some("a:hi")));
        assert_eq!(segments[2], InlineSegment::Text(" y".into()));
    }

    #[test]
    fn first_registered_wins_ties() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("first")));
        registry.register(Arc::new(Shout("second")));
        let segments = registry.process_inline_text("!go!", &mut ctx());
        assert!(matches!(&segments[0], InlineSegment::Node(n) if n.attr_str("text") == Some("first:go")));
    }

    #[test]
    fn declined_and_failed_matches_stay_literal() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("a")));
        let segments = registry.process_inline_text("!skip! !fail! !ok!", &mut ctx());
        assert_eq!(segments[0], InlineSegment::Text("!skip! !fail! ".into()));
        assert!(matches!(&segments[1], InlineSegment::Node(_)));
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn panicking_plugin_is_skipped() {
        let registry = PluginRegistry::new();
        registry.register(Arc::new(Shout("a")));
        let segments = registry.process_inline_text("!panic! !ok!", &mut ctx());
        assert_eq!(segments[0], InlineSegment::Text("!panic! ".into()));
        assert!(matches!(&segments[1], InlineSegment::Node(n) if n.attr_str("text") == Some("a:ok")));
    }

    #[test]
    fn plugin_failures_name_the_plugin() {
        let mut ctx = ctx();
        let caps = SHOUT_RE.captures("!panic!").expect("matches");
        let input = PluginInput::Inline {
            captures: &caps,
            haystack: "!panic!",
        };
        let err = run_plugin(&Shout("loud"), input, &mut ctx).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Plugin `loud` failed: shout cannot parse this"
        );

        let caps = SHOUT_RE.captures("!fail!").expect("matches");
        let input = PluginInput::Inline {
            captures: &caps,
            haystack: "!fail!",
        };
        let err = run_plugin(&Shout("loud"), input, &mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "Plugin `loud` failed: invalid syntax: no");
    }

    #[test]
    fn no_plugins_returns_text() {
        let registry = PluginRegistry::new();
        assert_eq!(
            registry.process_inline_text("plain", &mut ctx()),
            vec![InlineSegment::Text("plain".into())]
        );
    }

    #[test]
    fn builtins_split_by_kind() {
        let registry = PluginRegistry::with_builtins();
        let blocks: Vec<String> = registry.block_plugins().iter().map(|p| p.name().to_string()).collect();
        let inline: Vec<String> = registry.inline_plugins().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(blocks, vec!["panel", "expand", "media", "layout"]);
        assert_eq!(inline, vec!["status", "date", "mention", "emoji"]);
    }

    #[test]
    fn claims_block_uses_patterns() {
        let registry = PluginRegistry::with_builtins();
        assert!(registry.claims_block(":::panel type=\"info\""));
        assert!(registry.claims_block("::: expand"));
        assert!(!registry.claims_block(":::unknown"));
    }
}
