use std::rc::Rc;

use crate::binder::BoundEvents;
use crate::config::Config;
use crate::dom::{Dom, NodeId, truncate_chars};
use crate::error::{Error, Result};
use crate::event::{Event, Listener, ListenerFn, ListenerStore, Matcher, Scope, Value};
use crate::html::parse_html;
use crate::registry::{HandlerRegistry, ObserverRegistry};
use crate::selector::Selector;
use crate::trace::{TraceCategory, TraceLog};

const DEFAULT_DISPATCH_DEPTH_LIMIT: usize = 256;
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Registries and listener bookkeeping for one document.
#[derive(Default, Clone)]
pub(crate) struct Engine {
    pub(crate) config: Config,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) observers: ObserverRegistry,
    pub(crate) bound: BoundEvents,
}

/// A document together with its handler and observer registries.
///
/// All dispatch is synchronous. Callbacks receive `&mut Page` and may register
/// more callbacks, edit the document or trigger further events; such nested
/// firings run to completion before the outer one continues.
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) engine: Engine,
    pub(crate) trace: TraceLog,
    depth: usize,
    depth_limit: usize,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::with_config(html, Config::default())
    }

    pub fn with_config(html: &str, config: Config) -> Result<Self> {
        config.validate()?;
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            engine: Engine {
                config,
                ..Engine::default()
            },
            trace: TraceLog::default(),
            depth: 0,
            depth_limit: DEFAULT_DISPATCH_DEPTH_LIMIT,
        })
    }

    pub fn config(&self) -> &Config {
        &self.engine.config
    }

    /// The document node; target of [`Page::trigger`].
    pub fn document(&self) -> NodeId {
        self.dom.root
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.set_enabled(enabled);
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }

    pub fn set_trace_bindings(&mut self, enabled: bool) {
        self.trace.set_bindings(enabled);
    }

    pub fn set_trace_dispatch(&mut self, enabled: bool) {
        self.trace.set_dispatch(enabled);
    }

    /// Forward recorded trace lines to the `tracing` subscriber as well.
    pub fn set_trace_emit(&mut self, enabled: bool) {
        self.trace.set_emit(enabled);
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        self.trace.set_limit(max_entries)
    }

    /// Maximum nesting of firings inside callbacks before dispatch fails with
    /// [`Error::DispatchDepthExceeded`].
    pub fn set_dispatch_depth_limit(&mut self, max_depth: usize) -> Result<()> {
        if max_depth == 0 {
            return Err(Error::InvalidConfig(
                "dispatch depth limit requires at least 1 level".into(),
            ));
        }
        self.depth_limit = max_depth;
        Ok(())
    }

    /// Attaches a listener to the document. With a selector the listener is
    /// delegated: it runs once for every element on the event path that matches,
    /// innermost first. Without one it runs once per event reaching the document.
    pub fn on<F>(&mut self, event: &str, selector: Option<&str>, callback: F) -> Result<&mut Self>
    where
        F: Fn(&mut Page, &mut Event, &[Value]) -> Result<()> + 'static,
    {
        let scope = match selector {
            Some(selector) => {
                let selector = Selector::parse(selector)?;
                let matcher: Matcher =
                    Rc::new(move |page: &Page, node: NodeId| selector.matches(&page.dom, node));
                Scope::Delegated(matcher)
            }
            None => Scope::Direct,
        };
        self.attach(event, scope, Rc::new(callback));
        Ok(self)
    }

    pub(crate) fn attach(&mut self, event: &str, scope: Scope, callback: ListenerFn) {
        self.listeners.add(event, Listener { scope, callback });
    }

    /// Number of listeners attached for `event`, delegated and direct.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.count(event)
    }

    /// Fires `event` on the document with extra arguments.
    pub fn trigger(&mut self, event: &str, args: &[Value]) -> Result<Event> {
        let root = self.dom.root;
        self.fire(root, event, args)
    }

    /// Fires `event` on the first element matching `selector`.
    pub fn dispatch(&mut self, selector: &str, event: &str, args: &[Value]) -> Result<Event> {
        let target = self.select_one(selector)?;
        self.fire(target, event, args)
    }

    /// Fires `event` on `target`.
    pub fn dispatch_on(&mut self, target: NodeId, event: &str, args: &[Value]) -> Result<Event> {
        self.check_node(target)?;
        self.fire(target, event, args)
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.fire(target, "click", &[])?;
        Ok(())
    }

    fn fire(&mut self, target: NodeId, event_type: &str, args: &[Value]) -> Result<Event> {
        if self.depth >= self.depth_limit {
            return Err(Error::DispatchDepthExceeded {
                event: event_type.to_string(),
                limit: self.depth_limit,
            });
        }
        self.depth += 1;
        let outcome = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.fire_inner(target, event_type, args)
        });
        self.depth -= 1;
        outcome
    }

    fn fire_inner(&mut self, target: NodeId, event_type: &str, args: &[Value]) -> Result<Event> {
        let mut event = Event::new(event_type, target);
        let root = self.dom.root;

        if !self.dom.is_connected(target) {
            self.trace_event_done(&event, "detached");
            return Ok(event);
        }

        let listeners = self.listeners.get(event_type);
        if listeners.is_empty() {
            self.trace_event_done(&event, "no_listeners");
            return Ok(event);
        }

        // The queue is fixed before any listener runs.
        let mut queue: Vec<(NodeId, ListenerFn)> = Vec::new();
        for node in self.dom.path_to_root(target) {
            if node == root {
                break;
            }
            for listener in &listeners {
                if let Scope::Delegated(matcher) = &listener.scope {
                    if matcher(&*self, node) {
                        queue.push((node, Rc::clone(&listener.callback)));
                    }
                }
            }
        }
        for listener in &listeners {
            if matches!(listener.scope, Scope::Direct) {
                queue.push((root, Rc::clone(&listener.callback)));
            }
        }

        let mut level = None;
        for (node, callback) in queue {
            if event.is_immediate_propagation_stopped() {
                break;
            }
            if event.is_propagation_stopped() && level != Some(node) {
                break;
            }
            level = Some(node);
            event.current_target = node;
            callback(self, &mut event, args)?;
        }

        let outcome = if event.is_propagation_stopped() {
            "propagation_stopped"
        } else {
            "completed"
        };
        self.trace_event_done(&event, outcome);
        Ok(event)
    }

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        if !self.trace.wants(TraceCategory::Dispatch) {
            return;
        }
        let line = format!(
            "[event] done {} target={} current={} outcome={}",
            event.event_type(),
            self.dom.node_label(event.target()),
            self.dom.node_label(event.current_target()),
            outcome
        );
        self.trace.record(TraceCategory::Dispatch, line);
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        Ok(Selector::parse(selector)?.query_all(&self.dom))
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if self.dom.is_valid_node(node) {
            Ok(())
        } else {
            Err(Error::NotAnElement(node))
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.dom.tag_name(node)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.dom.attr(node, name)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node, name)
    }

    pub fn text_content(&self, node: NodeId) -> Result<String> {
        self.check_node(node)?;
        Ok(self.dom.text_content(node))
    }

    pub fn set_text_content(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.dom.set_text_content(node, value)
    }

    /// Parses `html` and appends the resulting nodes to `parent`. Returns the
    /// appended top-level nodes.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        self.check_node(parent)?;
        let fragment = parse_html(html)?;
        self.dom.append_fragment(parent, &fragment)
    }

    /// Detaches `node` from the document. Its handle stays usable but the node
    /// no longer receives delegated events or observer notifications.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.check_node(node)?;
        self.dom.remove_node(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_valid_node(node) && self.dom.is_connected(node)
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: truncate_chars(&self.dom.dump_node(target), 200),
            });
        }
        Ok(())
    }
}
