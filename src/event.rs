use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::error::Result;
use crate::page::Page;

/// Extra argument carried by a triggered event.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Node(NodeId),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => f.write_str(&format_number(*v)),
            Self::Null => f.write_str("null"),
            Self::Node(node) => write!(f, "node-{}", node.0),
        }
    }
}

/// Integral numbers render without a fractional part.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Self::Node(value)
    }
}

/// One occurrence of an event travelling through the document.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: NodeId,
    pub(crate) current_target: NodeId,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was fired on.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The node whose listener is currently running: the matched element for
    /// delegated listeners, the document for direct ones.
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

/// Raw document listener, as registered with [`Page::on`].
pub type ListenerFn = Rc<dyn Fn(&mut Page, &mut Event, &[Value]) -> Result<()>>;

/// Decides whether a delegated listener applies to a node on the event path.
pub(crate) type Matcher = Rc<dyn Fn(&Page, NodeId) -> bool>;

#[derive(Clone)]
pub(crate) enum Scope {
    Direct,
    Delegated(Matcher),
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) scope: Scope,
    pub(crate) callback: ListenerFn,
}

/// Listeners attached to the document, per event type, in attachment order.
#[derive(Default, Clone)]
pub(crate) struct ListenerStore {
    map: HashMap<String, Vec<Listener>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, event: &str, listener: Listener) {
        self.map.entry(event.to_string()).or_default().push(listener);
    }

    pub(crate) fn get(&self, event: &str) -> Vec<Listener> {
        self.map.get(event).cloned().unwrap_or_default()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.map.get(event).map_or(0, Vec::len)
    }
}
