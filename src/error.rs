use crate::dom::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("callback failed: {0}")]
    Callback(String),
    #[error("dispatch of {event} exceeded the nesting limit of {limit}")]
    DispatchDepthExceeded { event: String, limit: usize },
    #[error("assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}
