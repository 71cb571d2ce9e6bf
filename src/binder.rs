use std::collections::HashSet;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::event::{Event, ListenerFn, Matcher, Scope, Value};
use crate::page::Page;
use crate::trace::TraceCategory;

/// Event names that already have their engine listener attached, kept apart
/// for the delegated handler side and the document-level observer side.
#[derive(Debug, Default, Clone)]
pub(crate) struct BoundEvents {
    handler: HashSet<String>,
    observer: HashSet<String>,
}

impl BoundEvents {
    pub(crate) fn has_handler_listener(&self, event: &str) -> bool {
        self.handler.contains(event)
    }

    pub(crate) fn has_observer_listener(&self, event: &str) -> bool {
        self.observer.contains(event)
    }
}

impl Page {
    /// Attaches the single delegated listener serving every handler name
    /// registered for `event`. Repeated calls for the same event are no-ops.
    ///
    /// The listener matches elements carrying the handler attribute under the
    /// prefix setting current at firing time, and stops propagation at the first
    /// match so outer handler elements do not see the same occurrence.
    pub(crate) fn bind_handler_listener(&mut self, event: &str) {
        if self.engine.bound.has_handler_listener(event) {
            return;
        }
        self.engine.bound.handler.insert(event.to_string());
        let matcher: Matcher = Rc::new(|page: &Page, node: NodeId| page.declares_handlers(node));
        let callback: ListenerFn = Rc::new(|page: &mut Page, event: &mut Event, _args: &[Value]| {
            event.stop_propagation();
            page.dispatch_handlers(event)
        });
        self.attach(event, Scope::Delegated(matcher), callback);

        if self.trace.wants(TraceCategory::Binding) {
            let line = format!(
                "[bind] handler {event} selector=[{}]",
                self.engine.config.handler_attr_name()
            );
            self.trace.record(TraceCategory::Binding, line);
        }
    }

    /// Attaches the single document-level listener notifying observers of
    /// `event`. Repeated calls for the same event are no-ops.
    pub(crate) fn bind_observer_listener(&mut self, event: &str) {
        if self.engine.bound.has_observer_listener(event) {
            return;
        }
        self.engine.bound.observer.insert(event.to_string());
        let callback: ListenerFn = Rc::new(|page: &mut Page, event: &mut Event, args: &[Value]| {
            page.dispatch_observers(event, args)
        });
        self.attach(event, Scope::Direct, callback);
        self.trace
            .record(TraceCategory::Binding, format!("[bind] observer {event} document"));
    }

    fn declares_handlers(&self, node: NodeId) -> bool {
        self.dom.has_attr(node, &self.engine.config.handler_attr_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    #[test]
    fn handler_binding_is_idempotent_per_event() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.bind_handler_listener("click");
        page.bind_handler_listener("click");
        page.bind_handler_listener("keyup");
        assert_eq!(page.listener_count("click"), 1);
        assert_eq!(page.listener_count("keyup"), 1);
        assert!(page.engine.bound.has_handler_listener("click"));
        assert!(!page.engine.bound.has_observer_listener("click"));
        Ok(())
    }

    #[test]
    fn observer_and_handler_sides_bind_separately() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.bind_handler_listener("refresh");
        page.bind_observer_listener("refresh");
        page.bind_observer_listener("refresh");
        assert_eq!(page.listener_count("refresh"), 2);
        assert!(page.engine.bound.has_observer_listener("refresh"));
        Ok(())
    }

    #[test]
    fn bindings_are_traced() -> Result<()> {
        let mut page = Page::from_html("")?;
        page.enable_trace(true);
        page.set_trace_emit(false);
        page.bind_handler_listener("click");
        page.bind_observer_listener("saved");
        assert_eq!(
            page.take_trace_logs(),
            vec![
                "[bind] handler click selector=[data-handob-handler]",
                "[bind] observer saved document",
            ]
        );
        Ok(())
    }

    #[test]
    fn handler_matcher_follows_the_prefix_setting() -> Result<()> {
        let mut page = Page::from_html(
            "<a id='p' data-handob-handler='x'></a><a id='u' data-handler='x'></a>",
        )?;
        let prefixed = page.query_selector("#p")?.ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        let plain = page.query_selector("#u")?.ok_or_else(|| Error::SelectorNotFound("#u".into()))?;
        assert!(page.declares_handlers(prefixed));
        assert!(!page.declares_handlers(plain));
        page.engine.config.set_prefix_enabled(false);
        assert!(!page.declares_handlers(prefixed));
        assert!(page.declares_handlers(plain));
        Ok(())
    }
}
