//! Routing of engine listener firings to registered callbacks.
//!
//! Neither dispatcher isolates callbacks from each other: the first callback
//! returning an error ends the pass and the error travels out of the firing
//! call, so later callbacks of that pass do not run. Effects of the callbacks
//! that already ran are kept.

use crate::dom::NodeId;
use crate::error::Result;
use crate::event::{Event, Value};
use crate::page::Page;
use crate::registry::HandlerFn;
use crate::selector::Selector;
use crate::tokens::{contains_token, tokenize};
use crate::trace::TraceCategory;

impl Page {
    /// Runs the handler callbacks for the element the delegated listener matched
    /// (`event.current_target()`), token by token in attribute order.
    pub(crate) fn dispatch_handlers(&mut self, event: &Event) -> Result<()> {
        let element = event.current_target();
        let attr = self.engine.config.handler_attr_name();
        let names = tokenize(self.dom.attr(element, &attr));

        let passes: Vec<(String, Vec<HandlerFn>)> = names
            .into_iter()
            .map(|name| {
                let callbacks = self.engine.handlers.callbacks_for(event.event_type(), &name);
                (name, callbacks)
            })
            .collect();

        for (name, callbacks) in passes {
            if self.trace.wants(TraceCategory::Dispatch) {
                let line = format!(
                    "[handler] {} name={} element={} callbacks={}",
                    event.event_type(),
                    name,
                    self.dom.node_label(element),
                    callbacks.len()
                );
                self.trace.record(TraceCategory::Dispatch, line);
            }
            for callback in callbacks {
                callback(self, event, element)?;
            }
        }
        Ok(())
    }

    /// Notifies every element declaring each registered observer name of
    /// `event`. The document is queried again for every entry.
    pub(crate) fn dispatch_observers(&mut self, event: &Event, args: &[Value]) -> Result<()> {
        let entries = self.engine.observers.entries_for(event.event_type());

        for entry in entries {
            let matched = self.observing_elements(&entry.observer);
            if self.trace.wants(TraceCategory::Dispatch) {
                let line = format!(
                    "[observer] {} name={} matched={} args={}",
                    event.event_type(),
                    entry.observer,
                    matched.len(),
                    args.len()
                );
                self.trace.record(TraceCategory::Dispatch, line);
            }
            for element in matched {
                (entry.callback)(self, event, element, args)?;
            }
        }
        Ok(())
    }

    /// Connected elements whose observer attribute lists `observer`, in
    /// document order.
    pub(crate) fn observing_elements(&self, observer: &str) -> Vec<NodeId> {
        let attr = self.engine.config.observer_attr_name();
        // The substring prefilter also accepts "xx" for "x"; membership decides.
        Selector::attr_contains(&attr, observer)
            .query_all(&self.dom)
            .into_iter()
            .filter(|node| contains_token(self.dom.attr(*node, &attr), observer))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::Error;

    #[test]
    fn observing_elements_uses_exact_tokens_in_document_order() -> Result<()> {
        let page = Page::from_html(
            r#"<div id="a" data-handob-observer="panel"></div>
               <div id="b" data-handob-observer="xpanel"></div>
               <section><p id="c" data-handob-observer="menu panel panel"></p></section>
               <div id="d" data-observer="panel"></div>"#,
        )?;
        let ids = page
            .observing_elements("panel")
            .into_iter()
            .map(|node| page.attr(node, "id").unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "c"]);
        Ok(())
    }

    #[test]
    fn handler_pass_snapshots_every_token_before_running() -> Result<()> {
        let mut page = Page::from_html(r#"<button id="b" data-handob-handler="a b">go</button>"#)?;
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        let late: HandlerFn = Rc::new(move |_: &mut Page, _: &Event, _: NodeId| {
            log.borrow_mut().push("late b");
            Ok(())
        });
        let log = Rc::clone(&seen);
        let first: HandlerFn = Rc::new(move |page: &mut Page, _: &Event, _: NodeId| {
            log.borrow_mut().push("a");
            page.engine.handlers.register("click", "b", Rc::clone(&late));
            Ok(())
        });
        page.engine.handlers.register("click", "a", first);
        page.bind_handler_listener("click");

        page.click("#b")?;
        assert_eq!(*seen.borrow(), vec!["a"]);

        page.click("#b")?;
        assert_eq!(*seen.borrow(), vec!["a", "a", "late b"]);
        Ok(())
    }

    #[test]
    fn observer_errors_stop_the_pass() -> Result<()> {
        let mut page = Page::from_html(
            r#"<p id="one" data-handob-observer="o"></p><p id="two" data-handob-observer="o"></p>"#,
        )?;
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        page.add_observer("tick", "o", move |_, _, _, _| {
            *counter.borrow_mut() += 1;
            Err(Error::Callback("observer failed".into()))
        })?;
        assert_eq!(
            page.trigger("tick", &[]).map(|_| ()),
            Err(Error::Callback("observer failed".into()))
        );
        assert_eq!(*count.borrow(), 1);
        Ok(())
    }

    #[test]
    fn dispatch_is_traced_per_name() -> Result<()> {
        let mut page = Page::from_html(
            r#"<button id="b" data-handob-handler="save">go</button><p data-handob-observer="status"></p>"#,
        )?;
        page.enable_trace(true);
        page.set_trace_emit(false);
        page.set_trace_bindings(false);
        page.add_handler("save", crate::HandlerSpec::activate(|_, _, _| Ok(())), Some("saved"))?;
        page.add_observer("saved", "status", |_, _, _, _| Ok(()))?;
        page.click("#b")?;
        let logs = page.take_trace_logs();
        assert!(logs.contains(&"[handler] click name=save element=button#b callbacks=1".to_string()));
        assert!(logs.contains(&"[observer] saved name=status matched=1 args=0".to_string()));
        assert!(!logs.iter().any(|line| line.starts_with("[bind]")));
        Ok(())
    }
}
