use std::rc::Rc;

use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::event::{Event, Value};
use crate::page::Page;
use crate::registry::{HandlerFn, ObserverFn};
use crate::tokens::{is_single_token, tokenize};

/// Which events a handler name listens for, and with which callback.
pub enum HandlerSpec {
    /// The configured activation event (`click` by default).
    Activate(HandlerFn),
    /// A single named event.
    On(String, HandlerFn),
    /// Several events, each with its own callback, registered in order.
    Map(Vec<(String, HandlerFn)>),
}

impl HandlerSpec {
    pub fn activate<F>(callback: F) -> Self
    where
        F: Fn(&mut Page, &Event, NodeId) -> Result<()> + 'static,
    {
        Self::Activate(Rc::new(callback))
    }

    pub fn on<F>(event: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut Page, &Event, NodeId) -> Result<()> + 'static,
    {
        Self::On(event.into(), Rc::new(callback))
    }

    pub fn map<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (E, HandlerFn)>,
        E: Into<String>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(event, callback)| (event.into(), callback))
                .collect(),
        )
    }

    /// Wraps a closure as a [`HandlerFn`] for use with [`HandlerSpec::map`].
    pub fn callback<F>(callback: F) -> HandlerFn
    where
        F: Fn(&mut Page, &Event, NodeId) -> Result<()> + 'static,
    {
        Rc::new(callback)
    }

    fn into_pairs(self, default_event: &str) -> Vec<(String, HandlerFn)> {
        match self {
            Self::Activate(callback) => vec![(default_event.to_string(), callback)],
            Self::On(event, callback) => vec![(event, callback)],
            Self::Map(pairs) => pairs,
        }
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<()> {
    if is_single_token(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Runs `callback`, then fires `trigger` on the document once it succeeded.
fn chain_trigger(callback: HandlerFn, trigger: Rc<str>) -> HandlerFn {
    Rc::new(move |page: &mut Page, event: &Event, element: NodeId| {
        callback(page, event, element)?;
        page.trigger(&trigger, &[])?;
        Ok(())
    })
}

impl Page {
    /// Registers callbacks for elements declaring `handler` in their handler
    /// attribute.
    ///
    /// With `trigger`, every callback is followed by a document-level firing of
    /// that event name, which is how a handler hands over to observers. Names
    /// are validated before anything is registered. Registering the same
    /// callback twice makes it run twice.
    pub fn add_handler(
        &mut self,
        handler: &str,
        spec: HandlerSpec,
        trigger: Option<&str>,
    ) -> Result<&mut Self> {
        check_name("handler", handler)?;
        if let Some(trigger) = trigger {
            check_name("trigger", trigger)?;
        }
        let pairs = spec.into_pairs(self.engine.config.default_event());
        for (event, _) in &pairs {
            check_name("event", event)?;
        }

        let trigger: Option<Rc<str>> = trigger.map(Rc::from);
        for (event, callback) in pairs {
            let callback = match &trigger {
                Some(trigger) => chain_trigger(callback, Rc::clone(trigger)),
                None => callback,
            };
            if self.engine.handlers.register(&event, handler, callback) {
                self.bind_handler_listener(&event);
            }
            tracing::trace!(
                target: "handob",
                handler,
                event = %event,
                trigger = trigger.as_deref(),
                "handler registered"
            );
        }
        Ok(self)
    }

    /// Registers `callback` for each of the space-separated `events`; on every
    /// firing it runs once per element declaring `observer`.
    pub fn add_observer<F>(&mut self, events: &str, observer: &str, callback: F) -> Result<&mut Self>
    where
        F: Fn(&mut Page, &Event, NodeId, &[Value]) -> Result<()> + 'static,
    {
        self.add_observer_fn(events, observer, Rc::new(callback))
    }

    pub fn add_observer_fn(
        &mut self,
        events: &str,
        observer: &str,
        callback: ObserverFn,
    ) -> Result<&mut Self> {
        check_name("observer", observer)?;
        let events = tokenize(Some(events));
        if events.is_empty() {
            return Err(Error::InvalidName {
                kind: "event",
                name: String::new(),
            });
        }

        for event in events {
            if self
                .engine
                .observers
                .register(&event, observer, Rc::clone(&callback))
            {
                self.bind_observer_listener(&event);
            }
            tracing::trace!(target: "handob", observer, event = %event, "observer registered");
        }
        Ok(self)
    }

    /// Look up `data-<prefix>handler` / `data-<prefix>observer` from now on.
    pub fn enable_prefix(&mut self) -> &mut Self {
        self.engine.config.set_prefix_enabled(true);
        self
    }

    /// Look up plain `data-handler` / `data-observer` from now on. Registered
    /// callbacks are unaffected.
    pub fn disable_prefix(&mut self) -> &mut Self {
        self.engine.config.set_prefix_enabled(false);
        self
    }
}
