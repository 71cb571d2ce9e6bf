//! Markup-driven event dispatch.
//!
//! Elements opt into behaviour through attributes: `data-handob-handler` names the
//! handlers an element participates in, `data-handob-observer` names the observers it
//! declares. Application code registers callbacks against those names on a [`Page`]
//! without knowing which elements exist yet.
//!
//! ```
//! use handob::{HandlerSpec, Page, Result, Value};
//!
//! # fn main() -> Result<()> {
//! let mut page = Page::from_html(
//!     r#"<button id="save" data-handob-handler="save">Save</button>
//!        <p id="status" data-handob-observer="status"></p>"#,
//! )?;
//!
//! page.add_handler(
//!     "save",
//!     HandlerSpec::activate(|_page, _event, _element| Ok(())),
//!     Some("saved"),
//! )?
//! .add_observer("saved", "status", |page, _event, element, _args: &[Value]| {
//!     page.set_text_content(element, "saved")
//! })?;
//!
//! page.click("#save")?;
//! page.assert_text("#status", "saved")?;
//! # Ok(())
//! # }
//! ```

mod api;
mod binder;
mod config;
mod dispatch;
mod dom;
mod error;
mod event;
mod html;
mod page;
mod registry;
mod selector;
mod tokens;
mod trace;

pub use api::HandlerSpec;
pub use config::Config;
pub use dom::NodeId;
pub use error::{Error, Result};
pub use event::{Event, ListenerFn, Value};
pub use page::Page;
pub use registry::{HandlerFn, ObserverFn};
pub use tokens::{contains_token, tokenize};
