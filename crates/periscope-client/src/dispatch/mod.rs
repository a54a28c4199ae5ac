//! RPC dispatch between the desktop and registered plugins.
//!
//! The dispatcher decodes each inbound message, routes calls by method name
//! and sends exactly one response per call that carries an id. It also
//! correlates calls the client starts itself (plugin pushes) with the
//! desktop's responses.
//!
//! ## Methods
//!
//! | method | effect | success payload |
//! |---|---|---|
//! | `getPlugins` | lists plugins in registration order | `{"plugins": [..]}` |
//! | `getBackgroundPlugins` | lists background-eligible plugins | `{"plugins": [..]}` |
//! | `init` | connects `params.plugin` | `{}` |
//! | `deinit` | disconnects `params.plugin` | `{}` |
//! | `execute` | calls `params.method` on plugin `params.api` | plugin-defined |
//!
//! Failures are answered with `{"name": .., "message": ..}` in the response's
//! `error` field.

mod dispatcher;
mod errors;
mod pending;
mod router;
mod session;

pub use self::dispatcher::{Dispatcher, SessionSummary};
pub use self::errors::DispatchError;
pub use self::router::Method;
pub use self::session::Generation;
