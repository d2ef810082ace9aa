/// DIDgeridoo - ATProto handle resolution for a site and its members
///
/// Serves `/.well-known/atproto-did` for the site's root domain and, in
/// organization mode, for `<label>.[<subdomain>.]<site>` handles.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod profiles;
pub mod resolver;
pub mod server;
pub mod settings;
pub mod validation;

pub use context::AppContext;
pub use error::{DidgeridooError, DidgeridooResult};
