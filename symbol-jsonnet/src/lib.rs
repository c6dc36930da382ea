//! Semantic core of a Jsonnet language server: static analysis, scopes, cross-file resolution and
//! the queries an editor asks about a position in a file.
//!
//! Queries go through an [`Engine`]. Each one parses the text it's given afresh, while files reached
//! through `import` are parsed once and cached in a [`NodeCache`] until they change on the
//! [`Host`].

pub mod analysis;
pub mod cache;
pub mod file;
pub mod graph;
pub mod host;
pub mod locate;
pub mod query;
pub mod scope;

pub use cache::NodeCache;
pub use file::ParsedFile;
pub use host::Host;
pub use host::HostError;
pub use host::MemoryHost;
pub use host::OsHost;
pub use query::Engine;
pub use query::EngineConfig;
pub use query::QueryError;
pub use query::QueryResult;

/// Name the standard library is bound to in every file.
pub const STD: &str = "std";
