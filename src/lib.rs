//! Move selection for a chess opponent that cascades through an opening book,
//! a remote reasoning service and a local UCI engine.

pub mod book;
pub mod breaker;
pub mod commentary;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod logging;
pub mod oracle;
pub mod reasoning;
pub mod util;

pub use oracle::{MoveResult, MoveSource, Oracle, OracleError, OracleSettings, Status};
