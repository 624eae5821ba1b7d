//! TCP server: accept loop, workers, and the per-connection dispatcher

pub mod dispatcher;
pub mod server;

pub use dispatcher::Dispatcher;
pub use server::{Server, ServerConfig};
