//! Request serving for CheckUser.
//!
//! An accept loop pushes connections onto a bounded queue drained by a
//! fixed pool of workers. Each worker reads one request line, dispatches
//! the command through the [`CommandRegistry`], and writes a JSON
//! response before closing the connection.

pub mod app;
pub mod command;
pub mod handler;
pub mod limits;
pub mod pool;
pub mod request;
pub mod response;
pub mod server;

pub use command::{Command, CommandError, CommandRegistry};
pub use handler::ConnectionHandler;
pub use pool::{PendingConnection, WorkerPool};
pub use server::RequestServer;
