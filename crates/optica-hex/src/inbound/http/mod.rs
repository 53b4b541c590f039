pub mod identity;
mod server;

pub use identity::RequestIdentity;
pub use server::{HttpServer, HttpServerConfig};
