pub mod handlers;
pub mod routes;
pub mod server;

pub use routes::RouteTable;
pub use server::{build_app, serve};
