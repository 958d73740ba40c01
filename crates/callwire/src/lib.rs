#![doc = include_str!("../README.md")]

mod call;
mod channel;
mod client;
mod codec;
mod config;
mod context;
pub mod deadline;
mod error;
mod handler;
mod registry;
mod server;
mod status;
mod transport;


pub use crate::call::*;
pub use crate::channel::*;
pub use crate::client::*;
pub use crate::codec::*;
pub use crate::config::*;
pub use crate::context::*;
pub use crate::error::*;
pub use crate::handler::*;
pub use crate::registry::*;
pub use crate::server::*;
pub use crate::status::*;
pub use crate::transport::*;
