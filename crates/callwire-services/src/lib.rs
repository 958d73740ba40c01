#![doc = include_str!("../README.md")]

mod calculator;
mod client;
mod greeter;
pub mod proto;

#[cfg(test)]
mod tests;

pub use crate::calculator::*;
pub use crate::client::*;
pub use crate::greeter::*;
// Public re-export so downstream crates can reach the engine via
// `callwire_services::callwire`
pub use callwire;

use callwire::{Registry, RegistryBuilder};

/// Builds a registry serving both demo services.
///
/// # Errors
///
/// Returns an error if the two services declare overlapping methods.
pub fn registry(greeter: GreeterConfig) -> callwire::Result<Registry> {
    let mut builder = RegistryBuilder::new();
    Calculator.register(&mut builder)?;
    Greeter::new(greeter).register(&mut builder)?;
    Ok(builder.build())
}
