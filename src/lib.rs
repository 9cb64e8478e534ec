#![cfg_attr(not(test), no_std)]

// Declared before every other module so the logging macros are in scope.
pub(crate) mod fmt;

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod sim;

#[cfg(test)]
mod hex;
#[cfg(test)]
mod test_helpers;
