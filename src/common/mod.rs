//! Common utilities shared between client and server roles

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
