pub mod analysis;
pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod fetch;
pub mod locate;
pub mod monitor;
pub mod mutation;
pub mod node;
pub mod notify;
pub mod payment;
pub mod price;
pub mod reconcile;
pub mod rules;
pub mod select;
pub mod trigger;

pub use error::{FeescopeError, Result};
