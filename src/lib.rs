pub mod aggregate;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod listing;
pub mod locate;
pub mod marketplace;
pub mod pipeline;
pub mod price;
pub mod rank;
pub mod validate;

pub use error::{PricewiseError, Result};
