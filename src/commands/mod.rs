//! Command implementations for the pricewise CLI

mod compare;
mod ledger;
mod misc;

pub use compare::*;
pub use ledger::*;
pub use misc::*;
