//! Vault accounting engine
//!
//! Plain Rust over the program's account structs: the instruction handlers
//! hand in the accounts and a `YieldSource` adapter, the engine does the
//! share math, fee accrual, routing and source replacement.

pub mod fees;
pub mod ledger;
pub mod router;
pub mod upgrade;
pub mod vault;

pub use router::*;
pub use upgrade::*;
pub use vault::*;
