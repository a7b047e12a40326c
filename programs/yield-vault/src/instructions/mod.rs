pub mod admin;
pub mod deposit;
pub mod emergency;
pub mod fees;
pub mod initialize;
pub mod sources;
pub mod strategy;
pub mod upgrade;
pub mod views;
pub mod withdraw;

pub use admin::*;
pub use deposit::*;
pub use emergency::*;
pub use fees::*;
pub use initialize::*;
pub use sources::*;
pub use strategy::*;
pub use upgrade::*;
pub use views::*;
pub use withdraw::*;
