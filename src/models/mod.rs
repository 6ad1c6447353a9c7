pub mod entitlement;
pub mod product;
pub mod provider_event;

pub use entitlement::*;
pub use product::*;
pub use provider_event::*;
