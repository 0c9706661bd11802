pub mod policy;
mod principal;

pub use policy::{grant, permit, require_admin, Grant, Owned};
pub use principal::Principal;
