pub mod anchor;
pub mod classify;
pub mod deeplink;
pub mod diff;
pub mod error;
pub mod filter;
pub mod model;
pub mod payload;
pub mod render;
