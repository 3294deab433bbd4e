//! Application services: the Markdown toggle controller and the seams it is
//! wired through.

pub mod context;
pub mod convert;
pub mod error;
pub mod hooks;
pub mod repos;
pub mod security;
pub mod toggle;
