pub mod attribution;
pub mod config;
pub mod page;
pub mod replay;
pub mod session;
pub mod trigger;
