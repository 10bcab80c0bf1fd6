pub mod command;
pub mod download;
pub mod extract;
pub mod mover;
pub mod platform;
