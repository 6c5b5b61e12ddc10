#[path = "../common/mod.rs"]
mod common;

mod config_file;
mod lifecycle;
mod notifications;
mod relationships;
