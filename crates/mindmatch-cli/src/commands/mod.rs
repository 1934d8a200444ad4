pub mod auth_cmd;
pub mod common;
pub mod delete;
pub mod list;
pub mod new;
pub mod pending;
pub mod show;
pub mod status;
pub mod sync;
pub mod write;
