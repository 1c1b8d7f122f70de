pub mod commands;
pub mod handlers;
pub mod input;
pub mod output;
