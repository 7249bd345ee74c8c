//! CLI module for bitclass

pub mod commands;
pub mod format;
