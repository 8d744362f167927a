//! Command handlers

pub mod configure;
pub mod find;
