//! Control unit shared definitions: configuration, mode enums and
//! interlock flags.

pub mod config;
pub mod error;
pub mod state;
