//! Command implementations.

pub mod backup;
pub mod quick;
pub mod restore;
