//! Attendance workflow over the `model` entities.
//!
//! Every operation takes a database connection and returns
//! [`error::Result`]. The HTTP layer decides who may call what through
//! [`access`]; finer checks (a teacher touching only their own subjects)
//! happen here.

pub mod access;
pub mod attendance;
pub mod error;
pub mod identity;
pub mod roster;
pub mod session;

#[cfg(test)]
mod testing;

pub use error::{ComputeError, Result};
