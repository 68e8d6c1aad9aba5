//! Command line administration of a portal database.
//!
//! Commands operate on the database directly with full rights, they are
//! meant for the operator of the server rather than for portal users.

pub mod commands;
pub mod globalsettings;
pub mod output;
