//! Subcommand implementations.

pub(crate) mod control;
pub(crate) mod plugins;
pub(crate) mod routines;
