//! Nitro command-line library
//!
//! Command handlers behind the `nitro` binary, kept in a library so they can
//! be driven from tests.

pub mod commands;
pub mod output;

pub use crate::commands::{
    extract::handle as handle_extract, info::handle as handle_info,
    pack::handle as handle_pack, tree::handle as handle_tree,
};
pub use crate::output::OutputFormat;
