//! Internal helper functions and utilities.
//!
//! This module contains shared implementation details that are not part
//! of the public API.

mod helpers;
mod policy;

pub(crate) use helpers::*;
pub(crate) use policy::*;
