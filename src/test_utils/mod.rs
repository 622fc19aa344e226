//! Helpers shared by unit tests: polling and fake consumer trees.
mod common;

pub(crate) use common::*;
