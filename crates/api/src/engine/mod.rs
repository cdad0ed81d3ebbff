//! Glue between inbound worker callbacks and the stage engine.

pub mod callbacks;
