//! HTTP surface of the assignment engine

pub mod handlers;
