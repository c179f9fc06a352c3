//! Common test utilities for the webserver tests

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{send, server_with, TestResponse};
