// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Library entry point exposing the generator pipeline for the binary and integration tests.

pub mod compiler;
pub mod config;
pub mod domain;
pub mod generator;
pub mod telemetry;
