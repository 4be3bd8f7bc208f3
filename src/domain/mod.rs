// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Domain types for the debugger message schema: extracted GL entries and the generated document.

pub mod entry;
pub mod schema;
