//! Infrastructure shared by the client library and binaries.

pub mod logging;
