//! Radio Control Logic
//!
//! Session state and preset stations. Implements the functional core
//! shared by the front panel and the remote-control protocol.

pub mod session;
pub mod stations;
