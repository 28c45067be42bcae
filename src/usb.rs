//! USB Subsystem
//!
//! CDC ACM serial port carrying the remote-control protocol.

pub mod cdc;
