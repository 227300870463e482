//! Infrastructure layer for keyrelay-bridge.
//!
//! The infrastructure layer handles all I/O: opening and programming the
//! serial device, and accepting the single TCP client.
//!
//! # Responsibilities
//!
//! - Opening the serial device and configuring its line discipline
//! - Registering the serial descriptor with the tokio reactor
//! - Binding the TCP listener and accepting exactly one client
//! - Wiring both into the forwarding engine for one session
//!
//! # What does NOT belong here?
//!
//! - The copy loops themselves (that is the application layer)
//! - Configuration types (that is the domain layer)
//! - Argument parsing (that is done in `main.rs`)

pub mod acceptor;
pub mod serial;
pub mod session;

// Re-export the primary entry point so `main.rs` can call it concisely.
pub use session::Bridge;
