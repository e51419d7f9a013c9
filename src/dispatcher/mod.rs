//! # Dispatcher Module
//!
//! The state machine that drives one request through the fixed processing
//! lifecycle:
//!
//! ```text
//! Start → Route → Pre-Dispatch → Dispatch → Post-Dispatch → Output → End
//! ```
//!
//! Each phase runs exactly once per [`Dispatcher::run`] call. A failure in
//! any phase abandons the loop and passes control once to the exception
//! phase, which invokes the `on_exception` hook, classifies the failure
//! into a terminal 404/405/500 response (HTML-shaped when the client
//! accepts HTML), outputs it, and resets the machine to idle. Fatal kinds —
//! re-entrancy, phase violations, route conflicts — and the configured
//! surface-errors mode re-raise to the host instead.
//!
//! Collaborators can steer a run through the injection surface:
//! [`Dispatcher::dispatch_resource`] skips resolution (allowed in
//! Start/Route/Pre-Dispatch) and [`Dispatcher::output_response`] skips ahead
//! to Output (allowed anywhere but End). Inputs — the request, the resource
//! map — may only be replaced while the machine is in Start, which is also
//! its idle state; later phases have already committed to values derived
//! from them.
//!
//! One `run()` processes one request to completion; a nested or concurrent
//! `run()` on the same instance fails fast with `AlreadyRunning` and leaves
//! the active run untouched.

mod core;
mod respond;

pub use core::{DispatchPhase, Dispatcher};
pub use respond::ErrorResponder;
