//! Turn exchange: the controller that runs one request/response cycle,
//! reply extraction policy, and the single-slot session guard.

pub mod controller;
pub mod reply;
pub mod session;
