//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own persistence, authorization, and event delivery so
//! route handlers and components stay focused on protocol translation and
//! view state.

pub mod bus;
pub mod policy;
pub mod question;
pub mod session;
