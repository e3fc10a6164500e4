//! Stateful view components driven by websocket sessions and bus events.
//!
//! ARCHITECTURE
//! ============
//! A component owns view state only. Collaborators (store, policy, bus,
//! acting principal) arrive per call, so the same instance can be driven by
//! a websocket session, a REST handler, or a test.

pub mod question_list;
