//! Proctored interview session engine.
//!
//! One `SessionController` per interview owns all session state and runs on its
//! own event queue (`runtime`). Question timing (`clock`, `timer`), integrity
//! policy (`monitor`, `signals`) and scoring collaborators feed that queue; the
//! `report` aggregator turns a finished interview into a `FinalReport`.

pub mod clock;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod models;
pub mod monitor;
pub mod observer;
pub mod profile;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod signals;
pub mod store;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;
