//! Domain logic for tunegrab: conversion jobs, their supervisors, and the
//! reclamation sweep.
//!
//! Nothing in this crate knows about HTTP. The API crate owns an
//! [`store::JobStore`] and a [`scheduler::Scheduler`] and translates their
//! state into responses.

pub mod artifact;
pub mod dependencies;
pub mod error;
pub mod job;
pub mod line_buffer;
pub mod progress;
pub mod scheduler;
pub mod source_url;
pub mod store;
pub mod supervisor;
pub mod sweep;
pub mod types;
