//! Core types and trait definitions for the Roster attendance desk.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::AttendanceStore`],
//! [`member::MemberDirectory`] and [`gate::GateProvider`]; the check-in /
//! check-out state machine lives in [`lifecycle::Attendance`], and the
//! checkout stub rules in [`reconcile`].

// Trait methods declare `impl Future + Send`; implementors write `async fn`.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod feed;
pub mod gate;
pub mod lifecycle;
pub mod member;
pub mod reconcile;
pub mod session;
pub mod store;

pub use error::{Error, Result};
