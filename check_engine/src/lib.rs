//! Checkflow engine — parallel check orchestration for back-end design
//! review checklists.
//!
//! A checklist project holds check modules, each holding check items; an
//! item is a self-contained check over one or more report/log files that
//! emits a structured pass/fail verdict with waiver handling. This crate
//! provides:
//!
//! - the canonical result model ([`types`])
//! - the per-item log/report renderers ([`formatter`])
//! - the input-file parser toolkit ([`parser`])
//! - waiver parsing and matching ([`waivers`])
//! - one-call result assembly ([`builder`])
//! - the checker lifecycle and 4-way type detection ([`checker`],
//!   [`checkers`])
//! - the bounded result cache with an optional file tier ([`cache`])
//! - the dispatcher with process-level fan-out and timeouts
//!   ([`dispatcher`])
//! - the post-run aggregators ([`aggregate`])
//!
//! The `check_flow` binary wires these together behind the CLI.

pub mod aggregate;
pub mod builder;
pub mod cache;
pub mod checker;
pub mod checkers;
pub mod config;
pub mod dispatcher;
pub mod distribute;
pub mod formatter;
pub mod parser;
pub mod teelog;
pub mod types;
pub mod waivers;
