//! # Payslip Context
//!
//! Version-aware policy document context for payslip questions.
//!
//! Payroll policies change over time. When an employee asks about a payslip
//! for a given month, the answer has to be grounded in the policy versions
//! that were in force during that month, not the ones in force today. This
//! crate keeps a catalog of dated document versions, materializes their
//! text, resolves which versions apply to a payslip period, picks the ones
//! relevant to a question, and renders them as prompt context.
//!
//! ## Architecture
//!
//! ```text
//! VersionCatalog ──▶ DocumentStore ◀── ContentLoader (primary / fallback / placeholder)
//!                         │
//!                         ▼
//!                   DateResolver ──▶ RelevanceSelector ──▶ ContextAssembler
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! payctx sources                                   # check source files
//! payctx docs effective --month 6 --year 2024      # what applied in June
//! payctx context "How is overtime paid?" --month 6 --year 2024
//! payctx serve                                     # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Domain error types |
//! | [`models`] | Core data types |
//! | [`catalog`] | Versioned document catalog and window validation |
//! | [`loader`] | Text sources and content loading with fallback |
//! | [`clock`] | Injectable "today" |
//! | [`store`] | Materialized document set and admin operations |
//! | [`resolver`] | Effective-date resolution |
//! | [`relevance`] | Question-to-document selection |
//! | [`assemble`] | Prompt context rendering |
//! | [`engine`] | Facade wiring the pipeline together |
//! | [`docs`] | CLI document commands |
//! | [`sources`] | Source health listing |
//! | [`server`] | HTTP API |

pub mod assemble;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod docs;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod relevance;
pub mod resolver;
pub mod server;
pub mod sources;
pub mod store;

pub use engine::{AssembledContext, ContextEngine};
pub use error::{CatalogError, Error, Result, SourceError};
