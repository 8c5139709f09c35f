//! # Onboarding manual RAG
//!
//! Retrieval-augmented grounding for small-business onboarding manuals.
//!
//! A structured manual (goal, procedure steps, precautions) is split into
//! semantic chunks, each chunk is embedded and stored under the manual's id,
//! and a question about the manual is answered with the stored chunks
//! closest to it. Downstream generation (quizzes, card news) interpolates
//! those chunks into its prompts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────────┐
//! │  Manual  │──▶│  Chunker  │──▶│ Indexer  │──▶│ Vector Store │
//! │  (JSON)  │   │ goal/step │   │ embed +  │   │ SQLite / mem │
//! └──────────┘   │ precaution│   │ upsert   │   └──────┬───────┘
//!                └───────────┘   └──────────┘          │
//!                                                      ▼
//!                   ┌──────────┐   ┌──────────┐   ┌───────────┐
//!                   │   CLI    │   │   HTTP   │──▶│ Retriever │
//!                   │(onboard) │──▶│  (axum)  │   │  top-k    │
//!                   └──────────┘   └──────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! onboard init                               # create database
//! onboard manual add manual.json --index     # store + index a manual
//! onboard retrieve 1 "인사 방법" --limit 2    # nearest chunks
//! onboard serve                              # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`models`] | Core data types |
//! | [`manual`] | Lenient manual JSON coercion |
//! | [`chunk`] | Manual chunking and chunk serialization |
//! | [`embedding`] | Embedding providers and distance metrics |
//! | [`store`] | Vector store trait and backends |
//! | [`lock`] | Per-manual indexing lock |
//! | [`indexer`] | Write path |
//! | [`retriever`] | Read path |
//! | [`manuals`] | Stored manual snapshots |
//! | [`tone`] | Tone classification |
//! | [`pipeline`] | Wiring from config to indexer/retriever |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod lock;
pub mod manual;
pub mod manuals;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod server;
pub mod store;
pub mod tone;
