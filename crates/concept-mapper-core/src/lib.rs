//! # Concept Mapper Core
//!
//! Shared, I/O-free logic for Concept Mapper: data models, word windowing,
//! filename identity resolution, fragment building, the fragment index and
//! embedding traits, concept retrieval and the concept mapping service.
//!
//! This crate contains no tokio, sqlx, HTTP clients or filesystem access.
//! Concrete collaborators (embedding providers, the SQLite index, LLM
//! summarizers) live in the `concept-mapper` app crate and plug in through
//! the traits defined here.
//!
//! ## Pipeline
//!
//! ```text
//! pages ──▶ chunk::window ──▶ fragment::build ──▶ FragmentIndex
//!                                  ▲                    │
//!                      identity::resolve                ▼
//!                                         retrieve::ConceptRetriever
//!                                                       │
//!                                                       ▼
//!                                  mapping::ConceptMapper (+ Summarizer)
//! ```

pub mod chunk;
pub mod embedding;
pub mod fragment;
pub mod identity;
pub mod index;
pub mod mapping;
pub mod models;
pub mod retrieve;
pub mod summarize;
