//! # Concept Mapper
//!
//! Maps lecture transcripts onto NCERT textbook concepts.
//!
//! Textbook PDFs are extracted page by page, split into overlapping word
//! windows tagged with class, subject, chapter and page, embedded and
//! stored in SQLite. At query time a transcript is embedded, the nearest
//! fragments become concept labels, and an LLM titles and summarizes the
//! best matches.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ extract  │──▶│  chunk   │──▶│  embed   │──▶│  SQLite  │
//! │ PDF→JSON │   │ windows  │   │ vectors  │   │  index   │
//! └──────────┘   └──────────┘   └──────────┘   └────┬─────┘
//!                                                   │
//!                              ┌────────────────────┤
//!                              ▼                    ▼
//!                         ┌──────────┐        ┌──────────┐
//!                         │   CLI    │        │   HTTP   │
//!                         │  (cmap)  │        │  :5002   │
//!                         └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cmap init                     # create database
//! cmap extract                  # PDFs → page JSON
//! cmap chunk                    # page JSON → fragment JSON
//! cmap embed                    # fragments → vectors
//! cmap map "In this lecture we discuss Newton's laws of motion"
//! cmap serve                    # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF page extraction |
//! | [`ingest`] | Chunk file generation |
//! | [`embed_cmd`] | Index loading and embedding |
//! | [`embedding`] | Embedding providers |
//! | [`summarizer`] | LLM summarizers |
//! | [`index`] | SQLite fragment index |
//! | [`search`] | Search and map commands |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod search;
pub mod server;
pub mod summarizer;
