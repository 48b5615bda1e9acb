//! # kioskcache Architecture
//!
//! Display nodes in a signage installation play images and video from a
//! folder shared by the master machine. Reading straight off the share makes
//! playback hostage to the network, so each node keeps a local mirror and
//! plays from that. This crate is that mirror: a write-through,
//! staleness-aware file cache.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, loads config, prints results           │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs)                                               │
//! │  - MediaCache facade, owns the sync cursor                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                   │
//! │  - get, prime, sync, cleanup, status, config                │
//! │  - Typed outcomes and reports, events through `tracing`     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Remote (remote/)                                           │
//! │  - RemoteFs trait                                           │
//! │  - FsRemote (production, timeouts), MemRemote (testing)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cache Rules
//!
//! - Cached files sit directly in the cache root under their remote name.
//!   The directory listing is the only state; there is no index file.
//! - A local copy is stale when the remote file is newer by more than 30 s.
//!   If the remote cannot be asked, the local copy is assumed fresh.
//! - A failed refresh serves the old copy. Only "no copy and no remote"
//!   is an error, and only [`api::MediaCache::get_media_path`] returns it.
//! - Folder priming, sync and cleanup are best-effort: per-file failures go
//!   into their reports and the log, never into a `Result`.
//!
//! ## Module Overview
//!
//! - [`api`]: The `MediaCache` facade
//! - [`commands`]: Cache operations
//! - [`remote`]: Remote filesystem abstraction and implementations
//! - [`model`]: Outcomes, policy, media extension allow-list
//! - [`config`]: `config.json` settings
//! - [`node`]: Master/slave role and media path rewrite
//! - [`paths`]: Local directories
//! - [`logging`]: `tracing` subscriber setup for hosts
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod node;
pub mod paths;
pub mod remote;
