//! Kanban tracker back-end: users, projects and issues over a REST API.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (router, SPA fallback, shutdown) │
//! │  (SPA)   │ <─────── │    └─ api.rs  (AppState, ApiError, router)   │
//! └──────────┘          │         │  auth.rs  (JWT, cookie, middleware)│
//!                       │         v                                    │
//!                       │  routes/  (users, auth, projects, issues)    │
//!                       │         │ DbHandle::call()                   │
//!                       │         v                                    │
//!                       │  db.rs  (SQLite, transactions, board lanes)  │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                        |
//! |------------|-------------------------------------------------------|
//! | `models`   | Shared types: `User`, `Project`, `Issue`, `BoardView` |
//! | `code`     | Sequential `J`/`JI`/`JP` business codes               |
//! | `password` | Argon2id hashing and verification                     |
//!
//! ## Typical Request Flow (drag an issue to "In Progress")
//!
//! 1. `PATCH /api/issues/{code}/move` passes `auth::require_auth`, which
//!    attaches the caller's RACFID as an `AuthUser` extension.
//! 2. `routes::issues::move_issue` validates the body through `ValidJson`.
//! 3. `TrackerDb::move_issue` closes the gap in the old lane, clamps the
//!    target position, shifts the new lane and stores the issue, all in one
//!    transaction.
//! 4. The updated issue is returned; the board view reads lanes back in
//!    position order.

pub mod api;
pub mod auth;
pub mod code;
pub mod db;
pub mod models;
pub mod password;
pub mod routes;
pub mod server;
