//! CLI command implementations.
//!
//! | Module   | Commands handled   |
//! |----------|--------------------|
//! | `serve`  | `Serve`, `InitDb`  |
//! | `config` | `Config`           |

pub mod config;
pub mod serve;

pub use config::cmd_config;
pub use serve::{cmd_init_db, cmd_serve};
