//! Test utilities shared across the workspace's crates: fixture builders,
//! a configurable stub [`Plugin`](switchyard_core::Plugin) implementation,
//! and a real-Postgres test pool helper.
//!
//! Not published; depended on only via `[dev-dependencies]`.

#![warn(clippy::all)]

pub mod fixtures;
pub mod plugins;
pub mod pool;

pub use fixtures::{test_actor, test_plugin_config, test_work_item, test_work_item_for};
pub use plugins::StubPlugin;
pub use pool::{connect_test_pool, ENV_TEST_DATABASE_URL};
