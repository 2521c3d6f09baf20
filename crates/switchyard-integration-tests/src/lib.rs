#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Integration test crate for the orchestration pipeline.
//!
//! This crate exists solely for integration testing. It is `publish = false`
//! and has no library code — all tests live in `tests/`.
//!
//! Every test here needs a real Postgres database (storage is `sqlx`
//! throughout, with no in-memory backend) reachable at
//! `SWITCHYARD_TEST_DATABASE_URL`. See
//! [`switchyard_test::connect_test_pool`].
