//! Shared database repository test infrastructure
//!
//! Every repository test is an async function over [`harness::TestRepos`], run
//! twice: against an in-memory SQLite database on every `cargo test`, and
//! against PostgreSQL in a testcontainer when ignored tests are requested.
//!
//! ```bash
//! cargo test                       # Run fast SQLite tests only
//! cargo test -- --ignored          # Run PostgreSQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Run all tests
//! ```

mod memberships;
