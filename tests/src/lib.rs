//! # Mirror-Node Test Suite
//!
//! Unified test crate for flows that cross subsystem boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Log entry builders shared by tests and benches
//! └── integration/      # End-to-end flows over the sync engine
//!     ├── sync_cycles.rs
//!     ├── import_flow.rs
//!     ├── history_feed.rs
//!     ├── rebalance_flow.rs
//!     └── persistence.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p mn-tests
//!
//! # By flow
//! cargo test -p mn-tests integration::sync_cycles
//!
//! # Benchmarks
//! cargo bench -p mn-tests
//! ```

pub mod integration;
pub mod support;
