//! # Ledger Gateway Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── commit_flow.rs    # event manager + commit handler + strategies
//!     ├── query_flow.rs     # query handlers over a shared usage table
//!     └── gateway_flow.rs   # gateway → ledger → contract end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gw-tests
//! cargo test -p gw-tests integration::commit_flow
//! ```

#![allow(dead_code)]

pub mod integration;
