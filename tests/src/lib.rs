//! # Resource Gateway Test Suite
//!
//! Unified test crate for end-to-end behaviour across the workspace.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Gateway/tool harness over the in-memory upstream
//! └── integration/
//!     ├── admission_flows.rs   # sliding-window rate limiting
//!     ├── pagination_flows.rs  # multi-page aggregation
//!     ├── catalogue_flows.rs   # CRUD and error classification
//!     ├── bulk_flows.rs        # per-item bulk ledgers
//!     ├── derived_flows.rs     # date windows and composite operations
//!     ├── tool_flows.rs        # consolidated tools and the stdio server
//!     └── http_transport.rs    # reqwest transport against a mock server
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rm-tests
//!
//! # By area
//! cargo test -p rm-tests integration::admission_flows::
//! cargo test -p rm-tests integration::http_transport::
//! ```

pub mod fixtures;
pub mod integration;
