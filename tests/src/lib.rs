//! # Browser-Agent Test Suite
//!
//! End-to-end flows that run the real controller router, the real worker
//! command loop and a real localhost WebSocket between them.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs    # controller/worker/page-server harness
//!     ├── flows.rs       # broker <-> worker correlation over the socket
//!     ├── reconnect.rs   # connection loss, session loss, replacement
//!     └── e2e_agent.rs   # HTTP command -> decision loop -> worker
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ba-tests
//! cargo test -p ba-tests integration::reconnect::
//! ```

pub mod integration;
