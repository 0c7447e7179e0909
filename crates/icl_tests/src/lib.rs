//! Integration test crate for the ICL compiler workspace.
//!
//! All content lives in `tests/`: end-to-end suites (`e2e_*.rs`) exercising
//! the pipeline through the public crate APIs, with shared fixtures in
//! `tests/common/`. This library target is intentionally empty.
