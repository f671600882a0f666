//! Forwarder Patcher: batch rewriting of Foundry test files for
//! EIP-2771 trusted-forwarder support.
//!
//! The patcher appends a forwarder address argument to the constructor
//! calls of three contract types (`DexCore`, `DEXRouter`, `FlashSwap`)
//! across a Solidity test suite, and can additionally insert the
//! `MinimalForwarder` import, state variable, and `setUp` deployment
//! into each test file.
//!
//! # Architecture
//!
//! Everything reduces to an ordered list of [`PatchRule`]s per file:
//! exact literal substitutions and guarded structural insertions. The
//! rule catalog is static data built once at startup; the applier reads
//! a file, folds the rules over its content, and rewrites the file only
//! when the content actually changed.
//!
//! # Safety
//!
//! - Atomic file writes (tempfile + fsync + rename)
//! - Unchanged files are never touched, so reruns are cheap and safe
//! - Every rule is idempotent: a second run over patched files is a no-op

pub mod apply;
pub mod catalog;
pub mod driver;
pub mod rule;

// Re-exports
pub use apply::{check_file, patch_file, ApplyResult, PatchError};
pub use catalog::{
    forwarder_catalog, glob_rules, FileTarget, PatchCatalog, DEFAULT_TEST_DIR, TEST_FILE_SUFFIX,
};
pub use driver::{run_explicit, run_glob, BatchOptions, BatchReport, FileReport};
pub use rule::{apply_all, InsertAnchor, InsertGuard, InsertRule, PatchRule};
