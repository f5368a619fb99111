//! Execution core of an automated code-review worker.
//!
//! A review job names a set of changed files and the tools to run over
//! them. The worker stages the files each tool needs — isolated temp trees
//! for single-file linters, a synced and fully patched repository checkout
//! for build-aware tools — resolves which files are in scope, invokes the
//! external checkers, and records findings as comments on the files.

pub mod config;
pub mod patterns;
pub mod process;
pub mod repository;
pub mod review;
pub mod stager;
pub mod tools;
pub mod worker;
