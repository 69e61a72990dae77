//! Shared support for the `ocr-worker` and `vision-worker` binaries.
//!
//! Everything pipeline-specific lives in `recall-db`, `recall-ocr`, and
//! `recall-vision`; this crate only holds the configuration layer the two
//! binaries share.

pub mod config;
