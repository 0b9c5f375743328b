//! Parsers for raw `dumpsys` output.
//!
//! These are line-oriented and deliberately forgiving: device dumps vary by
//! Android release and lines we do not recognize are skipped, never fatal.

pub mod notifications;
pub mod power;
