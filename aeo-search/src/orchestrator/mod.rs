//! Run-level provider orchestration: fan-out, normalisation, scoring.
//!
//! Queries every configured answer engine concurrently, turns each
//! settled payload into an ordered citation list, and measures how
//! prominently a target domain appears in each list.

pub mod fanout;
pub mod normalize;
pub mod scoring;
