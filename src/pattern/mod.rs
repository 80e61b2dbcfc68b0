//! Pattern reduction and signature hashing (pure, no ledger state).

pub mod hasher;
pub mod reducer;

pub use hasher::SignatureHash;
pub use reducer::{reduce, try_reduce, PatternSignature, ReducedPattern};
