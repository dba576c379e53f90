// Parameter Map Utilities
//
// Helpers shared by the mutation catalog, the prober and the signer:
//
// - change: structural comparison of two parameter maps
// - encoding: query-protocol form encoding of a parameter map
//
// Architecture:
//   change.rs (leaf, pure)
//       ↑
//   engine.rs (skips mutations that leave the baseline untouched)
//
//   encoding.rs (leaf, pure)
//       ↑
//   auth.rs (hashes the encoded body while signing)

pub mod change;
pub mod encoding;

pub use change::*;
pub use encoding::*;
