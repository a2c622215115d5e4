// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits that define what the system
// talks about: sentence pairs, reserved token ids, and the
// abstractions the outer layers implement.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only plain structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Aligned source/target sentences and special token ids
pub mod sentence_pair;

// Core abstractions (traits) that other layers implement
pub mod traits;
