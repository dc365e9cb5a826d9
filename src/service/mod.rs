pub mod cart;
pub mod orders;

/// Attempts per operation before a serialization conflict is surfaced.
const MAX_CONFLICT_ATTEMPTS: u32 = 3;
