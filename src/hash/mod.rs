//! Symbol hash tables referenced from the dynamic section.
//!
//! Only the header is consumed during bootstrap; the bucket and chain arrays
//! are recorded for whoever resolves symbols later.
mod sysv;

pub use sysv::ElfHash;
