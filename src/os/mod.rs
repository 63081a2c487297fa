//! Kernel calls the loader depends on.
mod traits;

pub use traits::{BreakReason, Kernel};

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "aarch64", target_os = "horizon"))]{
        mod horizon;
        pub use horizon::*;
    }
}
