//! Logging shims
//!
//! Library code logs through these macros so the same call sites work on
//! target (`defmt`), on the host (`log`) and in builds with neither.

#![allow(unused_macros)]

#[cfg(all(feature = "embedded", feature = "std"))]
compile_error!(
    "features `embedded` and `std` are mutually exclusive; build firmware with `--no-default-features --features embedded`"
);

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::debug!($($arg)*);
        #[cfg(feature = "std")]
        ::log::debug!($($arg)*);
        #[cfg(not(any(feature = "embedded", feature = "std")))]
        let _ = ($($arg)*);
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::info!($($arg)*);
        #[cfg(feature = "std")]
        ::log::info!($($arg)*);
        #[cfg(not(any(feature = "embedded", feature = "std")))]
        let _ = ($($arg)*);
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::warn!($($arg)*);
        #[cfg(feature = "std")]
        ::log::warn!($($arg)*);
        #[cfg(not(any(feature = "embedded", feature = "std")))]
        let _ = ($($arg)*);
    }};
}
