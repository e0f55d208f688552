//! Optional forwarding to the `log` crate.
//!
//! `decode_log!(level, ...)` expands to the matching `log` macro when the
//! `logging` feature is enabled. Without it the arguments still
//! type-check but compile to nothing.

macro_rules! decode_log {
    ($level:ident, $fmt:literal $(, $($arg:expr),* $(,)?)?) => {
        #[cfg(feature = "logging")]
        ::log::$level!($fmt $(, $($arg),*)?);
        #[cfg(not(feature = "logging"))]
        { $($(let _ = &$arg;)*)? }
    };
}

pub(crate) use decode_log;
