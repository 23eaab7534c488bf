#![no_std]

//! Thin logging facade that forwards to `defmt` and/or `log` depending on the
//! enabled features. With neither feature enabled the macros compile to
//! nothing.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_impl {
    ($level:ident, $($args:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($args)*);
        #[cfg(feature = "log")]
        ::log::$level!($($args)*);
    }};
}

#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => { $crate::__log_impl!(trace, $($args)*) };
}

#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => { $crate::__log_impl!(debug, $($args)*) };
}

#[macro_export]
macro_rules! info {
    ($($args:tt)*) => { $crate::__log_impl!(info, $($args)*) };
}

#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => { $crate::__log_impl!(warn, $($args)*) };
}

#[macro_export]
macro_rules! error {
    ($($args:tt)*) => { $crate::__log_impl!(error, $($args)*) };
}
