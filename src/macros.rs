#[cfg(feature = "log")]
macro_rules! net_log {
    (trace, $($arg:expr),*) => { log::trace!($($arg),*) };
    (error, $($arg:expr),*) => { log::error!($($arg),*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! net_log {
    (trace, $($arg:expr),*) => { defmt::trace!($($arg),*) };
    (error, $($arg:expr),*) => { defmt::error!($($arg),*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! net_log {
    ($level:ident, $($arg:expr),*) => {{ $( let _ = &$arg; )* }};
}

macro_rules! net_trace {
    ($($arg:expr),*) => (net_log!(trace, $($arg),*));
}

macro_rules! net_error {
    ($($arg:expr),*) => (net_log!(error, $($arg),*));
}
