//! Logging macros. Each takes an optional leading threshold expression (defaults to 0, always emitted). When the
//! message has format arguments, write the threshold explicitly: `info!(0, "{} objects", n)`.

#[doc(hidden)]
#[macro_export]
macro_rules! __geece_event {
    ($level:expr, critical, $threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::__tracing::event!(
                $level,
                critical = true,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($level:expr, plain, $threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::__tracing::event!(
                $level,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! critical {
    ($threshold:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__geece_event!($crate::__tracing::Level::ERROR, critical, $threshold, $fmt $(, $arg)*)
    };
    ($($arg:tt)+) => {
        $crate::__geece_event!($crate::__tracing::Level::ERROR, critical, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($threshold:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__geece_event!($crate::__tracing::Level::ERROR, plain, $threshold, $fmt $(, $arg)*)
    };
    ($($arg:tt)+) => {
        $crate::__geece_event!($crate::__tracing::Level::ERROR, plain, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($threshold:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__geece_event!($crate::__tracing::Level::WARN, plain, $threshold, $fmt $(, $arg)*)
    };
    ($($arg:tt)+) => {
        $crate::__geece_event!($crate::__tracing::Level::WARN, plain, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($threshold:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__geece_event!($crate::__tracing::Level::INFO, plain, $threshold, $fmt $(, $arg)*)
    };
    ($($arg:tt)+) => {
        $crate::__geece_event!($crate::__tracing::Level::INFO, plain, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($threshold:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__geece_event!($crate::__tracing::Level::DEBUG, plain, $threshold, $fmt $(, $arg)*)
    };
    ($($arg:tt)+) => {
        $crate::__geece_event!($crate::__tracing::Level::DEBUG, plain, 0, $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($threshold:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__geece_event!($crate::__tracing::Level::TRACE, plain, $threshold, $fmt $(, $arg)*)
    };
    ($($arg:tt)+) => {
        $crate::__geece_event!($crate::__tracing::Level::TRACE, plain, 0, $($arg)+)
    };
}


// Makes the macros importable from the `log` module.
pub use {critical, error, warning, info, debug, trace};
