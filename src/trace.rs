use std::fmt;

/// Sink for the mapper's diagnostic output.
///
/// Passed explicitly into each mapping attempt so that attempts for
/// different sites can run side by side with their own sinks.
pub trait MapTrace {
    fn enabled(&self) -> bool {
        true
    }

    fn message(&mut self, args: fmt::Arguments);
}

pub struct NoTrace;

impl MapTrace for NoTrace {
    fn enabled(&self) -> bool {
        false
    }

    fn message(&mut self, _args: fmt::Arguments) {}
}

/// Forwards to the `log` facade under the `lut_rotation` target.
pub struct LogTrace;

impl MapTrace for LogTrace {
    fn enabled(&self) -> bool {
        log::log_enabled!(target: "lut_rotation", log::Level::Debug)
    }

    fn message(&mut self, args: fmt::Arguments) {
        log::debug!(target: "lut_rotation", "{}", args);
    }
}

impl MapTrace for Vec<String> {
    fn message(&mut self, args: fmt::Arguments) {
        self.push(args.to_string());
    }
}

macro_rules! map_trace {
    ($trace:expr, $($arg:tt)*) => {{
        let trace = &mut *$trace;
        if $crate::trace::MapTrace::enabled(&*trace) {
            $crate::trace::MapTrace::message(trace, format_args!($($arg)*));
        }
    }};
}
pub(crate) use map_trace;
