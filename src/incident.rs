use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{Location, PanicHookInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    /// Short type name of the failure, `"Panic"` for panics.
    pub kind: String,
    pub message: String,
    /// Innermost frame: where the panic fired or where the error was reported.
    pub location: Option<SourceLocation>,
    pub traceback: String,
}

impl Incident {
    /// Build an incident from inside a panic hook.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let message = payload_message(info.payload());
        let location = info.location().map(SourceLocation::from);
        let thread = std::thread::current();
        let origin = location
            .as_ref()
            .map(|l| format!(" at {}:{}", l.file, l.line))
            .unwrap_or_default();
        let traceback = format!(
            "thread '{}' panicked{origin}:\n{message}\n\nstack backtrace:\n{}",
            thread.name().unwrap_or("<unnamed>"),
            Backtrace::force_capture()
        );

        Self {
            kind: "Panic".to_string(),
            message,
            location,
            traceback,
        }
    }

    /// Fallback when a panic was caught but the hook did not record it.
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload_message(payload);
        Self {
            kind: "Panic".to_string(),
            traceback: message.clone(),
            message,
            location: None,
        }
    }

    /// Build an incident from an error value. The location is the caller's.
    #[track_caller]
    pub fn from_error<E: fmt::Display + fmt::Debug>(err: &E) -> Self {
        Self {
            kind: short_type_name(std::any::type_name::<E>()).to_string(),
            message: err.to_string(),
            location: Some(Location::caller().into()),
            traceback: format!("{err:?}"),
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// `std::io::error::Error` -> `Error`, `my_app::Wrapper<u8>` -> `Wrapper`.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
