//! Leveled loggers
//!
//! A [`LevelLogger`] renders one line per message: its tag, optional
//! timestamp and source location, then the message itself.
//!
//! ```text
//! [jasmd] client connected
//! ERROR: 2024/03/09 14:02:11 server.rs:88: accept failed
//! ```

use std::fmt;
use std::panic::Location;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::sink::SharedWriter;

/// Metadata prepended to each line after the tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMeta {
    /// `YYYY/MM/DD` in local time
    pub date: bool,
    /// `HH:MM:SS` in local time
    pub time: bool,
    /// `file.rs:LINE` of the caller, base name only
    pub short_file: bool,
}

impl LineMeta {
    /// No metadata at all
    pub const NONE: Self = Self {
        date: false,
        time: false,
        short_file: false,
    };

    /// Date and time
    pub const TIMESTAMP: Self = Self {
        date: true,
        time: true,
        short_file: false,
    };

    /// Date, time and source location
    pub const FULL: Self = Self {
        date: true,
        time: true,
        short_file: true,
    };

    /// Whether lines carry a date or time
    pub fn has_timestamp(&self) -> bool {
        self.date || self.time
    }
}

/// A tagged logger bound to one output
#[derive(Debug, Clone)]
pub struct LevelLogger {
    tag: String,
    meta: LineMeta,
    out: SharedWriter,
}

impl LevelLogger {
    pub fn new(tag: impl Into<String>, meta: LineMeta, out: SharedWriter) -> Self {
        Self {
            tag: tag.into(),
            meta,
            out,
        }
    }

    /// A logger that drops everything written to it
    pub fn discard() -> Self {
        Self::new("", LineMeta::TIMESTAMP, SharedWriter::discard())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn meta(&self) -> LineMeta {
        self.meta
    }

    pub fn is_discard(&self) -> bool {
        self.out.is_discard()
    }

    /// Log `msg` verbatim, attributed to the caller
    #[track_caller]
    pub fn log(&self, msg: &str) {
        self.output(Location::caller(), msg);
    }

    /// Log formatted arguments, attributed to the caller
    #[track_caller]
    pub fn log_fmt(&self, args: fmt::Arguments<'_>) {
        let caller = Location::caller();
        if self.is_discard() {
            return;
        }
        match args.as_str() {
            Some(msg) => self.output(caller, msg),
            None => self.output(caller, &args.to_string()),
        }
    }

    /// Log `msg` attributed to an explicit source location
    ///
    /// Write errors are dropped: a failed log line must never fail the
    /// operation being logged.
    pub fn output(&self, caller: &Location<'_>, msg: &str) {
        if self.is_discard() {
            return;
        }
        let now = self
            .meta
            .has_timestamp()
            .then(|| chrono::Local::now().naive_local());
        let line = self.render(now, caller, msg);
        let _ = self.out.write_line(line.as_bytes());
    }

    /// Render one complete line, newline included
    ///
    /// Date and time are omitted when `now` is `None`.
    pub fn render(&self, now: Option<NaiveDateTime>, caller: &Location<'_>, msg: &str) -> String {
        let mut line = String::with_capacity(self.tag.len() + msg.len() + 32);
        line.push_str(&self.tag);
        if let Some(now) = now {
            if self.meta.date {
                line.push_str(&now.format("%Y/%m/%d ").to_string());
            }
            if self.meta.time {
                line.push_str(&now.format("%H:%M:%S ").to_string());
            }
        }
        if self.meta.short_file {
            line.push_str(short_file(caller.file()));
            line.push(':');
            line.push_str(&caller.line().to_string());
            line.push_str(": ");
        }
        line.push_str(msg);
        if !msg.ends_with('\n') {
            line.push('\n');
        }
        line
    }
}

fn short_file(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}
