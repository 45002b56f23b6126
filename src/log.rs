// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Simple logger shared by all shadow passes. It writes to the console and forwards every
//! message to the registered listeners. One-shot messages are keyed by an id and printed again
//! only when their text changes, which keeps per-frame diagnostics from flooding the output.

use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::fmt::{Debug, Display};
use std::io::{self, Write};
use std::sync::mpsc::Sender;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// A message that could be sent by the logger to all listeners.
#[derive(Debug, Clone)]
pub struct LogMessage {
    /// Kind of the message: information, warning or error.
    pub kind: MessageKind,
    /// The source message without logger prefixes.
    pub content: String,
    /// Time point at which the message was recorded. It is relative to the moment when the
    /// logger was initialized.
    pub time: Duration,
}

static LOG: LazyLock<Mutex<Log>> = LazyLock::new(|| {
    Mutex::new(Log {
        verbosity: MessageKind::Information,
        listeners: Default::default(),
        time_origin: Instant::now(),
        one_shot_sources: Default::default(),
    })
});

/// A kind of message.
#[derive(Debug, Default, Copy, Clone, PartialOrd, PartialEq, Eq, Ord, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Some useful information.
    #[default]
    Information = 0,
    /// A warning.
    Warning = 1,
    /// An error of some kind.
    Error = 2,
}

impl MessageKind {
    fn as_str(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

/// Well-known ids of one-shot messages.
pub mod once {
    /// The cached shadow volume stopped covering the view and had to be rebuilt.
    pub const CACHE_OUT_OF_RANGE: usize = 0x5ad0_0001;
    /// A shadow texture request exceeded the pool capacity.
    pub const POOL_CAPACITY: usize = 0x5ad0_0002;
}

/// See module docs.
pub struct Log {
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
    time_origin: Instant,
    one_shot_sources: FxHashMap<usize, String>,
}

impl Log {
    fn write_internal<S>(&mut self, id: Option<usize>, kind: MessageKind, message: S) -> bool
    where
        S: AsRef<str>,
    {
        let mut msg = message.as_ref().to_owned();
        if kind < self.verbosity {
            return false;
        }

        if let Some(id) = id {
            match self.one_shot_sources.entry(id) {
                Entry::Occupied(mut previous) => {
                    if previous.get() == &msg {
                        return false;
                    }
                    previous.insert(msg.clone());
                }
                Entry::Vacant(entry) => {
                    entry.insert(msg.clone());
                }
            }
        }

        // Notify listeners about the message and remove all disconnected listeners.
        let time = self.time_origin.elapsed();
        self.listeners.retain(|listener| {
            listener
                .send(LogMessage {
                    kind,
                    content: msg.clone(),
                    time,
                })
                .is_ok()
        });

        msg.insert_str(0, kind.as_str());
        msg.push('\n');
        let _ = io::stdout().write_all(msg.as_bytes());

        true
    }

    /// Writes a message to the console.
    pub fn write<S>(kind: MessageKind, msg: S)
    where
        S: AsRef<str>,
    {
        LOG.lock().write_internal(None, kind, msg);
    }

    /// Writes a message only once per given id if the message remains the same. If the message
    /// changes, then the new version will be printed. Returns `true` if the message was written.
    pub fn write_once<S>(id: usize, kind: MessageKind, msg: S) -> bool
    where
        S: AsRef<str>,
    {
        LOG.lock().write_internal(Some(id), kind, msg)
    }

    /// Writes an information message.
    pub fn info<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::write(MessageKind::Information, msg)
    }

    /// Writes a warning message.
    pub fn warn<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::write(MessageKind::Warning, msg)
    }

    /// Writes error message.
    pub fn err<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::write(MessageKind::Error, msg)
    }

    /// Writes a warning message once. See [`Self::write_once`] for more info.
    pub fn warn_once<S>(id: usize, msg: S) -> bool
    where
        S: AsRef<str>,
    {
        Self::write_once(id, MessageKind::Warning, msg)
    }

    /// Sets verbosity level.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Adds a listener that will receive a copy of every message passed into the log.
    pub fn add_listener(listener: Sender<LogMessage>) {
        LOG.lock().listeners.push(listener)
    }

    /// Prints the error of a failed operation into the log, prefixed with `msg`.
    pub fn verify_message<S, T, E>(result: Result<T, E>, msg: S)
    where
        E: Debug,
        S: Display,
    {
        if let Err(e) = result {
            Self::write(MessageKind::Error, format!("{msg}. Reason: {e:?}"));
        }
    }
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::Log::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::Log::warn(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::log::Log::err(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn_once {
    ($id:expr, $($arg:tt)*) => {
        $crate::log::Log::warn_once($id, format!($($arg)*))
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_write_once_skips_repeated_messages() {
        let id = 0x7e57_0001;
        assert!(Log::warn_once(id, "cache is out of range"));
        assert!(!Log::warn_once(id, "cache is out of range"));
        assert!(Log::warn_once(id, "cache is out of range again"));
    }

    #[test]
    fn test_listener_receives_messages() {
        let (sender, receiver) = channel();
        Log::add_listener(sender);
        Log::err("listener test message");
        assert!(receiver
            .try_iter()
            .any(|m| m.kind == MessageKind::Error && m.content == "listener test message"));
    }
}
