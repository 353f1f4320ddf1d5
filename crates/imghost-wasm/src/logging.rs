//! `tracing` output routed to the browser console.
//!
//! Each formatted event is buffered and flushed as one `console.*` call when
//! the writer is dropped, so multi-part writes from the formatter end up on
//! a single console line.

use std::io;
use std::sync::OnceLock;

use tracing::{Level, Metadata};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, Registry};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ConsoleMakeWriter;

pub(crate) struct ConsoleWriter {
    level: Level,
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buffer);
        let line = text.trim_end();
        if line.is_empty() {
            return;
        }
        emit(self.level, line);
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, line: &str) {
    use web_sys::console;

    let message = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::ERROR => console::error_1(&message),
        Level::WARN => console::warn_1(&message),
        Level::INFO => console::info_1(&message),
        _ => console::debug_1(&message),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, line: &str) {
    eprintln!("{line}");
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buffer: Vec::new(),
        }
    }
}

static LEVEL: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

/// Install the console subscriber. Later calls are no-ops.
pub(crate) fn install(max_level: Level) {
    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(max_level));
    // No clock is available to the formatter in the browser.
    let console = fmt::layer()
        .with_writer(ConsoleMakeWriter)
        .with_target(true)
        .without_time();
    match tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init()
    {
        Ok(()) => {
            let _ = LEVEL.set(handle);
        }
        Err(_) => tracing::debug!("console subscriber already installed"),
    }
}

/// Change the level of an installed subscriber.
pub(crate) fn set_max_level(level: Level) {
    let Some(handle) = LEVEL.get() else {
        return;
    };
    if let Err(e) = handle.reload(LevelFilter::from_level(level)) {
        tracing::warn!(error = %e, "could not change log level");
    }
}

/// Parse a level name from JS (`"debug"`, `"warn"`, ...).
pub(crate) fn parse_level(name: &str) -> Option<Level> {
    name.parse().ok()
}
