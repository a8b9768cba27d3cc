//! Core types: time formatting, event normalization, body rendering, conversion engine

pub mod body;
pub mod engine;
pub mod error;
pub mod event;
pub mod time;
pub mod tracing;

pub use body::{MarkupConverter, MarkupSniffer, render_body};
pub use engine::{CalendarBackend, ConversionOptions, Converter, DEFAULT_WINDOW_DAYS};
pub use error::{Error, Result};
pub use event::{CanonicalEvent, NO_TITLE, NormalizedEvent, RawEvent, normalize, unescape_commas};
pub use time::{
    EventTime, TargetZone, TimeWindow, format_date, format_instant, resolve_timezone,
    timezone_names,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
