//! Backends for the ical2org conversion engine.
//!
//! - [`IcsBackend`] - decodes iCalendar text and expands recurrences
//! - [`HtmlSniffer`] - detects HTML in event descriptions
//! - [`HtmlToOrg`], [`PandocConverter`] - turn HTML descriptions into org text
//!
//! # Architecture
//!
//! ```text
//!   ICS text
//!      │
//!      ▼ IcsBackend::decode()
//! ┌─────────────┐
//! │ IcsCalendar │
//! └──────┬──────┘
//!        │
//!        ▼ IcsBackend::expand(window)
//! ┌─────────────┐     HtmlSniffer / OrgConverter
//! │  RawEvent   │ ───────────────────────────────▶ ical2org_core::Converter
//! └─────────────┘
//! ```

pub mod ics;
pub mod markup;

pub use ics::{ExpansionOptions, IcsBackend, IcsCalendar, MAX_OCCURRENCES};
pub use markup::{HtmlSniffer, HtmlToOrg, OrgConverter, PandocConverter};
