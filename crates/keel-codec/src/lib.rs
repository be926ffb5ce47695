//! Type-tagged transcoder for Keel record payloads.
//!
//! A record's [`Fields`](keel_types::Fields) are stored as JSON text. JSON has
//! no date, time, byte or identifier types, so those values are written as
//! objects carrying a reserved tag and explicit integer components:
//!
//! ```text
//! {"__class__":"date","y":2024,"month":2,"d":29}
//! {"__class__":"time","h":13,"minute":5,"s":0,"ns":250000000}
//! {"__class__":"datetime","y":..,"month":..,"d":..,"h":..,"minute":..,"s":..,"ns":..}
//! {"__class__":"oid","namespace":"app.Person","num":3}
//! {"__bytes__":"AAEC"}
//! ```
//!
//! Decoding dispatches on [`NodeKind`]. Objects with no tag, or with a tag
//! this crate does not know, pass through as plain maps. A known tag with a
//! missing or invalid component is a hard error; it never decodes to a zero
//! value.

pub mod error;
pub mod tag;
pub mod transcoder;

pub use error::{CodecError, CodecResult};
pub use tag::NodeKind;
pub use transcoder::Transcoder;
