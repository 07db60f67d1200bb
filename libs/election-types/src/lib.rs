//! Types shared between the election API client and the terminal app.
//!
//! Everything here mirrors what the remote election service sends over the
//! wire, plus the small amount of display logic (time zones, countdown
//! breakdowns) that every view needs.

pub mod admin;
pub mod display;
pub mod results;
pub mod status;
pub mod timestamp;
mod util;
pub mod voting;
