//! 수집 모듈.

pub mod clock;
pub mod done_marker;
pub mod range_export;
pub mod watch;

pub use clock::{Clock, SystemClock};
pub use done_marker::{DoneMarker, DoneMarkerStore, MarkerWrite};
pub use range_export::{export_range, run_range, EastmoneyDailyCapture};
pub use watch::{watch_today, DailyCapture, WatchOutcome, WatchScheduler, WatchState};
