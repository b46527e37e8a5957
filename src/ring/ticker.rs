//! Time sources driving the wheel

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};

/// Timestamp of one wheel advancement
pub type Tick = DateTime<Utc>;

/// Stream of ticks; the wheel advances one slot per item and stops when it ends
pub type TickStream = BoxStream<'static, Tick>;

/// Periodic ticks, the first one `period` after creation.
///
/// Ticks missed because the wheel fell behind are skipped rather than
/// replayed in a burst. Must be called inside a tokio runtime.
pub fn ticker(period: Duration) -> TickStream {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    IntervalStream::new(interval).map(|_| Utc::now()).boxed()
}

/// Ticks pushed by hand through the returned sender.
///
/// Dropping the sender ends the stream, which stops the wheel.
pub fn manual_ticker(buffer: usize) -> (mpsc::Sender<Tick>, TickStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, ReceiverStream::new(rx).boxed())
}
