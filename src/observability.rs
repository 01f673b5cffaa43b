use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("devconsole.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("devconsole.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("devconsole.client.request_duration_seconds");

pub(crate) static STREAM_LINES: Counter = Counter::new("devconsole.stream.lines");
pub(crate) static STREAM_MALFORMED_LINES: Counter =
    Counter::new("devconsole.stream.malformed_lines");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("devconsole.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("devconsole.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("devconsole.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("devconsole.stream.duration_seconds");

pub(crate) static TURNS_STARTED: Counter = Counter::new("devconsole.turns.started");
pub(crate) static TURNS_REJECTED_BUSY: Counter = Counter::new("devconsole.turns.rejected_busy");
pub(crate) static TURNS_INCOMPLETE: Counter = Counter::new("devconsole.turns.incomplete");
pub(crate) static STALE_EVENTS_DROPPED: Counter =
    Counter::new("devconsole.turns.stale_events_dropped");

pub(crate) static ATTACHMENTS_REJECTED: Counter =
    Counter::new("devconsole.attachments.rejected");
pub(crate) static ATTACHMENT_READ_ERRORS: Counter =
    Counter::new("devconsole.attachments.read_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_LINES);
    collector.register_counter(&STREAM_MALFORMED_LINES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&TURNS_STARTED);
    collector.register_counter(&TURNS_REJECTED_BUSY);
    collector.register_counter(&TURNS_INCOMPLETE);
    collector.register_counter(&STALE_EVENTS_DROPPED);

    collector.register_counter(&ATTACHMENTS_REJECTED);
    collector.register_counter(&ATTACHMENT_READ_ERRORS);
}
