use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("quickgroq.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("quickgroq.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("quickgroq.client.request_duration_seconds");

pub(crate) static STREAM_BYTES: Counter = Counter::new("quickgroq.stream.bytes");
pub(crate) static STREAM_EVENTS: Counter = Counter::new("quickgroq.stream.events");
pub(crate) static STREAM_DECODE_ERRORS: Counter = Counter::new("quickgroq.stream.decode_errors");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("quickgroq.stream.errors");

pub(crate) static SESSION_SENDS: Counter = Counter::new("quickgroq.session.sends");
pub(crate) static SESSION_BUSY: Counter = Counter::new("quickgroq.session.busy");
pub(crate) static SESSION_FAILED_REPLIES: Counter =
    Counter::new("quickgroq.session.failed_replies");
pub(crate) static SESSION_REPLY_DURATION: Moments =
    Moments::new("quickgroq.session.reply_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_DECODE_ERRORS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&SESSION_SENDS);
    collector.register_counter(&SESSION_BUSY);
    collector.register_counter(&SESSION_FAILED_REPLIES);
    collector.register_moments(&SESSION_REPLY_DURATION);
}
