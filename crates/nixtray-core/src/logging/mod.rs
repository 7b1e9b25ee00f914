mod log_sink;

pub(crate) use log_sink::TIMESTAMP_FORMAT;

pub use log_sink::LogSink;
