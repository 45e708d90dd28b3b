mod sled_watch_case1;
mod watch_cancellation_case1;
mod watch_sequence_case1;
