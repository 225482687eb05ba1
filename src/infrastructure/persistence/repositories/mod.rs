pub mod result_sink_repository;
pub mod signal_stats_repository;

pub use result_sink_repository::SqliteResultSink;
pub use signal_stats_repository::SqliteSignalStatsRepository;
