pub mod config;
pub mod extract;
pub mod sampler;
pub mod sink;

pub use config::{CapturePaths, SetupConfig};
pub use extract::{extract_vector3, Position};
pub use sampler::{resolve_interval, Clock, PositionSource, Sampler, SaveFile, TickOutcome};
pub use sink::{append_record, CsvLog, LogRecord, RecordSink};
