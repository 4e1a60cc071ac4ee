//! Structured logging for server processes.
//!
//! Every entry carries a severity, a message, the logical operation that
//! produced it, a trace id correlating it with the rest of its request, and
//! typed fields. A [`Logger`] hands each entry to a [`SinkRouter`], which
//! offers it to every registered sink whose minimum level the entry meets:
//! standard output, a rotating log file, and a crash-reporting service for
//! errors.
//!
//! ```no_run
//! use logit::{Field, Logger, LoggerConfig};
//!
//! let config = LoggerConfig::from_path("logit.toml")?;
//! let logger = Logger::new(&config)?;
//!
//! let trace = logger.new_trace_context(None);
//! logger.info(Some(&trace), "order accepted", "orders.create", [Field::new("orderId", 42)]);
//!
//! logger.shutdown();
//! # Ok::<(), logit::ConfigError>(())
//! ```

mod config;
mod encoder;
mod entry;
mod error;
mod escalation;
mod level;
mod logger;
mod router;
mod sink;
pub mod trace;

pub use config::{AppConfig, ConsoleConfig, Environment, EscalationConfig, FileConfig, LoggerConfig};
pub use encoder::{Encoder, EncoderStyle, DEFAULT_TIME_FORMAT};
pub use entry::{Field, LogEntry, LogEntryBuilder, Value};
pub use error::{ConfigError, EscalationError, SinkError};
pub use escalation::{CrashReport, CrashReporter, EscalationOptions, EscalationSink, HttpCrashReporter};
pub use level::Level;
pub use logger::{Logger, LoggerBuilder};
pub use router::{DispatchError, SinkFailure, SinkRouter};
pub use sink::{ConsoleSink, FileSink, LevelFilteredSink, MemorySink, Sink, WriterSink};
pub use trace::TraceContext;

pub use rolling_logger;
