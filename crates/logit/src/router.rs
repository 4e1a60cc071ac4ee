use crate::{entry::LogEntry, error::SinkError, sink::LevelFilteredSink};
use std::fmt;

/// Fans one entry out to every registered sink.
///
/// The registration list is fixed at construction. A router without any
/// registrations accepts everything and does nothing with it.
#[derive(Debug, Default)]
pub struct SinkRouter {
    sinks: Vec<LevelFilteredSink>,
}

impl SinkRouter {
    pub fn new(sinks: Vec<LevelFilteredSink>) -> Self {
        Self { sinks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sinks(&self) -> &[LevelFilteredSink] {
        &self.sinks
    }

    /// Offers the entry to every sink in registration order. A failing sink
    /// never prevents the ones after it from receiving the entry.
    pub fn dispatch(&self, entry: &LogEntry) -> Result<(), DispatchError> {
        self.each(|sink| sink.dispatch(entry))
    }

    pub fn flush(&self) -> Result<(), DispatchError> {
        self.each(LevelFilteredSink::flush)
    }

    fn each(&self, f: impl Fn(&LevelFilteredSink) -> Result<(), SinkError>) -> Result<(), DispatchError> {
        let failures: Vec<_> = self
            .sinks
            .iter()
            .filter_map(|sink| {
                f(sink).err().map(|error| SinkFailure {
                    sink: sink.name().to_owned(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError { failures })
        }
    }
}

/// One sink that could not take an entry.
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub error: SinkError,
}

/// Every sink failure of a single dispatch.
#[derive(Debug)]
pub struct DispatchError {
    pub failures: Vec<SinkFailure>,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sink(s) failed", self.failures.len())?;

        for failure in &self.failures {
            write!(f, "; {}: {}", failure.sink, failure.error)?;
        }

        Ok(())
    }
}

impl std::error::Error for DispatchError {}

#[cfg(test)]
mod tests {
    use super::SinkRouter;
    use crate::{
        entry::LogEntry,
        error::SinkError,
        level::Level,
        sink::{LevelFilteredSink, MemorySink, Sink},
    };
    use rstest::rstest;
    use std::{io, sync::Arc};

    struct BrokenSink;

    impl Sink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn write(&self, _: &LogEntry) -> Result<(), SinkError> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into())
        }
    }

    #[rstest]
    fn delivers_to_sinks_at_or_below_entry_level(
        #[values(Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal)] level: Level,
        #[values(Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal)] min_level: Level,
    ) {
        let gated = Arc::new(MemorySink::new());
        let everything = Arc::new(MemorySink::new());

        let router = SinkRouter::new(vec![
            LevelFilteredSink::new(gated.clone(), min_level),
            LevelFilteredSink::new(everything.clone(), Level::Debug),
        ]);

        router.dispatch(&LogEntry::builder(level, "msg").build()).unwrap();

        assert_eq!(usize::from(level >= min_level), gated.len());
        assert_eq!(1, everything.len());
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let before = Arc::new(MemorySink::new());
        let after = Arc::new(MemorySink::new());

        let router = SinkRouter::new(vec![
            LevelFilteredSink::new(before.clone(), Level::Debug),
            LevelFilteredSink::new(BrokenSink, Level::Debug),
            LevelFilteredSink::new(after.clone(), Level::Debug),
        ]);

        let error = router
            .dispatch(&LogEntry::builder(Level::Info, "msg").build())
            .unwrap_err();

        assert_eq!(1, before.len());
        assert_eq!(1, after.len());
        assert_eq!(1, error.failures.len());
        assert_eq!("broken", error.failures[0].sink);
        insta::assert_snapshot!(error.to_string(), @"1 sink(s) failed; broken: writing log entry: pipe closed");
    }

    #[test]
    fn filtered_out_failing_sink_is_not_called() {
        let router = SinkRouter::new(vec![LevelFilteredSink::new(BrokenSink, Level::Error)]);

        assert!(router.dispatch(&LogEntry::builder(Level::Warn, "msg").build()).is_ok());
        assert!(router.dispatch(&LogEntry::builder(Level::Error, "msg").build()).is_err());
    }

    #[test]
    fn empty_router_is_a_no_op() {
        let router = SinkRouter::empty();

        assert!(router.is_empty());
        assert!(router.dispatch(&LogEntry::builder(Level::Fatal, "msg").build()).is_ok());
        assert!(router.flush().is_ok());
    }
}
