use crate::application::session::TimelineEntry;
use crate::error::Result;
use std::io::Write;

/// Writes a session timeline as CSV with the header `seq,phase,status,note`.
pub struct TimelineWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TimelineWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes every entry in order and flushes.
    ///
    /// An empty timeline still produces the header row.
    pub fn write_timeline(&mut self, entries: &[TimelineEntry]) -> Result<()> {
        if entries.is_empty() {
            self.writer.write_record(["seq", "phase", "status", "note"])?;
        }
        for entry in entries {
            self.writer.serialize(entry)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
