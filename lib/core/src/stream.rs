//! Lazy, single-pass stream of vectors over one Avro data file.

use apache_avro::{Reader, Schema};
use std::io::Read;
use std::iter::FusedIterator;
use tracing::{debug, error};

use crate::{RecordProjector, Result, Vector};

/// Read only the writer schema embedded in an Avro data file header.
///
/// No records are decoded; the input is dropped (closed) before returning.
pub fn read_writer_schema<R: Read>(input: R) -> Result<Schema> {
    let reader = Reader::new(input)?;
    Ok(reader.writer_schema().clone())
}

/// Yields one [`Vector`] per record of the wrapped Avro container.
///
/// The underlying input is released the moment the stream is exhausted or fails,
/// and [`RecordStream::close`] releases it early for an aborted run. After that the
/// stream only returns `None`. Not restartable, not shareable between consumers.
pub struct RecordStream<'a, R: Read> {
    reader: Option<Reader<'a, R>>,
    projector: &'a RecordProjector,
    records: u64,
}

impl<'a, R: Read> RecordStream<'a, R> {
    /// Open a container, reading its records through the projector's schema
    pub fn open(projector: &'a RecordProjector, input: R) -> Result<Self> {
        let reader = Reader::with_schema(projector.schema(), input)?;
        Ok(Self {
            reader: Some(reader),
            projector,
            records: 0,
        })
    }

    /// Records projected so far
    #[inline]
    pub fn records(&self) -> u64 {
        self.records
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.projector.dim()
    }

    /// Release the underlying input. Idempotent.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Record stream closed after {} records", self.records);
        }
    }
}

impl<'a, R: Read> Iterator for RecordStream<'a, R> {
    type Item = Result<Vector>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        match reader.next() {
            Some(Ok(value)) => match self.projector.project(&value) {
                Ok(vector) => {
                    self.records += 1;
                    Some(Ok(vector))
                }
                Err(e) => {
                    self.close();
                    Some(Err(e))
                }
            },
            Some(Err(e)) => {
                error!("Avro reader failed after {} records: {}", self.records, e);
                self.close();
                Some(Err(e.into()))
            }
            None => {
                self.close();
                None
            }
        }
    }
}

impl<'a, R: Read> FusedIterator for RecordStream<'a, R> {}
