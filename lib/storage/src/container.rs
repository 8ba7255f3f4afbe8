// Keyed vector container files
//
// Layout:
//   magic "AVVEC\x01"
//   bincode(ContainerHeader)
//   body (gzip when header.compressed):
//     repeated: u8 tag=1, bincode((u64 key, Vec<f64> values))
//     u8 tag=0  (end frame; absence means the file was truncated)
//
// Keys are strictly increasing and every record has header.dimension values.

use avrovec_core::{Error, Result, Vector};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Read, Write};

const MAGIC: &[u8; 6] = b"AVVEC\x01";
const FORMAT_VERSION: u32 = 1;
const TAG_RECORD: u8 = 1;
const TAG_END: u8 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerHeader {
    pub version: u32,
    pub compressed: bool,
    pub dimension: u64,
    /// Names of the vector slots, in order
    pub fields: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ContainerHeader {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            version: FORMAT_VERSION,
            compressed: false,
            dimension: fields.len() as u64,
            fields,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dimension as usize
    }
}

enum Body<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Body<W> {
    fn finish(self) -> io::Result<W> {
        match self {
            Body::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Body::Gzip(encoder) => {
                let mut w = encoder.finish()?;
                w.flush()?;
                Ok(w)
            }
        }
    }
}

impl<W: Write> Write for Body<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Body::Plain(w) => w.write(buf),
            Body::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Body::Plain(w) => w.flush(),
            Body::Gzip(w) => w.flush(),
        }
    }
}

/// Writes `(key, vector)` records in key order
pub struct VectorFileWriter<W: Write> {
    body: Body<W>,
    header: ContainerHeader,
    last_key: Option<u64>,
    records: u64,
}

impl<W: Write> VectorFileWriter<W> {
    pub fn new(mut inner: W, header: ContainerHeader) -> Result<Self> {
        inner.write_all(MAGIC)?;
        bincode::serialize_into(&mut inner, &header).map_err(codec_error)?;

        let body = if header.compressed {
            Body::Gzip(GzEncoder::new(inner, Compression::default()))
        } else {
            Body::Plain(inner)
        };

        Ok(Self {
            body,
            header,
            last_key: None,
            records: 0,
        })
    }

    #[inline]
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    #[inline]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Key the next appended record would get from [`VectorFileWriter::append_all`]
    #[inline]
    pub fn next_key(&self) -> u64 {
        self.last_key.map_or(0, |k| k + 1)
    }

    pub fn append(&mut self, key: u64, vector: &Vector) -> Result<()> {
        if let Some(last) = self.last_key {
            if key <= last {
                return Err(Error::Container(format!(
                    "keys must increase: {} written after {}",
                    key, last
                )));
            }
        }
        if vector.dim() != self.header.dim() {
            return Err(Error::Container(format!(
                "vector dimension {} does not match container dimension {}",
                vector.dim(),
                self.header.dim()
            )));
        }

        self.body.write_all(&[TAG_RECORD])?;
        bincode::serialize_into(&mut self.body, &(key, vector.as_slice())).map_err(codec_error)?;
        self.last_key = Some(key);
        self.records += 1;
        Ok(())
    }

    /// Drain a vector stream, keying records with a counter starting at
    /// [`VectorFileWriter::next_key`]. Stops at the first error.
    pub fn append_all<I>(&mut self, vectors: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Vector>>,
    {
        let mut written = 0;
        for vector in vectors {
            let key = self.next_key();
            self.append(key, &vector?)?;
            written += 1;
        }
        Ok(written)
    }

    /// Write the end frame and flush. Returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.body.write_all(&[TAG_END])?;
        Ok(self.body.finish()?)
    }
}

enum BodyReader<R: Read> {
    Plain(R),
    Gzip(GzDecoder<R>),
}

impl<R: Read> Read for BodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BodyReader::Plain(r) => r.read(buf),
            BodyReader::Gzip(r) => r.read(buf),
        }
    }
}

/// Iterates the `(key, vector)` records of a container, verifying framing
pub struct VectorFileReader<R: Read> {
    body: BodyReader<R>,
    header: ContainerHeader,
    last_key: Option<u64>,
    done: bool,
}

impl<R: Read> VectorFileReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut magic = [0u8; 6];
        inner.read_exact(&mut magic).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                Error::Container("file too short for a vector container".to_string())
            }
            _ => Error::Io(e),
        })?;
        if &magic != MAGIC {
            return Err(Error::Container("not a vector container".to_string()));
        }

        let header: ContainerHeader = bincode::deserialize_from(&mut inner).map_err(codec_error)?;
        if header.version != FORMAT_VERSION {
            return Err(Error::Container(format!(
                "unsupported container version {}",
                header.version
            )));
        }

        let body = if header.compressed {
            BodyReader::Gzip(GzDecoder::new(inner))
        } else {
            BodyReader::Plain(inner)
        };

        Ok(Self {
            body,
            header,
            last_key: None,
            done: false,
        })
    }

    #[inline]
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    fn read_record(&mut self) -> Result<Option<(u64, Vector)>> {
        let mut tag = [0u8; 1];
        match self.body.read_exact(&mut tag) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Error::Container(
                    "container truncated: missing end frame".to_string(),
                ))
            }
            Err(e) => return Err(Error::Io(e)),
        }

        match tag[0] {
            TAG_END => Ok(None),
            TAG_RECORD => {
                let (key, values): (u64, Vec<f64>) =
                    bincode::deserialize_from(&mut self.body).map_err(codec_error)?;
                if let Some(last) = self.last_key {
                    if key <= last {
                        return Err(Error::Container(format!(
                            "keys out of order: {} after {}",
                            key, last
                        )));
                    }
                }
                if values.len() != self.header.dim() {
                    return Err(Error::Container(format!(
                        "record {} has {} values, expected {}",
                        key,
                        values.len(),
                        self.header.dim()
                    )));
                }
                self.last_key = Some(key);
                Ok(Some((key, Vector::new(values))))
            }
            other => Err(Error::Container(format!("unknown frame tag {}", other))),
        }
    }
}

impl<R: Read> Iterator for VectorFileReader<R> {
    type Item = Result<(u64, Vector)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn codec_error(err: bincode::Error) -> Error {
    match *err {
        bincode::ErrorKind::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => {
            Error::Container("container truncated mid-record".to_string())
        }
        bincode::ErrorKind::Io(io) => Error::Io(io),
        other => Error::Container(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> ContainerHeader {
        ContainerHeader::new(vec!["a".to_string(), "c".to_string()])
    }

    fn write(header: ContainerHeader, vectors: Vec<Vec<f64>>) -> Vec<u8> {
        let mut writer = VectorFileWriter::new(Vec::new(), header).unwrap();
        writer
            .append_all(vectors.into_iter().map(|v| Ok(Vector::new(v))))
            .unwrap();
        writer.finish().unwrap()
    }

    fn read(bytes: Vec<u8>) -> Result<Vec<(u64, Vector)>> {
        VectorFileReader::new(Cursor::new(bytes))?.collect()
    }

    #[test]
    fn test_keys_count_from_zero() {
        let bytes = write(header(), vec![vec![5.0, 1.0], vec![2.0, 0.0], vec![0.0, 0.0]]);
        let records = read(bytes).unwrap();
        let keys: Vec<u64> = records.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(records[0].1.as_slice(), &[5.0, 1.0]);
    }

    #[test]
    fn test_compressed_body() {
        let vectors: Vec<Vec<f64>> = (0..200).map(|i| vec![i as f64, 1.0]).collect();
        let plain = write(header(), vectors.clone());
        let packed = write(header().compressed(true), vectors);
        assert!(packed.len() < plain.len());

        let reader = VectorFileReader::new(Cursor::new(packed)).unwrap();
        assert!(reader.header().compressed);
        let records: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 200);
        assert_eq!(records[199].1.as_slice(), &[199.0, 1.0]);
    }

    #[test]
    fn test_header_carries_fields_and_metadata() {
        let bytes = write(header().with_metadata("source", "file:///in/x.avro"), vec![]);
        let reader = VectorFileReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().fields, vec!["a", "c"]);
        assert_eq!(reader.header().dim(), 2);
        assert_eq!(reader.header().metadata["source"], "file:///in/x.avro");
    }

    #[test]
    fn test_zero_dimension_vectors() {
        let bytes = write(ContainerHeader::new(vec![]), vec![vec![], vec![]]);
        let records = read(bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_writer_rejects_unordered_keys_and_wrong_dimension() {
        let mut writer = VectorFileWriter::new(Vec::new(), header()).unwrap();
        writer.append(3, &Vector::new(vec![1.0, 2.0])).unwrap();
        assert!(matches!(
            writer.append(3, &Vector::new(vec![1.0, 2.0])),
            Err(Error::Container(_))
        ));
        assert!(matches!(
            writer.append(4, &Vector::new(vec![1.0])),
            Err(Error::Container(_))
        ));
        assert_eq!(writer.records(), 1);
        assert_eq!(writer.next_key(), 4);
    }

    #[test]
    fn test_append_all_stops_on_error() {
        let mut writer = VectorFileWriter::new(Vec::new(), header()).unwrap();
        let items = vec![
            Ok(Vector::new(vec![1.0, 1.0])),
            Err(Error::Decode("corrupt block".to_string())),
            Ok(Vector::new(vec![2.0, 2.0])),
        ];
        assert!(matches!(writer.append_all(items), Err(Error::Decode(_))));
        assert_eq!(writer.records(), 1);
    }

    #[test]
    fn test_missing_end_frame_is_truncation() {
        let mut writer = VectorFileWriter::new(Vec::new(), header()).unwrap();
        writer.append(0, &Vector::new(vec![1.0, 2.0])).unwrap();
        let Body::Plain(bytes) = writer.body else {
            unreachable!()
        };

        let mut reader = VectorFileReader::new(Cursor::new(bytes)).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(Error::Container(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_rejects_foreign_files() {
        assert!(matches!(read(b"Obj\x01garbage".to_vec()), Err(Error::Container(_))));
        assert!(matches!(read(b"AV".to_vec()), Err(Error::Container(_))));
    }
}
