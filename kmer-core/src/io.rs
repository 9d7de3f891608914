//! Transparent-gzip FASTA reading, grounded in the teacher's
//! `seqkmer::reader`/`seqkmer::fasta` pair.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek};
use std::path::Path;

use flate2::read::GzDecoder;

pub const BUFSIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub id: String,
    pub seq: Vec<u8>,
}

pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("file not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

fn is_gzipped(file: &mut File) -> io::Result<bool> {
    let mut buffer = [0u8; 2];
    if file.read_exact(&mut buffer).is_err() {
        file.rewind()?;
        return Ok(false);
    }
    file.rewind()?;
    Ok(buffer == [0x1F, 0x8B])
}

pub fn dyn_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read + Send>> {
    let mut file = open_file(path)?;
    if is_gzipped(&mut file)? {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// A minimal single-record-at-a-time FASTA reader. Multi-line sequences
/// are concatenated; headers start with `>`.
pub struct FastaReader<R: Read> {
    lines: std::io::Lines<BufReader<R>>,
    pending_header: Option<String>,
}

impl<R: Read> FastaReader<R> {
    pub fn new(inner: R) -> Self {
        FastaReader {
            lines: BufReader::with_capacity(BUFSIZE, inner).lines(),
            pending_header: None,
        }
    }

    pub fn next_record(&mut self) -> io::Result<Option<Sequence>> {
        let mut header = match self.pending_header.take() {
            Some(h) => Some(h),
            None => None,
        };
        if header.is_none() {
            loop {
                match self.lines.next() {
                    None => return Ok(None),
                    Some(line) => {
                        let line = line?;
                        if let Some(rest) = line.strip_prefix('>') {
                            header = Some(rest.to_string());
                            break;
                        }
                    }
                }
            }
        }
        let id = header.unwrap();
        let mut seq = Vec::new();
        loop {
            match self.lines.next() {
                None => break,
                Some(line) => {
                    let line = line?;
                    if let Some(rest) = line.strip_prefix('>') {
                        self.pending_header = Some(rest.to_string());
                        break;
                    }
                    seq.extend_from_slice(line.trim_end().as_bytes());
                }
            }
        }
        Ok(Some(Sequence { id, seq }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_multi_record_fasta() {
        let data = b">r1\nACGT\nACGT\n>r2\nTTTT\n".to_vec();
        let mut reader = FastaReader::new(Cursor::new(data));
        let r1 = reader.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "r1");
        assert_eq!(r1.seq, b"ACGTACGT");
        let r2 = reader.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "r2");
        assert_eq!(r2.seq, b"TTTT");
        assert!(reader.next_record().unwrap().is_none());
    }
}
