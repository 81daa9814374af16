//! Transparent gzip I/O: shards, runs and source archives are always
//! written gzipped, but source archives are read whether or not they
//! actually carry the gzip magic bytes.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn is_gzip(mut reader: impl Read) -> io::Result<(bool, Vec<u8>)> {
    let mut peek = [0_u8; 2];
    let n = reader.read(&mut peek)?;
    Ok((n == 2 && peek == GZIP_MAGIC, peek[..n].to_vec()))
}

/// Open a source file for line-by-line reading, auto-detecting gzip by
/// magic bytes rather than trusting the file extension.
pub fn open_lines(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let (gzipped, prefix) = is_gzip(&mut reader)?;
    let prefixed = io::Cursor::new(prefix).chain(reader);
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(prefixed))))
    } else {
        Ok(Box::new(BufReader::new(prefixed)))
    }
}

/// Create a gzip writer for a shard or run file, truncating any existing
/// contents.
pub fn create_gz_writer(path: &Path) -> io::Result<BufWriter<GzEncoder<File>>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(GzEncoder::new(file, Compression::default())))
}

/// Flush and finish a gzip writer, surfacing any trailing I/O error.
pub fn finish_gz_writer(writer: BufWriter<GzEncoder<File>>) -> io::Result<()> {
    let inner = writer
        .into_inner()
        .map_err(|e| io::Error::new(e.error().kind(), e.to_string()))?;
    inner.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn roundtrips_gzip_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample.gz");
        let writer = create_gz_writer(&path).expect("create writer");
        let mut writer = writer;
        writer.write_all(b"hello\nworld\n").expect("write");
        finish_gz_writer(writer).expect("finish");

        let mut reader = open_lines(&path).expect("open");
        let mut contents = String::new();
        reader.read_to_string(&mut contents).expect("read");
        assert_eq!(contents, "hello\nworld\n");
    }

    #[test]
    fn reads_plain_text_without_gzip_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, b"plain\ntext\n").expect("write");

        let mut reader = open_lines(&path).expect("open");
        let mut contents = String::new();
        reader.read_to_string(&mut contents).expect("read");
        assert_eq!(contents, "plain\ntext\n");
    }
}
