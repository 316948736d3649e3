use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::types::CanonicalRecord;

/// Append-only writer for the canonical NDJSON store.
pub struct CanonicalLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    appended: u64,
}

impl CanonicalLogWriter {
    pub fn open_append(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let needs_newline = ends_without_newline(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        // an interrupted run may have left a partial last line
        if needs_newline {
            writer.write_all(b"\n")?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            appended: 0,
        })
    }

    pub fn append(&mut self, record: &CanonicalRecord) -> io::Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", line)?;
        self.appended += 1;
        Ok(())
    }

    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(mut self) -> io::Result<u64> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.appended)
    }
}

fn ends_without_newline(path: &Path) -> io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdOnly {
    match_id: String,
}

/// Identifiers already present in the store; unreadable lines are ignored.
pub fn existing_ids(path: &Path) -> io::Result<HashSet<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut ids = HashSet::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        match serde_json::from_slice::<IdOnly>(&line) {
            Ok(row) => {
                ids.insert(row.match_id);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "unreadable canonical line"),
        }
    }
    Ok(ids)
}
