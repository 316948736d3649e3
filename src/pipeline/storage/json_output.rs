use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialize `value` as pretty JSON to `path` via a temporary sibling and rename.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Streams a pretty-printed JSON array one element at a time.
///
/// Output is byte-identical to `serde_json::to_writer_pretty` on the whole
/// array, without holding the array in memory.
pub struct JsonArrayWriter {
    path: PathBuf,
    tmp: PathBuf,
    writer: BufWriter<File>,
    count: u64,
}

impl JsonArrayWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(path);
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(b"[")?;
        Ok(Self {
            path: path.to_path_buf(),
            tmp,
            writer,
            count: 0,
        })
    }

    pub fn push<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        let rendered = serde_json::to_string_pretty(item)?;
        let separator: &[u8] = if self.count == 0 { b"\n" } else { b",\n" };
        self.writer.write_all(separator)?;
        for (i, line) in rendered.lines().enumerate() {
            if i > 0 {
                self.writer.write_all(b"\n")?;
            }
            self.writer.write_all(b"  ")?;
            self.writer.write_all(line.as_bytes())?;
        }
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Close the array and move the file into place.
    pub fn finish(mut self) -> io::Result<u64> {
        if self.count == 0 {
            self.writer.write_all(b"]\n")?;
        } else {
            self.writer.write_all(b"\n]\n")?;
        }
        self.writer.flush()?;
        drop(self.writer);
        fs::rename(&self.tmp, &self.path)?;
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_streamed_array_matches_pretty_printer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("index.json");
        let items = vec![
            json!({ "matchId": "A", "nested": { "x": [1, 2] }, "empty": [] }),
            json!({ "matchId": "B", "nested": {}, "flag": true }),
        ];

        let mut w = JsonArrayWriter::create(&path).unwrap();
        for item in &items {
            w.push(item).unwrap();
        }
        assert_eq!(w.finish().unwrap(), 2);

        let streamed = fs::read_to_string(&path).unwrap();
        let expected = serde_json::to_string_pretty(&items).unwrap() + "\n";
        assert_eq!(streamed, expected);
        assert!(!dir.path().join("out").join("index.json.tmp").exists());
    }

    #[test]
    fn test_empty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        let w = JsonArrayWriter::create(&path).unwrap();
        w.finish().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, serde_json::to_string_pretty(&Vec::<u8>::new()).unwrap() + "\n");
    }

    #[test]
    fn test_write_json_pretty_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.json");
        write_json_pretty(&path, &json!({ "a": 1 })).unwrap();
        write_json_pretty(&path, &json!({ "a": 2 })).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["a"], 2);
    }
}
