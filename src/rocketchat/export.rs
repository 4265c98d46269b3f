use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Streams one record per non-blank line of an export file.
pub struct JsonLines<T> {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    _record: PhantomData<T>,
}

pub fn open<T: DeserializeOwned>(path: &Path) -> Result<JsonLines<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(JsonLines {
        path: path.to_path_buf(),
        lines: BufReader::new(file).lines(),
        line_no: 0,
        _record: PhantomData,
    })
}

impl<T: DeserializeOwned> Iterator for JsonLines<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    return Some(Err(err).with_context(|| {
                        format!("failed to read {}:{}", self.path.display(), self.line_no)
                    }));
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(trimmed).with_context(|| {
                format!("failed to parse {}:{}", self.path.display(), self.line_no)
            }));
        }
    }
}
