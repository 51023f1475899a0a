use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::snapshot::Snapshot;

/// Writes snapshots as JSON lines.
pub struct Publisher {
    writer: Box<dyn AsyncWrite + Unpin + Send>,
    published: u64,
}

impl Publisher {
    /// Append to `output`, or write to standard output when there is no file.
    pub async fn open(output: Option<&Path>) -> Result<Publisher> {
        let writer: Box<dyn AsyncWrite + Unpin + Send> = match output {
            Some(path) => Box::new(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .with_context(|| format!("Cannot open snapshot output {}", path.display()))?,
            ),
            None => Box::new(tokio::io::stdout()),
        };
        Ok(Publisher::from_writer(writer))
    }

    pub fn from_writer(writer: Box<dyn AsyncWrite + Unpin + Send>) -> Publisher {
        Publisher {
            writer,
            published: 0,
        }
    }

    pub async fn publish(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut line = serde_json::to_vec(snapshot).context("Cannot serialize snapshot")?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.published += 1;
        Ok(())
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut publisher = Publisher::open(Some(file.path())).await.unwrap();
        publisher.publish(&Snapshot::default()).await.unwrap();
        publisher.publish(&Snapshot::default()).await.unwrap();
        assert_eq!(publisher.published(), 2);

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![r#"{"bsss":[],"stas":[]}"#; 2]);
    }
}
