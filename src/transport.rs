use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::common::TransportEvent;

/// Session event source fed by newline-delimited JSON, one event per line.
pub struct JsonLinesTransport<R> {
    reader: R,
    event_sender: mpsc::Sender<TransportEvent>,
}

impl<R> JsonLinesTransport<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, event_sender: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            reader,
            event_sender,
        }
    }

    /// Forward events until the input ends or the receiver goes away.
    /// Returns how many events were delivered.
    pub async fn run(self) -> io::Result<usize> {
        let mut lines = self.reader.lines();
        let mut line_no = 0usize;
        let mut delivered = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event = match serde_json::from_str::<TransportEvent>(line) {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("Skipping malformed session event on line {line_no}: {err}");
                    continue;
                }
            };

            if self.event_sender.send(event).await.is_err() {
                log::warn!("Sync engine stopped listening; closing session stream");
                break;
            }
            delivered += 1;
        }

        Ok(delivered)
    }
}

/// Open the event stream: a file when given, stdin otherwise.
pub async fn open_events(
    path: Option<&Path>,
) -> io::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path).await?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}
