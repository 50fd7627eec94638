//! `omnipacker classify` – show the signals each output line produces.

use anyhow::Result;
use omnipacker_core::classify::{classify_line, ClassifyContext, Signal};
use omnipacker_core::console::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run_classify(stderr: bool) -> Result<()> {
    let stream = if stderr { Stream::Stderr } else { Stream::Stdout };
    let mut reader = LineReader::new(stream);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut n = 0usize;
    while let Some(line) = lines.next_line().await? {
        n += 1;
        let signals = reader.classify(&line);
        if !signals.is_empty() {
            println!("{n:>5}: {signals:?}");
        }
    }
    Ok(())
}

/// Tracks QR capture across lines so art and capture-end detection work.
struct LineReader {
    stream: Stream,
    ctx: ClassifyContext,
}

impl LineReader {
    fn new(stream: Stream) -> Self {
        Self {
            stream,
            ctx: ClassifyContext::default(),
        }
    }

    fn classify(&mut self, line: &str) -> Vec<Signal> {
        let signals = classify_line(line, self.stream, self.ctx);
        for signal in &signals {
            match signal {
                Signal::QrPromptStart => {
                    self.ctx = ClassifyContext {
                        qr_capturing: true,
                        qr_art_lines: 0,
                    }
                }
                Signal::QrArtLine => self.ctx.qr_art_lines += 1,
                Signal::QrCaptureEnd => self.ctx = ClassifyContext::default(),
                _ => {}
            }
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line_reports_percent() {
        let mut reader = LineReader::new(Stream::Stdout);
        assert!(reader
            .classify("Downloading depot 441 - 42.50%")
            .contains(&Signal::Progress(42)));
    }

    #[test]
    fn plain_line_has_no_signals() {
        let mut reader = LineReader::new(Stream::Stdout);
        assert!(reader.classify("Connecting to content server").is_empty());
    }
}
