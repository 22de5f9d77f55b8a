// ── Line-oriented NFC reader ──
//
// Text stand-in for a PC/SC reader: one event per line, so the bridge can
// be driven from a pipe, a FIFO or a terminal.
//
//   nfc1      connect
//   +nfc1     connect
//   -nfc1     release

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};
use tracing::{debug, trace};

use nfc2ble_core::{CoreError, NfcReader, ReaderEvent};

/// Parse one input line. `None` for blank, comment or bare-sign lines.
pub fn parse_line(line: &str) -> Option<ReaderEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (release, id) = match line.strip_prefix('-') {
        Some(id) => (true, id),
        None => (false, line.strip_prefix('+').unwrap_or(line)),
    };
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    Some(if release {
        ReaderEvent::Release(id.to_owned())
    } else {
        ReaderEvent::Connect(id.to_owned())
    })
}

pub struct LineReader<R> {
    lines: Lines<BufReader<R>>,
}

impl LineReader<Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            lines: BufReader::new(inner).lines(),
        }
    }
}

impl<R: AsyncRead + Unpin + Send> NfcReader for LineReader<R> {
    async fn next_event(&mut self) -> Result<Option<ReaderEvent>, CoreError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| CoreError::Reader {
                    message: e.to_string(),
                })?;
            let Some(line) = line else {
                return Ok(None);
            };
            match parse_line(&line) {
                Some(event) => {
                    trace!(?event, "reader event");
                    return Ok(Some(event));
                }
                None => debug!(line = %line, "ignored input line"),
            }
        }
    }

    async fn close(&mut self) {
        debug!("line reader closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_and_release() {
        assert_eq!(parse_line("nfc1"), Some(ReaderEvent::Connect("nfc1".into())));
        assert_eq!(parse_line(" +nfc1 "), Some(ReaderEvent::Connect("nfc1".into())));
        assert_eq!(parse_line("-nfc1"), Some(ReaderEvent::Release("nfc1".into())));
        assert_eq!(parse_line("- nfc1"), Some(ReaderEvent::Release("nfc1".into())));
    }

    #[test]
    fn ignores_noise() {
        for line in ["", "   ", "# tap log", "-", "+"] {
            assert_eq!(parse_line(line), None, "line {line:?}");
        }
    }

    #[tokio::test]
    async fn reads_events_until_end_of_input() {
        let input: &[u8] = b"nfc1\n\n# skip\n-nfc1\n04:a2:2b\n";
        let mut reader = LineReader::new(input);

        assert_eq!(
            reader.next_event().await.unwrap(),
            Some(ReaderEvent::Connect("nfc1".into()))
        );
        assert_eq!(
            reader.next_event().await.unwrap(),
            Some(ReaderEvent::Release("nfc1".into()))
        );
        assert_eq!(
            reader.next_event().await.unwrap(),
            Some(ReaderEvent::Connect("04:a2:2b".into()))
        );
        assert_eq!(reader.next_event().await.unwrap(), None);
    }
}
