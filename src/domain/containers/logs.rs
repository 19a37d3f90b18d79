use crate::domain::containers::port::ContainerRuntime;
use log::warn;

pub const DEFAULT_TAIL: usize = 100;

const HEADER_LEN: usize = 8;

#[derive(Clone)]
pub struct LogRetriever<R: ContainerRuntime> {
    runtime: R,
}

impl<R: ContainerRuntime> LogRetriever<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Last `tail` log lines of the container. A failed fetch comes back as a
    /// single line describing the error.
    pub async fn fetch_logs(&self, container_name: &str, tail: usize) -> Vec<String> {
        match self.runtime.container_logs(container_name, tail).await {
            Ok(raw) => demultiplex(&raw),
            Err(e) => {
                warn!("fetching logs of {container_name} failed: {e}");
                vec![format!("Error fetching logs: {e}")]
            }
        }
    }
}

/// Splits a runtime log stream into plain text lines.
///
/// Frames look like `[stream, 0, 0, 0, len_be32...] payload`. Once the bytes
/// stop looking like a frame header (containers with a TTY send raw text) the
/// rest is taken as is. Blank lines are dropped.
pub fn demultiplex(raw: &[u8]) -> Vec<String> {
    let mut text = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some((payload, remaining)) = next_frame(rest) {
        text.extend_from_slice(payload);
        rest = remaining;
    }
    text.extend_from_slice(rest);

    String::from_utf8_lossy(&text)
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn next_frame(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if header[0] > 2 || header[1..4] != [0, 0, 0] {
        return None;
    }
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let len = len.min(body.len());
    Some(body.split_at(len))
}

/// Encodes one frame, the inverse of [`demultiplex`] for a single payload.
pub fn frame(stream: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(stream);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::runtime_memory::{InMemoryRuntime, MemoryContainer};

    #[test]
    fn three_frames_give_three_lines() {
        let mut raw = frame(1, b"2024-05-01T10:00:00Z starting broker\n");
        raw.extend(frame(2, b"2024-05-01T10:00:01Z WARN no topics\n"));
        raw.extend(frame(1, b"2024-05-01T10:00:02Z ready\n"));

        let lines = demultiplex(&raw);
        assert_eq!(
            lines,
            vec![
                "2024-05-01T10:00:00Z starting broker",
                "2024-05-01T10:00:01Z WARN no topics",
                "2024-05-01T10:00:02Z ready",
            ]
        );
    }

    #[test]
    fn blank_lines_are_dropped() {
        let mut raw = frame(1, b"first\n\n");
        raw.extend(frame(1, b"   \n"));
        raw.extend(frame(2, b"second\r\n"));
        assert_eq!(demultiplex(&raw), vec!["first", "second"]);
    }

    #[test]
    fn tty_output_passes_through() {
        let raw = b"plain line one\nplain line two\n";
        assert_eq!(demultiplex(raw), vec!["plain line one", "plain line two"]);
    }

    #[test]
    fn truncated_frame_keeps_what_arrived() {
        let mut raw = frame(1, b"complete\n");
        let mut partial = frame(1, b"cut short here\n");
        partial.truncate(14);
        raw.extend(partial);
        assert_eq!(demultiplex(&raw), vec!["complete", "cut sh"]);
    }

    #[tokio::test]
    async fn fetch_failure_becomes_a_log_line() {
        let retriever = LogRetriever::new(InMemoryRuntime::default());
        let lines = retriever.fetch_logs("ghost", DEFAULT_TAIL).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Error fetching logs:"));
    }

    #[tokio::test]
    async fn fetch_demultiplexes_runtime_output() {
        let runtime = InMemoryRuntime::new([
            MemoryContainer::running("kafka").with_logs(frame(1, b"hello\nworld\n"))
        ]);
        let lines = LogRetriever::new(runtime).fetch_logs("kafka", 10).await;
        assert_eq!(lines, vec!["hello", "world"]);
    }
}
