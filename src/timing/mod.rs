//! ttyrec → script/timing conversion.
//!
//! A ttyrec file is a run of frames, each a 12-byte little-endian header
//! `(seconds, microseconds, length)` followed by `length` bytes of terminal
//! output. The canonical form used everywhere else in ttycast is the pair
//! produced by util-linux `script -t`: the raw output dump plus one
//! `"<delta> <bytes>"` line per write.

use std::fmt::Write as _;
use thiserror::Error;

/// First line of every converted script stream. Players skip the first line
/// of a script file, so the timing stream does not account for it.
pub const CONVERTED_BANNER: &str = "Script started (converted from ttyrec)\n";

/// Size of a ttyrec frame header in bytes.
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecording {
    #[error("recording is {len} bytes, shorter than one 12-byte frame header")]
    TooShort { len: usize },

    #[error("truncated frame header at byte {offset}: only {available} bytes left")]
    TruncatedHeader { offset: usize, available: usize },

    #[error(
        "truncated frame payload at byte {offset}: header announces {expected} bytes, {available} available"
    )]
    TruncatedPayload {
        offset: usize,
        expected: usize,
        available: usize,
    },
}

/// One decoded ttyrec write event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub seconds: u32,
    pub microseconds: u32,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    fn timestamp_micros(&self) -> i64 {
        i64::from(self.seconds) * 1_000_000 + i64::from(self.microseconds)
    }
}

/// Canonical two-stream form of a recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalSession {
    /// Raw terminal output, first line is a header that replay skips.
    pub script: Vec<u8>,
    /// `"<delta_seconds> <byte_count>\n"` per write.
    pub timing: String,
}

impl CanonicalSession {
    pub fn new(script: Vec<u8>, timing: String) -> Self {
        Self { script, timing }
    }

    pub fn frame_count(&self) -> usize {
        self.timing.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

/// Iterator over the frames of a raw ttyrec buffer.
///
/// Yields an error once and then stops if the buffer ends in the middle of a
/// frame.
pub struct Frames<'a> {
    raw: &'a [u8],
    pos: usize,
    failed: bool,
}

/// Iterate the frames of `raw` without copying payloads.
pub fn frames(raw: &[u8]) -> Frames<'_> {
    Frames {
        raw,
        pos: 0,
        failed: false,
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<Frame<'a>, MalformedRecording>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.raw.len() {
            return None;
        }

        let raw = self.raw;
        let offset = self.pos;
        let rest = &raw[offset..];
        if rest.len() < HEADER_LEN {
            self.failed = true;
            return Some(Err(MalformedRecording::TruncatedHeader {
                offset,
                available: rest.len(),
            }));
        }

        let seconds = read_u32_le(rest, 0);
        let microseconds = read_u32_le(rest, 4);
        let expected = read_u32_le(rest, 8) as usize;
        let available = rest.len() - HEADER_LEN;
        if expected > available {
            self.failed = true;
            return Some(Err(MalformedRecording::TruncatedPayload {
                offset,
                expected,
                available,
            }));
        }

        self.pos += HEADER_LEN + expected;
        Some(Ok(Frame {
            seconds,
            microseconds,
            payload: &rest[HEADER_LEN..HEADER_LEN + expected],
        }))
    }
}

fn read_u32_le(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Convert a raw ttyrec recording into the canonical script/timing pair.
///
/// The delta of the first frame is measured against its own timestamp.
/// Deltas are signed: a clock that steps backwards yields a negative delta
/// rather than being clamped.
pub fn convert(raw: &[u8]) -> Result<CanonicalSession, MalformedRecording> {
    if raw.len() < HEADER_LEN {
        return Err(MalformedRecording::TooShort { len: raw.len() });
    }

    let mut prev = i64::from(read_u32_le(raw, 0)) * 1_000_000 + i64::from(read_u32_le(raw, 4));
    let mut script = Vec::with_capacity(CONVERTED_BANNER.len() + raw.len());
    script.extend_from_slice(CONVERTED_BANNER.as_bytes());
    let mut timing = String::new();

    for frame in frames(raw) {
        let frame = frame?;
        let now = frame.timestamp_micros();
        let delta = (now - prev) as f64 / 1_000_000.0;
        // writing into a String cannot fail
        let _ = writeln!(timing, "{} {}", format_delta(delta), frame.payload.len());
        script.extend_from_slice(frame.payload);
        prev = now;
    }

    Ok(CanonicalSession { script, timing })
}

/// Whole seconds keep one decimal (`0.0`, `2.0`); everything else prints as
/// a plain decimal, never in exponent form.
fn format_delta(delta: f64) -> String {
    if delta.fract() == 0.0 {
        format!("{:.1}", delta)
    } else {
        format!("{}", delta)
    }
}

/// A parsed line of a canonical timing stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingLine {
    pub delta: f64,
    pub byte_count: usize,
}

impl TimingLine {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let delta = parts.next()?.parse::<f64>().ok()?;
        let byte_count = parts.next()?.parse::<usize>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { delta, byte_count })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid timing line {line_no}: {content:?}")]
pub struct InvalidTiming {
    pub line_no: usize,
    pub content: String,
}

/// Parse a whole timing stream. Blank lines are ignored.
pub fn parse_timing(timing: &str) -> Result<Vec<TimingLine>, InvalidTiming> {
    timing
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            TimingLine::parse(line).ok_or_else(|| InvalidTiming {
                line_no: idx + 1,
                content: line.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sec: u32, usec: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&sec.to_le_bytes());
        out.extend_from_slice(&usec.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_single_frame() {
        let raw = frame(0, 0, b"foo");
        let session = convert(&raw).unwrap();

        assert_eq!(session.timing, "0.0 3\n");
        assert_eq!(session.script, format!("{}foo", CONVERTED_BANNER).into_bytes());
    }

    #[test]
    fn test_fractional_delta() {
        let mut raw = frame(0, 500_000, b"a");
        raw.extend(frame(1, 0, b"bc"));
        let session = convert(&raw).unwrap();
        let lines = parse_timing(&session.timing).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].delta, 0.0);
        assert!((lines[1].delta - 0.5).abs() < 1e-9);
        assert_eq!(lines[1].byte_count, 2);
        assert_eq!(session.timing.lines().nth(1), Some("0.5 2"));
    }

    #[test]
    fn test_first_frame_is_its_own_baseline() {
        let mut raw = frame(1_700_000_000, 250_000, b"$ ");
        raw.extend(frame(1_700_000_002, 250_000, b"ls\r\n"));
        let session = convert(&raw).unwrap();

        assert_eq!(session.timing, "0.0 2\n2.0 4\n");
    }

    #[test]
    fn test_frame_and_byte_accounting() {
        let payloads: [&[u8]; 4] = [b"hello", b"", b"\x1b[31mred\x1b[0m", b"\r\n"];
        let mut raw = Vec::new();
        for (i, p) in payloads.iter().enumerate() {
            raw.extend(frame(10 + i as u32, (i as u32) * 1000, p));
        }

        let session = convert(&raw).unwrap();
        let lines = parse_timing(&session.timing).unwrap();
        let total: usize = payloads.iter().map(|p| p.len()).sum();

        assert_eq!(lines.len(), payloads.len());
        assert_eq!(session.frame_count(), payloads.len());
        assert_eq!(session.script.len(), total + CONVERTED_BANNER.len());
        assert_eq!(
            lines.iter().map(|l| l.byte_count).sum::<usize>(),
            session.script.len() - CONVERTED_BANNER.len()
        );
    }

    #[test]
    fn test_negative_delta_is_preserved() {
        let mut raw = frame(5, 900_000, b"x");
        raw.extend(frame(5, 100_000, b"y"));
        let session = convert(&raw).unwrap();
        let lines = parse_timing(&session.timing).unwrap();

        assert!((lines[1].delta + 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_small_delta_has_no_exponent() {
        let mut raw = frame(0, 0, b"x");
        raw.extend(frame(0, 1, b"y"));
        let session = convert(&raw).unwrap();

        assert_eq!(session.timing.lines().nth(1), Some("0.000001 1"));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(convert(b""), Err(MalformedRecording::TooShort { len: 0 }));
        assert_eq!(
            convert(&[0u8; 11]),
            Err(MalformedRecording::TooShort { len: 11 })
        );
    }

    #[test]
    fn test_truncated_payload() {
        let mut raw = frame(0, 0, b"foo");
        raw.truncate(raw.len() - 1);

        assert_eq!(
            convert(&raw),
            Err(MalformedRecording::TruncatedPayload {
                offset: 0,
                expected: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn test_trailing_partial_header() {
        let mut raw = frame(0, 0, b"foo");
        raw.extend_from_slice(&[1, 0, 0, 0, 0]);

        assert_eq!(
            convert(&raw),
            Err(MalformedRecording::TruncatedHeader {
                offset: 15,
                available: 5,
            })
        );
    }

    #[test]
    fn test_frames_iterator_stops_after_error() {
        let mut raw = frame(0, 0, b"ok");
        raw.extend_from_slice(&[0, 0, 0]);
        let items: Vec<_> = frames(&raw).collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().payload, b"ok");
        assert!(items[1].is_err());
    }

    #[test]
    fn test_parse_timing_rejects_garbage() {
        let err = parse_timing("0.1 4\nscript: invalid option\n").unwrap_err();
        assert_eq!(err.line_no, 2);
        assert!(TimingLine::parse("0.25 17").is_some());
        assert!(TimingLine::parse("0.25 17 extra").is_none());
        assert!(TimingLine::parse("0.25").is_none());
    }
}
