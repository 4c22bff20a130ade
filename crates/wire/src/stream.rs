// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental decoder for the agent's interleaved stdout/stderr stream.
//!
//! The agent emits plain progress lines, occasionally interrupted by a
//! CLIXML-framed payload (PowerShell's serialized-object format for
//! structured error/verbose/debug streams). The sentinel `#< CLIXML` and
//! the XML document that follows it may each be split across chunk
//! boundaries, so this decoder buffers raw bytes rather than assuming a
//! chunk aligns with a line or a complete document.

use quick_xml::events::Event;
use quick_xml::Reader;

const CLIXML_SENTINEL: &str = "#< CLIXML";
const CLIXML_CLOSE: &[u8] = b"</Objs>";

enum Mode {
    Text,
    Clixml(Vec<u8>),
}

/// Stateful line decoder. One instance per job; feed it chunks as they
/// arrive from the transport and collect zero or more complete output
/// lines per call.
pub struct StreamDecoder {
    buf: Vec<u8>,
    mode: Mode,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            mode: Mode::Text,
        }
    }

    /// Feed a chunk of stdout bytes, returning any complete lines decoded
    /// as a result.
    pub fn push_stdout(&mut self, chunk: &[u8]) -> Vec<String> {
        self.push(chunk, false)
    }

    /// Feed a chunk of stderr bytes. Each resulting line is tagged
    /// `STDERR: ` in the merged output sequence.
    pub fn push_stderr(&mut self, chunk: &[u8]) -> Vec<String> {
        self.push(chunk, true)
    }

    fn push(&mut self, chunk: &[u8], is_stderr: bool) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        loop {
            match &mut self.mode {
                Mode::Text => {
                    let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                        break;
                    };
                    let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                    line.pop(); // trailing \n
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    let text = String::from_utf8_lossy(&line).into_owned();
                    if text.trim_end() == CLIXML_SENTINEL {
                        self.mode = Mode::Clixml(Vec::new());
                        continue;
                    }
                    if text.is_empty() {
                        continue;
                    }
                    out.push(tag(text, is_stderr));
                }
                Mode::Clixml(acc) => {
                    acc.append(&mut self.buf);
                    let Some(end) = find_subsequence(acc, CLIXML_CLOSE) else {
                        break;
                    };
                    let xml_end = end + CLIXML_CLOSE.len();
                    let xml_bytes: Vec<u8> = acc.drain(..xml_end).collect();
                    while matches!(acc.first(), Some(b'\r') | Some(b'\n')) {
                        acc.remove(0);
                    }
                    self.buf = std::mem::take(acc);
                    self.mode = Mode::Text;

                    let xml_text = String::from_utf8_lossy(&xml_bytes);
                    for line in parse_s_elements(&xml_text) {
                        out.push(tag(line, is_stderr));
                    }
                }
            }
        }
        out
    }

    /// True while a CLIXML payload is mid-stream (decoder is buffering,
    /// waiting for the closing `</Objs>`).
    pub fn in_clixml(&self) -> bool {
        matches!(self.mode, Mode::Clixml(_))
    }
}

fn tag(line: String, is_stderr: bool) -> String {
    if is_stderr {
        format!("STDERR: {line}")
    } else {
        line
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Extract the text content of every `<S>` element in a CLIXML document,
/// in document order. Malformed XML yields whatever elements parsed
/// cleanly up to the failure point rather than discarding the whole
/// payload.
fn parse_s_elements(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut lines = Vec::new();
    let mut in_s = false;
    let mut current = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"S" => {
                in_s = true;
                current.clear();
            }
            Ok(Event::Text(e)) if in_s => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"S" => {
                in_s = false;
                lines.push(std::mem::take(&mut current));
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    lines
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
