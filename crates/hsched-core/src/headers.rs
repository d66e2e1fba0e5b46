//! Response header reconstruction from the engine's raw header callback.
//!
//! libcurl reports every header line of every response in a redirect chain,
//! one line per callback, with the CRLF still attached. Lines may also use
//! obsolete line folding (RFC 7230 section 3.2.4):
//!
//! ```text
//! header-field   = field-name ":" OWS field-value OWS
//! field-value    = *( field-content / obs-fold )
//! obs-fold       = CRLF 1*( SP / HTAB )
//! ```
//!
//! [`HeaderAssembler`] turns that stream into a flat, ordered list of
//! `Name: value` lines for the final response only.

/// Accumulates header lines for one in-flight transfer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderAssembler {
    lines: Vec<String>,
}

impl HeaderAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw header line as delivered by the engine.
    ///
    /// # Panics
    ///
    /// Panics if a folded continuation line arrives before any header line
    /// of the current response. A conforming engine never does this.
    pub fn push_line(&mut self, raw: &[u8]) {
        if is_status_line(raw) {
            // New response segment (redirect hop, 100 Continue, ...).
            self.lines.clear();
            return;
        }

        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();

        if is_continuation(raw) {
            let Some(prev) = self.lines.last_mut() else {
                panic!("folded header continuation with no preceding header line");
            };
            if trimmed.is_empty() {
                return;
            }
            // A fold after the blank end-of-headers entry starts it fresh.
            if !prev.is_empty() {
                prev.push(' ');
            }
            prev.push_str(trimmed);
            return;
        }

        // The bare CRLF ending a header block is kept as an empty entry.
        self.lines.push(trimmed.to_string());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

fn is_status_line(raw: &[u8]) -> bool {
    raw.len() >= 5 && raw[..5].eq_ignore_ascii_case(b"http/")
}

fn is_continuation(raw: &[u8]) -> bool {
    matches!(raw.first(), Some(b' ') | Some(b'\t'))
}

/// Returns the value of the first `name: value` line whose name matches
/// `name` case-insensitively.
pub fn find_header<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}
