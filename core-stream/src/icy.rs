//! # Inline Metadata Interceptor
//!
//! Shoutcast-style servers that advertise `icy-metaint: N` interleave a
//! metadata block into the payload after every N audio bytes: one length
//! byte (count of 16-byte units, zero for "no update"), then that many
//! bytes of `StreamTitle='...';`-style text, padded with NULs.
//!
//! The interceptor splits arriving wire chunks into pure audio segments
//! and surfaces title updates, so ring-buffer offsets count audio bytes
//! only and absolute positions stay seekable.

use bytes::Bytes;

enum State {
    /// Passing through audio; `remaining` bytes until the next block.
    Audio { remaining: usize },
    /// The next byte is the metadata length byte.
    MetaLen,
    /// Collecting `remaining` more metadata bytes.
    Meta { remaining: usize, collected: Vec<u8> },
}

/// Splits an ICY-interleaved wire stream into audio and metadata.
pub struct IcyInterceptor {
    interval: usize,
    state: State,
}

/// Result of feeding one wire chunk through the interceptor.
#[derive(Debug, Default)]
pub struct IcySplit {
    /// Audio segments, in order. Zero-copy slices of the input chunk
    /// except where a block boundary fell inside it.
    pub audio: Vec<Bytes>,
    /// Most recent complete title update in this chunk, if any.
    pub title: Option<String>,
}

impl IcyInterceptor {
    /// # Panics
    ///
    /// Panics if `interval` is zero; callers only construct an
    /// interceptor when the server advertised a positive interval.
    pub fn new(interval: usize) -> Self {
        assert!(interval > 0, "icy interval must be non-zero");
        Self {
            interval,
            state: State::Audio { remaining: interval },
        }
    }

    /// Feed one wire chunk; returns the audio segments it contained and
    /// any title update completed inside it.
    pub fn split(&mut self, mut chunk: Bytes) -> IcySplit {
        let mut out = IcySplit::default();

        while !chunk.is_empty() {
            match &mut self.state {
                State::Audio { remaining } => {
                    let take = (*remaining).min(chunk.len());
                    if take > 0 {
                        out.audio.push(chunk.split_to(take));
                        *remaining -= take;
                    }
                    if *remaining == 0 {
                        self.state = State::MetaLen;
                    }
                }
                State::MetaLen => {
                    let len = chunk.split_to(1)[0] as usize * 16;
                    self.state = if len == 0 {
                        State::Audio {
                            remaining: self.interval,
                        }
                    } else {
                        State::Meta {
                            remaining: len,
                            collected: Vec::with_capacity(len),
                        }
                    };
                }
                State::Meta {
                    remaining,
                    collected,
                } => {
                    let take = (*remaining).min(chunk.len());
                    collected.extend_from_slice(&chunk.split_to(take));
                    *remaining -= take;
                    if *remaining == 0 {
                        if let Some(title) = parse_stream_title(collected) {
                            out.title = Some(title);
                        }
                        self.state = State::Audio {
                            remaining: self.interval,
                        };
                    }
                }
            }
        }

        out
    }
}

/// Extract the `StreamTitle='...'` value from a metadata block.
fn parse_stream_title(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let after_key = text.split_once("StreamTitle='")?.1;
    let title = match after_key.split_once("';") {
        Some((value, _)) => value,
        None => after_key.trim_end_matches('\0').strip_suffix('\'')?,
    };
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
