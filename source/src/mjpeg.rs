use bytes::BytesMut;

use crate::SourceError;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Boundary token watchtower uses when the Content-Type header does not
/// advertise one.
pub const DEFAULT_BOUNDARY: &str = "frame";

/// Extract the multipart boundary token from a
/// `multipart/x-mixed-replace; boundary=...` Content-Type value.
/// Leading dashes and quotes are normalized away; some servers include
/// them in the parameter even though they are part of the delimiter line.
pub fn boundary_from_content_type(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("boundary="))
        .map(|token| token.trim_matches('"').trim_start_matches('-').to_string())
        .find(|token| !token.is_empty())
}

/// Parse state for the MJPEG multipart stream.
enum ParseState {
    /// Looking for the delimiter line `--<boundary>\r\n`.
    SeekingBoundary,
    /// Found the delimiter, now looking for end of part headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next delimiter.
    CollectingJpeg,
}

/// Incremental MJPEG multipart parser.
///
/// Network chunks arrive split at arbitrary positions; `push` consumes
/// one chunk and returns every complete JPEG part it finished. Carries
/// partial boundary/header/payload bytes across calls.
pub struct MjpegParser {
    delimiter: Vec<u8>,
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
    /// Cap on the parse buffer, so a stream that stops producing
    /// boundaries cannot grow it without limit.
    max_part_bytes: usize,
}

impl MjpegParser {
    pub fn new(boundary: &str, max_part_bytes: usize) -> Self {
        Self {
            delimiter: format!("--{boundary}\r\n").into_bytes(),
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
            max_part_bytes,
        }
    }

    /// Feed one network chunk; returns the JPEG payloads completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, SourceError> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.max_part_bytes {
            return Err(SourceError::FrameTooLarge {
                bytes: self.buffer.len(),
                max: self.max_part_bytes,
            });
        }

        let mut parts = Vec::new();
        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, &self.delimiter) {
                        // Discard everything up to and including the delimiter
                        let _ = self.buffer.split_to(pos + self.delimiter.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep last few bytes in case the delimiter spans chunks
                        if self.buffer.len() > self.delimiter.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - self.delimiter.len());
                        }
                        break;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        // Discard part headers
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        break;
                    }
                }
                ParseState::CollectingJpeg => {
                    // The next delimiter marks where this JPEG ends
                    if let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], &self.delimiter)
                    {
                        let jpeg_end = self.jpeg_start + pos;
                        // Strip trailing \r\n before the delimiter
                        let end = if jpeg_end >= 2
                            && self.buffer[jpeg_end - 2] == b'\r'
                            && self.buffer[jpeg_end - 1] == b'\n'
                        {
                            jpeg_end - 2
                        } else {
                            jpeg_end
                        };

                        let payload = self.buffer[..end].to_vec();
                        let _ = self.buffer.split_to(jpeg_end + self.delimiter.len());
                        if !payload.is_empty() {
                            parts.push(payload);
                        }

                        // Already past the delimiter, go to header parsing
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // No delimiter yet; remember where to resume the scan
                        self.jpeg_start = if self.buffer.len() > self.delimiter.len() {
                            self.buffer.len() - self.delimiter.len()
                        } else {
                            0
                        };
                        break;
                    }
                }
            }
        }
        Ok(parts)
    }
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(boundary: &str, payload: &[u8]) -> Vec<u8> {
        let mut bytes = format!("--{boundary}\r\nContent-Type: image/jpeg\r\n\r\n").into_bytes();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    #[test]
    fn boundary_parsing() {
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace; boundary=frame"),
            Some("frame".to_string())
        );
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace;boundary=\"--wtframe\""),
            Some("wtframe".to_string())
        );
        assert_eq!(boundary_from_content_type("image/jpeg"), None);
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace; boundary="),
            None
        );
    }

    #[test]
    fn single_part_in_one_chunk() {
        let payload = b"\xFF\xD8fake-jpeg\xFF\xD9";
        let mut stream = part("frame", payload);
        // The next delimiter is what terminates the part
        stream.extend_from_slice(b"--frame\r\n");

        let mut parser = MjpegParser::new("frame", 1024);
        let parts = parser.push(&stream).unwrap();
        assert_eq!(parts, vec![payload.to_vec()]);
    }

    #[test]
    fn parts_survive_single_byte_chunking() {
        let first = b"\xFF\xD8first\xFF\xD9".to_vec();
        let second = b"\xFF\xD8second-longer\xFF\xD9".to_vec();
        let mut stream = part("frame", &first);
        stream.extend_from_slice(&part("frame", &second));
        stream.extend_from_slice(b"--frame\r\n");

        let mut parser = MjpegParser::new("frame", 1024);
        let mut parts = Vec::new();
        for byte in &stream {
            parts.extend(parser.push(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(parts, vec![first, second]);
    }

    #[test]
    fn noise_before_first_boundary_is_discarded() {
        let payload = b"\xFF\xD8data\xFF\xD9";
        let mut stream = b"HTTP junk that is not a boundary".to_vec();
        stream.extend_from_slice(&part("frame", payload));
        stream.extend_from_slice(b"--frame\r\n");

        let mut parser = MjpegParser::new("frame", 1024);
        let parts = parser.push(&stream).unwrap();
        assert_eq!(parts, vec![payload.to_vec()]);
    }

    #[test]
    fn respects_custom_boundary() {
        let payload = b"\xFF\xD8x\xFF\xD9";
        let mut stream = part("wtframe", payload);
        stream.extend_from_slice(b"--wtframe\r\n");

        let mut parser = MjpegParser::new("wtframe", 1024);
        let parts = parser.push(&stream).unwrap();
        assert_eq!(parts, vec![payload.to_vec()]);
    }

    #[test]
    fn oversized_part_is_an_error() {
        let mut parser = MjpegParser::new("frame", 64);
        let mut stream = part("frame", &vec![0xAB; 128]);
        stream.extend_from_slice(b"--frame\r\n");
        assert!(matches!(
            parser.push(&stream),
            Err(SourceError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn incomplete_part_yields_nothing_yet() {
        let payload = b"\xFF\xD8pending\xFF\xD9";
        let stream = part("frame", payload);

        let mut parser = MjpegParser::new("frame", 1024);
        // No trailing delimiter yet, so the part is still open
        assert!(parser.push(&stream).unwrap().is_empty());
        // Delimiter arrives, part completes
        let parts = parser.push(b"--frame\r\n").unwrap();
        assert_eq!(parts, vec![payload.to_vec()]);
    }
}
