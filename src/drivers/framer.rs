use crate::drivers::DecodeError;
use crate::types::{Sample, CHANNEL_COUNT};
const FIELD_DELIMITER: char = ',';
const CHANNEL_PREFIX: &str = "Channel:";
/// Reassembles newline-delimited records from arbitrary byte chunks.
///
/// Bytes are kept raw until a terminator arrives, so a multi-byte character split
/// across two reads is decoded intact. The trailing fragment is never finalized
/// on its own.
#[derive(Default, Debug)]
pub struct LineFramer {
    partial: Vec<u8>,
}
impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }
    /// Appends `chunk` and returns every line it completed, trimmed, empty lines skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);
        let Some(last_newline) = self.partial.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);
        complete
            .split(|&b| b == b'\n')
            .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }
}
/// Strictly decodes one data line: exactly nine comma-separated numeric literals.
pub fn decode_sample(line: &str) -> Result<Sample, DecodeError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() != CHANNEL_COUNT {
        return Err(DecodeError::FieldCount {
            expected: CHANNEL_COUNT,
            actual: fields.len(),
        });
    }
    let mut values = [0.0f64; CHANNEL_COUNT];
    for (index, (slot, field)) in values.iter_mut().zip(&fields).enumerate() {
        let not_numeric = || DecodeError::NotNumeric {
            index,
            field: field.to_string(),
        };
        if !is_numeric_literal(field) {
            return Err(not_numeric());
        }
        *slot = field.parse::<f64>().map_err(|_| not_numeric())?;
    }
    Ok(Sample::new(values))
}
/// Lenient variant used by trial recording: tolerates a leading `Channel:` tag.
pub fn parse_channel_line(line: &str) -> Option<Sample> {
    let body = line.trim();
    let body = body.strip_prefix(CHANNEL_PREFIX).unwrap_or(body);
    decode_sample(body.trim()).ok()
}
// optional sign, digits with optional fraction (or a bare fraction), optional exponent
fn is_numeric_literal(field: &str) -> bool {
    let bytes = field.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let int_digits = count_digits(&bytes[i..]);
    i += int_digits;
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = count_digits(&bytes[i..]);
        i += frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return false;
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_digits = count_digits(&bytes[i..]);
        if exp_digits == 0 {
            return false;
        }
        i += exp_digits;
    }
    i == bytes.len()
}
fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    const STREAM: &str = "1.0,2.0,3.0,4.0,5.0,6.0,7.0,8.0,9.0\n\
                          hello from esp32\n\
                          -0.5,1e-3,2.5E+2,+4,.5,6.,7,8,9\n\
                          \n\
                          1,2,3\n";
    fn lines_for(chunks: &[&[u8]]) -> Vec<String> {
        let mut framer = LineFramer::new();
        chunks.iter().flat_map(|c| framer.push(c)).collect()
    }
    #[test]
    fn split_line_is_reassembled_and_decoded() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"1.0,2.0,3.0,4.").is_empty());
        assert_eq!(framer.partial.len(), 14);
        let lines = framer.push(b"0,5.0,6.0,7.0,8.0,9.0\n");
        assert_eq!(lines, vec!["1.0,2.0,3.0,4.0,5.0,6.0,7.0,8.0,9.0".to_string()]);
        let sample = decode_sample(&lines[0]).unwrap();
        assert_eq!(
            sample.values,
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
        assert!(framer.partial.is_empty());
    }
    #[test]
    fn any_chunk_partition_yields_same_lines() {
        let bytes = STREAM.as_bytes();
        let expected = lines_for(&[bytes]);
        assert_eq!(expected.len(), 4);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let mut chunks: Vec<&[u8]> = Vec::new();
            let mut start = 0;
            while start < bytes.len() {
                let end = (start + rng.gen_range(1..=16)).min(bytes.len());
                chunks.push(&bytes[start..end]);
                start = end;
            }
            assert_eq!(lines_for(&chunks), expected);
        }
        // one byte at a time
        let singles: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(lines_for(&singles), expected);
    }
    #[test]
    fn unterminated_line_is_held_back() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"1,2,3,4,5,6,7,8,9").is_empty());
        assert!(framer.push(b"").is_empty());
        assert_eq!(framer.push(b"\r\n"), vec!["1,2,3,4,5,6,7,8,9".to_string()]);
    }
    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let text = "连接成功\n".as_bytes();
        let (a, b) = text.split_at(2);
        assert_eq!(lines_for(&[a, b]), vec!["连接成功".to_string()]);
    }
    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            decode_sample("1,2,3"),
            Err(DecodeError::FieldCount {
                expected: 9,
                actual: 3
            })
        );
        assert!(decode_sample("1,2,3,4,5,6,7,8,9,10").is_err());
        assert!(decode_sample("").is_err());
    }
    #[test]
    fn rejects_non_numeric_fields() {
        for bad in [
            "1,2,3,4,5,6,7,8,x",
            "1,2,3,4,5,6,7,8,",
            "1,2,3,4,5,6,7,8, 9",
            "1,2,3,4,5,6,7,8,1e",
            "1,2,3,4,5,6,7,8,.",
            "1,2,3,4,5,6,7,8,--1",
            "1,2,3,4,5,6,7,8,1.2.3",
            "1,2,3,4,5,6,7,8,nan",
            "1,2,3,4,5,6,7,8,inf",
        ] {
            assert!(
                matches!(decode_sample(bad), Err(DecodeError::NotNumeric { index: 8, .. })),
                "accepted {bad:?}"
            );
        }
        assert_eq!(
            decode_sample("1, 2,3,4,5,6,7,8,9"),
            Err(DecodeError::NotNumeric {
                index: 1,
                field: " 2".to_owned()
            })
        );
    }
    #[test]
    fn accepts_numeric_literal_forms() {
        let sample = decode_sample("-0.5,1e-3,2.5E+2,+4,.5,6.,7,8,9").unwrap();
        assert_eq!(sample.values[0], -0.5);
        assert_eq!(sample.values[1], 0.001);
        assert_eq!(sample.values[2], 250.0);
        assert_eq!(sample.values[3], 4.0);
        assert_eq!(sample.values[4], 0.5);
        assert_eq!(sample.values[5], 6.0);
    }
    #[test]
    fn channel_prefix_is_optional_for_recording() {
        let tagged = parse_channel_line("Channel:0,1,2,3,4,5,6,7,8").unwrap();
        let bare = parse_channel_line("0,1,2,3,4,5,6,7,8").unwrap();
        assert_eq!(tagged, bare);
        assert_eq!(bare.signal(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert!(parse_channel_line("Channel:1,2").is_none());
    }
}
