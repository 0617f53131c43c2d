//! Channel trace files.
//!
//! One byte event per line:
//!
//! ```text
//! # node  timestamp  dir  byte
//!   0     1000       tx   aa
//!   0     4072       tx   0x33
//!   1     1200       rx   7e
//! ```
//!
//! Blank lines and `#` comments are ignored. Events are grouped by node in
//! file order; within one node timestamps must not go backwards.

use sosmon_core::channel::{ChannelEvent, Direction};
use sosmon_core::error::{Result, TraceError};
use std::collections::BTreeMap;
use std::path::Path;

/// Channel events of every node in a trace, ordered by node id.
pub type NodeTraces = BTreeMap<u32, Vec<ChannelEvent>>;

/// Read and parse a trace file.
pub fn load_trace(path: &Path) -> Result<NodeTraces> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_trace(&text)?)
}

/// Parse trace text.
pub fn parse_trace(text: &str) -> std::result::Result<NodeTraces, TraceError> {
    let mut traces = NodeTraces::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let fields: Vec<&str> = content.split_whitespace().collect();
        let [node, timestamp, direction, byte] = fields[..] else {
            return Err(TraceError::FieldCount {
                line,
                fields: fields.len(),
            });
        };

        let node: u32 = node.parse().map_err(|_| invalid(line, "node", node))?;
        let timestamp: u64 = timestamp
            .parse()
            .map_err(|_| invalid(line, "timestamp", timestamp))?;
        let direction = parse_direction(line, direction)?;
        let byte_value = parse_byte(byte).ok_or_else(|| invalid(line, "byte", byte))?;

        let events = traces.entry(node).or_default();
        if let Some(previous) = events.last().map(|e| e.timestamp) {
            if timestamp < previous {
                return Err(TraceError::TimeWentBackwards {
                    line,
                    node,
                    timestamp,
                    previous,
                });
            }
        }
        events.push(ChannelEvent::new(byte_value, timestamp, direction));
    }

    Ok(traces)
}

fn parse_direction(line: usize, value: &str) -> std::result::Result<Direction, TraceError> {
    match value.to_ascii_lowercase().as_str() {
        "tx" => Ok(Direction::Transmit),
        "rx" => Ok(Direction::Receive),
        _ => Err(TraceError::InvalidDirection {
            line,
            value: value.to_string(),
        }),
    }
}

fn parse_byte(value: &str) -> Option<u8> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16).ok()
}

fn invalid(line: usize, field: &'static str, value: &str) -> TraceError {
    TraceError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_groups_by_node() {
        let text = "\
# header
0 100 tx aa
1 150 rx 0x7E

0 200 TX 33  # trailing comment
";
        let traces = parse_trace(text).unwrap();

        assert_eq!(traces.len(), 2);
        assert_eq!(
            traces[&0],
            vec![
                ChannelEvent::transmit(0xAA, 100),
                ChannelEvent::transmit(0x33, 200)
            ]
        );
        assert_eq!(traces[&1], vec![ChannelEvent::receive(0x7E, 150)]);
    }

    #[test]
    fn test_field_count() {
        assert_eq!(
            parse_trace("0 100 tx"),
            Err(TraceError::FieldCount { line: 1, fields: 3 })
        );
    }

    #[test]
    fn test_invalid_fields() {
        assert!(matches!(
            parse_trace("x 100 tx aa"),
            Err(TraceError::InvalidNumber { field: "node", .. })
        ));
        assert!(matches!(
            parse_trace("0 100 tx 1ff"),
            Err(TraceError::InvalidNumber { field: "byte", .. })
        ));
        assert_eq!(
            parse_trace("\n0 100 up aa"),
            Err(TraceError::InvalidDirection {
                line: 2,
                value: "up".to_string()
            })
        );
    }

    #[test]
    fn test_time_went_backwards() {
        let text = "0 100 tx aa\n1 50 rx aa\n0 99 tx aa\n";
        assert_eq!(
            parse_trace(text),
            Err(TraceError::TimeWentBackwards {
                line: 3,
                node: 0,
                timestamp: 99,
                previous: 100
            })
        );
    }
}
