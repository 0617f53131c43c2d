//! Protocol identifiers and minimum message lengths.
//!
//! The numbers mirror the tree routing module running on the motes. They
//! travel together in one table so a decoder for a different firmware
//! build can be constructed without touching the decoding code.

/// Module id of the tree routing protocol.
pub const TREE_ROUTING_PID: u8 = 141;

/// Message type of a tree routing beacon.
pub const MSG_BEACON_PKT: u8 = 33;

/// Message type of a tree routing data message.
pub const MSG_TR_DATA_PKT: u8 = 34;

/// Smallest payload that holds a beacon.
pub const BEACON_PKT_MIN_LEN: usize = 6;

/// Smallest payload that holds a data message header.
pub const TR_DATA_PKT_MIN_LEN: usize = 9;

/// Identifiers used to recognise tree routing traffic inside an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolTable {
    /// Both module fields must carry this id
    pub tree_routing_pid: u8,
    pub beacon_type: u8,
    pub data_type: u8,
    pub beacon_min_len: usize,
    pub data_min_len: usize,
}

impl Default for ProtocolTable {
    fn default() -> Self {
        Self {
            tree_routing_pid: TREE_ROUTING_PID,
            beacon_type: MSG_BEACON_PKT,
            data_type: MSG_TR_DATA_PKT,
            beacon_min_len: BEACON_PKT_MIN_LEN,
            data_min_len: TR_DATA_PKT_MIN_LEN,
        }
    }
}

impl ProtocolTable {
    /// Check whether both module fields address the tree routing module.
    pub fn is_tree_routing(&self, dst_module: u8, src_module: u8) -> bool {
        dst_module == self.tree_routing_pid && src_module == self.tree_routing_pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = ProtocolTable::default();
        assert_eq!(table.tree_routing_pid, 141);
        assert_eq!(table.beacon_type, 33);
        assert_eq!(table.data_type, 34);
        assert_eq!(table.beacon_min_len, 6);
        assert_eq!(table.data_min_len, 9);
    }

    #[test]
    fn test_both_modules_must_match() {
        let table = ProtocolTable::default();
        assert!(table.is_tree_routing(141, 141));
        assert!(!table.is_tree_routing(141, 140));
        assert!(!table.is_tree_routing(0, 141));
    }
}
