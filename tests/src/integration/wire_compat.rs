//! # Wire Compatibility
//!
//! Pins the byte layout of peer messages as they leave a node, and checks
//! that each message type reaches the receiver it is routed to.
//!
//! ## Flow Tested:
//!
//! 1. **Codec (cc-02)**: little-endian, length-prefixed bodies
//! 2. **Envelope (cc-05 adapter)**: type byte and receiver per message
//! 3. **Peering (cc-01)**: delivery to the matching `(peering id, receiver)` only

#[cfg(test)]
mod tests {
    use super::super::fixtures::{hex_of, init_test_logging};
    use cc_01_peering::{receivers, InMemoryPeeringNetwork, MessageHandler, NetworkProvider};
    use cc_02_peer_messages::{
        msg_types, BlockIndexPingPongMsg, ChainMessage, GetBlockMsg, NotifyFinalResultPostedMsg,
        NotifyReqMsg, PeerMessage, SignedHashMsg,
    };
    use cc_05_batch_consensus::CommitteeLink;
    use shared_types::{HashValue, OutputId, PeeringId, RequestId, TransactionId, WireError};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn output(byte: u8, index: u16) -> OutputId {
        OutputId::new(TransactionId([byte; 32]), index)
    }

    // =============================================================================
    // PINNED LAYOUTS
    // =============================================================================

    #[test]
    fn test_block_messages_layout() {
        assert_eq!(hex_of(&GetBlockMsg { block_index: 7 }.to_bytes().unwrap()), "07000000");
        assert_eq!(
            hex_of(
                &BlockIndexPingPongMsg {
                    block_index: 258,
                    rsvp: true
                }
                .to_bytes()
                .unwrap()
            ),
            "0201000001"
        );
    }

    #[test]
    fn test_result_notice_layout() {
        let msg = NotifyFinalResultPostedMsg {
            state_output_id: output(0xaa, 1),
            tx_id: TransactionId([0xbb; 32]),
        };
        let expected = format!("{}0100{}", "aa".repeat(32), "bb".repeat(32));
        assert_eq!(hex_of(&msg.to_bytes().unwrap()), expected);
    }

    #[test]
    fn test_heartbeat_layout() {
        let msg = NotifyReqMsg {
            state_output_id: output(0x01, 0),
            request_ids: vec![],
        };
        let bytes = msg.to_bytes().unwrap();
        assert_eq!(bytes.len(), OutputId::LENGTH + 2);
        assert_eq!(hex_of(&bytes[OutputId::LENGTH..]), "0000");
    }

    #[test]
    fn test_request_ids_follow_count() {
        let ids = vec![
            RequestId::new(TransactionId([0x11; 32]), 3),
            RequestId::new(TransactionId([0x22; 32]), 4),
        ];
        let msg = NotifyReqMsg {
            state_output_id: output(0x01, 0),
            request_ids: ids.clone(),
        };
        let bytes = msg.to_bytes().unwrap();
        let body = &bytes[OutputId::LENGTH..];

        assert_eq!(hex_of(&body[..2]), "0200");
        assert_eq!(&body[2..2 + RequestId::LENGTH], ids[0].as_bytes());
        assert_eq!(hex_of(&body[2 + 32..2 + RequestId::LENGTH]), "0300");
    }

    #[test]
    fn test_decode_rejects_unknown_type_and_truncation() {
        assert_eq!(
            ChainMessage::decode(9, &[]),
            Err(WireError::UnknownMessageType(9))
        );
        let share = SignedHashMsg {
            state_output_id: output(0x01, 0),
            orig_timestamp: 1,
            batch_hash: HashValue([2; 32]),
            essence_hash: HashValue([3; 32]),
            sig_share: vec![4; 8],
        }
        .to_bytes()
        .unwrap();
        assert!(matches!(
            ChainMessage::decode(msg_types::SIGNED_HASH, &share[..share.len() - 1]),
            Err(WireError::TruncatedMessage { .. })
        ));
    }

    // =============================================================================
    // ENVELOPE ROUTING
    // =============================================================================

    fn collecting_handler() -> (MessageHandler, mpsc::UnboundedReceiver<(u8, Vec<u8>)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: MessageHandler = Arc::new(move |msg| {
            let _ = tx.send((msg.data.msg_type, msg.data.payload));
        });
        (handler, rx)
    }

    #[tokio::test]
    async fn test_messages_reach_their_receiver() {
        init_test_logging();
        let network = InMemoryPeeringNetwork::new(&["node-a", "node-b"], 64);
        let a = network.provider(0).unwrap();
        let b = network.provider(1).unwrap();
        let scope = PeeringId([5u8; 32]);
        let members = vec!["node-a".to_string(), "node-b".to_string()];

        let (consensus, mut consensus_rx) = collecting_handler();
        let (state_manager, mut state_rx) = collecting_handler();
        b.attach(scope, receivers::CONSENSUS, consensus);
        b.attach(scope, receivers::STATE_MANAGER, state_manager);

        let link = CommitteeLink::new(a, scope, &members);
        assert_eq!(link.peers(), ["node-b".to_string()]);

        let ping = BlockIndexPingPongMsg {
            block_index: 3,
            rsvp: false,
        };
        let notice = NotifyFinalResultPostedMsg {
            state_output_id: output(0x0c, 0),
            tx_id: TransactionId([0x0d; 32]),
        };
        assert_eq!(link.broadcast(&ping), 1);
        assert!(link.send_to("node-b", &notice));

        let (ty, payload) = timeout(Duration::from_secs(1), state_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ty, msg_types::BLOCK_INDEX_PING_PONG);
        assert_eq!(
            ChainMessage::decode(ty, &payload).unwrap(),
            ChainMessage::BlockIndexPingPong(ping)
        );

        let (ty, payload) = timeout(Duration::from_secs(1), consensus_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ty, msg_types::NOTIFY_FINAL_RESULT_POSTED);
        assert_eq!(NotifyFinalResultPostedMsg::from_bytes(&payload).unwrap(), notice);

        // Nothing crossed over.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(state_rx.try_recv().is_err());
        assert!(consensus_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_other_scope_sees_nothing() {
        let network = InMemoryPeeringNetwork::new(&["node-a", "node-b"], 64);
        let b = network.provider(1).unwrap();
        let (handler, mut rx) = collecting_handler();
        b.attach(PeeringId([2u8; 32]), receivers::STATE_MANAGER, handler);

        let members = vec!["node-a".to_string(), "node-b".to_string()];
        let link = CommitteeLink::new(network.provider(0).unwrap(), PeeringId([1u8; 32]), &members);
        link.broadcast(&GetBlockMsg { block_index: 1 });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(b.dropped_count(), 1);
    }
}
