//! Nodes talking to each other over loopback TCP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ringchain_crypto::{generate_keypair, keypair_from_seed};
use ringchain_ledger::{Block, Transaction};
use ringchain_network::{ReplicationTransport, TransportConfig, Vnode};
use ringchain_node::{ChainNode, NodeConfig, NodeError};
use ringchain_nullables::NullRing;
use ringchain_store::{BlockStore, MemoryBlockStore};
use ringchain_types::BlockHash;

fn test_config() -> NodeConfig {
    NodeConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        block_difficulty: 4,
        transaction_difficulty: 2,
        tx_broadcast_delay_ms: 0,
        dial_timeout_ms: 2_000,
        ..NodeConfig::default()
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    (listener, host)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}

fn transaction(seed: u8, payload: &[u8]) -> Transaction {
    let kp = keypair_from_seed(&[seed; 32]);
    Transaction::create(&kp, kp.public.clone(), payload.to_vec(), 2).unwrap()
}

/// A bare transport standing in for a remote peer.
struct RawPeer {
    transport: Arc<ReplicationTransport>,
    txs: mpsc::Receiver<Transaction>,
    blocks: mpsc::Receiver<Block>,
}

fn raw_peer(listener: TcpListener, host: &str) -> RawPeer {
    let (tx_sink, txs) = mpsc::channel(16);
    let (block_sink, blocks) = mpsc::channel(16);
    let transport = ReplicationTransport::new(
        TransportConfig::default(),
        Arc::new(NullRing::new(host)),
        Arc::new(MemoryBlockStore::new()),
        tx_sink,
        block_sink,
    );
    transport.listen(listener).unwrap();
    RawPeer {
        transport,
        txs,
        blocks,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mined_block_replicates_to_peer() {
    let (l_a, host_a) = bind().await;
    let (l_b, host_b) = bind().await;

    let tx = transaction(7, b"pay b");
    let ring_a = Arc::new(NullRing::new(host_a.clone()).with_replicas(vec![
        Vnode::new(host_a.clone(), [1; 32]),
        Vnode::new(host_b.clone(), [2; 32]),
    ]));
    // Keep the transaction itself local so only the block reaches b.
    ring_a.script(tx.hash().as_bytes(), vec![Vnode::new(host_a.clone(), [1; 32])]);

    let store_a = Arc::new(MemoryBlockStore::new());
    let store_b = Arc::new(MemoryBlockStore::new());
    let mut a = ChainNode::start_with_listener(
        &test_config(),
        generate_keypair(),
        ring_a,
        store_a.clone(),
        l_a,
    )
    .unwrap();
    let mut b = ChainNode::start_with_listener(
        &test_config(),
        generate_keypair(),
        Arc::new(NullRing::new(host_b)),
        store_b.clone(),
        l_b,
    )
    .unwrap();

    a.submit_transaction(tx.clone()).await.unwrap();

    wait_until(|| store_b.len() == 1).await;
    let mined = store_a.last_block().unwrap().unwrap();
    assert_eq!(store_b.last_block().unwrap(), Some(mined.clone()));
    assert!(mined.prev_block().is_none());
    assert_eq!(mined.transactions, vec![tx]);
    mined.verify(4).unwrap();

    a.stop().await.unwrap();
    b.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn accepted_transaction_is_relayed_to_replicas() {
    let (l_node, host_node) = bind().await;
    let (l_peer, host_peer) = bind().await;
    let mut peer = raw_peer(l_peer, &host_peer);

    let ring = Arc::new(
        NullRing::new(host_node.clone()).with_replicas(vec![Vnode::new(host_peer, [1; 32])]),
    );
    let config = NodeConfig {
        block_difficulty: 256,
        ..test_config()
    };
    let mut node = ChainNode::start_with_listener(
        &config,
        generate_keypair(),
        ring,
        Arc::new(MemoryBlockStore::new()),
        l_node,
    )
    .unwrap();

    let tx = transaction(8, b"hello");
    node.submit_transaction(tx.clone()).await.unwrap();
    let relayed = tokio::time::timeout(Duration::from_secs(5), peer.txs.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(relayed, tx);

    // An invalid transaction is not relayed.
    let mut forged = transaction(9, b"forged");
    forged.signature = transaction(10, b"other").signature;
    node.submit_transaction(forged).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(peer.txs.try_recv().is_err());

    node.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gap_block_is_neither_stored_nor_relayed() {
    let (l_node, host_node) = bind().await;
    let (l_peer, host_peer) = bind().await;
    let mut peer = raw_peer(l_peer, &host_peer);

    let ring = Arc::new(
        NullRing::new(host_node.clone()).with_replicas(vec![Vnode::new(host_peer, [1; 32])]),
    );
    let store = Arc::new(MemoryBlockStore::new());
    let mut node = ChainNode::start_with_listener(
        &test_config(),
        generate_keypair(),
        ring,
        store.clone(),
        l_node,
    )
    .unwrap();

    let kp = keypair_from_seed(&[5; 32]);
    let mut orphan = Block::pending(Some(BlockHash::new([3; 32])), kp.public.clone());
    orphan.add_transaction(transaction(6, b"x"));
    orphan.header.merkle_root = orphan.generate_merkle_root();
    while !ringchain_work::validate_work(orphan.hash().as_bytes(), 4) {
        orphan.header.nonce += 1;
    }
    orphan.seal(&kp);

    node.submit_block(orphan).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(store.is_empty());
    assert!(peer.blocks.try_recv().is_err());

    node.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn peers_can_pull_mined_blocks() {
    let (l_node, host_node) = bind().await;
    let (l_peer, host_peer) = bind().await;
    let peer = raw_peer(l_peer, &host_peer);

    let store = Arc::new(MemoryBlockStore::new());
    let mut node = ChainNode::start_with_listener(
        &test_config(),
        generate_keypair(),
        Arc::new(NullRing::new(host_node.clone())),
        store.clone(),
        l_node,
    )
    .unwrap();

    assert_eq!(peer.transport.last_block(&host_node).await.unwrap(), None);

    node.submit_transaction(transaction(4, b"mine me")).await.unwrap();
    wait_until(|| store.len() == 1).await;

    let tip = peer.transport.last_block(&host_node).await.unwrap().unwrap();
    assert_eq!(peer.transport.first_block(&host_node).await.unwrap(), Some(tip.clone()));
    assert_eq!(
        peer.transport.block_by_hash(&host_node, &tip.hash()).await.unwrap(),
        Some(tip)
    );
    assert_eq!(
        peer.transport
            .block_by_hash(&host_node, &BlockHash::new([1; 32]))
            .await
            .unwrap(),
        None
    );

    node.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_is_idempotent_and_closes_the_engine() {
    let (listener, host) = bind().await;
    let mut node = ChainNode::start_with_listener(
        &test_config(),
        generate_keypair(),
        Arc::new(NullRing::new(host)),
        Arc::new(MemoryBlockStore::new()),
        listener,
    )
    .unwrap();
    assert_ne!(node.local_addr().port(), 0);

    node.stop().await.unwrap();
    node.stop().await.unwrap();
    assert!(node.transport().is_shut_down());
    assert!(matches!(
        node.submit_transaction(transaction(1, b"late")).await,
        Err(NodeError::EngineStopped)
    ));
}
