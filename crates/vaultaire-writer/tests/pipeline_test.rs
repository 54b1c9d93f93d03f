//! Write Pipeline Integration Tests
//!
//! Drives the full path — dispatcher, batcher, tick generator, flush —
//! over an in-memory pool, with a short batch period so flushes happen
//! inside the test timeout.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;
use vaultaire_core::daymap::DayMap;
use vaultaire_core::point::{encode_burst, Point, PointPayload};
use vaultaire_core::{label, Lane, Origin};
use vaultaire_pool::{MemoryPool, Pool};
use vaultaire_writer::reader;
use vaultaire_writer::{daymaps, Dispatcher, Reply, ReplyHandle, Request, WriterConfig};

const NO_BUCKETS: u64 = 16;

fn test_config() -> WriterConfig {
    WriterConfig {
        batch_period_ms: 50,
        tick_interval_ms: 10,
        ..Default::default()
    }
}

fn pony() -> Origin {
    Origin::tidy("PONY")
}

async fn send_burst(
    dispatcher: &Dispatcher,
    origin: &Origin,
    points: &[Point],
) -> oneshot::Receiver<Reply> {
    let (reply, rx) = ReplyHandle::pair();
    dispatcher
        .send(Request {
            reply,
            origin: origin.clone(),
            payload: encode_burst(points),
        })
        .await
        .unwrap();
    rx
}

async fn expect_reply(rx: oneshot::Receiver<Reply>) -> Reply {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("reply within timeout")
        .expect("reply handle answered")
}

#[tokio::test]
async fn test_unknown_origin_is_refused() {
    let pool = Arc::new(MemoryPool::new());
    let dispatcher = Dispatcher::spawn(pool, test_config());

    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    assert_eq!(
        expect_reply(rx).await,
        Reply::Failure("No such origin".to_string())
    );
}

#[tokio::test]
async fn test_burst_is_flushed_and_acknowledged() {
    let pool = Arc::new(MemoryPool::new());
    daymaps::provision(pool.as_ref(), &pony(), NO_BUCKETS)
        .await
        .unwrap();
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    let points = vec![
        Point::simple(4, 100, 42),
        Point::extended(5, 200, &b"out of band"[..]),
    ];
    let rx = send_burst(&dispatcher, &pony(), &points).await;
    assert_eq!(expect_reply(rx).await, Reply::Success);

    // both addresses share lane 4 of epoch 0
    let stored = reader::read_points(pool.as_ref(), &pony(), 0, 4)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].payload, PointPayload::Simple(42));
    assert_eq!(
        stored[1].payload,
        PointPayload::Extended(Bytes::from_static(b"out of band"))
    );
}

#[tokio::test]
async fn test_malformed_burst_is_refused_and_batch_unharmed() {
    let pool = Arc::new(MemoryPool::new());
    daymaps::provision(pool.as_ref(), &pony(), NO_BUCKETS)
        .await
        .unwrap();
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    // truncated: not even one header
    let (reply, bad_rx) = ReplyHandle::pair();
    dispatcher
        .send(Request {
            reply,
            origin: pony(),
            payload: Bytes::from_static(&[0u8; 7]),
        })
        .await
        .unwrap();
    assert!(matches!(expect_reply(bad_rx).await, Reply::Failure(_)));

    // a good burst on the same batcher still goes through
    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    assert_eq!(expect_reply(rx).await, Reply::Success);

    let stored = reader::read_points(pool.as_ref(), &pony(), 0, 4)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_time_before_first_epoch_is_refused() {
    let pool = Arc::new(MemoryPool::new());
    // both lanes start at epoch 1000
    for lane in [Lane::Simple, Lane::Extended] {
        let mut map = DayMap::new();
        map.insert(1_000, NO_BUCKETS);
        pool.write_full(&label::day_map_label(&pony(), lane), &map.encode())
            .await
            .unwrap();
    }
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 500, 1)]).await;
    assert!(matches!(expect_reply(rx).await, Reply::Failure(_)));
}

#[tokio::test]
async fn test_extended_points_bucket_by_the_simple_day_map() {
    let pool = Arc::new(MemoryPool::new());
    // the lanes disagree: 2 buckets on the simple side, 3 on the extended
    let mut simple_map = DayMap::new();
    simple_map.insert(0, 2);
    pool.write_full(
        &label::day_map_label(&pony(), Lane::Simple),
        &simple_map.encode(),
    )
    .await
    .unwrap();
    let mut extended_map = DayMap::new();
    extended_map.insert(0, 3);
    pool.write_full(
        &label::day_map_label(&pony(), Lane::Extended),
        &extended_map.encode(),
    )
    .await
    .unwrap();

    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    // masked address 4: bucket 0 under the simple map, 1 under the extended
    let rx = send_burst(&dispatcher, &pony(), &[Point::extended(5, 100, &b"x"[..])]).await;
    assert_eq!(expect_reply(rx).await, Reply::Success);

    let simple_side = pool
        .stat(&label::bucket_label(&pony(), 0, 0, Lane::Extended))
        .await
        .unwrap();
    let extended_side = pool
        .stat(&label::bucket_label(&pony(), 1, 0, Lane::Extended))
        .await
        .unwrap();
    assert!(
        simple_side.is_some() && extended_side.is_none(),
        "extended data lands in the simple map's bucket"
    );
}

#[tokio::test]
async fn test_batches_accumulate_across_messages() {
    let pool = Arc::new(MemoryPool::new());
    daymaps::provision(pool.as_ref(), &pony(), NO_BUCKETS)
        .await
        .unwrap();
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    let rx_a = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    let rx_b = send_burst(&dispatcher, &pony(), &[Point::simple(4, 200, 2)]).await;

    assert_eq!(expect_reply(rx_a).await, Reply::Success);
    assert_eq!(expect_reply(rx_b).await, Reply::Success);

    let stored = reader::read_points(pool.as_ref(), &pony(), 0, 4)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_batcher_reseals_and_respawns() {
    let pool = Arc::new(MemoryPool::new());
    daymaps::provision(pool.as_ref(), &pony(), NO_BUCKETS)
        .await
        .unwrap();
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    assert_eq!(expect_reply(rx).await, Reply::Success);

    // idle long enough for the batcher to seal itself
    tokio::time::sleep(Duration::from_millis(200)).await;

    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 200, 2)]).await;
    assert_eq!(expect_reply(rx).await, Reply::Success);
}

#[tokio::test]
async fn test_origins_are_isolated() {
    let pool = Arc::new(MemoryPool::new());
    let pirate = Origin::tidy("PIRATE");
    daymaps::provision(pool.as_ref(), &pony(), NO_BUCKETS)
        .await
        .unwrap();
    daymaps::provision(pool.as_ref(), &pirate, NO_BUCKETS)
        .await
        .unwrap();
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    let rx_a = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    let rx_b = send_burst(&dispatcher, &pirate, &[Point::simple(4, 100, 9)]).await;
    assert_eq!(expect_reply(rx_a).await, Reply::Success);
    assert_eq!(expect_reply(rx_b).await, Reply::Success);

    let pony_points = reader::read_points(pool.as_ref(), &pony(), 0, 4)
        .await
        .unwrap();
    let pirate_points = reader::read_points(pool.as_ref(), &pirate, 0, 4)
        .await
        .unwrap();
    assert_eq!(pony_points.len(), 1);
    assert_eq!(pony_points[0].payload, PointPayload::Simple(1));
    assert_eq!(pirate_points.len(), 1);
    assert_eq!(pirate_points[0].payload, PointPayload::Simple(9));
}

#[tokio::test]
async fn test_origin_appearing_later_is_picked_up() {
    let pool = Arc::new(MemoryPool::new());
    let dispatcher = Dispatcher::spawn(pool.clone(), test_config());

    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    assert_eq!(
        expect_reply(rx).await,
        Reply::Failure("No such origin".to_string())
    );

    daymaps::provision(pool.as_ref(), &pony(), NO_BUCKETS)
        .await
        .unwrap();

    let rx = send_burst(&dispatcher, &pony(), &[Point::simple(4, 100, 1)]).await;
    assert_eq!(expect_reply(rx).await, Reply::Success);
}
