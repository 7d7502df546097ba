//! Integration tests: both channels against a real peer on localhost.

use std::net::SocketAddr;
use std::time::Duration;

use ctroll_core::stream::FrameCompressor;
use ctroll_core::{
    ConnectionState, ControlRecord, EncoderConfig, FrameCodec, FrameMessage, FramePolicy,
    FrameTypeTag, InboundRecordChannel, LinkConfig, OutboundFrameChannel, Parity, Raster,
    StreamError,
};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedRead;

// ── Helpers ──────────────────────────────────────────────────────

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// Deterministic compressor: full halves cost `len / 16` bytes, each
/// tile of a diff image costs `tile_bytes`.
#[derive(Clone, Copy)]
struct SizedCompressor {
    tile_bytes: usize,
}

impl FrameCompressor for SizedCompressor {
    fn compress(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        _quality: u8,
    ) -> Result<Vec<u8>, StreamError> {
        if width == 8 {
            Ok(vec![0xD1; self.tile_bytes * (height as usize / 8)])
        } else {
            Ok(vec![0xF0; pixels.len() / 16])
        }
    }
}

fn link_config() -> LinkConfig {
    LinkConfig {
        connect_timeout_ms: 1000,
        write_timeout_ms: 1000,
        retry_ticks: 0,
    }
}

async fn ephemeral_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn sized_channel(addr: SocketAddr, tile_bytes: usize) -> OutboundFrameChannel<SizedCompressor> {
    sized_channel_with(addr, tile_bytes, link_config())
}

fn sized_channel_with(
    addr: SocketAddr,
    tile_bytes: usize,
    link: LinkConfig,
) -> OutboundFrameChannel<SizedCompressor> {
    OutboundFrameChannel::with_compressor(
        addr,
        link,
        FramePolicy::default(),
        EncoderConfig::default(),
        SizedCompressor { tile_bytes },
    )
}

async fn next_message(framed: &mut FramedRead<TcpStream, FrameCodec>) -> FrameMessage {
    tokio::time::timeout(Duration::from_secs(5), framed.next())
        .await
        .expect("timeout")
        .expect("peer stream ended")
        .expect("decode failed")
}

/// Fill the 8×8 tile at block coordinates `(bx, by)`.
fn paint_tile(raster: &mut Raster, bx: u32, by: u32, rgb: [u8; 3]) {
    for y in by * 8..by * 8 + 8 {
        for x in bx * 8..bx * 8 + 8 {
            raster.set_pixel(x, y, rgb);
        }
    }
}

/// Connect, accept, and push the initial full pair plus one NoChange.
async fn settled_session(
    tile_bytes: usize,
) -> (
    OutboundFrameChannel<SizedCompressor>,
    FramedRead<TcpStream, FrameCodec>,
    Raster,
) {
    let (listener, addr) = ephemeral_listener().await;
    let mut channel = sized_channel(addr, tile_bytes);
    let raster = Raster::filled(WIDTH, HEIGHT, 40);

    channel.push_frame(&raster).await;
    let (peer, _) = listener.accept().await.unwrap();
    let mut framed = FramedRead::new(peer, FrameCodec::for_raster(WIDTH, HEIGHT));

    channel.push_frame(&raster).await;
    channel.push_frame(&raster).await;
    assert!(matches!(
        next_message(&mut framed).await,
        FrameMessage::Full { parity: Parity::Even, .. }
    ));
    assert!(matches!(
        next_message(&mut framed).await,
        FrameMessage::Full { parity: Parity::Odd, .. }
    ));
    assert_eq!(next_message(&mut framed).await, FrameMessage::NoChange);

    (channel, framed, raster)
}

// ── Outbound frames ──────────────────────────────────────────────

#[tokio::test]
async fn first_frame_is_a_jpeg_checkerboard_pair() {
    let (listener, addr) = ephemeral_listener().await;
    let mut channel = OutboundFrameChannel::new(
        addr,
        link_config(),
        FramePolicy::default(),
        EncoderConfig::default(),
    );
    let raster = Raster::filled(WIDTH, HEIGHT, 90);

    assert_eq!(channel.push_frame(&raster).await, 0);
    assert_eq!(channel.state(), ConnectionState::Connected);
    channel.push_frame(&raster).await;

    let (peer, _) = listener.accept().await.unwrap();
    let mut framed = FramedRead::new(peer, FrameCodec::for_raster(WIDTH, HEIGHT));

    for expected in [Parity::Even, Parity::Odd] {
        match next_message(&mut framed).await {
            FrameMessage::Full { parity, payload } => {
                assert_eq!(parity, expected);
                let image =
                    image::load_from_memory_with_format(&payload, image::ImageFormat::Jpeg)
                        .unwrap();
                assert_eq!((image.width(), image.height()), (WIDTH / 2, HEIGHT));
            }
            other => panic!("expected a full frame, got {other:?}"),
        }
    }

    assert_eq!(channel.stats().full_frames, 2);
    assert!(channel.scheduler().last_frame_was_full());
    assert_eq!(channel.last_sent(), Some(FrameTypeTag::FullOdd));
}

#[tokio::test]
async fn identical_frame_after_pair_sends_no_change() {
    let (mut channel, _framed, _) = settled_session(4).await;
    assert_eq!(channel.last_sent(), Some(FrameTypeTag::NoChange));
    assert_eq!(channel.scheduler().force_frame(), 2);
    assert_eq!(channel.stats().no_change_frames, 1);
    assert_eq!(channel.stats().sessions, 1);

    channel.push_frame(&Raster::filled(WIDTH, HEIGHT, 40)).await;
    assert_eq!(channel.stats().no_change_frames, 2);
}

#[tokio::test]
async fn single_changed_tile_sends_a_diff() {
    let (mut channel, mut framed, mut raster) = settled_session(4).await;

    paint_tile(&mut raster, 5, 3, [255, 0, 0]);
    channel.push_frame(&raster).await;

    match next_message(&mut framed).await {
        FrameMessage::Diff { bitmap, payload } => {
            assert_eq!(bitmap.len(), 150);
            let index = 3 * 40 + 5;
            for (i, byte) in bitmap.iter().enumerate() {
                let expected = if i == index / 8 { 1 << (index % 8) } else { 0 };
                assert_eq!(*byte, expected, "bitmap byte {i}");
            }
            assert_eq!(payload.len(), 4);
        }
        other => panic!("expected a diff, got {other:?}"),
    }
    // Staleness was cleared by the full pair, so only the diff counts.
    assert_eq!(channel.scheduler().force_frame(), 5);
}

#[tokio::test]
async fn oversized_diff_falls_back_to_full() {
    let (mut channel, mut framed, mut raster) = settled_session(10_000).await;

    paint_tile(&mut raster, 0, 0, [0, 255, 0]);
    channel.push_frame(&raster).await;

    assert!(matches!(
        next_message(&mut framed).await,
        FrameMessage::Full { parity: Parity::Even, .. }
    ));
    assert_eq!(channel.scheduler().parity(), Parity::Odd);
}

#[tokio::test]
async fn requested_full_frame_replaces_no_change() {
    let (mut channel, mut framed, raster) = settled_session(4).await;

    channel.request_full_frame();
    channel.push_frame(&raster).await;
    channel.push_frame(&raster).await;

    assert!(matches!(
        next_message(&mut framed).await,
        FrameMessage::Full { parity: Parity::Even, .. }
    ));
    assert!(matches!(
        next_message(&mut framed).await,
        FrameMessage::Full { parity: Parity::Odd, .. }
    ));
}

#[tokio::test]
async fn confirmation_byte_is_returned() {
    let (mut channel, framed, _) = settled_session(4).await;
    let mut peer = framed.into_inner();
    peer.write_all(&[7]).await.unwrap();

    let mut confirmation = 0;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        confirmation = channel.poll_confirmation().await;
        if confirmation != 0 {
            break;
        }
    }
    assert_eq!(confirmation, 7);
    assert_eq!(channel.poll_confirmation().await, 0);
}

#[tokio::test]
async fn reconnect_waits_cooldown_then_starts_a_fresh_session() {
    let (listener, addr) = ephemeral_listener().await;
    let link = LinkConfig {
        retry_ticks: 3,
        ..link_config()
    };
    let mut channel = sized_channel_with(addr, 4, link);
    let mut raster = Raster::filled(WIDTH, HEIGHT, 10);

    channel.push_frame(&raster).await;
    let (peer, _) = listener.accept().await.unwrap();
    channel.push_frame(&raster).await;
    drop(peer);

    // Keep pushing until the loss is noticed.
    for i in 0..200u32 {
        if !channel.state().is_connected() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        paint_tile(&mut raster, i % 40, 0, [i as u8, 0, 0]);
        channel.push_frame(&raster).await;
    }
    assert_eq!(channel.state(), ConnectionState::Connecting { cooldown: 3 });

    // No reconnect while the cooldown runs, even though the listener is up.
    let dropped = channel.stats().dropped_frames;
    for remaining in (0..3).rev() {
        assert_eq!(channel.push_frame(&raster).await, 0);
        assert_eq!(channel.state(), ConnectionState::Connecting { cooldown: remaining });
    }
    assert_eq!(channel.stats().dropped_frames, dropped + 3);
    assert_eq!(channel.stats().sessions, 1);

    channel.push_frame(&raster).await;
    assert_eq!(channel.state(), ConnectionState::Connected);
    let (peer, _) = listener.accept().await.unwrap();
    let mut framed = FramedRead::new(peer, FrameCodec::for_raster(WIDTH, HEIGHT));

    assert!(matches!(
        next_message(&mut framed).await,
        FrameMessage::Full { parity: Parity::Even, .. }
    ));
    assert_eq!(channel.stats().sessions, 2);
}

// ── Inbound records ──────────────────────────────────────────────

fn record(seed: u16) -> ControlRecord {
    ControlRecord {
        pressed_buttons: 0b1001 | seed << 4,
        circle_pad_x: -100,
        circle_pad_y: 42,
        touch_x: seed,
        touch_y: 200,
        accel_x: 1,
        accel_y: 2,
        accel_z: 3,
        gyro_x: 4,
        gyro_y: 5,
        gyro_z: 6,
    }
}

async fn inbound_session() -> (InboundRecordChannel, TcpStream) {
    let (listener, addr) = ephemeral_listener().await;
    let mut channel = InboundRecordChannel::new(addr, link_config());
    assert_eq!(channel.on_bytes_available().await, None);
    let (peer, _) = listener.accept().await.unwrap();
    (channel, peer)
}

#[tokio::test]
async fn record_trickled_byte_by_byte_arrives_once() {
    let (mut channel, mut peer) = inbound_session().await;
    let expected = record(1);

    let mut emitted = Vec::new();
    for byte in expected.encode() {
        peer.write_all(&[byte]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        emitted.extend(channel.on_bytes_available().await);
    }
    for _ in 0..50 {
        if !emitted.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        emitted.extend(channel.on_bytes_available().await);
    }

    assert_eq!(emitted, vec![expected]);
    assert_eq!(channel.records_received(), 1);
}

#[tokio::test]
async fn burst_resolves_to_latest_record() {
    let (mut channel, mut peer) = inbound_session().await;

    let mut burst = Vec::new();
    for seed in 1..=3 {
        burst.extend_from_slice(&record(seed).encode());
    }
    peer.write_all(&burst).await.unwrap();

    let mut latest = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Some(r) = channel.on_bytes_available().await {
            latest = Some(r);
        }
        if channel.records_received() == 3 {
            break;
        }
    }
    assert_eq!(latest, Some(record(3)));
    assert_eq!(channel.records_received(), 3);
}

#[tokio::test]
async fn inbound_peer_close_disconnects() {
    let (mut channel, peer) = inbound_session().await;
    drop(peer);

    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        channel.on_bytes_available().await;
        if !channel.state().is_connected() {
            break;
        }
    }
    assert_eq!(channel.state(), ConnectionState::Connecting { cooldown: 0 });
}
