//! End-to-end capture tests: raw input records in, wire bytes out over TCP.

use std::time::Duration;

use keyrelay_capture::application::{CaptureError, CaptureUseCase};
use keyrelay_capture::infrastructure::{connect, EventStreamSource};
use keyrelay_core::protocol::decode_stream;
use keyrelay_core::{InputEvent, WireMessage};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A keyboard session as the kernel reports it: MSC_SCAN and SYN_REPORT
/// records around every key transition, plus auto-repeat while held.
fn typing_session() -> Vec<InputEvent> {
    let scan = InputEvent {
        event_type: 0x04,
        code: 0x04,
        value: 0x1e,
        ..InputEvent::default()
    };
    let syn = InputEvent::default();
    vec![
        scan,
        InputEvent::key(30, 1),
        syn,
        InputEvent::key(30, 2),
        syn,
        InputEvent::key(30, 2),
        syn,
        scan,
        InputEvent::key(30, 0),
        syn,
        InputEvent::key(42, 1),
        InputEvent::key(42, 0),
    ]
}

#[tokio::test]
async fn test_records_become_wire_messages_on_the_socket() {
    // Arrange: a fake device and a fake bridge
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    let (mut device_writer, device_reader) = duplex(4096);
    for event in typing_session() {
        device_writer.write_all(&event.to_bytes()).await.unwrap();
    }
    drop(device_writer);

    // Act
    let stream = connect("127.0.0.1", &port).await.unwrap();
    let (mut bridge_side, _) = listener.accept().await.unwrap();
    let stats = CaptureUseCase::new(EventStreamSource::new(device_reader), stream, false)
        .run()
        .await
        .unwrap();

    // Assert
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), bridge_side.read_to_end(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, vec![254, 30, 255, 30, 254, 42, 255, 42]);
    let (messages, rest) = decode_stream(&received).unwrap();
    assert_eq!(rest, 0);
    assert_eq!(messages[0], WireMessage::press(30));
    assert_eq!(messages[3], WireMessage::release(42));
    assert_eq!(stats.events, 12);
    assert_eq!(stats.sent, 4);
}

#[tokio::test]
async fn test_closed_bridge_stops_the_capture_loop() {
    // Arrange: the bridge accepts, then goes away
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    let stream = connect("127.0.0.1", &port).await.unwrap();
    let (bridge_side, _) = listener.accept().await.unwrap();
    drop(bridge_side);
    drop(listener);

    // A device that keeps producing key presses.
    let (mut device_writer, device_reader) = duplex(64 * 1024);
    let producer = tokio::spawn(async move {
        for _ in 0..1000 {
            let press = InputEvent::key(30, 1).to_bytes();
            if device_writer.write_all(&press).await.is_err() {
                break;
            }
        }
    });

    // Act
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        CaptureUseCase::new(EventStreamSource::new(device_reader), stream, false).run(),
    )
    .await
    .expect("capture must stop once the bridge is gone");

    // Assert: either a send error, or the source ran dry first
    match result {
        Err(CaptureError::Send(_)) => {}
        Ok(stats) => assert_eq!(stats.events, 1000),
        Err(other) => panic!("unexpected error: {other}"),
    }
    producer.abort();
}
