//! End-to-end RDMnet client tests against an in-process mock broker

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use luxflow_core::Uid;
use luxflow_net::{
    BrokerSessionOptions, BrokerState, CapabilitySource, ErrorCode, RdmnetClient,
    RdmnetClientConfig, RdmnetEvent,
};
use luxflow_proto::acn::{build_rdmnet_packet, extract_rdmnet_packets, RootPacket};
use luxflow_proto::rdm::{consts, RdmFrame};
use luxflow_proto::rdmnet::{
    BrokerMessage, BrokerStatusCode, EndpointRole, LlrpMessage, RdmnetMessage, RptMessage,
    RptStatusCode, VECTOR_ROOT_BROKER, VECTOR_ROOT_LLRP, VECTOR_ROOT_RPT,
};

const BROKER_CID: [u8; 16] = [9u8; 16];

/// One (root vector, payload) reply from the mock broker
type Replies = Vec<(u32, Vec<u8>)>;

async fn serve_connection<F>(mut socket: TcpStream, mut handler: F)
where
    F: FnMut(RootPacket) -> Replies + Send,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(count) = socket.read(&mut chunk).await else {
            break;
        };
        if count == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..count]);
        let (packets, remainder) = extract_rdmnet_packets(&buffer).expect("client sent garbage");
        buffer = remainder;
        for packet in packets {
            for (vector, data) in handler(packet.clone()) {
                let out = build_rdmnet_packet(vector, &data, Some(BROKER_CID)).unwrap();
                socket.write_all(&out).await.unwrap();
            }
        }
    }
}

/// Spawn a one-connection mock broker; returns its port
async fn spawn_broker<F>(handler: F) -> u16
where
    F: FnMut(RootPacket) -> Replies + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        serve_connection(socket, handler).await;
    });
    port
}

fn client_config(port: u16) -> RdmnetClientConfig {
    RdmnetClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        auto_reconnect: false,
        request_timeout: Duration::from_millis(2000),
        ..Default::default()
    }
}

fn decode(packet: &RootPacket) -> RdmnetMessage {
    RdmnetMessage::decode(packet.vector, &packet.data).unwrap()
}

fn device_info_request() -> RdmFrame {
    RdmFrame::request(
        Uid::new(0x4c55, 0x0000_0001),
        Uid::new(0x02B0, 0x0000_0063),
        1,
        consts::GET_COMMAND,
        consts::PID_DEVICE_INFO,
        vec![],
    )
}

#[tokio::test]
async fn test_connect_and_bind_happy_path() {
    let port = spawn_broker(|packet| match decode(&packet) {
        RdmnetMessage::Broker(BrokerMessage::ConnectRequest { sequence, scope, .. }) => {
            assert_eq!(scope, "default");
            vec![(
                VECTOR_ROOT_BROKER,
                BrokerMessage::ConnectReply {
                    sequence,
                    status: BrokerStatusCode::Ok,
                    client_id: 99,
                    text: String::new(),
                }
                .encode(),
            )]
        }
        RdmnetMessage::Broker(BrokerMessage::ClientBindRequest {
            sequence,
            endpoint_id,
            ..
        }) => vec![(
            VECTOR_ROOT_BROKER,
            BrokerMessage::ClientBindReply {
                sequence,
                status: BrokerStatusCode::Ok,
                endpoint_id,
                negotiated_role: EndpointRole::Controller,
                negotiated_profile: 0x0100,
                text: String::new(),
            }
            .encode(),
        )],
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();
    assert_eq!(client.broker_state(), BrokerState::TcpConnected);

    client
        .start_broker_session(BrokerSessionOptions::default())
        .await
        .unwrap();

    assert_eq!(client.broker_state(), BrokerState::Bound);
    assert_eq!(client.client_id(), Some(99));
    let capability = client.capability(1).unwrap();
    assert_eq!(capability.role, Some(EndpointRole::Controller));
    assert_eq!(capability.profiles, vec![0x0100]);
    assert_eq!(capability.source, CapabilitySource::BrokerNegotiation);

    client.disconnect().await;
}

#[tokio::test]
async fn test_connect_rejection_maps_status() {
    let port = spawn_broker(|packet| match decode(&packet) {
        RdmnetMessage::Broker(BrokerMessage::ConnectRequest { sequence, .. }) => vec![(
            VECTOR_ROOT_BROKER,
            BrokerMessage::ConnectReply {
                sequence,
                status: BrokerStatusCode::InvalidScope,
                client_id: 0,
                text: "unknown scope".to_string(),
            }
            .encode(),
        )],
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();

    let error = client
        .start_broker_session(BrokerSessionOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::BrokerInvalidScope);
    assert_eq!(error.status, Some(BrokerStatusCode::InvalidScope));
    assert_eq!(client.broker_state(), BrokerState::Error);

    client.disconnect().await;
}

#[tokio::test]
async fn test_strict_negotiation_role_mismatch() {
    let port = spawn_broker(|packet| match decode(&packet) {
        RdmnetMessage::Broker(BrokerMessage::ConnectRequest { sequence, .. }) => vec![(
            VECTOR_ROOT_BROKER,
            BrokerMessage::ConnectReply {
                sequence,
                status: BrokerStatusCode::Ok,
                client_id: 7,
                text: String::new(),
            }
            .encode(),
        )],
        RdmnetMessage::Broker(BrokerMessage::ClientBindRequest {
            sequence,
            endpoint_id,
            ..
        }) => vec![(
            VECTOR_ROOT_BROKER,
            BrokerMessage::ClientBindReply {
                sequence,
                status: BrokerStatusCode::Ok,
                endpoint_id,
                negotiated_role: EndpointRole::Responder,
                negotiated_profile: 0,
                text: String::new(),
            }
            .encode(),
        )],
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();

    let error = client
        .start_broker_session(BrokerSessionOptions {
            strict_negotiation: true,
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::NegotiationRoleMismatch);
    assert_eq!(client.broker_state(), BrokerState::Error);

    client.disconnect().await;
}

#[tokio::test]
async fn test_rpt_rdm_transaction_round_trip() {
    let port = spawn_broker(|packet| match decode(&packet) {
        RdmnetMessage::Rpt(RptMessage::RdmCommand {
            sequence,
            endpoint_id,
            frame,
        }) => {
            let response = RdmFrame {
                destination: frame.source,
                source: frame.destination,
                transaction: frame.transaction,
                port_id: consts::RESPONSE_TYPE_ACK,
                message_count: 0,
                sub_device: 0,
                command_class: consts::GET_COMMAND_RESPONSE,
                pid: frame.pid,
                parameter_data: vec![1, 2, 3, 4],
            };
            vec![(
                VECTOR_ROOT_RPT,
                RptMessage::RdmResponse {
                    sequence,
                    endpoint_id,
                    frame: response,
                }
                .encode()
                .unwrap(),
            )]
        }
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();

    let response = client
        .rdm_transaction(&device_info_request(), 1, None)
        .await
        .unwrap();

    assert_eq!(response.pid, consts::PID_DEVICE_INFO);
    assert_eq!(response.command_class, consts::GET_COMMAND_RESPONSE);
    assert_eq!(response.parameter_data, vec![1, 2, 3, 4]);

    client.disconnect().await;
}

#[tokio::test]
async fn test_reassembly_across_split_writes() {
    // The broker drip-feeds one ConnectReply byte by byte; the client
    // must reassemble it from partial reads.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let count = socket.read(&mut chunk).await.unwrap();
            if count == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..count]);
            let (packets, remainder) = extract_rdmnet_packets(&buffer).unwrap();
            buffer = remainder;
            for packet in packets {
                if let RdmnetMessage::Broker(BrokerMessage::ConnectRequest { sequence, .. }) =
                    decode(&packet)
                {
                    let reply = BrokerMessage::ConnectReply {
                        sequence,
                        status: BrokerStatusCode::Ok,
                        client_id: 3,
                        text: String::new(),
                    }
                    .encode();
                    let out = build_rdmnet_packet(VECTOR_ROOT_BROKER, &reply, Some(BROKER_CID))
                        .unwrap();
                    for byte in out {
                        socket.write_all(&[byte]).await.unwrap();
                        socket.flush().await.unwrap();
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                }
            }
        }
    });

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();
    client
        .start_broker_session(BrokerSessionOptions {
            auto_bind: false,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(client.broker_state(), BrokerState::Connected);
    assert_eq!(client.client_id(), Some(3));

    client.disconnect().await;
}

#[tokio::test]
async fn test_decode_error_keeps_connection_alive() {
    let port = spawn_broker(|packet| match decode(&packet) {
        RdmnetMessage::Broker(BrokerMessage::ConnectRequest { sequence, .. }) => vec![
            // An undecodable broker payload first (unknown vector 0x42)...
            (VECTOR_ROOT_BROKER, vec![0, 0, 0, 0x42, 0, 0, 0, 1]),
            // ...then the real reply on the same connection.
            (
                VECTOR_ROOT_BROKER,
                BrokerMessage::ConnectReply {
                    sequence,
                    status: BrokerStatusCode::Ok,
                    client_id: 5,
                    text: String::new(),
                }
                .encode(),
            ),
        ],
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    let mut events = client.subscribe();
    client.connect().await.unwrap();

    client
        .start_broker_session(BrokerSessionOptions {
            auto_bind: false,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(client.client_id(), Some(5));

    let mut saw_decode_error = false;
    while let Ok(event) = events.try_recv() {
        if let RdmnetEvent::Error { code, .. } = event {
            assert_eq!(code, ErrorCode::BrokerDecodeError);
            saw_decode_error = true;
        }
    }
    assert!(saw_decode_error);

    client.disconnect().await;
}

#[tokio::test]
async fn test_endpoint_advertisement_ack() {
    let port = spawn_broker(|packet| match decode(&packet) {
        RdmnetMessage::Rpt(RptMessage::EndpointAdvertisement {
            sequence,
            endpoint_id,
            ..
        }) => vec![(
            VECTOR_ROOT_RPT,
            RptMessage::EndpointAdvertisementAck {
                sequence,
                endpoint_id,
                accepted: true,
                status: RptStatusCode::Ok,
            }
            .encode()
            .unwrap(),
        )],
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();

    let sequence = client
        .send_endpoint_advertisement(2, EndpointRole::Responder, vec![0x0200, 0x0100])
        .await
        .unwrap();

    let capability = client.capability(2).unwrap();
    assert_eq!(capability.source, CapabilitySource::LocalAdvertisement);
    assert_eq!(capability.profiles, vec![0x0100, 0x0200]);

    let ack = client
        .wait_for_endpoint_advertisement_ack(sequence, 2, None)
        .await
        .unwrap();
    assert!(ack.accepted);
    assert_eq!(ack.status, RptStatusCode::Ok);

    client.disconnect().await;
}

#[tokio::test]
async fn test_llrp_discovery_dedupes_targets() {
    let target_a = Uid::new(0x4c55, 1);
    let target_b = Uid::new(0x4c55, 2);
    let port = spawn_broker(move |packet| match decode(&packet) {
        RdmnetMessage::Llrp(LlrpMessage::ProbeRequest { sequence, .. }) => vec![
            (
                VECTOR_ROOT_LLRP,
                LlrpMessage::ProbeReply {
                    sequence,
                    target: target_a,
                }
                .encode(),
            ),
            (
                VECTOR_ROOT_LLRP,
                LlrpMessage::ProbeReply {
                    sequence,
                    target: target_b,
                }
                .encode(),
            ),
            // A duplicate that must collapse.
            (
                VECTOR_ROOT_LLRP,
                LlrpMessage::ProbeReply {
                    sequence,
                    target: target_a,
                }
                .encode(),
            ),
        ],
        _ => vec![],
    })
    .await;

    let client = RdmnetClient::new(client_config(port));
    client.connect().await.unwrap();

    let targets = client
        .discover_llrp_targets(Uid::MIN, Uid::MAX, Some(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(targets, vec![target_a, target_b]);

    client.disconnect().await;
}

#[tokio::test]
async fn test_remote_close_rejects_waiters_and_emits_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(socket);
    });

    let client = RdmnetClient::new(client_config(port));
    let mut events = client.subscribe();
    client.connect().await.unwrap();

    // A waiter that nothing will ever match.
    let error = client
        .wait_for_message(|_| false, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(error.message, "socket closed");
    assert_eq!(client.broker_state(), BrokerState::Disconnected);

    let mut saw_disconnected = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, RdmnetEvent::Disconnected) {
            saw_disconnected = true;
        }
    }
    assert!(saw_disconnected);
}

#[tokio::test]
async fn test_reconnect_after_remote_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        // First connection drops immediately; the second stays up.
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
        let (socket, _) = listener.accept().await.unwrap();
        serve_connection(socket, |_| vec![]).await;
    });

    let client = RdmnetClient::new(RdmnetClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        auto_reconnect: true,
        initial_reconnect_delay: Duration::from_millis(50),
        ..Default::default()
    });
    let mut events = client.subscribe();
    client.connect().await.unwrap();

    // Wait for the drop, the backoff and the second connect.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(client.is_connected());

    let mut saw_reconnecting = false;
    while let Ok(event) = events.try_recv() {
        if let RdmnetEvent::Reconnecting { attempt, delay } = event {
            assert_eq!(attempt, 1);
            assert_eq!(delay, Duration::from_millis(50));
            saw_reconnecting = true;
        }
    }
    assert!(saw_reconnecting);

    client.disconnect().await;
}

#[tokio::test]
async fn test_response_timeout_code() {
    // A broker that swallows everything.
    let port = spawn_broker(|_| vec![]).await;

    let client = RdmnetClient::new(RdmnetClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        auto_reconnect: false,
        request_timeout: Duration::from_millis(100),
        ..Default::default()
    });
    client.connect().await.unwrap();

    let error = client
        .rdm_transaction(&device_info_request(), 1, None)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ResponseTimeout);

    client.disconnect().await;
}

#[tokio::test]
async fn test_idle_heartbeat_uses_configured_vector() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let port = spawn_broker(move |packet| {
        tx.send(packet).ok();
        vec![]
    })
    .await;

    let client = RdmnetClient::new(RdmnetClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        auto_reconnect: false,
        heartbeat_interval: Duration::from_millis(50),
        ..Default::default()
    });
    client.connect().await.unwrap();

    // Outside a broker session the heartbeat is a zero-data root
    // packet carrying the configured vector.
    let packet = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(packet.vector, VECTOR_ROOT_BROKER);
    assert!(packet.data.is_empty());

    client.disconnect().await;
}
