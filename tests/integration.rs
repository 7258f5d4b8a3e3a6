//! Integration tests for thumper-client.
//!
//! A scripted host drives a real worker and management client over in-memory
//! duplex streams using the same framing as the production relay.

use bytes::Bytes;
use serde_json::{json, Value};
use tokio::io::{duplex, split, DuplexStream, ReadHalf, WriteHalf};

use thumper_client::codec::MsgPackCodec;
use thumper_client::protocol::Frame;
use thumper_client::transport::{Relay, StreamRelay};
use thumper_client::{
    BoxError, DecodeError, Disposition, FramedRpc, ManagementClient, Message, ThumperError,
    Topology, Worker,
};

type TestRelay = StreamRelay<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

fn connected_pair() -> (TestRelay, TestRelay) {
    let (host, worker) = duplex(64 * 1024);
    let (hr, hw) = split(host);
    let (wr, ww) = split(worker);
    (StreamRelay::new(hr, hw), StreamRelay::new(wr, ww))
}

fn unit(tag: u64) -> Frame {
    let meta = json!({
        "headers": { "x-attempt": ["1"] },
        "queue": "jobs",
        "exchange": "work",
        "routingKey": "jobs.new",
        "deliveryTag": tag,
    });
    Frame::new(
        Bytes::from(meta.to_string()),
        Bytes::from(format!("payload-{}", tag)),
    )
}

fn end_of_stream() -> Frame {
    Frame::new(Bytes::new(), Bytes::new())
}

/// Send `frames`, then collect `expected` dispositions.
async fn script(mut host: TestRelay, frames: Vec<Frame>, expected: usize) -> (TestRelay, Vec<Disposition>) {
    for frame in frames {
        host.send(frame).await.unwrap();
    }

    let mut replies = Vec::new();
    for _ in 0..expected {
        let reply = host.receive().await.unwrap().expect("worker closed early");
        assert!(reply.context().is_empty());
        replies.push(Disposition::decode(reply.body()).expect("unknown disposition"));
    }
    (host, replies)
}

#[tokio::test]
async fn test_worker_acks_each_unit_in_order() {
    let (host, relay) = connected_pair();
    let frames = vec![unit(1), unit(2), unit(3), end_of_stream()];
    let host_task = tokio::spawn(script(host, frames, 3));

    let mut worker = Worker::new(relay);
    let mut seen = Vec::new();
    let summary = worker
        .run(|msg: Message| {
            seen.push((msg.delivery_tag(), msg.body().to_vec()));
            async { Ok::<(), BoxError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(summary.acked, 3);
    assert_eq!(
        seen,
        vec![
            (1, b"payload-1".to_vec()),
            (2, b"payload-2".to_vec()),
            (3, b"payload-3".to_vec()),
        ]
    );

    let (_host, replies) = host_task.await.unwrap();
    assert_eq!(replies, vec![Disposition::Ack; 3]);
}

#[tokio::test]
async fn test_message_fields_reach_handler() {
    let (host, relay) = connected_pair();
    let host_task = tokio::spawn(script(host, vec![unit(9), end_of_stream()], 1));

    let mut worker = Worker::new(relay);
    let mut captured = None;
    worker
        .run(|msg: Message| {
            captured = Some(msg);
            async { Ok::<(), BoxError>(()) }
        })
        .await
        .unwrap();

    let msg = captured.unwrap();
    assert_eq!(msg.queue(), "jobs");
    assert_eq!(msg.exchange(), "work");
    assert_eq!(msg.routing_key(), "jobs.new");
    assert_eq!(msg.header("x-attempt"), Some(&["1".to_string()][..]));

    host_task.await.unwrap();
}

#[tokio::test]
async fn test_dead_lettered_message_is_processed() {
    let (host, relay) = connected_pair();
    let meta = json!({
        "headers": { "x-foo": "yes", "x-death": [{ "count": 1, "queue": "jobs" }] },
        "queue": "jobs",
        "exchange": "",
        "routingKey": "jobs",
        "deliveryTag": 1,
    });
    let frames = vec![
        Frame::new(Bytes::from(meta.to_string()), Bytes::from_static(b"retry")),
        end_of_stream(),
    ];
    let host_task = tokio::spawn(script(host, frames, 1));

    let mut worker = Worker::new(relay);
    let mut foo = None;
    let summary = worker
        .run(|msg: Message| {
            foo = msg.header("x-foo").map(<[String]>::to_vec);
            async { Ok::<(), BoxError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(summary.acked, 1);
    assert_eq!(foo, Some(vec!["yes".to_string()]));

    let (_host, replies) = host_task.await.unwrap();
    assert_eq!(replies, vec![Disposition::Ack]);
}

#[tokio::test]
async fn test_handler_failure_rejects_and_fetches_nothing_more() {
    let (host, relay) = connected_pair();
    let frames = vec![unit(1), unit(2), unit(3), unit(4), end_of_stream()];
    let host_task = tokio::spawn(script(host, frames, 2));

    let mut worker = Worker::new(relay);
    let mut calls = 0;
    let err = worker
        .run(|msg: Message| {
            calls += 1;
            let tag = msg.delivery_tag();
            async move {
                if tag == 2 {
                    Err::<(), BoxError>("poison message".into())
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ThumperError::Handler { delivery_tag: 2, .. }));
    assert_eq!(calls, 2);

    let (mut host, replies) = host_task.await.unwrap();
    assert_eq!(replies, vec![Disposition::Ack, Disposition::Reject]);

    drop(worker);
    assert!(host.receive().await.unwrap().is_none());
}

#[tokio::test]
async fn test_bad_envelope_faults_without_reply() {
    let (host, relay) = connected_pair();
    let bad = Frame::new(
        Bytes::from_static(b"{\"queue\":\"jobs\",\"exchange\":\"\",\"routingKey\":\"jobs\",\"deliveryTag\":\"7\"}"),
        Bytes::from_static(b"body"),
    );
    let host_task = tokio::spawn(script(host, vec![unit(1), bad], 1));

    let mut worker = Worker::new(relay);
    let err = worker
        .run(|_msg: Message| async { Ok::<(), BoxError>(()) })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ThumperError::Decode(DecodeError::WrongType { field: "deliveryTag", .. })
    ));

    let (mut host, replies) = host_task.await.unwrap();
    assert_eq!(replies, vec![Disposition::Ack]);

    drop(worker);
    assert!(host.receive().await.unwrap().is_none());
}

#[tokio::test]
async fn test_host_closing_stream_stops_worker() {
    let (host, relay) = connected_pair();
    let host_task = tokio::spawn(async move {
        let (host, replies) = script(host, vec![unit(1)], 1).await;
        drop(host);
        replies
    });

    let mut worker = Worker::new(relay);
    let summary = worker
        .run(|_msg: Message| async { Ok::<(), BoxError>(()) })
        .await
        .unwrap();

    assert_eq!(summary.acked, 1);
    assert_eq!(host_task.await.unwrap(), vec![Disposition::Ack]);
}

#[tokio::test]
async fn test_manual_dispositions() {
    let (host, relay) = connected_pair();
    let host_task = tokio::spawn(script(host, vec![unit(1), unit(2), end_of_stream()], 2));

    let mut worker = Worker::new(relay);
    let first = worker.wait_message().await.unwrap().unwrap();
    assert_eq!(first.delivery_tag(), 1);
    worker.respond(Disposition::Nack).await.unwrap();

    let second = worker.wait_message().await.unwrap().unwrap();
    assert_eq!(second.delivery_tag(), 2);
    worker.respond(Disposition::Ack).await.unwrap();

    assert!(worker.wait_message().await.unwrap().is_none());

    let (_host, replies) = host_task.await.unwrap();
    assert_eq!(replies, vec![Disposition::Nack, Disposition::Ack]);
}

/// Answers every RPC call and records `(method, body)`.
async fn rpc_host(mut host: TestRelay, refuse: Option<&'static str>) -> Vec<(String, Value)> {
    let mut calls = Vec::new();
    while let Some(request) = host.receive().await.unwrap() {
        let method = String::from_utf8(request.context().to_vec()).unwrap();
        let body: Value = MsgPackCodec::decode(request.body()).unwrap();

        let reply = if refuse == Some(method.as_str()) {
            Frame::error(request.seq(), "access refused")
        } else {
            Frame::with_seq(0, request.seq(), Bytes::new(), Bytes::new())
        };
        calls.push((method, body));
        host.send(reply).await.unwrap();
    }
    calls
}

#[tokio::test]
async fn test_topology_and_publish_over_rpc() {
    let (host, relay) = connected_pair();
    let host_task = tokio::spawn(rpc_host(host, None));

    let client = ManagementClient::new(FramedRpc::new(relay));
    let topology = Topology::from_json_str(
        r#"{
            "queue": [{ "name": "orders", "durable": true }],
            "exchange": [{ "name": "shop", "kind": "direct" }],
            "queueBind": [{ "queue": "orders", "exchange": "shop", "key": "new" }]
        }"#,
    )
    .unwrap();

    topology.declare(&client).await.unwrap();
    client
        .publish("shop", "new", "text/plain", "hello", Default::default())
        .await
        .unwrap();
    drop(client);

    let calls = host_task.await.unwrap();
    let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        methods,
        vec![
            "thumper.QueueDeclare",
            "thumper.ExchangeDeclare",
            "thumper.BindQueue",
            "thumper.Publish",
        ]
    );
    assert_eq!(
        calls[3].1,
        json!({
            "exchange": "shop",
            "key": "new",
            "contentType": "text/plain",
            "message": "hello",
        })
    );
}

#[tokio::test]
async fn test_remote_error_reaches_caller() {
    let (host, relay) = connected_pair();
    let host_task = tokio::spawn(rpc_host(host, Some("thumper.Publish")));

    let client = ManagementClient::new(FramedRpc::new(relay));
    let err = client
        .publish("missing", "key", "text/plain", "hello", Default::default())
        .await
        .unwrap_err();

    match err {
        ThumperError::Remote(message) => assert_eq!(message, "access refused"),
        other => panic!("unexpected error {:?}", other),
    }

    drop(client);
    assert_eq!(host_task.await.unwrap().len(), 1);
}
