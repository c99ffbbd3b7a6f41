use async_trait::async_trait;
use domain::{
    Credentials, DeviceConfig, EndpointConfig, EndpointTable, FieldRegister, ReadingVector,
    RegisterFunction,
};
use em_acquisition::Scheduler;
use em_forward::{ContentSink, Delivery, ForwardError, OneM2mForwarder};
use em_protocol::{BusConnector, DevicePoller, ProtocolError, RegisterBus};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 所有地址都返回 1000.0 的假总线；`failing` 中的从站连接失败。
#[derive(Default)]
struct FakeConnector {
    failing: HashSet<u8>,
    connects: Mutex<u32>,
}

struct FakeBus {
    refused_slaves: HashSet<u8>,
}

#[async_trait]
impl RegisterBus for FakeBus {
    async fn read_registers(
        &mut self,
        _function: RegisterFunction,
        slave_id: u8,
        _address: u16,
        _count: u16,
    ) -> Result<Vec<u16>, ProtocolError> {
        if self.refused_slaves.contains(&slave_id) {
            return Err(ProtocolError::Timeout("no response".to_string()));
        }
        Ok(vec![0x0000, 0x447A])
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

#[async_trait]
impl BusConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterBus>, ProtocolError> {
        *self.connects.lock().unwrap() += 1;
        Ok(Box::new(FakeBus {
            refused_slaves: self.failing.clone(),
        }))
    }

    fn port(&self) -> &str {
        "/dev/fake"
    }
}

/// 连接器本身拒绝连接。
struct RefusingConnector;

#[async_trait]
impl BusConnector for RefusingConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterBus>, ProtocolError> {
        Err(ProtocolError::Connection("/dev/fake: busy".to_string()))
    }

    fn port(&self) -> &str {
        "/dev/fake"
    }
}

/// 记录每次提交；`rejecting` 中的从站返回 500。
#[derive(Default)]
struct RecordingSink {
    rejecting: HashSet<u8>,
    submissions: Mutex<Vec<(u8, ReadingVector)>>,
    stop_after: Option<(usize, watch::Sender<bool>)>,
}

#[async_trait]
impl ContentSink for RecordingSink {
    async fn submit(&self, slave_id: u8, vector: &ReadingVector) -> Result<Delivery, ForwardError> {
        let count = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push((slave_id, vector.clone()));
            submissions.len()
        };
        if let Some((limit, tx)) = &self.stop_after {
            if count >= *limit {
                let _ = tx.send(true);
            }
        }
        if self.rejecting.contains(&slave_id) {
            return Err(ForwardError::Rejected {
                status: 500,
                body: "internal".to_string(),
            });
        }
        Ok(Delivery {
            status: 201,
            body: String::new(),
        })
    }
}

fn three_meters() -> Vec<DeviceConfig> {
    vec![
        DeviceConfig::new(
            1,
            vec![
                FieldRegister::new("Energy", 3960),
                FieldRegister::new("Power", 3902),
                FieldRegister::new("Current", 3912),
            ],
        ),
        DeviceConfig::new(
            2,
            vec![
                FieldRegister::new("Energy", 158),
                FieldRegister::new("Power", 100),
                FieldRegister::new("Voltage", 140),
                FieldRegister::new("Current", 148),
                FieldRegister::new("Frequency", 156),
                FieldRegister::new("PowerFactor", 116),
            ],
        ),
        DeviceConfig::new(
            3,
            vec![
                FieldRegister::new("Energy", 158),
                FieldRegister::new("Voltage", 140),
            ],
        ),
    ]
}

#[tokio::test]
async fn one_cycle_forwards_every_device_with_shared_timestamp() {
    let connector = Arc::new(FakeConnector::default());
    let sink = Arc::new(RecordingSink::default());
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(connector.clone()),
        sink.clone(),
    );

    let report = scheduler.run_cycle(1759719120).await;
    assert_eq!(report.delivered(), 3);
    assert_eq!(report.failed(), 0);

    let submissions = sink.submissions.lock().unwrap();
    let slaves: Vec<u8> = submissions.iter().map(|(slave, _)| *slave).collect();
    assert_eq!(slaves, vec![1, 2, 3]);
    for ((_, vector), device) in submissions.iter().zip(three_meters()) {
        assert_eq!(vector.timestamp(), 1759719120);
        assert_eq!(vector.len(), 1 + device.field_count());
        assert!(vector.values().iter().all(|value| *value == 1000.0));
    }
    // 每台设备独立建立一次会话
    assert_eq!(*connector.connects.lock().unwrap(), 3);
}

#[tokio::test]
async fn rejected_delivery_does_not_stop_later_devices() {
    let sink = Arc::new(RecordingSink {
        rejecting: HashSet::from([2]),
        ..RecordingSink::default()
    });
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(Arc::new(FakeConnector::default())),
        sink.clone(),
    );

    let report = scheduler.run_cycle(100).await;
    assert_eq!(report.devices.len(), 3);
    assert!(report.devices[0].delivery.is_ok());
    assert!(matches!(
        report.devices[1].delivery,
        Err(ForwardError::Rejected { status: 500, .. })
    ));
    assert!(report.devices[2].delivery.is_ok());
    assert_eq!(sink.submissions.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn failing_registers_still_produce_full_vectors() {
    let connector = Arc::new(FakeConnector {
        failing: HashSet::from([2]),
        ..FakeConnector::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let scheduler = Scheduler::new(three_meters(), DevicePoller::new(connector), sink.clone());

    let report = scheduler.run_cycle(100).await;
    let meter_two = &report.devices[1];
    assert_eq!(meter_two.slave_id, 2);
    assert_eq!(meter_two.vector.len(), 7);
    assert!(meter_two.vector.values().iter().all(|value| *value == 0.0));
    // 其他设备不受影响
    assert_eq!(report.devices[0].vector.values(), &[1000.0, 1000.0, 1000.0]);
}

#[tokio::test]
async fn connection_failure_forwards_zero_vector() {
    let sink = Arc::new(RecordingSink::default());
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(Arc::new(RefusingConnector)),
        sink.clone(),
    );

    let report = scheduler.run_cycle(5).await;
    assert_eq!(report.devices.len(), 3);
    for (outcome, device) in report.devices.iter().zip(three_meters()) {
        assert_eq!(outcome.vector.len(), 1 + device.field_count());
        assert_eq!(outcome.vector.timestamp(), 5);
        assert!(outcome.vector.values().iter().all(|value| *value == 0.0));
    }
}

#[tokio::test(start_paused = true)]
async fn run_repeats_cycles_until_shutdown() {
    let (tx, rx) = watch::channel(false);
    // 两个完整周期（每周期 3 台设备）后停止
    let sink = Arc::new(RecordingSink {
        stop_after: Some((6, tx)),
        ..RecordingSink::default()
    });
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(Arc::new(FakeConnector::default())),
        sink.clone(),
    )
    .with_interval(Duration::from_secs(60));

    scheduler.run(rx).await;

    let submissions = sink.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 6);
    let first_cycle = submissions[0].1.timestamp();
    assert!(submissions[..3].iter().all(|(_, v)| v.timestamp() == first_cycle));
    let second_cycle = submissions[3].1.timestamp();
    assert!(submissions[3..].iter().all(|(_, v)| v.timestamp() == second_cycle));
}

#[tokio::test]
async fn shutdown_finishes_current_device_only() {
    let (tx, rx) = watch::channel(false);
    let sink = Arc::new(RecordingSink {
        stop_after: Some((1, tx)),
        ..RecordingSink::default()
    });
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(Arc::new(FakeConnector::default())),
        sink.clone(),
    );

    scheduler.run(rx).await;

    let submissions = sink.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, 1);
}

#[tokio::test]
async fn shutdown_before_start_runs_nothing() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).expect("receiver alive");
    let sink = Arc::new(RecordingSink::default());
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(Arc::new(FakeConnector::default())),
        sink.clone(),
    );

    scheduler.run(rx).await;
    assert!(sink.submissions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn remote_failure_for_one_device_leaves_others_delivered() {
    let server = MockServer::start().await;
    for (route, status) in [("/d1", 201), ("/d2", 500), ("/d3", 201)] {
        Mock::given(method("POST"))
            .and(path(route))
            .and(header("X-M2M-Origin", "sr-user:sr-pass"))
            .respond_with(ResponseTemplate::new(status).set_body_string(format!("{route}:{status}")))
            .expect(1)
            .mount(&server)
            .await;
    }

    let endpoints: EndpointTable = (1u8..=3)
        .map(|slave| {
            (
                slave,
                EndpointConfig::new(
                    format!("{}/d{}", server.uri(), slave),
                    vec!["AE-SR-EM".to_string(), format!("SR-EM-KH04-0{}", slave - 1)],
                ),
            )
        })
        .collect();
    let forwarder = OneM2mForwarder::new(
        Arc::new(endpoints),
        Arc::new(Credentials::new("sr-user", "sr-pass")),
    )
    .expect("forwarder");
    let scheduler = Scheduler::new(
        three_meters(),
        DevicePoller::new(Arc::new(FakeConnector::default())),
        Arc::new(forwarder),
    );

    let report = scheduler.run_cycle(42).await;
    assert_eq!(report.devices.len(), 3);
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.failed(), 1);

    let first = &report.devices[0];
    assert_eq!(first.slave_id, 1);
    assert_eq!(first.delivery.as_ref().map(|d| d.status).ok(), Some(201));

    let second = &report.devices[1];
    assert_eq!(second.slave_id, 2);
    match &second.delivery {
        Err(ForwardError::Rejected { status, body }) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "/d2:500");
        }
        other => panic!("unexpected delivery: {other:?}"),
    }

    let third = &report.devices[2];
    assert_eq!(third.slave_id, 3);
    assert_eq!(third.delivery.as_ref().map(|d| d.status).ok(), Some(201));

    for (outcome, device) in report.devices.iter().zip(three_meters()) {
        assert_eq!(outcome.vector.timestamp(), 42);
        assert_eq!(outcome.vector.len(), 1 + device.field_count());
    }
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 3);
}
