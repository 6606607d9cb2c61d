use device_agent::{spool, AgentConfig, AgentError, GatewayClient, Measurement};
use ingest_gateway::{Gateway, GatewayConfig, MeasurementValidation};
use std::{path::PathBuf, time::Duration};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

struct Running {
    upload_dir: PathBuf,
    url: String,
    stop: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<Result<(), String>>>,
}

async fn start_gateway(validation: MeasurementValidation) -> Running {
    let upload_dir = temp_dir("agent-uploads");
    let gateway = Gateway::new(GatewayConfig {
        upload_dir: upload_dir.clone(),
        measurement_validation: validation,
        ..GatewayConfig::default()
    })
    .unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        gateway
            .serve_on(listener, async move {
                let _ = stopped.await;
            })
            .await
            .map_err(|err| err.to_string())
    });
    Running {
        upload_dir,
        url,
        stop: Some(stop),
        server: Some(server),
    }
}

impl Running {
    fn client(&self) -> GatewayClient {
        GatewayClient::new(&AgentConfig {
            device_id: "dev-42".to_string(),
            gateway_url: self.url.clone(),
            spool_dir: temp_dir("unused-spool"),
            poll_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn uploads(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(server) = self.server.take() {
            server.await.unwrap().unwrap();
        }
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn one_shot_measurement_and_image_are_acknowledged() {
    let gateway = start_gateway(MeasurementValidation::Strict).await;
    let client = gateway.client();

    client
        .send_measurement(&Measurement::parse("temperature", "21.5"))
        .await
        .unwrap();

    let image_dir = temp_dir("agent-images");
    std::fs::create_dir_all(&image_dir).unwrap();
    let image = image_dir.join("photo.jpg");
    std::fs::write(&image, b"\xff\xd8jpeg\xff\xd9").unwrap();
    client.upload_image(&image).await.unwrap();

    let uploads = gateway.uploads();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].ends_with("-photo.jpg"));

    drop(client);
    let _ = std::fs::remove_dir_all(&image_dir);
    gateway.shutdown().await;
}

#[tokio::test]
async fn drain_sends_spool_and_keeps_nothing_acknowledged() {
    let gateway = start_gateway(MeasurementValidation::Permissive).await;
    let client = gateway.client();
    let spool_dir = temp_dir("agent-spool");
    std::fs::create_dir_all(&spool_dir).unwrap();
    std::fs::write(
        spool_dir.join("0001.json"),
        serde_json::to_vec(&Measurement::parse("od", "0.42")).unwrap(),
    )
    .unwrap();
    std::fs::write(spool_dir.join("0002.jpg"), b"jpeg").unwrap();
    std::fs::write(spool_dir.join("0003.json"), b"{broken").unwrap();

    let report = spool::drain(&client, &spool_dir).await.unwrap();

    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.quarantined, 1);
    let mut left: Vec<String> = std::fs::read_dir(&spool_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["0003.json.bad".to_string()]);
    assert_eq!(gateway.uploads().len(), 1);

    drop(client);
    let _ = std::fs::remove_dir_all(&spool_dir);
    gateway.shutdown().await;
}

#[tokio::test]
async fn rejected_request_surfaces_status_and_body() {
    let gateway = start_gateway(MeasurementValidation::Strict).await;
    let client = GatewayClient::new(&AgentConfig {
        device_id: String::new(),
        gateway_url: gateway.url.clone(),
        spool_dir: temp_dir("unused-spool"),
        poll_interval: Duration::from_secs(30),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap();

    let err = client
        .send_measurement(&Measurement::parse("temperature", "21.5"))
        .await
        .unwrap_err();

    match err {
        AgentError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "Invalid request");
        }
        other => panic!("unexpected error: {other}"),
    }

    drop(client);
    gateway.shutdown().await;
}

#[tokio::test]
async fn unreachable_gateway_leaves_spool_untouched() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let spool_dir = temp_dir("agent-spool");
    std::fs::create_dir_all(&spool_dir).unwrap();
    std::fs::write(spool_dir.join("0001.png"), b"png").unwrap();
    let client = GatewayClient::new(&AgentConfig {
        device_id: "dev-42".to_string(),
        gateway_url: url,
        spool_dir: spool_dir.clone(),
        poll_interval: Duration::from_secs(30),
        request_timeout: Duration::from_secs(2),
    })
    .unwrap();

    let report = spool::drain(&client, &spool_dir).await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(spool_dir.join("0001.png").exists());
    let _ = std::fs::remove_dir_all(&spool_dir);
}
