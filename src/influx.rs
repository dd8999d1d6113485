use thiserror::Error;

use crate::config::InfluxDbConfig;
use crate::reading::SensorReading;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("sink returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Renders the collected readings as line protocol: two records per reading
/// (`temperature`, `humidity`), sharing the label and timestamp.
pub fn to_line_protocol(readings: &[SensorReading]) -> String {
    let mut records = String::new();

    for reading in readings {
        let timestamp = reading.to_nano();
        for (metric, value) in [
            ("temperature", &reading.temperature),
            ("humidity", &reading.humidity),
        ] {
            records.push_str(&format!(
                "{metric},label={label} value={value} {timestamp}\n",
                label = reading.label,
            ));
        }
    }

    records
}

/// Delivers the concatenated records to the sink in a single POST. Any
/// status at or above 300 is a delivery failure carrying the response body;
/// the caller decides what to do with it (in practice: log and move on).
pub async fn publish(sink: &InfluxDbConfig, records: &str) -> Result<(), PublishError> {
    let url = format!(
        "http://{}:{}/write?db={}",
        sink.host, sink.port, sink.database
    );

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(records.to_string())
        .send()
        .await?;

    let status = response.status();
    if status.as_u16() >= 300 {
        let body = response.text().await.unwrap_or_default();
        return Err(PublishError::Status { status, body });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;

    use chrono::DateTime;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn reading(label: &str, temperature: &str, humidity: &str, micros: i64) -> SensorReading {
        SensorReading {
            label: label.to_string(),
            measured_at: DateTime::from_timestamp_micros(micros).unwrap(),
            temperature: temperature.to_string(),
            humidity: humidity.to_string(),
        }
    }

    #[test]
    fn formats_two_records_per_reading() {
        let records = to_line_protocol(&[reading(
            "livingroom",
            "23.5",
            "45.2",
            1_700_000_000_123_456,
        )]);

        assert_eq!(
            records,
            "temperature,label=livingroom value=23.5 1700000000123456000\n\
             humidity,label=livingroom value=45.2 1700000000123456000\n"
        );
    }

    #[test]
    fn record_count_is_twice_the_reading_count() {
        let readings = vec![
            reading("livingroom", "23.5", "45.2", 1_700_000_000_000_000),
            reading("bedroom", "19.1", "51.0", 1_700_000_060_000_000),
            reading("attic", "15.8", "60.3", 1_700_000_120_000_000),
        ];

        let records = to_line_protocol(&readings);
        assert_eq!(records.lines().count(), 2 * readings.len());
    }

    #[test]
    fn no_readings_means_no_records() {
        assert_eq!(to_line_protocol(&[]), "");
    }

    /// Accepts a single connection, captures the full request, answers with
    /// the canned response and hands the request back through the join handle.
    async fn one_shot_sink(response: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            String::from_utf8(request).unwrap()
        });

        (addr, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };

        let head = String::from_utf8_lossy(&request[..head_end]);
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);

        request.len() >= head_end + 4 + content_length
    }

    #[tokio::test]
    async fn publish_posts_the_documented_request() {
        let (addr, handle) =
            one_shot_sink("HTTP/1.1 204 No Content\r\ncontent-length: 0\r\n\r\n").await;
        let sink = InfluxDbConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            database: "sensors".to_string(),
        };

        let records = "temperature,label=livingroom value=23.5 1700000000123456000\n\
                       humidity,label=livingroom value=45.2 1700000000123456000\n";
        publish(&sink, records).await.unwrap();

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /write?db=sensors HTTP/1.1\r\n"));

        let head = request.split("\r\n\r\n").next().unwrap().to_lowercase();
        assert!(head.contains("content-type: application/octet-stream"));

        assert!(request.ends_with(records));
    }

    #[tokio::test]
    async fn publish_reports_error_statuses_with_the_response_body() {
        let (addr, _handle) = one_shot_sink(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 26\r\n\r\n{\"error\":\"database error\"}",
        )
        .await;
        let sink = InfluxDbConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            database: "sensors".to_string(),
        };

        let err = publish(&sink, "").await.unwrap_err();
        match err {
            PublishError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "{\"error\":\"database error\"}");
            }
            other => panic!("expected a status error, got: {other}"),
        }
    }
}
