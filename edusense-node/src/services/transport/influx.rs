use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

use super::{encode_points, Point, TransportWriter};
use crate::configs::{Influx, InfluxVersion};
use crate::errors::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum InfluxEndpoint {
    V1 {
        base_url: String,
        database: String,
        username: Option<String>,
        password: Option<String>,
    },
    V2 {
        url: String,
        org: String,
        bucket: String,
        token: String,
    },
}

impl InfluxEndpoint {
    pub fn from_settings(influx: &Influx) -> Result<Self, TransportError> {
        match influx.version {
            InfluxVersion::V1 => {
                let v1 = influx
                    .v1
                    .as_ref()
                    .ok_or_else(|| TransportError::Misconfigured("missing [influx.v1] section".into()))?;
                let scheme = if v1.ssl { "https" } else { "http" };

                Ok(InfluxEndpoint::V1 {
                    base_url: format!("{scheme}://{}:{}", v1.host, v1.port),
                    database: v1.database.clone(),
                    username: v1.username.clone().filter(|name| !name.is_empty()),
                    password: v1.password.clone(),
                })
            }
            InfluxVersion::V2 => {
                let v2 = influx.v2.clone().unwrap_or_default();
                let required = |value: Option<String>, name: &str| {
                    value.filter(|v| !v.is_empty()).ok_or_else(|| {
                        TransportError::Misconfigured(format!("missing InfluxDB v2 setting `{name}`"))
                    })
                };

                Ok(InfluxEndpoint::V2 {
                    url: required(v2.url, "url")?.trim_end_matches('/').to_string(),
                    org: required(v2.org, "org")?,
                    bucket: required(v2.bucket, "bucket")?,
                    token: required(v2.token, "token")?,
                })
            }
        }
    }

    pub fn write_url(&self) -> String {
        match self {
            InfluxEndpoint::V1 { base_url, .. } => format!("{base_url}/write"),
            InfluxEndpoint::V2 { url, .. } => format!("{url}/api/v2/write"),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InfluxEndpoint::V1 { base_url, database, .. } => format!("v1 {base_url}/{database}"),
            InfluxEndpoint::V2 { url, bucket, .. } => format!("v2 {url} bucket {bucket}"),
        }
    }
}

/// Writes points to InfluxDB over HTTP as line protocol.
pub struct InfluxWriter {
    client: Client,
    endpoint: InfluxEndpoint,
}

impl InfluxWriter {
    pub fn new(endpoint: InfluxEndpoint, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, endpoint })
    }

    pub fn from_settings(influx: &Influx) -> Result<Self, TransportError> {
        Self::new(
            InfluxEndpoint::from_settings(influx)?,
            Duration::from_millis(influx.timeout_ms),
        )
    }

    pub fn endpoint(&self) -> &InfluxEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl TransportWriter for InfluxWriter {
    async fn write(&self, measurement: &str, points: &[Point]) -> Result<(), TransportError> {
        let body = encode_points(points);
        if body.is_empty() {
            tracing::debug!("nothing to write for {}", measurement);
            return Ok(());
        }

        let request = self
            .client
            .post(self.endpoint.write_url())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);

        let request = match &self.endpoint {
            InfluxEndpoint::V1 { database, username, password, .. } => {
                let request = request.query(&[("db", database.as_str()), ("precision", "ns")]);
                match username {
                    Some(username) => request.basic_auth(username, password.as_ref()),
                    None => request,
                }
            }
            InfluxEndpoint::V2 { org, bucket, token, .. } => request
                .query(&[("org", org.as_str()), ("bucket", bucket.as_str()), ("precision", "ns")])
                .header(AUTHORIZATION, format!("Token {token}")),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected { status, body });
        }

        tracing::debug!("wrote {} points to {}", points.len(), measurement);

        Ok(())
    }
}
