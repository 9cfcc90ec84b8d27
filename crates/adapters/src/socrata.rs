//! Socrata open-data adapter for fetching planning application records

use async_trait::async_trait;
use planning_poster_domain::{ApplicationRecord, Coordinates, RecordSource, SourceError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::Date;
use time::macros::format_description;

pub const DEFAULT_BASE_URL: &str = "https://opendata.camden.gov.uk";
pub const DEFAULT_DATASET: &str = "2eiu-s2cw";
pub const DEFAULT_ORDER: &str = "registered_date DESC";

/// Socrata dataset holding planning applications
pub struct SocrataSource {
    client: Client,
    base_url: String,
    dataset: String,
    order_by: String,
    app_token: Option<SecretString>,
}

impl SocrataSource {
    pub fn new(
        base_url: String,
        dataset: String,
        order_by: String,
        app_token: Option<SecretString>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset,
            order_by,
            app_token,
        })
    }

    fn resource_url(&self) -> String {
        format!("{}/resource/{}.json", self.base_url, self.dataset)
    }
}

#[derive(Deserialize)]
struct RawRecord {
    pk: Scalar,
    application_type: String,
    applicant_name: Option<String>,
    development_address: String,
    registered_date: String,
    full_application: RawLink,
    location: Option<RawLocation>,
}

#[derive(Deserialize)]
struct RawLink {
    url: String,
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: Scalar,
    longitude: Scalar,
}

/// Socrata serializes most scalars as strings, but not always
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Number(n) => n.as_f64(),
        }
    }
}

impl RawRecord {
    fn into_record(self) -> Result<ApplicationRecord, SourceError> {
        let pk = self.pk.into_string();

        let registered_date = parse_registered_date(&self.registered_date).ok_or_else(|| {
            SourceError::Decode(format!(
                "record {}: invalid registered_date '{}'",
                pk, self.registered_date
            ))
        })?;

        let location = match self.location {
            Some(raw) => {
                let (Some(latitude), Some(longitude)) = (raw.latitude.as_f64(), raw.longitude.as_f64())
                else {
                    return Err(SourceError::Decode(format!(
                        "record {}: invalid location coordinates",
                        pk
                    )));
                };
                Some(Coordinates {
                    latitude,
                    longitude,
                })
            }
            None => None,
        };

        Ok(ApplicationRecord {
            pk,
            application_type: self.application_type,
            applicant_name: self.applicant_name,
            development_address: self.development_address,
            registered_date,
            url: self.full_application.url,
            location,
        })
    }
}

/// Decode a single raw feed record (one element of the dataset's JSON array)
pub fn parse_record(json: &str) -> Result<ApplicationRecord, SourceError> {
    let raw: RawRecord =
        serde_json::from_str(json).map_err(|e| SourceError::Decode(e.to_string()))?;
    raw.into_record()
}

/// Parse the date part of "2021-03-04", "2021-03-04T00:00:00.000" or RFC 3339
fn parse_registered_date(value: &str) -> Option<Date> {
    let date_part = value.trim().get(..10)?;
    Date::parse(date_part, format_description!("[year]-[month]-[day]")).ok()
}

#[async_trait]
impl RecordSource for SocrataSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<ApplicationRecord>, SourceError> {
        tracing::info!(dataset = %self.dataset, limit = limit, "Fetching records from Socrata");

        let mut request = self.client.get(self.resource_url()).query(&[
            ("$limit", limit.to_string()),
            ("$order", self.order_by.clone()),
        ]);

        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Vec<RawRecord> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let records = raw
            .into_iter()
            .map(RawRecord::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = records.len(), "Decoded records");

        Ok(records)
    }
}
