//! X API write adapter for publishing posts

use async_trait::async_trait;
use planning_poster_domain::{MapImage, Post, PublishError, PublishResult, Publisher};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.x.com";

/// X API publisher for creating posts
pub struct XPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
    enabled: bool,
}

impl XPublisher {
    pub fn with_base_url(user_token: SecretString, base_url: String) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            enabled: true,
        })
    }

    /// Create a disabled publisher (for dry runs)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            user_token: SecretString::new("".into()),
            base_url: String::new(),
            enabled: false,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            "Authorization",
            format!("Bearer {}", self.user_token.expose_secret()),
        )
    }

    async fn upload_media(&self, image: &MapImage) -> Result<String, PublishError> {
        let bytes = tokio::fs::read(image.path())
            .await
            .map_err(|e| PublishError::Media(format!("Failed to read image: {}", e)))?;

        let part = Part::bytes(bytes)
            .file_name("map.png")
            .mime_str("image/png")
            .map_err(|e| PublishError::Media(e.to_string()))?;

        let form = Form::new()
            .text("media_category", "tweet_image")
            .part("media", part);

        let url = format!("{}/2/media/upload", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Media(e.to_string()))?;

        let response = check_status(response, "upload media")
            .await
            .map_err(|e| match e {
                PublishError::Api(message) => PublishError::Media(message),
                other => other,
            })?;

        let media: DataResponse<MediaData> = response
            .json()
            .await
            .map_err(|e| PublishError::Media(e.to_string()))?;

        Ok(media.data.id)
    }
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaAttachment>,
}

#[derive(Serialize)]
struct MediaAttachment {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct MediaData {
    id: String,
}

#[derive(Deserialize)]
struct UserData {
    username: String,
}

async fn check_status(response: Response, action: &str) -> Result<Response, PublishError> {
    if response.status() == 401 || response.status() == 403 {
        return Err(PublishError::Auth(format!(
            "{} rejected with HTTP {}",
            action,
            response.status()
        )));
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(PublishError::Api(format!(
            "Failed to {}: HTTP {}: {}",
            action, status, body
        )));
    }

    Ok(response)
}

#[async_trait]
impl Publisher for XPublisher {
    async fn verify_credentials(&self) -> Result<(), PublishError> {
        if !self.enabled {
            return Err(PublishError::Auth("Publisher is disabled".to_string()));
        }

        let url = format!("{}/2/users/me", self.base_url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))?;

        let response = check_status(response, "verify credentials").await?;
        let user: DataResponse<UserData> = response
            .json()
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))?;

        tracing::debug!(username = %user.data.username, "Verified X credentials");
        Ok(())
    }

    async fn publish(
        &self,
        post: &Post,
        image: Option<&MapImage>,
    ) -> Result<PublishResult, PublishError> {
        if !self.enabled {
            return Err(PublishError::Api("Publisher is disabled".to_string()));
        }

        let media = match image {
            Some(image) => Some(MediaAttachment {
                media_ids: vec![self.upload_media(image).await?],
            }),
            None => None,
        };

        // The v2 create endpoint has no exact-coordinate geotagging
        if let Some(coordinates) = post.coordinates {
            tracing::debug!(
                pk = %post.source_pk,
                latitude = coordinates.latitude,
                longitude = coordinates.longitude,
                "Coordinates not attached to X post"
            );
        }

        let request = CreateTweetRequest {
            text: &post.text,
            media,
        };

        let url = format!("{}/2/tweets", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let response = check_status(response, "create post").await?;

        let tweet: DataResponse<TweetData> = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishResult {
            url: Some(format!("https://x.com/i/status/{}", tweet.data.id)),
            id: tweet.data.id,
        })
    }

    fn platform(&self) -> &'static str {
        "x"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_post() -> Post {
        Post {
            source_pk: "42".to_string(),
            text: "New Householder planning application from Unknown at 1 Road.".to_string(),
            coordinates: None,
        }
    }

    fn publisher(base_url: String) -> XPublisher {
        XPublisher::with_base_url(SecretString::new("test-token".into()), base_url).unwrap()
    }

    #[tokio::test]
    async fn test_publish_text_only() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "text": "New Householder planning application from Unknown at 1 Road."
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1001", "text": "..."}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = publisher(mock_server.uri())
            .publish(&sample_post(), None)
            .await
            .unwrap();

        assert_eq!(result.id, "1001");
        assert_eq!(result.url.as_deref(), Some("https://x.com/i/status/1001"));
    }

    #[tokio::test]
    async fn test_publish_with_image_uploads_media_first() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/media/upload"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "media-7"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({
                "text": "New Householder planning application from Unknown at 1 Road.",
                "media": {"media_ids": ["media-7"]}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1002"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG fake").unwrap();
        let image = MapImage::new(file.into_temp_path());

        let result = publisher(mock_server.uri())
            .publish(&sample_post(), Some(&image))
            .await
            .unwrap();

        assert_eq!(result.id, "1002");
    }

    #[tokio::test]
    async fn test_media_upload_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/media/upload"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let file = tempfile::NamedTempFile::new().unwrap();
        let image = MapImage::new(file.into_temp_path());

        let result = publisher(mock_server.uri())
            .publish(&sample_post(), Some(&image))
            .await;

        assert!(matches!(result, Err(PublishError::Media(_))));
    }

    #[tokio::test]
    async fn test_publish_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = publisher(mock_server.uri())
            .publish(&sample_post(), None)
            .await;

        assert!(matches!(result, Err(PublishError::Auth(_))));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "9", "name": "Planning Bot", "username": "planningbot"}
            })))
            .mount(&mock_server)
            .await;

        assert!(
            publisher(mock_server.uri())
                .verify_credentials()
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_verify_credentials_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let result = publisher(mock_server.uri()).verify_credentials().await;

        assert!(matches!(result, Err(PublishError::Auth(_))));
    }

    #[tokio::test]
    async fn test_disabled_publisher() {
        let publisher = XPublisher::disabled();

        assert!(publisher.verify_credentials().await.is_err());
        assert!(publisher.publish(&sample_post(), None).await.is_err());
    }
}
