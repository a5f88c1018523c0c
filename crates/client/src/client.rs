//! Immich API client.
//!
//! Async HTTP client using `reqwest` with `x-api-key` authentication. In
//! dry-run mode every mutating call is logged and answered with a synthetic
//! result instead of touching the network.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use immich_protocol::album::BulkIdsRequest;
use immich_protocol::asset::{CreateStackRequest, DeleteAssetsRequest, SearchResponse};
use immich_protocol::job::{CreateJobRequest, JobCommandRequest};
use immich_protocol::tag::{BulkTagAssetsRequest, UpsertTagsRequest};
use immich_protocol::{
    AllJobStatus, Album, Asset, AssetStatistics, AssetUploadResponse, AssetUploadStatus,
    BulkIdResponse, BulkTagAssetsResponse, BulkUpdateAssetsRequest, CreateAlbumRequest,
    JobCommand, JobName, JobStatus, MediaTypes, MetadataSearchRequest, PingResponse,
    ServerAbout, ServerStatistics, Stack, Tag, UpdateAssetRequest, User,
};

use crate::Error;
use crate::upload::AssetUploadParams;

const API_KEY_HEADER: &str = "x-api-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const SEARCH_PAGE_SIZE: u32 = 1000;
const DRY_RUN_ID: &str = "dry-run";

/// Characters escaped in a path segment. Keeps UUIDs and job names readable.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL, with or without the trailing `/api`.
    pub endpoint: String,
    pub api_key: String,
    pub verify_tls: bool,
    /// Connect timeout, and total deadline for every call except uploads and
    /// downloads, whose bodies are only bounded per read.
    pub timeout: Duration,
    pub dry_run: bool,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
            dry_run: false,
        }
    }
}

/// Immich API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    dry_run: bool,
}

impl Client {
    /// Creates a new client from the given settings.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let base_url = normalize_endpoint(&config.endpoint)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&config.api_key).map_err(|_| Error::InvalidKey)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.timeout)
            .tcp_keepalive(Some(config.timeout))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        debug!(base_url = %base_url, dry_run = config.dry_run, "immich client created");
        Ok(Self {
            http,
            base_url,
            timeout: config.timeout,
            dry_run: config.dry_run,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.streaming_request(method, path).timeout(self.timeout)
    }

    /// A request without a total deadline, for large bodies.
    fn streaming_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends a request and turns non-success statuses into [`Error::Api`].
    async fn send(&self, req: RequestBuilder, endpoint: &str) -> Result<Response, Error> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::from_response(status.as_u16(), endpoint, &body));
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let resp = self.send(self.request(Method::GET, path), path).await?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(method, path).json(body);
        let resp = self.send(req, path).await?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    /// For endpoints that answer 204 or an uninteresting body.
    async fn send_discard<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), Error> {
        let mut req = self.request(method, path);
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send(req, path).await?;
        Ok(())
    }

    /// Logs a skipped mutating call. Returns true when the call must not be sent.
    fn skip_in_dry_run(&self, method: &Method, path: &str) -> bool {
        if self.dry_run {
            info!(%method, path, "dry run: request not sent");
        }
        self.dry_run
    }

    // --- Server ---

    /// Returns true when the server answers the ping with `pong`.
    pub async fn ping(&self) -> Result<bool, Error> {
        let resp: PingResponse = self.get_json("/server/ping").await?;
        Ok(resp.is_pong())
    }

    /// Checks that the API key is accepted by fetching the current user.
    pub async fn validate_connection(&self) -> Result<User, Error> {
        self.get_json("/users/me").await
    }

    pub async fn server_statistics(&self) -> Result<ServerStatistics, Error> {
        self.get_json("/server/statistics").await
    }

    pub async fn asset_statistics(&self) -> Result<AssetStatistics, Error> {
        self.get_json("/assets/statistics").await
    }

    pub async fn media_types(&self) -> Result<MediaTypes, Error> {
        self.get_json("/server/media-types").await
    }

    pub async fn about(&self) -> Result<ServerAbout, Error> {
        self.get_json("/server/about").await
    }

    // --- Assets ---

    pub async fn asset_info(&self, asset_id: &str) -> Result<Asset, Error> {
        self.get_json(&format!("/assets/{}", encode(asset_id))).await
    }

    /// Streams the original file of an asset to `dest`. Returns bytes written.
    pub async fn download_asset(&self, asset_id: &str, dest: &Path) -> Result<u64, Error> {
        let path = format!("/assets/{}/original", encode(asset_id));
        let resp = self
            .send(self.streaming_request(Method::GET, &path), &path)
            .await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        loop {
            let next = tokio::time::timeout(self.timeout, stream.next())
                .await
                .map_err(|_| {
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "download stalled")
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(asset_id, bytes = written, dest = %dest.display(), "asset downloaded");
        Ok(written)
    }

    pub async fn update_asset(
        &self,
        asset_id: &str,
        changes: &UpdateAssetRequest,
    ) -> Result<Asset, Error> {
        let path = format!("/assets/{}", encode(asset_id));
        if self.skip_in_dry_run(&Method::PUT, &path) {
            return self.asset_info(asset_id).await;
        }
        self.send_json(Method::PUT, &path, changes).await
    }

    pub async fn update_assets(&self, req: &BulkUpdateAssetsRequest) -> Result<(), Error> {
        if req.ids.is_empty() {
            return Err(Error::InvalidArgument("no asset ids given".into()));
        }
        if self.skip_in_dry_run(&Method::PUT, "/assets") {
            return Ok(());
        }
        self.send_discard(Method::PUT, "/assets", Some(req)).await
    }

    pub async fn delete_assets(&self, ids: &[String], force: bool) -> Result<(), Error> {
        if ids.is_empty() {
            return Err(Error::InvalidArgument("no asset ids given".into()));
        }
        if self.skip_in_dry_run(&Method::DELETE, "/assets") {
            return Ok(());
        }
        let body = DeleteAssetsRequest {
            ids: ids.to_vec(),
            force,
        };
        self.send_discard(Method::DELETE, "/assets", Some(&body)).await
    }

    /// Uploads one asset with its optional sidecar and live-photo motion file.
    pub async fn upload_asset(
        &self,
        params: &AssetUploadParams,
    ) -> Result<AssetUploadResponse, Error> {
        if self.skip_in_dry_run(&Method::POST, "/assets") {
            // Still fail on unreadable input.
            tokio::fs::metadata(&params.asset_path).await?;
            return Ok(AssetUploadResponse {
                id: format!("{DRY_RUN_ID}-{}", params.device_asset_id),
                status: AssetUploadStatus::Created,
            });
        }

        let form = params.into_form().await?;
        let req = self
            .streaming_request(Method::POST, "/assets")
            .multipart(form);
        let resp = self.send(req, "/assets").await?;
        let parsed: AssetUploadResponse = serde_json::from_slice(&resp.bytes().await?)?;
        debug!(
            file = %params.asset_path.display(),
            id = %parsed.id,
            status = ?parsed.status,
            "asset uploaded"
        );
        Ok(parsed)
    }

    /// Replaces the original file of an existing asset, keeping its id.
    pub async fn replace_asset(
        &self,
        asset_id: &str,
        params: &AssetUploadParams,
    ) -> Result<AssetUploadResponse, Error> {
        let path = format!("/assets/{}/original", encode(asset_id));
        if self.skip_in_dry_run(&Method::PUT, &path) {
            tokio::fs::metadata(&params.asset_path).await?;
            return Ok(AssetUploadResponse {
                id: asset_id.to_string(),
                status: AssetUploadStatus::Replaced,
            });
        }

        let form = params.into_form().await?;
        let req = self.streaming_request(Method::PUT, &path).multipart(form);
        let resp = self.send(req, &path).await?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    /// Runs a metadata search, following `nextPage` until exhausted.
    pub async fn search_assets(
        &self,
        mut query: MetadataSearchRequest,
    ) -> Result<Vec<Asset>, Error> {
        query.page = Some(query.page.unwrap_or(1));
        query.size = Some(query.size.unwrap_or(SEARCH_PAGE_SIZE));

        let mut assets = Vec::new();
        loop {
            let resp: SearchResponse = self
                .send_json(Method::POST, "/search/metadata", &query)
                .await?;
            assets.extend(resp.assets.items);

            let Some(next) = resp.assets.next_page.filter(|p| !p.is_empty()) else {
                break;
            };
            match next.parse::<u32>() {
                Ok(page) => query.page = Some(page),
                Err(_) => {
                    warn!(next_page = %next, "unparseable nextPage, stopping search");
                    break;
                }
            }
        }
        Ok(assets)
    }

    /// Assets whose checksum matches exactly.
    pub async fn assets_by_checksum(&self, checksum: &str) -> Result<Vec<Asset>, Error> {
        let query = MetadataSearchRequest {
            checksum: Some(checksum.to_string()),
            ..Default::default()
        };
        let assets = self.search_assets(query).await?;
        Ok(assets.into_iter().filter(|a| a.checksum == checksum).collect())
    }

    /// Assets whose original file name matches exactly.
    pub async fn assets_by_name(&self, name: &str) -> Result<Vec<Asset>, Error> {
        let query = MetadataSearchRequest {
            original_file_name: Some(name.to_string()),
            ..Default::default()
        };
        let assets = self.search_assets(query).await?;
        Ok(assets
            .into_iter()
            .filter(|a| a.original_file_name == name)
            .collect())
    }

    /// Every visible asset, trashed ones included.
    pub async fn all_assets(&self) -> Result<Vec<Asset>, Error> {
        let query = MetadataSearchRequest {
            with_exif: true,
            is_visible: Some(true),
            with_deleted: Some(true),
            ..Default::default()
        };
        self.search_assets(query).await
    }

    // --- Albums ---

    pub async fn albums(&self) -> Result<Vec<Album>, Error> {
        self.get_json("/albums").await
    }

    pub async fn album_info(&self, album_id: &str, without_assets: bool) -> Result<Album, Error> {
        let path = format!(
            "/albums/{}?withoutAssets={without_assets}",
            encode(album_id)
        );
        self.get_json(&path).await
    }

    pub async fn create_album(
        &self,
        name: &str,
        description: &str,
        asset_ids: &[String],
    ) -> Result<Album, Error> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("album name is empty".into()));
        }
        if self.skip_in_dry_run(&Method::POST, "/albums") {
            return Ok(Album {
                id: DRY_RUN_ID.to_string(),
                album_name: name.to_string(),
                description: description.to_string(),
                owner_id: String::new(),
                shared: false,
                asset_count: asset_ids.len() as u64,
                created_at: None,
                assets: Vec::new(),
            });
        }
        let body = CreateAlbumRequest {
            album_name: name.to_string(),
            description: description.to_string(),
            asset_ids: asset_ids.to_vec(),
        };
        self.send_json(Method::POST, "/albums", &body).await
    }

    pub async fn add_assets_to_album(
        &self,
        album_id: &str,
        asset_ids: &[String],
    ) -> Result<Vec<BulkIdResponse>, Error> {
        let path = format!("/albums/{}/assets", encode(album_id));
        if self.skip_in_dry_run(&Method::PUT, &path) {
            return Ok(synthetic_bulk(asset_ids));
        }
        let body = BulkIdsRequest {
            ids: asset_ids.to_vec(),
        };
        self.send_json(Method::PUT, &path, &body).await
    }

    /// Albums that contain the given asset.
    pub async fn asset_albums(&self, asset_id: &str) -> Result<Vec<Album>, Error> {
        self.get_json(&format!("/albums?assetId={}", encode(asset_id)))
            .await
    }

    pub async fn delete_album(&self, album_id: &str) -> Result<(), Error> {
        let path = format!("/albums/{}", encode(album_id));
        if self.skip_in_dry_run(&Method::DELETE, &path) {
            return Ok(());
        }
        self.send_discard::<()>(Method::DELETE, &path, None).await
    }

    // --- Tags ---

    pub async fn tags(&self) -> Result<Vec<Tag>, Error> {
        self.get_json("/tags").await
    }

    /// Creates any missing tags (hierarchical `a/b` names allowed).
    pub async fn upsert_tags(&self, names: &[String]) -> Result<Vec<Tag>, Error> {
        if self.skip_in_dry_run(&Method::PUT, "/tags") {
            return Ok(names
                .iter()
                .map(|n| Tag {
                    id: DRY_RUN_ID.to_string(),
                    name: n.rsplit('/').next().unwrap_or(n).to_string(),
                    value: n.clone(),
                    parent_id: None,
                    color: None,
                })
                .collect());
        }
        let body = UpsertTagsRequest {
            tags: names.to_vec(),
        };
        self.send_json(Method::PUT, "/tags", &body).await
    }

    pub async fn tag_assets(
        &self,
        tag_id: &str,
        asset_ids: &[String],
    ) -> Result<Vec<BulkIdResponse>, Error> {
        let path = format!("/tags/{}/assets", encode(tag_id));
        if self.skip_in_dry_run(&Method::PUT, &path) {
            return Ok(synthetic_bulk(asset_ids));
        }
        let body = BulkIdsRequest {
            ids: asset_ids.to_vec(),
        };
        self.send_json(Method::PUT, &path, &body).await
    }

    pub async fn bulk_tag_assets(
        &self,
        tag_ids: &[String],
        asset_ids: &[String],
    ) -> Result<BulkTagAssetsResponse, Error> {
        if self.skip_in_dry_run(&Method::PUT, "/tags/assets") {
            return Ok(BulkTagAssetsResponse {
                count: (tag_ids.len() * asset_ids.len()) as u64,
            });
        }
        let body = BulkTagAssetsRequest {
            tag_ids: tag_ids.to_vec(),
            asset_ids: asset_ids.to_vec(),
        };
        self.send_json(Method::PUT, "/tags/assets", &body).await
    }

    // --- Stacks ---

    /// Stacks assets; the first id becomes the primary asset.
    pub async fn create_stack(&self, asset_ids: &[String]) -> Result<Stack, Error> {
        if asset_ids.len() < 2 {
            return Err(Error::InvalidArgument(
                "a stack needs at least two assets".into(),
            ));
        }
        if self.skip_in_dry_run(&Method::POST, "/stacks") {
            return Ok(Stack {
                id: DRY_RUN_ID.to_string(),
                primary_asset_id: asset_ids[0].clone(),
                assets: Vec::new(),
            });
        }
        let body = CreateStackRequest {
            asset_ids: asset_ids.to_vec(),
        };
        self.send_json(Method::POST, "/stacks", &body).await
    }

    // --- Jobs ---

    pub async fn jobs(&self) -> Result<AllJobStatus, Error> {
        self.get_json("/jobs").await
    }

    pub async fn send_job_command(
        &self,
        job_id: &str,
        command: JobCommand,
        force: bool,
    ) -> Result<JobStatus, Error> {
        let path = format!("/jobs/{}", encode(job_id));
        if self.skip_in_dry_run(&Method::PUT, &path) {
            return Ok(JobStatus::default());
        }
        let body = JobCommandRequest { command, force };
        self.send_json(Method::PUT, &path, &body).await
    }

    pub async fn create_job(&self, name: JobName) -> Result<(), Error> {
        if self.skip_in_dry_run(&Method::POST, "/jobs") {
            return Ok(());
        }
        let body = CreateJobRequest { name };
        self.send_discard(Method::POST, "/jobs", Some(&body)).await
    }
}

/// Turns a user-supplied server URL into the API base URL.
fn normalize_endpoint(endpoint: &str) -> Result<String, Error> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::InvalidArgument(format!(
            "endpoint must start with http:// or https://: {endpoint:?}"
        )));
    }
    if trimmed.ends_with("/api") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/api"))
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn synthetic_bulk(ids: &[String]) -> Vec<BulkIdResponse> {
    ids.iter()
        .map(|id| BulkIdResponse {
            id: id.clone(),
            success: true,
            error: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Throttle, serve, serve_stalled, serve_throttled};
    use crate::upload::UploadChecksum;

    fn client(url: &str) -> Client {
        Client::new(&ClientConfig::new(url, "test-key")).unwrap()
    }

    fn dry_client() -> Client {
        let mut config = ClientConfig::new("http://127.0.0.1:9", "test-key");
        config.dry_run = true;
        Client::new(&config).unwrap()
    }

    #[test]
    fn endpoint_normalization() {
        assert_eq!(
            normalize_endpoint("http://nas:2283").unwrap(),
            "http://nas:2283/api"
        );
        assert_eq!(
            normalize_endpoint("https://photos.example.com/api/").unwrap(),
            "https://photos.example.com/api"
        );
        assert!(normalize_endpoint("nas:2283").is_err());
    }

    #[test]
    fn invalid_api_key_rejected() {
        let err = Client::new(&ClientConfig::new("http://nas", "bad\nkey")).err();
        assert!(matches!(err, Some(Error::InvalidKey)));
    }

    #[tokio::test]
    async fn ping_sends_api_key() {
        let server = serve(vec![(200, r#"{"res":"pong"}"#)]).await;
        assert!(client(&server.url).ping().await.unwrap());

        let reqs = server.requests();
        assert_eq!(reqs[0].method, "GET");
        assert_eq!(reqs[0].path, "/api/server/ping");
        assert_eq!(reqs[0].header("x-api-key").as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn api_error_carries_message() {
        let server = serve(vec![(401, r#"{"message":"Invalid API key","statusCode":401}"#)]).await;
        let err = client(&server.url).validate_connection().await.unwrap_err();
        match err {
            Error::Api {
                status,
                message,
                endpoint,
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
                assert_eq!(endpoint, "/users/me");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn media_types_parsed() {
        let server = serve(vec![(
            200,
            r#"{"image":[".jpg",".heic"],"video":[".mov"],"sidecar":[".xmp"]}"#,
        )])
        .await;
        let media = client(&server.url).media_types().await.unwrap();
        assert_eq!(media.image.len(), 2);
        assert_eq!(media.sidecar, vec![".xmp"]);
    }

    #[tokio::test]
    async fn search_follows_next_page() {
        let page1 = r#"{"assets":{"total":2,"count":1,"items":[{"id":"a1","type":"IMAGE","originalFileName":"1.jpg","checksum":"c1"}],"nextPage":"2"}}"#;
        let page2 = r#"{"assets":{"total":2,"count":1,"items":[{"id":"a2","type":"VIDEO","originalFileName":"2.mov","checksum":"c2"}],"nextPage":null}}"#;
        let server = serve(vec![(200, page1), (200, page2)]).await;

        let assets = client(&server.url)
            .search_assets(MetadataSearchRequest::default())
            .await
            .unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1].id, "a2");

        let reqs = server.requests();
        assert_eq!(reqs.len(), 2);
        assert!(reqs[0].body_text().contains(r#""page":1"#));
        assert!(reqs[1].body_text().contains(r#""page":2"#));
        assert!(reqs[1].body_text().contains(r#""size":1000"#));
    }

    #[tokio::test]
    async fn assets_by_checksum_filters_exact() {
        let page = r#"{"assets":{"items":[
            {"id":"a1","type":"IMAGE","originalFileName":"1.jpg","checksum":"abc"},
            {"id":"a2","type":"IMAGE","originalFileName":"2.jpg","checksum":"abcd"}
        ],"nextPage":null}}"#;
        let server = serve(vec![(200, page)]).await;
        let assets = client(&server.url).assets_by_checksum("abc").await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, "a1");
    }

    #[tokio::test]
    async fn upload_streams_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_1.jpg");
        let sidecar = dir.path().join("IMG_1.xmp");
        std::fs::write(&photo, b"jpeg-bytes").unwrap();
        std::fs::write(&sidecar, b"<x:xmpmeta/>").unwrap();

        let server = serve(vec![(201, r#"{"id":"new-1","status":"created"}"#)]).await;
        let mut params = AssetUploadParams::from_path(&photo, "laptop").await.unwrap();
        params.sidecar_path = Some(sidecar);
        params.checksum = Some(UploadChecksum {
            algorithm: "sha256".into(),
            value: "deadbeef".into(),
        });

        let resp = client(&server.url).upload_asset(&params).await.unwrap();
        assert_eq!(resp.id, "new-1");
        assert_eq!(resp.status, AssetUploadStatus::Created);

        let reqs = server.requests();
        assert_eq!(reqs[0].method, "POST");
        assert_eq!(reqs[0].path, "/api/assets");
        let content_type = reqs[0].header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = reqs[0].body_text();
        assert!(body.contains(r#"name="assetData"; filename="IMG_1.jpg""#));
        assert!(body.contains(r#"name="sidecarData"; filename="IMG_1.xmp""#));
        assert!(body.contains("jpeg-bytes"));
        assert!(body.contains("<x:xmpmeta/>"));
        assert!(body.contains(r#"name="deviceId""#));
        assert!(body.contains("deadbeef"));
        assert!(!body.contains("livePhotoData"));
    }

    #[tokio::test]
    async fn upload_duplicate_status() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_2.jpg");
        std::fs::write(&photo, b"x").unwrap();

        let server = serve(vec![(200, r#"{"id":"old-7","status":"duplicate"}"#)]).await;
        let params = AssetUploadParams::from_path(&photo, "laptop").await.unwrap();
        let resp = client(&server.url).upload_asset(&params).await.unwrap();
        assert_eq!(resp.status, AssetUploadStatus::Duplicate);
        assert_eq!(resp.id, "old-7");
    }

    #[tokio::test]
    async fn slow_upload_outlives_call_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("big.mov");
        std::fs::write(&video, vec![7u8; 8 * 1024 * 1024]).unwrap();

        let throttle = Throttle {
            bytes: 512 * 1024,
            pause: Duration::from_millis(100),
        };
        let server = serve_throttled(
            vec![(201, r#"{"id":"big-1","status":"created"}"#)],
            Some(throttle),
        )
        .await;
        let mut config = ClientConfig::new(server.url.as_str(), "test-key");
        config.timeout = Duration::from_millis(300);
        let client = Client::new(&config).unwrap();

        let started = std::time::Instant::now();
        let params = AssetUploadParams::from_path(&video, "laptop").await.unwrap();
        let resp = client.upload_asset(&params).await.unwrap();
        assert_eq!(resp.id, "big-1");
        assert!(started.elapsed() > config.timeout);
        assert!(server.requests()[0].body.len() > 8 * 1024 * 1024);
    }

    #[tokio::test]
    async fn json_call_bounded_by_timeout() {
        let server = serve_stalled().await;
        let mut config = ClientConfig::new(server.url.as_str(), "test-key");
        config.timeout = Duration::from_millis(200);
        let err = Client::new(&config).unwrap().ping().await.unwrap_err();
        match err {
            Error::Http(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn replace_asset_puts_original() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_9.jpg");
        let sidecar = dir.path().join("IMG_9.xmp");
        std::fs::write(&photo, b"new-bytes").unwrap();
        std::fs::write(&sidecar, b"<x/>").unwrap();

        let server = serve(vec![(200, r#"{"id":"a-9","status":"replaced"}"#)]).await;
        let mut params = AssetUploadParams::from_path(&photo, "laptop").await.unwrap();
        params.sidecar_path = Some(sidecar);
        let resp = client(&server.url).replace_asset("a-9", &params).await.unwrap();
        assert_eq!(resp.status, AssetUploadStatus::Replaced);

        let reqs = server.requests();
        assert_eq!(reqs[0].method, "PUT");
        assert_eq!(reqs[0].path, "/api/assets/a-9/original");
        let body = reqs[0].body_text();
        assert!(body.contains(r#"name="assetData"; filename="IMG_9.jpg""#));
        assert!(body.contains(r#"name="sidecarData"; filename="IMG_9.xmp""#));
        assert!(body.contains("new-bytes"));
    }

    #[tokio::test]
    async fn replace_asset_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_9.jpg");
        std::fs::write(&photo, b"x").unwrap();
        let params = AssetUploadParams::from_path(&photo, "laptop").await.unwrap();

        let resp = dry_client().replace_asset("a-9", &params).await.unwrap();
        assert_eq!(resp.id, "a-9");
        assert_eq!(resp.status, AssetUploadStatus::Replaced);
    }

    #[tokio::test]
    async fn assets_by_name_filters_exact() {
        let page = r#"{"assets":{"items":[
            {"id":"a1","type":"IMAGE","originalFileName":"IMG_1.jpg","checksum":"c1"},
            {"id":"a2","type":"IMAGE","originalFileName":"IMG_1.jpg.xmp","checksum":"c2"}
        ],"nextPage":null}}"#;
        let server = serve(vec![(200, page)]).await;
        let assets = client(&server.url).assets_by_name("IMG_1.jpg").await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, "a1");
        assert!(
            server.requests()[0]
                .body_text()
                .contains(r#""originalFileName":"IMG_1.jpg""#)
        );
    }

    #[tokio::test]
    async fn all_assets_includes_deleted() {
        let page = r#"{"assets":{"items":[
            {"id":"a1","type":"IMAGE","originalFileName":"1.jpg","checksum":"c1"}
        ],"nextPage":null}}"#;
        let server = serve(vec![(200, page)]).await;
        let assets = client(&server.url).all_assets().await.unwrap();
        assert_eq!(assets.len(), 1);

        let body = server.requests()[0].body_text();
        assert!(body.contains(r#""withDeleted":true"#));
        assert!(body.contains(r#""isVisible":true"#));
        assert!(body.contains(r#""withExif":true"#));
    }

    #[tokio::test]
    async fn dry_run_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_3.jpg");
        std::fs::write(&photo, b"x").unwrap();

        let client = dry_client();
        assert!(client.is_dry_run());
        let params = AssetUploadParams::from_path(&photo, "laptop").await.unwrap();
        let resp = client.upload_asset(&params).await.unwrap();
        assert!(resp.id.starts_with("dry-run-"));

        let album = client.create_album("Trip", "", &[]).await.unwrap();
        assert_eq!(album.album_name, "Trip");
        let added = client
            .add_assets_to_album(&album.id, &["a".into(), "b".into()])
            .await
            .unwrap();
        assert!(added.iter().all(|r| r.success));
        client.delete_assets(&["a".into()], false).await.unwrap();
    }

    #[tokio::test]
    async fn create_stack_needs_two_ids() {
        let err = dry_client().create_stack(&["only".into()]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn delete_assets_sends_force() {
        let server = serve(vec![(204, "")]).await;
        client(&server.url)
            .delete_assets(&["a1".into(), "a2".into()], true)
            .await
            .unwrap();
        let reqs = server.requests();
        assert_eq!(reqs[0].method, "DELETE");
        assert_eq!(reqs[0].body_text(), r#"{"ids":["a1","a2"],"force":true}"#);
    }

    #[tokio::test]
    async fn add_assets_path_and_body() {
        let server = serve(vec![(200, r#"[{"id":"a1","success":true},{"id":"a2","success":false,"error":"duplicate"}]"#)]).await;
        let results = client(&server.url)
            .add_assets_to_album("album-1", &["a1".into(), "a2".into()])
            .await
            .unwrap();
        assert_eq!(results[1].error.as_deref(), Some("duplicate"));
        let reqs = server.requests();
        assert_eq!(reqs[0].method, "PUT");
        assert_eq!(reqs[0].path, "/api/albums/album-1/assets");
        assert_eq!(reqs[0].body_text(), r#"{"ids":["a1","a2"]}"#);
    }

    #[test]
    fn segment_encoding() {
        assert_eq!(encode("0b2c-4e_x.y"), "0b2c-4e_x.y");
        assert_eq!(encode("a/b c"), "a%2Fb%20c");
    }

    #[tokio::test]
    async fn download_writes_file() {
        let server = serve(vec![(200, "raw-image-data")]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let n = client(&server.url).download_asset("a1", &dest).await.unwrap();
        assert_eq!(n, 14);
        assert_eq!(std::fs::read(&dest).unwrap(), b"raw-image-data");
        assert_eq!(server.requests()[0].path, "/api/assets/a1/original");
    }

    #[tokio::test]
    async fn job_command_body() {
        let server = serve(vec![(200, r#"{"jobCounts":{"active":0},"queueStatus":{"isActive":false,"isPaused":true}}"#)]).await;
        let status = client(&server.url)
            .send_job_command("thumbnailGeneration", JobCommand::Pause, false)
            .await
            .unwrap();
        assert!(status.queue_status.is_paused);
        let reqs = server.requests();
        assert_eq!(reqs[0].path, "/api/jobs/thumbnailGeneration");
        assert_eq!(reqs[0].body_text(), r#"{"command":"pause","force":false}"#);
    }
}
