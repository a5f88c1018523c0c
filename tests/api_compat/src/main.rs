fn main() {
    println!("Run `cargo test -p api-compat` to check API payload compatibility.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use immich_protocol as api;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes numbers so that `65` and `65.0` compare as equal.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a server payload, re-serializes it, and compares the JSON
    /// values. Fields the types do not model would be lost and fail here.
    fn roundtrip_test<T>(name: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        if !fixtures_dir().join(name).exists() {
            eprintln!("SKIP: fixture {name} not captured");
            return None;
        }
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  rust:   {reserialized}"
        );
        Some(parsed)
    }

    // --- Assets ---

    #[test]
    fn fixture_asset() {
        let Some(asset) = roundtrip_test::<api::Asset>("asset.json") else {
            return;
        };
        assert_eq!(asset.asset_type, api::AssetType::Image);
        assert!(asset.live_photo_video_id.is_some());
        assert_eq!(asset.exif_info.and_then(|e| e.rating), Some(4));
    }

    #[test]
    fn fixture_search_response() {
        let Some(resp) = roundtrip_test::<api::SearchResponse>("search_response.json") else {
            return;
        };
        assert_eq!(resp.assets.items.len(), 1);
        assert_eq!(resp.assets.next_page.as_deref(), Some("2"));
    }

    #[test]
    fn fixture_upload_response() {
        let Some(resp) = roundtrip_test::<api::AssetUploadResponse>("upload_response.json") else {
            return;
        };
        assert_eq!(resp.status, api::AssetUploadStatus::Duplicate);
    }

    #[test]
    fn fixture_bulk_ids() {
        roundtrip_test::<Vec<api::BulkIdResponse>>("bulk_ids.json");
    }

    // --- Albums and tags ---

    #[test]
    fn fixture_album() {
        roundtrip_test::<api::Album>("album.json");
    }

    #[test]
    fn fixture_tags() {
        let Some(tags) = roundtrip_test::<Vec<api::Tag>>("tags.json") else {
            return;
        };
        assert_eq!(tags[1].parent_id.as_deref(), Some("t-1"));
    }

    // --- Server ---

    #[test]
    fn fixture_ping() {
        let Some(ping) = roundtrip_test::<api::PingResponse>("ping.json") else {
            return;
        };
        assert!(ping.is_pong());
    }

    #[test]
    fn fixture_server_statistics() {
        roundtrip_test::<api::ServerStatistics>("server_statistics.json");
    }

    #[test]
    fn fixture_asset_statistics() {
        roundtrip_test::<api::AssetStatistics>("asset_statistics.json");
    }

    #[test]
    fn fixture_media_types() {
        let Some(types) = roundtrip_test::<api::MediaTypes>("media_types.json") else {
            return;
        };
        assert_eq!(types.kind_of("HEIC"), Some(api::MediaKind::Image));
        assert_eq!(types.kind_of(".xmp"), Some(api::MediaKind::Sidecar));
    }

    #[test]
    fn fixture_server_about() {
        let Some(about) = roundtrip_test::<api::ServerAbout>("server_about.json") else {
            return;
        };
        assert_eq!(about.version, "v1.119.1");
        assert!(about.extra.contains_key("ffmpeg"));
    }

    #[test]
    fn fixture_user() {
        roundtrip_test::<api::User>("user.json");
    }

    // --- Jobs ---

    #[test]
    fn fixture_jobs() {
        let Some(jobs) = roundtrip_test::<api::AllJobStatus>("jobs.json") else {
            return;
        };
        assert!(jobs["thumbnailGeneration"].queue_status.is_active);
    }
}
