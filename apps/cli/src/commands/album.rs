use immich_protocol::{Album, Asset, BulkIdResponse, MetadataSearchRequest};

use super::{Context, print_json};
use crate::cli::AlbumCmd;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: AlbumCmd) -> anyhow::Result<()> {
    let client = &ctx.client;
    match cmd {
        AlbumCmd::List => {
            let albums = client.albums().await?;
            emit(ctx.json, &albums, |albums| render_albums("Found", albums))?;
        }
        AlbumCmd::Info {
            album_id,
            without_assets,
        } => print_json(&client.album_info(&album_id, without_assets).await?)?,
        AlbumCmd::Create {
            album_name,
            description,
            asset_ids,
        } => {
            let album = client
                .create_album(&album_name, &description, &asset_ids)
                .await?;
            emit(ctx.json, &album, |a| format!("Album created with ID: {}", a.id))?;
        }
        AlbumCmd::AddAssets {
            album_id,
            asset_ids,
        } => {
            let results = client.add_assets_to_album(&album_id, &asset_ids).await?;
            emit(ctx.json, &results, |r| render_bulk("added", r))?;
        }
        AlbumCmd::Delete { album_id } => {
            client.delete_album(&album_id).await?;
            println!("Album deleted.");
        }
        AlbumCmd::AssetAlbums { asset_id } => {
            let albums = client.asset_albums(&asset_id).await?;
            emit(ctx.json, &albums, |albums| {
                render_albums("Asset belongs to", albums)
            })?;
        }
        AlbumCmd::Organize {
            filename_pattern,
            album_name,
        } => organize(ctx, &filename_pattern, album_name).await?,
    }
    Ok(())
}

/// Gathers assets whose file name contains `pattern` into one album,
/// creating it when no album has that exact name.
async fn organize(ctx: &Context, pattern: &str, album_name: Option<String>) -> anyhow::Result<()> {
    let client = &ctx.client;
    let album_name = album_name.unwrap_or_else(|| default_album_name(pattern));

    let query = MetadataSearchRequest {
        original_file_name: Some(pattern.to_string()),
        ..Default::default()
    };
    let ids = matching_ids(&client.search_assets(query).await?, pattern);
    if ids.is_empty() {
        println!("No assets found with the filename containing '{pattern}'.");
        return Ok(());
    }
    println!("Found {} assets with filename containing '{pattern}'.", ids.len());

    let existing = client
        .albums()
        .await?
        .into_iter()
        .find(|a| a.album_name == album_name);
    match existing {
        Some(album) => {
            let results = client.add_assets_to_album(&album.id, &ids).await?;
            let added = results.iter().filter(|r| r.success).count();
            println!("Added {added} assets to album '{album_name}' (ID: {}).", album.id);
            for failed in results.iter().filter(|r| !r.success) {
                println!(
                    "Failed to add asset {}: {}.",
                    failed.id,
                    failed.error.as_deref().unwrap_or("unknown")
                );
            }
        }
        None => {
            let album = client.create_album(&album_name, "", &ids).await?;
            println!(
                "Created album '{album_name}' (ID: {}) with {} assets.",
                album.id,
                ids.len()
            );
        }
    }
    Ok(())
}

fn default_album_name(pattern: &str) -> String {
    pattern.replace('_', " ")
}

/// The server matches loosely; keep only names containing the pattern.
fn matching_ids(assets: &[Asset], pattern: &str) -> Vec<String> {
    let needle = pattern.to_lowercase();
    let mut ids: Vec<String> = Vec::new();
    for asset in assets {
        if asset.original_file_name.to_lowercase().contains(&needle) && !ids.contains(&asset.id) {
            ids.push(asset.id.clone());
        }
    }
    ids
}

fn render_albums(lead: &str, albums: &[Album]) -> String {
    let mut out = format!("{lead} {} albums.\n", albums.len());
    for album in albums {
        out.push_str(&format!(
            "{} - {} ({} assets)\n",
            album.id, album.album_name, album.asset_count
        ));
    }
    out
}

pub fn render_bulk(verb: &str, results: &[BulkIdResponse]) -> String {
    let mut out = String::new();
    for item in results {
        if item.success {
            out.push_str(&format!("Asset {} {verb}.\n", item.id));
        } else {
            out.push_str(&format!(
                "Asset {} not {verb}: {}\n",
                item.id,
                item.error.as_deref().unwrap_or("unknown")
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, name: &str) -> Asset {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "type": "IMAGE",
            "originalFileName": name,
        }))
        .unwrap()
    }

    #[test]
    fn album_name_from_pattern() {
        assert_eq!(default_album_name("Summer_Trip_2024"), "Summer Trip 2024");
    }

    #[test]
    fn only_real_matches_are_kept() {
        let assets = vec![
            asset("1", "Summer_Trip_001.jpg"),
            asset("2", "summer_trip_002.JPG"),
            asset("3", "Winter.jpg"),
            asset("1", "Summer_Trip_001.jpg"),
        ];
        assert_eq!(matching_ids(&assets, "Summer_Trip"), vec!["1", "2"]);
    }

    #[test]
    fn bulk_results() {
        let results = vec![
            BulkIdResponse {
                id: "a".into(),
                success: true,
                error: None,
            },
            BulkIdResponse {
                id: "b".into(),
                success: false,
                error: Some("duplicate".into()),
            },
        ];
        assert_eq!(
            render_bulk("added", &results),
            "Asset a added.\nAsset b not added: duplicate\n"
        );
    }
}
