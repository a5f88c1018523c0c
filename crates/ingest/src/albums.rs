//! Batched album assignment after all uploads finish.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{info, warn};

use crate::error::IngestError;
use crate::server::AlbumDirectory;
use crate::types::AlbumResult;

/// Album name to the asset ids destined for it. Sets only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumAssignment {
    albums: BTreeMap<String, BTreeSet<String>>,
}

impl AlbumAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one asset under every given album name.
    pub fn register(&mut self, albums: &[String], asset_id: &str) {
        for album in albums {
            self.albums
                .entry(album.clone())
                .or_default()
                .insert(asset_id.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    pub fn asset_ids(&self, album: &str) -> Option<&BTreeSet<String>> {
        self.albums.get(album)
    }
}

/// Creates missing albums and adds assets with one call per album.
pub struct AlbumAssigner<'a, D: AlbumDirectory + ?Sized> {
    directory: &'a D,
}

impl<'a, D: AlbumDirectory + ?Sized> AlbumAssigner<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Assigns every album. Failures are recorded per album, never raised.
    pub async fn assign(&self, assignment: AlbumAssignment) -> Vec<AlbumResult> {
        if assignment.is_empty() {
            return Vec::new();
        }

        // Fetched once; lookup is by exact, case-sensitive name.
        let existing: Result<HashMap<String, String>, String> = self
            .directory
            .list_albums()
            .await
            .map(|albums| {
                let mut by_name = HashMap::new();
                for album in albums {
                    by_name.entry(album.name).or_insert(album.id);
                }
                by_name
            })
            .map_err(|e| e.to_string());

        let mut results = Vec::with_capacity(assignment.albums.len());
        for (name, ids) in assignment.albums {
            let ids: Vec<String> = ids.into_iter().collect();
            let result = match &existing {
                Ok(by_name) => self.assign_one(&name, by_name.get(&name).cloned(), &ids).await,
                Err(message) => failed(
                    &name,
                    None,
                    false,
                    ids.len(),
                    IngestError::AlbumCreation {
                        album: name.clone(),
                        message: format!("album lookup failed: {message}"),
                    },
                ),
            };
            results.push(result);
        }
        results
    }

    async fn assign_one(&self, name: &str, existing: Option<String>, ids: &[String]) -> AlbumResult {
        let (album_id, created) = match existing {
            Some(id) => (id, false),
            None => match self.directory.create_album(name).await {
                Ok(id) => {
                    info!(album = name, album_id = %id, "album created");
                    (id, true)
                }
                Err(e) => {
                    let err = IngestError::AlbumCreation {
                        album: name.to_string(),
                        message: e.to_string(),
                    };
                    return failed(name, None, false, ids.len(), err);
                }
            },
        };

        match self.directory.add_assets(&album_id, ids).await {
            Ok(added) => {
                info!(album = name, requested = ids.len(), added, "assets added to album");
                AlbumResult {
                    album: name.to_string(),
                    album_id: Some(album_id),
                    created,
                    assets: ids.len(),
                    error: None,
                }
            }
            Err(e) => {
                let err = IngestError::AlbumAssign {
                    album: name.to_string(),
                    message: e.to_string(),
                };
                failed(name, Some(album_id), created, ids.len(), err)
            }
        }
    }
}

fn failed(
    name: &str,
    album_id: Option<String>,
    created: bool,
    assets: usize,
    err: IngestError,
) -> AlbumResult {
    warn!(album = name, error = %err, "album assignment failed");
    AlbumResult {
        album: name.to_string(),
        album_id,
        created,
        assets,
        error: Some(err.to_string()),
    }
}
