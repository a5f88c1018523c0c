//! Media classification and companion pairing.
//!
//! Entries are buffered one directory at a time. When the directory changes
//! the buffered group is classified and folded into upload bundles.

use std::collections::HashMap;
use std::path::PathBuf;

use immich_protocol::MediaKind;
use tracing::warn;

use crate::expand::EntryError;
use crate::types::{AssetBundle, ClassifiedItem, FileEntry, Role, SkipReason, SupportedMedia};

/// Verdict for one entry of a directory group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Item(ClassifiedItem),
    Skipped { entry: FileEntry, reason: SkipReason },
}

/// Unit of work handed to the pipeline, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Upload(AssetBundle),
    Skip { entry: FileEntry, reason: SkipReason },
    /// Found by the walk but could not be inspected.
    Unreadable {
        source_path: PathBuf,
        relative_path: String,
        error: String,
    },
}

impl Dispatch {
    fn relative_path(&self) -> &str {
        match self {
            Self::Upload(bundle) => &bundle.primary.relative_path,
            Self::Skip { entry, .. } => &entry.relative_path,
            Self::Unreadable { relative_path, .. } => relative_path,
        }
    }
}

impl From<EntryError> for Dispatch {
    fn from(err: EntryError) -> Self {
        Self::Unreadable {
            source_path: err.source_path,
            relative_path: err.relative_path,
            error: err.error.to_string(),
        }
    }
}

/// Classifies entries against the server's supported extensions.
pub struct MediaClassifier {
    media: SupportedMedia,
    current_dir: Option<String>,
    pending: Vec<FileEntry>,
    /// Unreadable entries of the buffered group, keyed by how many entries
    /// had been buffered when each arrived.
    unreadable: Vec<(usize, Dispatch)>,
}

impl MediaClassifier {
    pub fn new(media: SupportedMedia) -> Self {
        Self {
            media,
            current_dir: None,
            pending: Vec::new(),
            unreadable: Vec::new(),
        }
    }

    /// Buffers an entry. Returns the previous directory's work once the
    /// stream moves on to another directory.
    pub fn push(&mut self, entry: FileEntry) -> Vec<Dispatch> {
        let dir = entry.dir().to_string();
        let out = if self.current_dir.as_deref() != Some(dir.as_str()) {
            self.current_dir = Some(dir);
            self.flush()
        } else {
            Vec::new()
        };
        self.pending.push(entry);
        out
    }

    /// Queues an entry that could not be inspected so it is handed out at
    /// its discovery position relative to the buffered group.
    pub fn push_unreadable(&mut self, err: EntryError) -> Vec<Dispatch> {
        if self.pending.is_empty() {
            return vec![err.into()];
        }
        self.unreadable.push((self.pending.len(), err.into()));
        Vec::new()
    }

    /// Classifies whatever is still buffered.
    pub fn finish(&mut self) -> Vec<Dispatch> {
        self.current_dir = None;
        self.flush()
    }

    fn flush(&mut self) -> Vec<Dispatch> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let group = std::mem::take(&mut self.pending);
        let position: HashMap<String, usize> = group
            .iter()
            .enumerate()
            .map(|(i, e)| (e.relative_path.clone(), i))
            .collect();
        let units = bundle(self.classify(group));

        let mut unreadable = std::mem::take(&mut self.unreadable).into_iter().peekable();
        let mut out = Vec::with_capacity(units.len());
        for unit in units {
            let at = position.get(unit.relative_path()).copied().unwrap_or(usize::MAX);
            while let Some((_, failed)) = unreadable.next_if(|(offset, _)| *offset <= at) {
                out.push(failed);
            }
            out.push(unit);
        }
        out.extend(unreadable.map(|(_, failed)| failed));
        out
    }

    /// Assigns a role to every entry of one directory.
    ///
    /// The result has the same length and order as the input.
    pub fn classify(&self, entries: Vec<FileEntry>) -> Vec<Verdict> {
        let kinds: Vec<Option<MediaKind>> = entries
            .iter()
            .map(|e| e.extension().and_then(|ext| self.media.kind_of(&ext)))
            .collect();

        // Images first: they anchor live-photo pairing.
        let mut image_by_stem: HashMap<&str, usize> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if kinds[i] == Some(MediaKind::Image) {
                image_by_stem.entry(entry.stem()).or_insert(i);
            }
        }

        let mut roles: Vec<Option<(Role, Option<usize>)>> = vec![None; entries.len()];
        let mut has_motion = vec![false; entries.len()];
        for (i, entry) in entries.iter().enumerate() {
            match kinds[i] {
                Some(MediaKind::Image) => roles[i] = Some((Role::PrimaryAsset, None)),
                Some(MediaKind::Video) => {
                    roles[i] = match image_by_stem.get(entry.stem()) {
                        Some(&img) if !has_motion[img] => {
                            has_motion[img] = true;
                            Some((Role::LivePhotoMotion, Some(img)))
                        }
                        _ => Some((Role::PrimaryAsset, None)),
                    };
                }
                _ => {}
            }
        }

        // Sidecars match `<name>.<ext>.xmp` first, then `<stem>.xmp`.
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        let mut by_stem: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if matches!(roles[i], Some((Role::PrimaryAsset, _))) {
                by_name.insert(entry.file_name(), i);
                by_stem.entry(entry.stem()).or_default().push(i);
            }
        }
        let mut has_sidecar = vec![false; entries.len()];
        for (i, entry) in entries.iter().enumerate() {
            if kinds[i] != Some(MediaKind::Sidecar) {
                continue;
            }
            let key = entry.stem();
            let target = by_name
                .get(key)
                .copied()
                .filter(|&p| !has_sidecar[p])
                .or_else(|| {
                    by_stem
                        .get(key)
                        .and_then(|c| c.iter().copied().find(|&p| !has_sidecar[p]))
                });
            if let Some(p) = target {
                has_sidecar[p] = true;
                roles[i] = Some((Role::Sidecar, Some(p)));
            }
        }

        let primary_paths: Vec<String> = entries.iter().map(|e| e.relative_path.clone()).collect();
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| match roles[i] {
                Some((role, primary)) => Verdict::Item(ClassifiedItem {
                    entry,
                    role,
                    primary: primary.map(|p| primary_paths[p].clone()),
                }),
                None if kinds[i] == Some(MediaKind::Sidecar) => {
                    warn!(file = %entry.relative_path, "sidecar has no matching asset, skipping");
                    Verdict::Skipped {
                        entry,
                        reason: SkipReason::OrphanedSidecar,
                    }
                }
                None => {
                    let reason = SkipReason::UnsupportedMediaType(entry.extension());
                    Verdict::Skipped { entry, reason }
                }
            })
            .collect()
    }
}

/// Folds companions into their primary's bundle.
///
/// Each primary and each skipped entry yields one dispatch at its own
/// position; companions yield none.
pub fn bundle(verdicts: Vec<Verdict>) -> Vec<Dispatch> {
    let mut out: Vec<Dispatch> = Vec::with_capacity(verdicts.len());
    let mut slot_by_path: HashMap<String, usize> = HashMap::new();
    let mut companions = Vec::new();

    for verdict in verdicts {
        match verdict {
            Verdict::Item(item) if item.role == Role::PrimaryAsset => {
                slot_by_path.insert(item.entry.relative_path.clone(), out.len());
                out.push(Dispatch::Upload(AssetBundle::single(item.entry)));
            }
            Verdict::Item(item) => companions.push(item),
            Verdict::Skipped { entry, reason } => out.push(Dispatch::Skip { entry, reason }),
        }
    }

    for item in companions {
        let slot = item.primary.as_ref().and_then(|p| slot_by_path.get(p));
        let Some(Dispatch::Upload(bundle)) = slot.and_then(|&s| out.get_mut(s)) else {
            warn!(file = %item.entry.relative_path, "companion lost its primary, skipping");
            continue;
        };
        match item.role {
            Role::Sidecar => bundle.sidecar = Some(item.entry),
            Role::LivePhotoMotion => bundle.live_photo = Some(item.entry),
            Role::PrimaryAsset => {}
        }
    }

    out
}
