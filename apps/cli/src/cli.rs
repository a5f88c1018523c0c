use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use immich_protocol::{JobCommand, JobName};

#[derive(Debug, Parser)]
#[command(name = "immich", version)]
#[command(about = "Command-line client for an Immich server", long_about = None)]
pub struct Cli {
    /// Server URL, e.g. `https://photos.example.com`.
    #[arg(short, long, env = "IMMICH_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    #[arg(short = 'k', long, env = "IMMICH_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Accept invalid TLS certificates.
    #[arg(long, global = true)]
    pub no_verify_ssl: bool,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 60.0, global = true)]
    pub timeout: f64,

    /// Log mutating requests instead of sending them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Server status and capabilities
    #[command(subcommand)]
    Server(ServerCmd),
    /// Upload, search and edit assets
    #[command(subcommand)]
    Asset(AssetCmd),
    #[command(subcommand)]
    Album(AlbumCmd),
    #[command(subcommand)]
    Tag(TagCmd),
    /// Background job queues
    #[command(subcommand)]
    Job(JobCmd),
    /// Saved defaults
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(Debug, Subcommand)]
pub enum ServerCmd {
    /// Check that the server answers
    Ping,
    Stats,
    /// Asset counts for the current user
    AssetStats,
    /// Supported file extensions
    MediaTypes,
    About,
    /// Tell whether a file extension can be uploaded
    CheckExtension { extension: String },
}

#[derive(Debug, Subcommand)]
pub enum AssetCmd {
    /// Search assets by metadata
    List(ListArgs),
    Info { asset_id: String },
    /// Download the original file
    Download {
        asset_id: String,
        /// Output path; defaults to the original file name.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a file, a directory or an archive
    Upload(UploadArgs),
    /// Replace the original file of an existing asset
    Replace {
        asset_id: String,
        path: PathBuf,
        #[arg(long)]
        sidecar: Option<PathBuf>,
        #[arg(long)]
        device_id: Option<String>,
    },
    Delete {
        #[arg(required = true)]
        asset_ids: Vec<String>,
        /// Delete permanently instead of moving to the trash.
        #[arg(long)]
        force: bool,
    },
    Update {
        asset_id: String,
        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Apply the same changes to many assets
    BatchUpdate {
        #[arg(required = true)]
        asset_ids: Vec<String>,
        #[command(flatten)]
        changes: ChangeArgs,
        /// Stack the assets under this primary asset.
        #[arg(long)]
        stack_parent_id: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub without_exif: bool,
    #[arg(long)]
    pub with_deleted: bool,
    #[arg(long)]
    pub with_archived: bool,
    /// ISO 8601 date or timestamp.
    #[arg(long)]
    pub taken_before: Option<String>,
    #[arg(long)]
    pub taken_after: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub make: Option<String>,
    #[arg(long)]
    pub checksum: Option<String>,
    #[arg(long)]
    pub original_file_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub path: PathBuf,
    /// Descend into subdirectories.
    #[arg(short, long)]
    pub recursive: bool,
    /// Add every uploaded asset to this album. Repeatable.
    #[arg(long = "album")]
    pub albums: Vec<String>,
    /// Sidecar for a single-file upload.
    #[arg(long)]
    pub sidecar: Option<PathBuf>,
    /// Concurrent uploads.
    #[arg(short, long)]
    pub concurrency: Option<usize>,
    #[arg(long)]
    pub favorite: bool,
    #[arg(long)]
    pub archived: bool,
    #[arg(long)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ChangeArgs {
    #[arg(long)]
    pub favorite: Option<bool>,
    #[arg(long)]
    pub archived: Option<bool>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    /// Star rating, 0 to 5.
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=5))]
    pub rating: Option<i32>,
}

#[derive(Debug, Subcommand)]
pub enum AlbumCmd {
    List,
    Info {
        album_id: String,
        #[arg(long)]
        without_assets: bool,
    },
    Create {
        album_name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Asset to add right away. Repeatable.
        #[arg(long = "asset-id")]
        asset_ids: Vec<String>,
    },
    AddAssets {
        album_id: String,
        #[arg(required = true)]
        asset_ids: Vec<String>,
    },
    Delete { album_id: String },
    /// Albums that contain an asset
    AssetAlbums { asset_id: String },
    /// Collect assets whose file name contains a pattern into an album
    Organize {
        filename_pattern: String,
        /// Defaults to the pattern with underscores replaced by spaces.
        #[arg(long)]
        album_name: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TagCmd {
    List,
    /// Create tags; `parent/child` creates the hierarchy
    Create {
        #[arg(required = true)]
        tags: Vec<String>,
    },
    TagAssets {
        tag_id: String,
        #[arg(required = true)]
        asset_ids: Vec<String>,
    },
    /// Apply several tags to several assets
    BulkTagAssets {
        #[arg(long = "tag-id", required = true)]
        tag_ids: Vec<String>,
        #[arg(required = true)]
        asset_ids: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum JobCmd {
    List,
    /// Start, pause, resume, empty or clear-failed a queue
    Command {
        job_id: String,
        command: JobCommand,
        #[arg(long)]
        force: bool,
    },
    /// Queue a manual job (person-cleanup, tag-cleanup, user-cleanup)
    Create { name: JobName },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    /// Print the config file location and contents
    Show,
    /// Save the endpoint and API key given on the command line, plus
    /// upload defaults
    Save {
        #[arg(long)]
        device_id: Option<String>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
}
