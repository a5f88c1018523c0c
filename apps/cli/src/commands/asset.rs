use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::bail;
use immich_client::AssetUploadParams;
use immich_ingest::{
    DEFAULT_CONCURRENCY, ImmichServer, IngestOptions, Ingestion, default_device_id,
};
use immich_protocol::{Asset, BulkUpdateAssetsRequest, MetadataSearchRequest, UpdateAssetRequest};
use tracing::warn;

use super::{Context, print_json};
use crate::adapter::ClientServer;
use crate::cli::{AssetCmd, ChangeArgs, ListArgs, UploadArgs};
use crate::output::{emit, render_report};
use crate::progress;

pub async fn run(ctx: &Context, cmd: AssetCmd) -> anyhow::Result<ExitCode> {
    let client = &ctx.client;
    match cmd {
        AssetCmd::List(args) => {
            let assets = client.search_assets(search_request(&args)).await?;
            emit(ctx.json, &assets, |assets| render_assets(assets))?;
        }
        AssetCmd::Info { asset_id } => print_json(&client.asset_info(&asset_id).await?)?,
        AssetCmd::Download { asset_id, output } => {
            let dest = match output {
                Some(path) => path,
                None => PathBuf::from(client.asset_info(&asset_id).await?.original_file_name),
            };
            let bytes = client.download_asset(&asset_id, &dest).await?;
            println!("Asset downloaded to {} ({bytes} bytes).", dest.display());
        }
        AssetCmd::Upload(args) => return upload(ctx, args).await,
        AssetCmd::Replace {
            asset_id,
            path,
            sidecar,
            device_id,
        } => {
            let device_id = device_id
                .or_else(|| ctx.config.device_id.clone())
                .unwrap_or_else(default_device_id);
            let mut params = AssetUploadParams::from_path(&path, &device_id).await?;
            params.sidecar_path = sidecar;
            let resp = client.replace_asset(&asset_id, &params).await?;
            if !ctx.json {
                println!("Asset {} replaced from {}.", resp.id, path.display());
            }
            print_json(&resp)?;
        }
        AssetCmd::Delete { asset_ids, force } => {
            client.delete_assets(&asset_ids, force).await?;
            println!("Deleted {} assets.", asset_ids.len());
        }
        AssetCmd::Update { asset_id, changes } => {
            let changes = update_request(&changes);
            if changes.is_empty() {
                bail!("nothing to update: pass at least one change flag");
            }
            let asset = client.update_asset(&asset_id, &changes).await?;
            if !ctx.json {
                println!("Asset updated.");
            }
            print_json(&asset)?;
        }
        AssetCmd::BatchUpdate {
            asset_ids,
            changes,
            stack_parent_id,
        } => {
            let changes = update_request(&changes);
            if changes.is_empty() && stack_parent_id.is_none() {
                bail!("nothing to update: pass a change flag or --stack-parent-id");
            }
            if !changes.is_empty() {
                let req = BulkUpdateAssetsRequest {
                    ids: asset_ids.clone(),
                    changes,
                };
                client.update_assets(&req).await?;
                println!("Updated {} assets.", asset_ids.len());
            }
            if let Some(parent) = stack_parent_id {
                let stack = client.create_stack(&stack_ids(&parent, &asset_ids)).await?;
                println!("Stack {} created with primary asset {parent}.", stack.id);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn upload(ctx: &Context, args: UploadArgs) -> anyhow::Result<ExitCode> {
    let server: Arc<dyn ImmichServer> = Arc::new(ClientServer::new(ctx.client.clone()));
    let options = IngestOptions {
        recursive: args.recursive,
        albums: args.albums,
        sidecar_path: args.sidecar,
        concurrency: args
            .concurrency
            .or(ctx.config.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY),
        favorite: args.favorite,
        archived: args.archived,
        device_id: args
            .device_id
            .or_else(|| ctx.config.device_id.clone())
            .unwrap_or_else(default_device_id),
        ..Default::default()
    };

    let mut ingestion = Ingestion::new(server, options);
    let cancel = ingestion.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, waiting for in-flight uploads");
            cancel.cancel();
        }
    });
    let show_bar = !ctx.json && std::io::stderr().is_terminal();
    let bar = ingestion
        .take_events()
        .map(|events| progress::spawn(events, show_bar));

    let result = ingestion.run(&args.path).await;
    interrupt.abort();
    if let Some(bar) = bar {
        let _ = bar.await;
    }
    let report = result?;

    if ctx.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", render_report(&report, ctx.verbose));
    }
    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn search_request(args: &ListArgs) -> MetadataSearchRequest {
    MetadataSearchRequest {
        with_exif: !args.without_exif,
        with_deleted: args.with_deleted.then_some(true),
        is_archived: if args.with_archived { None } else { Some(false) },
        taken_before: args.taken_before.clone(),
        taken_after: args.taken_after.clone(),
        model: args.model.clone(),
        make: args.make.clone(),
        checksum: args.checksum.clone(),
        original_file_name: args.original_file_name.clone(),
        ..Default::default()
    }
}

fn update_request(args: &ChangeArgs) -> UpdateAssetRequest {
    UpdateAssetRequest {
        is_favorite: args.favorite,
        is_archived: args.archived,
        description: args.description.clone(),
        latitude: args.latitude,
        longitude: args.longitude,
        rating: args.rating,
        ..Default::default()
    }
}

/// Parent first, then the other ids without repeats.
fn stack_ids(parent: &str, ids: &[String]) -> Vec<String> {
    let mut out = vec![parent.to_string()];
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

fn render_assets(assets: &[Asset]) -> String {
    let mut out = format!("Found {} assets.\n", assets.len());
    for asset in assets {
        out.push_str(&format!(
            "{} - {} - {}\n",
            asset.id, asset.original_file_name, asset.file_created_at
        ));
    }
    out
}
