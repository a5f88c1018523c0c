use immich_protocol::{MediaKind, MediaTypes};
use serde_json::json;

use super::{Context, print_json};
use crate::cli::ServerCmd;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: ServerCmd) -> anyhow::Result<()> {
    let client = &ctx.client;
    match cmd {
        ServerCmd::Ping => {
            let available = client.ping().await?;
            emit(ctx.json, &json!({ "available": available }), |_| {
                if available {
                    "Server is available.".into()
                } else {
                    "Server is not available.".into()
                }
            })?;
        }
        ServerCmd::Stats => print_json(&client.server_statistics().await?)?,
        ServerCmd::AssetStats => print_json(&client.asset_statistics().await?)?,
        ServerCmd::MediaTypes => {
            let types = client.media_types().await?;
            emit(ctx.json, &types, render_media_types)?;
        }
        ServerCmd::About => print_json(&client.about().await?)?,
        ServerCmd::CheckExtension { extension } => {
            let types = client.media_types().await?;
            let kind = types.kind_of(&extension);
            emit(ctx.json, &json!({ "extension": extension, "kind": kind }), |_| {
                extension_verdict(&extension, kind)
            })?;
        }
    }
    Ok(())
}

fn render_media_types(types: &MediaTypes) -> String {
    format!(
        "image:   {}\nvideo:   {}\nsidecar: {}",
        types.image.join(" "),
        types.video.join(" "),
        types.sidecar.join(" ")
    )
}

fn extension_verdict(extension: &str, kind: Option<MediaKind>) -> String {
    match kind {
        Some(MediaKind::Image) | Some(MediaKind::Video) => {
            format!("Extension '{extension}' is supported.")
        }
        Some(MediaKind::Sidecar) => {
            format!("Extension '{extension}' is ignored (sidecar, uploaded with its asset).")
        }
        None => format!("Extension '{extension}' is not supported."),
    }
}
