use immich_protocol::Tag;

use super::Context;
use super::album::render_bulk;
use crate::cli::TagCmd;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: TagCmd) -> anyhow::Result<()> {
    let client = &ctx.client;
    match cmd {
        TagCmd::List => {
            let tags = client.tags().await?;
            emit(ctx.json, &tags, |tags| render_tags("Found", tags))?;
        }
        TagCmd::Create { tags } => {
            let created = client.upsert_tags(&tags).await?;
            emit(ctx.json, &created, |tags| {
                render_tags("Created or updated", tags)
            })?;
        }
        TagCmd::TagAssets { tag_id, asset_ids } => {
            let results = client.tag_assets(&tag_id, &asset_ids).await?;
            emit(ctx.json, &results, |r| render_bulk("tagged", r))?;
        }
        TagCmd::BulkTagAssets { tag_ids, asset_ids } => {
            let result = client.bulk_tag_assets(&tag_ids, &asset_ids).await?;
            emit(ctx.json, &result, |r| format!("Tagged {} assets.", r.count))?;
        }
    }
    Ok(())
}

fn render_tags(lead: &str, tags: &[Tag]) -> String {
    let mut out = format!("{lead} {} tags.\n", tags.len());
    for tag in tags {
        let path = if tag.value.is_empty() { &tag.name } else { &tag.value };
        out.push_str(&format!("{} - {path}\n", tag.id));
    }
    out
}
