use std::fmt::Write;

use immich_protocol::AllJobStatus;

use super::{Context, print_json};
use crate::cli::JobCmd;
use crate::output::emit;

pub async fn run(ctx: &Context, cmd: JobCmd) -> anyhow::Result<()> {
    let client = &ctx.client;
    match cmd {
        JobCmd::List => {
            let jobs = client.jobs().await?;
            emit(ctx.json, &jobs, render_jobs)?;
        }
        JobCmd::Command {
            job_id,
            command,
            force,
        } => {
            let status = client.send_job_command(&job_id, command, force).await?;
            if !ctx.json {
                println!("Command {command} sent to job {job_id}.");
            }
            print_json(&status)?;
        }
        JobCmd::Create { name } => {
            client.create_job(name).await?;
            println!("Job {name} created.");
        }
    }
    Ok(())
}

fn render_jobs(jobs: &AllJobStatus) -> String {
    let mut out = format!("Found {} jobs.\n", jobs.len());
    for (id, job) in jobs {
        let c = job.job_counts;
        let q = job.queue_status;
        let _ = writeln!(
            out,
            "{id}: active {} completed {} failed {} delayed {} waiting {} paused {}{}{}",
            c.active,
            c.completed,
            c.failed,
            c.delayed,
            c.waiting,
            c.paused,
            if q.is_active { " [running]" } else { "" },
            if q.is_paused { " [paused]" } else { "" },
        );
    }
    out
}
