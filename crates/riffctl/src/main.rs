//! # riffctl
//! Terminal front end for KC-Riff: list, download, remove and update models through the
//! native binding or the KC-Riff service.

mod cli;
mod render;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use indicatif::{MultiProgress, ProgressBar};
use kcriff::{
    BatchError, BatchEvent, BatchSelection, DownloadEvent, DownloadOutcome, ModelManager,
    PollerHandle, RiffConfig, RiffError,
};
use std::collections::HashMap;

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = RiffConfig::load()?;
    cli.apply_to(&mut config);

    let manager = ModelManager::connect(config).await;
    if let Some(reason) = manager.unavailable_reason() {
        eprintln!("❌ {}", "KC-Riff is not available".red());
        for attempt in &reason.attempts {
            eprintln!("   {} {}", attempt.candidate.dimmed(), attempt.reason);
        }
        eprintln!("   {} {}", reason.endpoint.dimmed(), reason.endpoint_reason);
        std::process::exit(2);
    }

    let ok = match cli.command {
        Commands::List {
            recommended,
            downloaded,
        } => list(&manager, recommended, downloaded).await?,
        Commands::Download { name } => download(&manager, &name).await?,
        Commands::DownloadAll { names } => download_all(&manager, names).await?,
        Commands::Remove { name } => {
            let ack = manager.remove_model(&name).await?;
            println!(
                "🗑  {} {}",
                name.cyan(),
                ack.message.or(ack.status).unwrap_or_else(|| "removed".into())
            );
            true
        }
        Commands::Updates { apply } => updates(&manager, apply).await?,
        Commands::Health => {
            let health = manager.health_check().await?;
            let version = health.version.clone().unwrap_or_else(|| "unknown".into());
            if health.is_healthy() {
                println!("✅ {} (version {})", "healthy".green(), version);
            } else {
                println!("❌ {} (version {})", "unhealthy".red(), version);
            }
            health.is_healthy()
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn list(manager: &ModelManager, recommended: bool, downloaded: bool) -> Result<bool> {
    let all = manager.refresh_models().await?;
    let models = if recommended {
        manager.recommended_models()
    } else if downloaded {
        manager.downloaded_models()
    } else {
        all
    };

    if models.is_empty() {
        println!("{}", "No models".dimmed());
    }
    for model in &models {
        println!("{}", render::model_row(model));
    }
    Ok(true)
}

fn stop_on_ctrlc(handles: Vec<PollerHandle>) -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\n{}", "Stopping...".yellow());
        for handle in &handles {
            handle.stop();
        }
    })?;
    Ok(())
}

async fn download(manager: &ModelManager, name: &str) -> Result<bool> {
    println!("📥 Downloading {}", name.cyan());
    let mut session = manager.download(name)?;
    stop_on_ctrlc(vec![session.handle().clone()])?;

    let bar = ProgressBar::new(100);
    bar.set_style(render::member_style()?);
    bar.set_message(name.to_string());

    let mut outcome = DownloadOutcome::Cancelled;
    while let Some(event) = session.next_event().await {
        match event {
            DownloadEvent::Progress { progress, .. } => bar.set_position(render::percent(progress)),
            DownloadEvent::Finished { outcome: last, .. } => {
                outcome = last;
                break;
            }
        }
    }

    render::finish_bar(&bar, &outcome);
    Ok(outcome.is_success())
}

async fn download_all(manager: &ModelManager, names: Vec<String>) -> Result<bool> {
    let selection = if names.is_empty() {
        BatchSelection::Recommended
    } else {
        BatchSelection::Names(names)
    };

    let mut batch = match manager.download_batch(selection).await {
        Ok(batch) => batch,
        Err(RiffError::Batch(BatchError::Empty)) => {
            eprintln!("❌ {}", "No models selected".red());
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };
    stop_on_ctrlc(batch.handles().to_vec())?;

    println!("📥 Downloading {} model(s)", batch.members().len());
    let multi = MultiProgress::new();
    let overall = multi.add(ProgressBar::new(100));
    overall.set_style(render::overall_style()?);
    overall.set_message("overall");

    let mut bars = HashMap::new();
    for member in batch.members() {
        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(render::member_style()?);
        bar.set_message(member.clone());
        bars.insert(member.clone(), bar);
    }

    while let Some(event) = batch.next_event().await {
        match event {
            BatchEvent::Progress {
                model,
                progress,
                overall: mean,
            } => {
                if let Some(bar) = bars.get(&model) {
                    bar.set_position(render::percent(progress));
                }
                overall.set_position(render::percent(mean));
            }
            BatchEvent::MemberFinished { model, outcome } => {
                if let Some(bar) = bars.get(&model) {
                    render::finish_bar(bar, &outcome);
                }
            }
            BatchEvent::Finished(report) => {
                overall.finish();
                println!("{}", render::summary(&report));
                return Ok(report.is_success());
            }
        }
    }

    Ok(batch.wait().await.is_success())
}

async fn updates(manager: &ModelManager, apply: bool) -> Result<bool> {
    let info = manager.check_for_updates().await?;
    let current = info.current_version.as_deref().unwrap_or("unknown");

    if !info.available {
        println!("✅ KC-Riff {} is up to date", current.green());
        return Ok(true);
    }

    println!(
        "⬆  Update available: {} -> {}",
        current,
        info.new_version.as_deref().unwrap_or("unknown").cyan()
    );
    if let Some(notes) = &info.release_notes {
        println!("   {}", notes);
    }
    if let Some(url) = &info.download_url {
        println!("   {}", url.dimmed());
    }

    if apply {
        let ack = manager.apply_update().await?;
        println!(
            "🔄 {} {}",
            ack.status.as_deref().unwrap_or("updating").green(),
            ack.to_version.as_deref().unwrap_or_default()
        );
    }
    Ok(true)
}
