use kcriff::{BatchEvent, BatchSelection, ModelManager};

#[async_std::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let manager = ModelManager::load().await?;
    if let Some(reason) = manager.unavailable_reason() {
        eprintln!("KC-Riff is not available: {}", reason);
        return Ok(());
    }

    let models = manager.refresh_models().await?;
    println!("{} model(s) known to the backend", models.len());
    for model in manager.recommended_models() {
        println!("  * {} ({:.1} GB)", model.name, model.size_bytes as f64 / 1e9);
    }

    let mut batch = manager.download_batch(BatchSelection::Recommended).await?;
    while let Some(event) = batch.next_event().await {
        match event {
            BatchEvent::Progress { model, progress, overall } => {
                println!("{:<20} {:5.1}%   overall {:5.1}%", model, progress, overall);
            }
            BatchEvent::MemberFinished { model, outcome } => println!("{}: {}", model, outcome),
            BatchEvent::Finished(report) => {
                println!(
                    "done: {} succeeded, {} failed",
                    report.succeeded().len(),
                    report.failed().len()
                );
                break;
            }
        }
    }
    Ok(())
}
