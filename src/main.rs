use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    flipfolio::logging::init().context("init logging")?;

    let cli = flipfolio::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        flipfolio::cli::Command::Import {
            command: flipfolio::cli::ImportCommand::Pdf(args),
        } => {
            flipfolio::ingest::import_pdf(args)
                .await
                .context("import pdf")?;
        }
        flipfolio::cli::Command::Import {
            command: flipfolio::cli::ImportCommand::Images(args),
        } => {
            flipfolio::ingest::import_images(args)
                .await
                .context("import images")?;
        }
        flipfolio::cli::Command::Analyze(args) => {
            flipfolio::insights::run(args).await.context("analyze")?;
        }
        flipfolio::cli::Command::Export(args) => {
            flipfolio::export::run(args).await.context("export")?;
        }
        flipfolio::cli::Command::Library {
            command: flipfolio::cli::LibraryCommand::List(args),
        } => {
            flipfolio::library::run_list(args).await.context("library list")?;
        }
        flipfolio::cli::Command::Library {
            command: flipfolio::cli::LibraryCommand::Delete(args),
        } => {
            flipfolio::library::run_delete(args)
                .await
                .context("library delete")?;
        }
    }

    Ok(())
}
