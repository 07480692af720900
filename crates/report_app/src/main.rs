use clap::Parser;
use report_app::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let saved = report_app::run(cli).await?;
    println!("Saved {}", saved.display());
    Ok(())
}
