// crates.io
use clap::Parser;
// self
use covermatch_cli::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	covermatch_cli::run(args).await
}
