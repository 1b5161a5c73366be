use std::{fmt::Write as _, fs, io::Read, path::PathBuf, sync::Arc};

use clap::{
	Parser, ValueEnum,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use covermatch_engine::{MatchService, RecommendRequest, RecommendResponse};
use covermatch_storage::dir::DirStore;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
	version = VERSION,
	rename_all = "kebab",
	styles = styles(),
)]
pub struct Args {
	/// Service configuration file.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Customer record to match, JSON or free text. `-` reads stdin.
	#[arg(long, short = 'i', value_name = "FILE", default_value = "-")]
	pub input: PathBuf,
	/// Override the configured number of matches.
	#[arg(long, value_name = "N")]
	pub top: Option<u32>,
	#[arg(long, value_enum, default_value_t = Format::Json)]
	pub format: Format,
	/// Log an include/exclude verdict for every corpus entry.
	#[arg(long)]
	pub debug_similarity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
	Json,
	Text,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = covermatch_config::load(&args.config)?;
	let filter = EnvFilter::new(cfg.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	tracing::info!(config = %args.config.display(), "Configuration loaded.");

	let customer = read_customer(&args.input)?;
	let store = Arc::new(DirStore::new(&cfg.storage.corpus_dir, &cfg.storage.policy_dir));
	let service = MatchService::new(cfg, store.clone(), store).debug_similarity(args.debug_similarity);
	let request = RecommendRequest { customer, top_k: args.top, deadline: None };
	let response = service.recommend(request).await;

	tracing::info!(matches = response.top_k_matches.len(), "Recommendation complete.");

	match args.format {
		Format::Json => println!("{}", serde_json::to_string_pretty(&response)?),
		Format::Text => print!("{}", render_text(&response)),
	}

	Ok(())
}

fn read_customer(input: &PathBuf) -> color_eyre::Result<Value> {
	let raw = if input.as_os_str() == "-" {
		let mut buffer = String::new();

		std::io::stdin().read_to_string(&mut buffer)?;

		buffer
	} else {
		fs::read_to_string(input)?
	};

	// Free-text records are passed through as a JSON string and handed to
	// the extraction fallback downstream.
	Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
}

fn render_text(response: &RecommendResponse) -> String {
	let mut out = String::new();

	if let Some(error) = &response.error {
		let _ = writeln!(out, "Error: {error}");

		return out;
	}
	if response.top_k_matches.is_empty() {
		let _ = writeln!(out, "No matches found.");

		return out;
	}

	for (position, matched) in response.top_k_matches.iter().enumerate() {
		let policy = matched.policy_id.as_deref().unwrap_or("(unknown policy)");

		let _ = writeln!(
			out,
			"{}. {policy}  score {:.4}{}",
			position + 1,
			matched.similarity_score,
			if matched.resolved { "" } else { "  [unresolved]" },
		);

		if let Some(segment) = &matched.segment_label {
			let _ = writeln!(out, "   segment: {segment}");
		}
		if !matched.coverages.is_empty() {
			let _ = writeln!(out, "   coverages: {}", matched.coverages.join(", "));
		}
		for (name, value) in &matched.limits {
			let _ = writeln!(out, "   limit {name}: {value}");
		}
		for (name, value) in &matched.deductibles {
			let _ = writeln!(out, "   deductible {name}: {value}");
		}
		if !matched.add_ons.is_empty() {
			let _ = writeln!(out, "   add-ons: {}", matched.add_ons.join(", "));
		}
		if let Some(premium) = matched.premium {
			let _ = writeln!(out, "   premium: ${premium:.2}");
		}
	}
	if let Some(suggestion) = &response.suggestion {
		let _ = writeln!(out, "\n{suggestion}");
	}

	out
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use covermatch_engine::CoverageRecommendation;

	use super::*;

	#[test]
	fn renders_matches_and_suggestion() {
		let response = RecommendResponse {
			top_k_matches: vec![CoverageRecommendation {
				policy_id: Some("pol_1".into()),
				segment_label: Some("family segment".into()),
				similarity_score: 0.9132,
				coverages: vec!["Liability".into()],
				limits: Map::new(),
				deductibles: Map::new(),
				add_ons: vec!["Roadside".into()],
				premium: Some(1200.),
				resolved: true,
			}],
			suggestion: Some("Similar customers typically carry Liability.".into()),
			error: None,
		};
		let text = render_text(&response);

		assert!(text.contains("1. pol_1  score 0.9132"));
		assert!(text.contains("segment: family segment"));
		assert!(text.contains("coverages: Liability"));
		assert!(text.contains("premium: $1200.00"));
		assert!(text.contains("Similar customers typically carry Liability."));
	}

	#[test]
	fn renders_the_error_line_alone() {
		let response = RecommendResponse {
			top_k_matches: Vec::new(),
			suggestion: None,
			error: Some("Corpus store unreachable: gone".into()),
		};

		assert_eq!(render_text(&response), "Error: Corpus store unreachable: gone\n");
	}

	#[test]
	fn free_text_input_becomes_a_json_string() {
		let parsed: Value = serde_json::from_str("not json").unwrap_or(Value::String("not json".into()));

		assert_eq!(parsed, Value::String("not json".into()));
	}
}
