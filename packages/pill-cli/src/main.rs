//! Pill identification CLI
//!
//! Every command prints its result as pretty JSON on stdout. Logs go to
//! stderr (`RUST_LOG` overrides the default filter).

mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use pill_id::{
    normalize_features, CandidateMatch, FeatureQuery, HttpFetcher, OpenAIVision, OpenFdaClient,
    PillIdentifier, RateLimitedFetcher, SectionKey, WebDriverLauncher,
};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "pill")]
#[command(about = "Identify pills from photos and cross-reference drugs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify a pill from a photo
    Identify {
        #[arg(long)]
        image: PathBuf,
        /// Image MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
        /// Also list reported reactions for each matched choice
        #[arg(long)]
        side_effects: bool,
    },

    /// Normalize imprint/color/shape text without searching
    Normalize { text: String },

    /// Search the match source for given features
    Search {
        #[arg(long)]
        imprint: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        shape: String,
    },

    /// Split a candidate's display text into its labeled fields
    Details { text: String },

    /// Check interactions between two drugs
    Interactions { drug_a: String, drug_b: String },

    /// Fetch labeling sections for a drug (all sections when --section is omitted)
    Label {
        drug: String,
        #[arg(long)]
        section: Option<SectionKey>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List reported reactions for a drug
    SideEffects {
        drug: String,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Count pills with given features in a photo
    Count {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        imprint: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        shape: String,
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Serialize)]
struct CountResponse<'a> {
    imprint: &'a str,
    color: &'a str,
    shape: &'a str,
    count: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pill_id=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    run(cli.command, &config, &cancel).await
}

async fn run(command: Commands, config: &Config, cancel: &CancellationToken) -> Result<()> {
    match command {
        Commands::Normalize { text } => output(&normalize_features(&text)?),

        Commands::Details { text } => output(&CandidateMatch::new(text).details()),

        Commands::Identify {
            image,
            mime,
            side_effects,
        } => {
            let identifier = build_identifier(config)?;
            let (bytes, mime) = read_image(&image, mime).await?;
            if side_effects {
                let pill = cancellable(
                    identifier.identify_image_with_side_effects(&bytes, &mime),
                    cancel,
                )
                .await??;
                output(&pill)
            } else {
                let result =
                    cancellable(identifier.identify_image(&bytes, &mime), cancel).await??;
                output(&result)
            }
        }

        Commands::Search {
            imprint,
            color,
            shape,
        } => {
            let identifier = build_identifier(config)?;
            let query = FeatureQuery::new(imprint, color, shape)?;
            let result = cancellable(identifier.search(&query), cancel).await??;
            output(&result)
        }

        Commands::Interactions { drug_a, drug_b } => {
            let identifier = build_identifier(config)?;
            // Cancellation is handled inside so that browser sessions get closed
            let report = identifier
                .check_interactions(&drug_a, &drug_b, cancel)
                .await
                .with_context(|| format!("checking {} against {}", drug_a, drug_b))?;
            output(&report)
        }

        Commands::Label {
            drug,
            section,
            limit,
        } => {
            let identifier = build_identifier(config)?;
            match section {
                Some(key) => {
                    let section =
                        cancellable(identifier.label_section(&drug, key, limit), cancel).await??;
                    output(&section)
                }
                None => {
                    let sections =
                        cancellable(identifier.label_all_sections(&drug, limit), cancel).await??;
                    output(&sections)
                }
            }
        }

        Commands::SideEffects { drug, limit } => {
            let identifier = build_identifier(config)?;
            let effects = cancellable(identifier.side_effects(&drug, limit), cancel).await??;
            output(&effects)
        }

        Commands::Count {
            image,
            imprint,
            color,
            shape,
            mime,
        } => {
            let identifier = build_identifier(config)?;
            let query = FeatureQuery::new(imprint, color, shape)?;
            let (bytes, mime) = read_image(&image, mime).await?;
            let count =
                cancellable(identifier.count_pills(&bytes, &mime, &query), cancel).await??;
            output(&CountResponse {
                imprint: query.imprint(),
                color: query.color(),
                shape: query.shape(),
                count,
            })
        }
    }
}

fn build_identifier(config: &Config) -> Result<PillIdentifier> {
    let pill_config = config.pill_config();
    let http = &pill_config.http;

    let fetcher = RateLimitedFetcher::new(
        HttpFetcher::new(http).context("Failed to create HTTP fetcher")?,
        http.requests_per_second,
    );
    let browser = WebDriverLauncher::new(&config.webdriver_url, http)
        .context("Failed to create WebDriver client")?;
    let source = OpenFdaClient::new(&pill_config.structured_base_url, http)
        .context("Failed to create openFDA client")?;

    let mut builder = PillIdentifier::builder()
        .fetcher(Arc::new(fetcher))
        .browser(Arc::new(browser))
        .source(Arc::new(source));

    if let Some(key) = &config.openai_api_key {
        builder = builder.vision(Arc::new(
            OpenAIVision::new(key.as_str()).with_model(&config.openai_model),
        ));
    }

    Ok(builder.config(pill_config).build()?)
}

async fn cancellable<F: Future>(future: F, cancel: &CancellationToken) -> Result<F::Output> {
    tokio::select! {
        result = future => Ok(result),
        _ = cancel.cancelled() => Err(anyhow!("cancelled")),
    }
}

async fn read_image(path: &Path, mime: Option<String>) -> Result<(Vec<u8>, String)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    let mime = match mime {
        Some(m) => m,
        None => guess_mime(path)?.to_string(),
    };
    Ok((bytes, mime))
}

fn guess_mime(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    Ok(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        other => bail!("Cannot guess image type from extension {:?}, pass --mime", other),
    })
}

fn output<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_label_section() {
        let cli = Cli::try_parse_from(["pill", "label", "Advil", "--section", "dosage-table"]).unwrap();
        let Commands::Label { drug, section, limit } = cli.command else {
            panic!("expected label command");
        };
        assert_eq!(drug, "Advil");
        assert_eq!(section, Some(SectionKey::DosageTable));
        assert!(limit.is_none());
    }

    #[test]
    fn test_parses_identify_side_effects_flag() {
        let cli = Cli::try_parse_from(["pill", "identify", "--image", "pill.jpg", "--side-effects"])
            .unwrap();
        let Commands::Identify { image, mime, side_effects } = cli.command else {
            panic!("expected identify command");
        };
        assert_eq!(image, PathBuf::from("pill.jpg"));
        assert!(mime.is_none());
        assert!(side_effects);
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("pill.JPG")).unwrap(), "image/jpeg");
        assert_eq!(guess_mime(Path::new("pill.png")).unwrap(), "image/png");
        assert!(guess_mime(Path::new("pill")).is_err());
    }
}
