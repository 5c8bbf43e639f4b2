mod cli;

use flvkit::{config, dump::Dumper, rewrite};
use flvkit_media::{FlvReader, FlvWriter};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "flvkit=debug,flvkit_media=trace".to_string()
        } else {
            "flvkit=info,flvkit_media=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Dump { file, strict, json } => {
            dump_file(&file, strict, json, cli.config.as_deref())
        }
        Commands::Rewrite {
            input,
            output,
            sync_every,
        } => rewrite_file(&input, &output, sync_every, cli.config.as_deref()),
        Commands::Version => {
            println!("flvkit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn dump_file(file: &Path, strict: bool, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let strict = strict || config.reader.strict_back_pointer;

    let mut reader = FlvReader::open(file)
        .with_context(|| format!("Failed to open FLV file: {:?}", file))?
        .strict(strict);

    tracing::info!("Dumping {:?} ({} bytes, strict: {})", file, reader.size(), strict);

    let stored_duration = match reader.stored_duration() {
        Ok(duration) => Some(duration),
        Err(e) => {
            tracing::warn!("Could not read stored duration: {}", e);
            None
        }
    };

    let mut dumper = Dumper::new();
    let mut reports = Vec::new();
    let mut failure = None;

    loop {
        match reader.next_tag() {
            Ok(Some(tag)) => {
                let report = dumper.record(&tag);
                if json {
                    reports.push(report);
                } else {
                    println!("{}", report);
                }
            }
            Ok(None) => {
                tracing::debug!("Reached end of {:?}", file);
                break;
            }
            Err(e) => {
                tracing::error!("Tag read failed: {}", e);
                failure = Some(e);
                break;
            }
        }
    }

    let summary = dumper.finish(stored_duration);

    if json {
        let output = serde_json::json!({
            "file": file,
            "header": reader.header(),
            "tags": reports,
            "summary": summary,
            "error": failure.as_ref().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        print!("{}", summary);
    }

    match failure {
        Some(e) => Err(anyhow::Error::new(e).context(format!("Failed to read {:?}", file))),
        None => Ok(()),
    }
}

fn rewrite_file(
    input: &Path,
    output: &Path,
    sync_every: Option<u32>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let sync_every = sync_every.unwrap_or(config.writer.sync_every);
    if sync_every > config::MAX_SYNC_EVERY {
        anyhow::bail!(
            "--sync-every must be at most {} (got {})",
            config::MAX_SYNC_EVERY,
            sync_every
        );
    }

    let mut reader = FlvReader::open(input)
        .with_context(|| format!("Failed to open FLV file: {:?}", input))?
        .strict(config.reader.strict_back_pointer);
    let mut writer = FlvWriter::create_with_options(output, config.writer.options())
        .with_context(|| format!("Failed to create FLV file: {:?}", output))?;

    tracing::info!("Rewriting {:?} -> {:?}", input, output);

    let result = rewrite::rewrite(&mut reader, &mut writer, sync_every);

    // Persist the duration of whatever made it out, even on a read failure
    let closed = writer.close();
    let stats = result.with_context(|| format!("Failed to rewrite {:?}", input))?;
    closed.with_context(|| format!("Failed to finalize {:?}", output))?;

    println!(
        "Wrote {} tags to {} (read {}, skipped {} script tags, duration {:.3}s)",
        stats.tags_written,
        output.display(),
        stats.tags_read,
        stats.script_tags_skipped,
        stats.duration
    );
    Ok(())
}
