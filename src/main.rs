use anyhow::{Context, Result, bail};
use clap::Parser;
use lsifg::config::Config;
use lsifg::dump::{self, LoadOptions, OnError};
use lsifg::validate::StreamValidator;
use lsifg::{Resolver, cli, util};
use serde_json::json;
use std::path::Path;

fn load_options(on_error: Option<OnError>) -> LoadOptions {
    let options = LoadOptions::from_config(Config::get());
    match on_error {
        Some(on_error) => options.on_error(on_error),
        None => options,
    }
}

fn load(path: &Path, on_error: Option<OnError>) -> Result<dump::LoadOutcome> {
    dump::load_path(path, load_options(on_error))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Validate { dump } => {
            let reader = util::open_reader(&dump)?;
            let mut validator = StreamValidator::new();
            for record in dump::records(reader)? {
                let element = record.with_context(|| format!("read {}", dump.display()))?;
                validator.check(&element);
            }
            let checked = validator.checked();
            let report = validator.finish();
            let total = report.len();
            let max = Config::get().max_violations;
            let shown = if max == 0 { total } else { total.min(max) };
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "checked": checked,
                    "total": total,
                    "counts": report.counts(),
                    "violations": &report.violations[..shown],
                }))?
            );
            if !report.is_valid() {
                bail!("{total} violations in {}", dump.display());
            }
            Ok(())
        }
        cli::Command::Overview { dump, on_error } => {
            let outcome = load(&dump, on_error)?;
            let overview = outcome.snapshot.overview();
            let digest = outcome.snapshot.digest()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "overview": overview,
                    "digest": digest,
                    "rejected": outcome.rejected.len(),
                }))?
            );
            Ok(())
        }
        cli::Command::Resolve {
            dump,
            id,
            kind,
            on_error,
        } => {
            let outcome = load(&dump, on_error)?;
            let resolver = Resolver::new(outcome.snapshot);
            let resolution = resolver
                .resolve(&id, kind)
                .with_context(|| format!("resolve {kind} from {id}"))?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
            Ok(())
        }
        cli::Command::Convert {
            dump,
            out,
            format,
            on_error,
        } => {
            let outcome = load(&dump, on_error)?;
            dump::write_path(&outcome.snapshot, &out, format)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "written": outcome.snapshot.len(),
                    "rejected": outcome.rejected.len(),
                    "out": out.display().to_string(),
                }))?
            );
            Ok(())
        }
    }
}
