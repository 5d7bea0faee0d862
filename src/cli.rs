use crate::dump::{Format, OnError};
use crate::model::{Id, RequestKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lsifg",
    version,
    about = "Code intelligence graph toolkit",
    after_help = r#"Examples:
  lsifg validate --dump index.lsif
  lsifg overview --dump index.lsif --on-error skip
  lsifg resolve --dump index.lsif --id 14 --kind hover
  lsifg resolve --dump index.lsif --id 14 --kind references
  lsifg convert --dump index.lsif --out index.json --format json
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a dump and print every violation found.
    Validate {
        #[arg(long, value_name = "PATH")]
        dump: PathBuf,
    },
    /// Load a dump and print label counts, version and digest.
    Overview {
        #[arg(long, value_name = "PATH")]
        dump: PathBuf,
        /// What to do with rejected records: abort|skip. Defaults to LSIFG_ON_ERROR.
        #[arg(long)]
        on_error: Option<OnError>,
    },
    /// Answer one request against a dump.
    Resolve {
        #[arg(long, value_name = "PATH")]
        dump: PathBuf,
        /// Start vertex id; numeric ids are parsed as integers.
        #[arg(long)]
        id: Id,
        #[arg(long)]
        kind: RequestKind,
        /// What to do with rejected records: abort|skip. Defaults to LSIFG_ON_ERROR.
        #[arg(long)]
        on_error: Option<OnError>,
    },
    /// Load a dump through the builder and write it back out.
    Convert {
        #[arg(long, value_name = "PATH")]
        dump: PathBuf,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        /// Output encoding: line|json.
        #[arg(long, default_value = "line")]
        format: Format,
        /// What to do with rejected records: abort|skip. Defaults to LSIFG_ON_ERROR.
        #[arg(long)]
        on_error: Option<OnError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_parses_kind_and_id() {
        let args = Args::try_parse_from([
            "lsifg", "resolve", "--dump", "a.lsif", "--id", "14", "--kind", "type-definition",
        ])
        .unwrap();
        match args.command {
            Command::Resolve { id, kind, .. } => {
                assert_eq!(id, Id::Int(14));
                assert_eq!(kind, RequestKind::TypeDefinition);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn string_ids_are_kept() {
        let args = Args::try_parse_from([
            "lsifg", "resolve", "--dump", "a.lsif", "--id", "r1", "--kind", "hover",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Resolve { id: Id::Str(ref value), .. } if value == "r1"
        ));
    }
}
