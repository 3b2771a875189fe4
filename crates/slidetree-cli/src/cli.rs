use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use slidetree_types::InterchangeVersion;

#[derive(Parser)]
#[command(
    name = "slidetree",
    about = "Inspect and normalize whole-slide image annotation documents",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with load options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a document and summarize its objects
    Inspect(InspectArgs),
    /// Load a document and write its annotations back out normalized
    Convert(ConvertArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Repair invalid geometries before import
    #[arg(long)]
    pub fix_invalid: bool,
    /// Fail if any record is skipped
    #[arg(long)]
    pub raise_on_skip: bool,
    /// Treat the document as written by an older producer
    #[arg(long, value_name = "VERSION")]
    pub legacy: Option<InterchangeVersion>,
}

#[derive(Args)]
pub struct ConvertArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[arg(long)]
    pub fix_invalid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inspect() {
        let cli = Cli::try_parse_from(["slidetree", "inspect", "slide.geojson"]).unwrap();
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("slide.geojson"));
            assert!(!args.fix_invalid);
            assert!(!args.raise_on_skip);
            assert!(args.legacy.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_inspect_flags() {
        let cli = Cli::try_parse_from([
            "slidetree", "inspect", "a.json", "--fix-invalid", "--raise-on-skip", "--legacy", "0.2.3",
        ])
        .unwrap();
        if let Command::Inspect(args) = cli.command {
            assert!(args.fix_invalid);
            assert!(args.raise_on_skip);
            assert_eq!(args.legacy, Some(InterchangeVersion::LAST_UNTAGGED));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_bad_legacy_version() {
        assert!(Cli::try_parse_from(["slidetree", "inspect", "a.json", "--legacy", "zero"]).is_err());
    }

    #[test]
    fn parse_convert() {
        let cli = Cli::try_parse_from(["slidetree", "convert", "in.json", "out.json", "--fix-invalid"]).unwrap();
        if let Command::Convert(args) = cli.command {
            assert_eq!(args.input, PathBuf::from("in.json"));
            assert_eq!(args.output, PathBuf::from("out.json"));
            assert!(args.fix_invalid);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_convert_requires_output() {
        assert!(Cli::try_parse_from(["slidetree", "convert", "in.json"]).is_err());
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["slidetree", "--verbose", "inspect", "a.json"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["slidetree", "--format", "json", "inspect", "a.json"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn parse_config_after_subcommand() {
        let cli = Cli::try_parse_from(["slidetree", "inspect", "a.json", "--config", "st.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("st.toml")));
    }
}
