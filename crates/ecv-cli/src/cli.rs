use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ecv",
    about = "Check that erasure-coded parity on a cluster matches its data",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan the cluster and verify the parity of every EC object
    Verify(VerifyArgs),
    /// List the EC shard fragments held by one OSD
    Shards(ShardsArgs),
    /// Ask the encoder for the chunk size of an object
    ChunkSize(ChunkSizeArgs),
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Directory for encoder input and output
    #[arg(long)]
    pub scratch: Option<PathBuf>,
    /// Only scan these OSD ids
    #[arg(long = "osd")]
    pub osds: Vec<u32>,
    /// Number of OSDs to query at once
    #[arg(long)]
    pub parallel: Option<usize>,
}

#[derive(Args)]
pub struct ShardsArgs {
    #[arg(long)]
    pub osd: u32,
}

#[derive(Args)]
pub struct ChunkSizeArgs {
    /// Profile as comma-separated key=value pairs
    #[arg(long)]
    pub profile: String,
    /// Object size in bytes
    #[arg(long)]
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_verify_defaults() {
        let cli = Cli::try_parse_from(["ecv", "verify"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.verbose);
        if let Command::Verify(args) = cli.command {
            assert!(args.osds.is_empty());
            assert!(args.parallel.is_none());
            assert!(args.scratch.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verify_with_osds() {
        let cli = Cli::try_parse_from([
            "ecv", "verify", "--osd", "0", "--osd", "3", "--parallel", "4", "--scratch", "/var/tmp/ec",
        ])
        .unwrap();
        if let Command::Verify(args) = cli.command {
            assert_eq!(args.osds, vec![0, 3]);
            assert_eq!(args.parallel, Some(4));
            assert_eq!(args.scratch, Some(PathBuf::from("/var/tmp/ec")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ecv", "shards", "--osd", "2", "--format", "json", "-v", "-c", "ecv.toml"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ecv.toml")));
        assert!(matches!(cli.command, Command::Shards(ShardsArgs { osd: 2 })));
    }

    #[test]
    fn parse_chunk_size() {
        let cli = Cli::try_parse_from(["ecv", "chunk-size", "--profile", "plugin=isa,k=4,m=2", "--size", "4096"]).unwrap();
        if let Command::ChunkSize(args) = cli.command {
            assert_eq!(args.profile, "plugin=isa,k=4,m=2");
            assert_eq!(args.size, 4096);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn shards_requires_osd() {
        assert!(Cli::try_parse_from(["ecv", "shards"]).is_err());
    }
}
