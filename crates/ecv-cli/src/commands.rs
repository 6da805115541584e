use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use ecv_encode::{EncodeEngine, ReedSolomonEngine, Staging, ToolEncodeEngine};
use ecv_query::{ObjectStoreTool, ShardQuery};
use ecv_registry::{CachingResolver, CephClusterMetadata, ClusterMetadata, ObjectRegistry};
use ecv_transport::ProcessTransport;
use ecv_types::{ErasureCodeProfile, NodeRef};
use ecv_verify::{ClusterScanner, NodeScanReport, VerificationEngine, VerifyError};
use serde_json::json;

use crate::cli::*;
use crate::config::{EcvConfig, EncoderKind};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = EcvConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Verify(args) => cmd_verify(config, args, cli.format),
        Command::Shards(args) => cmd_shards(&config, args, cli.format),
        Command::ChunkSize(args) => cmd_chunk_size(&config, args, cli.format),
    }
}

fn transport(config: &EcvConfig) -> Arc<ProcessTransport> {
    Arc::new(ProcessTransport::new(config.transport.clone()))
}

/// Build the configured engine. `chunk-size` alone never touches files, so
/// it skips the staging check.
fn encoder(
    config: &EcvConfig,
    transport: &Arc<ProcessTransport>,
    uses_files: bool,
) -> anyhow::Result<Box<dyn EncodeEngine>> {
    let staging = if uses_files { config.encoder_staging()? } else { Staging::Shared };
    let engine: Box<dyn EncodeEngine> = match config.encoder.kind {
        EncoderKind::Tool => Box::new(
            ToolEncodeEngine::new(
                Arc::clone(transport),
                config.encoder_node()?,
                config.tools.erasure_code.clone(),
            )
            .with_staging(staging),
        ),
        EncoderKind::ReedSolomon => Box::new(ReedSolomonEngine::new()),
    };
    Ok(engine)
}

fn cmd_verify(mut config: EcvConfig, args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(root) = args.scratch {
        config.scratch.root = root;
    }
    if !args.osds.is_empty() {
        config.cluster.osds = args.osds;
    }
    if let Some(parallel) = args.parallel {
        config.scan.parallelism = parallel;
    }

    let transport = transport(&config);
    let engine = VerificationEngine::new(encoder(&config, &transport, true)?, config.scratch.clone());
    let metadata = CephClusterMetadata::new(
        Arc::clone(&transport),
        config.cluster.mon_node(),
        config.tools.ceph.clone(),
    );
    let nodes: Vec<NodeRef> = if config.cluster.osds.is_empty() {
        metadata
            .list_storage_nodes()
            .context("cannot list OSDs")?
            .into_iter()
            .map(|n| config.cluster.with_host(n))
            .collect()
    } else {
        config.cluster.osds.iter().map(|&id| config.cluster.osd_node(id)).collect()
    };

    let query = Arc::new(ObjectStoreTool::new(
        Arc::clone(&transport),
        config.tools.objectstore.clone(),
    ));
    let scanner = ClusterScanner::new(query, CachingResolver::new(metadata));
    let mut registry = ObjectRegistry::new();
    let reports = if config.scan.parallelism > 1 {
        tokio::runtime::Runtime::new()?.block_on(scanner.scan_concurrent(
            &nodes,
            &mut registry,
            config.scan.parallelism,
        ))?
    } else {
        scanner.scan(&nodes, &mut registry)
    };

    let result = engine.verify_all(&registry);

    match format {
        OutputFormat::Json => {
            let body = match &result {
                Ok(summary) => json!({"passed": true, "scan": reports, "stats": registry.stats(), "summary": summary}),
                Err(e) => json!({
                    "passed": false,
                    "scan": reports,
                    "stats": registry.stats(),
                    "error": e.to_string(),
                    "object": e.object().map(ToString::to_string),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            print_scan(&reports);
            let stats = registry.stats();
            println!(
                "Objects: {} ({} complete), shards: {} present, {} missing",
                stats.objects.to_string().bold(),
                stats.complete,
                stats.shards_present,
                stats.shards_missing,
            );
            match &result {
                Ok(summary) => {
                    println!("{summary}");
                    println!(
                        "{} Parity consistent: {} shards compared",
                        "✓".green().bold(),
                        summary.shards_compared()
                    );
                }
                Err(e) => print_failure(e),
            }
        }
    }

    result.map(|_| ()).context("verification failed")
}

fn print_scan(reports: &[NodeScanReport]) {
    for r in reports {
        let status = match &r.list_error {
            Some(e) => format!("unlistable: {e}").red(),
            None if r.skipped > 0 => format!("{} skipped", r.skipped).yellow(),
            None => "ok".green(),
        };
        println!(
            "  {} listed {}, ingested {}, duplicates {} ({})",
            r.node.to_string().bold(),
            r.listed,
            r.ingested,
            r.duplicates,
            status
        );
    }
}

fn print_failure(error: &VerifyError) {
    println!("{} {}", "✗".red().bold(), error);
    if let VerifyError::ParityMismatch { object, shard, .. } = error {
        println!("  Object: {}", object.to_string().yellow());
        println!("  Shard:  {}", shard.to_string().yellow());
    }
}

fn cmd_shards(config: &EcvConfig, args: ShardsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let node = config.cluster.osd_node(args.osd);
    let tool = ObjectStoreTool::new(transport(config), config.tools.objectstore.clone());
    let fragments = tool
        .list_shard_fragments(&node)
        .with_context(|| format!("cannot list {node}"))?;

    let mut rows = Vec::with_capacity(fragments.len());
    for fragment in &fragments {
        let meta = tool
            .dump_shard_info(&node, fragment)
            .and_then(|dump| dump.fragment_meta());
        match meta {
            Ok(meta) => rows.push(json!({
                "pgid": fragment.pgid(),
                "object": meta.key.to_string(),
                "pool": meta.pool,
                "shard": meta.shard,
                "chunk_size": meta.chunk_size,
            })),
            Err(e) => rows.push(json!({
                "pgid": fragment.pgid(),
                "object": fragment.oid(),
                "error": e.to_string(),
            })),
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            println!("{} on {}", format!("{} EC shards", rows.len()).bold(), node.to_string().cyan());
            for row in &rows {
                match row.get("error").and_then(|e| e.as_str()) {
                    Some(e) => println!("  {:<12} {} {}", row["pgid"].as_str().unwrap_or("?"), row["object"], e.red()),
                    None => println!(
                        "  {:<12} {} shard {} ({} bytes)",
                        row["pgid"].as_str().unwrap_or("?"),
                        row["object"].as_str().unwrap_or("?").yellow(),
                        row["shard"],
                        row["chunk_size"]
                    ),
                }
            }
        }
    }
    Ok(())
}

fn cmd_chunk_size(config: &EcvConfig, args: ChunkSizeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let profile = ErasureCodeProfile::parse(&args.profile).context("invalid profile")?;
    let engine = encoder(config, &transport(config), false)?;
    let chunk = engine.chunk_size(&profile, args.size)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({"profile": profile.to_tool_string(), "object_size": args.size, "chunk_size": chunk})
        ),
        OutputFormat::Text => println!("{chunk}"),
    }
    Ok(())
}
