use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dagsql_core::config::ExecConfig;
use dagsql_core::schema::{CatalogDef, Schema};
use dagsql_core::{build_sql_job_with, Context, ExecError, MetadataVisitor};
use tracing::{debug, info};

#[derive(Parser)]
#[clap(name = "dagsql")]
struct Arguments {
    /// JSON file describing tables, their columns and rows.
    #[clap(long)]
    catalog: Option<PathBuf>,
    /// Schema within the catalog to run queries against.
    #[clap(long, default_value = "main")]
    schema: String,
    /// Capacity of the handoff between two tasks.
    #[clap(long)]
    channel_buffer: Option<usize>,
    /// Let task panics unwind instead of returning an error.
    #[clap(long)]
    disable_recover: bool,
    /// Default log level, RUST_LOG takes precedence.
    #[clap(long, default_value = "error")]
    log_level: tracing::Level,
    /// Log as JSON instead of human readable text.
    #[clap(long)]
    log_json: bool,
    /// Execute file containing sql statements then exit.
    #[clap(short = 'f', long)]
    files: Vec<PathBuf>,
    /// Queries to execute.
    #[clap(trailing_var_arg = true)]
    queries: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Parse(#[from] dagsql_parser::errors::ParseError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Nothing to execute, provide queries or files")]
    NoInput,
}

type Result<T, E = CliError> = std::result::Result<T, E>;

/// Runs queries against an in-memory catalog.
fn main() {
    let args = Arguments::parse();
    let format = if args.log_json {
        logutil::LogFormat::Json
    } else {
        logutil::LogFormat::HumanReadable
    };
    logutil::configure_global_logger(args.log_level, format, io::stderr);

    // Nested result. Outer result for the panic, inner is execution result.
    let result = std::panic::catch_unwind(|| -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(inner(args))
    });

    match result {
        Ok(Err(err)) => {
            println!("ERROR: {err}");
            std::process::exit(1);
        }
        Err(err) => {
            println!("PANIC: {err:?}");
            std::process::exit(2);
        }
        Ok(Ok(())) => (),
    }
}

async fn inner(args: Arguments) -> Result<()> {
    let mut config = ExecConfig::default();
    if let Some(buffer) = args.channel_buffer {
        config.set_from_str("channel_buffer", &buffer.to_string())?;
    }
    config.disable_recover = args.disable_recover;

    let schema = match &args.catalog {
        Some(path) => {
            let catalog = CatalogDef::from_json(&std::fs::read_to_string(path)?)?;
            Some(Arc::new(catalog.build_schema(&args.schema)?))
        }
        None => None,
    };

    let mut sources = Vec::new();
    for path in &args.files {
        sources.push(std::fs::read_to_string(path)?);
    }
    sources.extend(args.queries.iter().cloned());
    if sources.is_empty() {
        return Err(CliError::NoInput);
    }

    let mut stdout = BufWriter::new(io::stdout());
    for source in sources {
        // Jobs hold a single statement, split up anything with more.
        for (_, raw) in dagsql_parser::parse_with_source(&source)? {
            run_one(raw, schema.as_ref(), &config, &mut stdout).await?;
            stdout.flush()?;
        }
    }

    Ok(())
}

async fn run_one(
    raw: &str,
    schema: Option<&Arc<Schema>>,
    config: &ExecConfig,
    out: &mut impl Write,
) -> Result<()> {
    let mut ctx = Context::new(raw).with_config(config.clone());
    if let Some(schema) = schema {
        ctx = ctx.with_schema(schema.clone());
    }
    let ctx = Arc::new(ctx);

    let mut job = build_sql_job_with(ctx.clone(), Box::new(MetadataVisitor::new(&ctx)))?;
    job.setup()?;

    // Stop the job on ctrl-c rather than killing the process outright.
    let signal_ctx = ctx.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down job");
            signal_ctx.shutdown();
        }
    });

    let result = job.collect().await;
    signal.abort();
    let close = job.close();
    let rows = result?;
    close?;

    debug!(%raw, rows = rows.len(), "query finished");
    for row in rows {
        writeln!(out, "{row}")?;
    }
    Ok(())
}
