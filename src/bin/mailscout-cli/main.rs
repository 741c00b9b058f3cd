use std::io::{self, BufRead};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing_subscriber::EnvFilter;

use mailscout_lib::{
    Context as ScoutContext, CoreError, DiscoveryAggregator, DiscoveryRequest, Settings,
    ValidationPipeline, ValidationRequest,
};

mod args;
mod output;

use args::{Cli, Commands};
use output::Sink;

/// Addresses validated at the same time in batch mode.
const VALIDATION_CONCURRENCY: usize = 8;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // exit codes: 0 ok, 2 invalid input or invalid/empty result, 1 fatal
    match run(cli).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(2),
        Err(err) => {
            let client_error = err
                .downcast_ref::<CoreError>()
                .is_some_and(CoreError::is_client_error);
            eprintln!("error: {err:#}");
            std::process::exit(if client_error { 2 } else { 1 });
        }
    }
}

/// `Ok(false)` when the command ran but found something invalid or nothing.
async fn run(cli: Cli) -> Result<bool> {
    let settings = Settings::load(cli.config.as_deref()).context("load settings")?;
    let sink = Sink {
        format: &cli.format,
        out: cli.out.as_deref(),
    };

    match cli.cmd {
        Commands::Validate {
            level,
            stdin,
            summary,
            mut emails,
        } => {
            if stdin {
                for line in io::stdin().lock().lines() {
                    let line = line.context("read stdin")?;
                    if !line.trim().is_empty() {
                        emails.push(line);
                    }
                }
            }
            if emails.is_empty() {
                eprintln!("no address given (pass addresses or --stdin)");
                return Ok(false);
            }

            let ctx = ScoutContext::connect(settings).await;
            let pipeline = ValidationPipeline::from_settings(ctx.settings())
                .context("initialize DNS resolver")?;
            let results: Vec<_> = stream::iter(emails)
                .map(|email| {
                    let (ctx, pipeline) = (&ctx, &pipeline);
                    async move {
                        let request = ValidationRequest::new(email.as_str(), level);
                        let result = pipeline.validate(ctx, &request).await;
                        (email, result)
                    }
                })
                .buffered(VALIDATION_CONCURRENCY)
                .collect()
                .await;

            let (rows, mut failed) = split_batch(results);
            if rows.is_empty() {
                if let Some((email, err)) = failed.pop() {
                    return Err(anyhow::Error::from(err).context(format!("validate {email}")));
                }
            }
            for (email, err) in &failed {
                eprintln!("error: validate {email}: {err}");
            }
            output::write_validation(&rows, &sink, summary)?;
            Ok(failed.is_empty() && rows.iter().all(|row| row.valid))
        }
        Commands::Discover {
            methods,
            no_detail,
            domain,
        } => {
            let aggregator =
                DiscoveryAggregator::from_settings(&settings).context("build HTTP client")?;
            let ctx = ScoutContext::connect(settings).await;
            let mut request = DiscoveryRequest::new(domain).detailed(!no_detail);
            if !methods.is_empty() {
                request = request.methods(methods);
            }
            let result = aggregator.discover(&ctx, &request).await?;
            output::write_discovery(&result, &sink)?;
            Ok(result.total_found > 0)
        }
        Commands::Providers => {
            let aggregator =
                DiscoveryAggregator::from_settings(&settings).context("build HTTP client")?;
            output::write_providers(&aggregator.provider_status(), &sink)?;
            Ok(true)
        }
    }
}

/// Splits a batch into the responses and the addresses that errored,
/// keeping input order in both.
fn split_batch<T, E>(results: Vec<(String, Result<T, E>)>) -> (Vec<T>, Vec<(String, E)>) {
    let mut rows = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (email, result) in results {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => failed.push((email, err)),
        }
    }
    (rows, failed)
}
