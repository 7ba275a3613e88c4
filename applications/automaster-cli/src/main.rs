/// Automaster - offline loudness analysis and mastering
use anyhow::Context;
use automaster_cli::{analyze, effective_config, master, presets_table, Cli, Commands};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize tracing; reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "automaster=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => {
            let analysis = analyze(&args.input)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&analysis.to_json())?);
            } else {
                println!("{analysis}");
            }
        }
        Commands::Master(args) => {
            let summary = master(&args)
                .with_context(|| format!("Mastering {} failed", args.input.display()))?;
            println!("{summary}");
        }
        Commands::Presets => {
            print!("{}", presets_table());
        }
        Commands::Config { config, preset } => {
            let config = effective_config(config.as_deref(), preset, None, None)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
