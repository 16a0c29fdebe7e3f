mod cli;

use mediaforged::{
    commands::{self, Cancelled},
    config, signals,
};

use anyhow::Result;
use clap::Parser;
use cli::{ChaptersCommand, Cli, Commands};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediaforged=trace,mediaforged_av=trace".to_string()
        } else {
            "mediaforged=info,mediaforged_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = signals::install_abort_handler() {
        tracing::warn!("Failed to install signal handlers: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<Cancelled>() => {
            eprintln!("{}", e);
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Probe {
            file,
            json,
            input_format,
        } => {
            let config = config::load_config_or_default(config_path)?;
            commands::probe::run(&config, &file, json, input_format.as_deref())
        }
        Commands::Convert { progress, args } => {
            let config = config::load_config_or_default(config_path)?;
            commands::convert::run(&config, &args, progress)
        }
        Commands::Chapters(ChaptersCommand::Export { file, format }) => {
            let config = config::load_config_or_default(config_path)?;
            commands::chapters::export(&config, &file, format.into())
        }
        Commands::Chapters(ChaptersCommand::Import {
            input,
            chapters,
            format,
            output,
            force,
        }) => {
            let config = config::load_config_or_default(config_path)?;
            commands::chapters::import(&config, &input, &chapters, format.map(Into::into), &output, force)
        }
        Commands::Metadata(args) => {
            let config = config::load_config_or_default(config_path)?;
            commands::metadata::run(
                &config,
                &args.input,
                &args.output,
                &args.edit(),
                args.clear_chapters,
                args.force,
            )
        }
        Commands::Exec { program, args } => {
            let config = config::load_config_or_default(config_path)?;
            commands::exec::run(&config, &program, &args)
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = mediaforged_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            print_config(&config::Config::default());
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    let show = |path: &Option<std::path::PathBuf>| match path {
        Some(p) => p.display().to_string(),
        None => "(PATH)".to_string(),
    };
    println!("  ffmpeg: {}", show(&config.tools.ffmpeg_path));
    println!("  ffprobe: {}", show(&config.tools.ffprobe_path));
    println!(
        "  Cancel retry: {}s, poll: {}ms",
        config.execution.cancel_retry_secs, config.execution.poll_interval_ms
    );
    println!(
        "  Probe: analyzeduration={}, probesize={}",
        config.probe.analyze_duration, config.probe.probe_size
    );
}
