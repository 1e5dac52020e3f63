use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod context;
mod format;

/// Skiff - Container Registry Client
///
/// Resolves image references and fetches manifests, configs and blobs from
/// OCI-compliant container registries.
#[derive(Parser, Debug)]
#[command(name = "skiff")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(long, global = true, env = "SKIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: pretty, json, yaml
    #[arg(short, long, global = true, default_value = "pretty")]
    format: String,

    /// Registry username; overrides Docker credentials
    #[arg(short, long, global = true, requires = "password")]
    username: Option<String>,

    /// Registry password or token
    #[arg(short, long, global = true, env = "SKIFF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display version information
    Version,
    /// Parse an image reference and show how it resolves
    Parse {
        /// Image reference (name[:tag] or name@digest)
        reference: String,
    },
    /// Fetch the image manifest for a platform
    Manifest {
        /// Image reference (name[:tag] or name@digest)
        reference: String,
        /// Platform to select from a multi-platform image (os/arch[/variant])
        #[arg(long)]
        platform: Option<String>,
    },
    /// Fetch the image configuration for a platform
    Config {
        /// Image reference (name[:tag] or name@digest)
        reference: String,
        /// Platform to select from a multi-platform image (os/arch[/variant])
        #[arg(long)]
        platform: Option<String>,
    },
    /// Show the content digest of a reference
    Digest {
        /// Image reference (name[:tag] or name@digest)
        reference: String,
    },
    /// Download a blob from a repository
    Blob {
        /// Repository name
        repository: String,
        /// Blob digest
        digest: String,
        /// Write the blob to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Copy a manifest or index to another reference
    Copy {
        /// Source reference
        source: String,
        /// Destination reference
        destination: String,
    },
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbosity = context::VerbosityLevel::from_count(cli.verbose);
    context::init_tracing(verbosity);

    match cli.command {
        Commands::Version => {
            commands::version::print_version();
            return;
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            return;
        }
        _ => {}
    }

    // Build context with precedence: defaults > config file > env vars > CLI flags
    let credentials = cli.username.zip(cli.password);
    let ctx = match context::AppContext::build(
        cli.config.as_deref(),
        format::OutputFormat::from(cli.format.as_str()),
        credentials,
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Parse { reference } => {
            commands::parse::handle_parse(&ctx, &reference);
        }
        Commands::Manifest {
            reference,
            platform,
        } => {
            commands::manifest::handle_manifest(&ctx, &reference, platform.as_deref()).await;
        }
        Commands::Config {
            reference,
            platform,
        } => {
            commands::manifest::handle_config(&ctx, &reference, platform.as_deref()).await;
        }
        Commands::Digest { reference } => {
            commands::manifest::handle_digest(&ctx, &reference).await;
        }
        Commands::Blob {
            repository,
            digest,
            output,
        } => {
            commands::blob::handle_blob(&ctx, &repository, &digest, output.as_deref()).await;
        }
        Commands::Copy {
            source,
            destination,
        } => {
            commands::copy::handle_copy(&ctx, &source, &destination).await;
        }
        Commands::Version | Commands::Completion { .. } => {}
    }
}
