use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::{Builder, Env};

use apk_bitminer::discovery::ClassifierConfig;
use apk_bitminer::{parse_manifest, parse_tests_with_config};

#[derive(Parser, Debug)]
#[command(
    name = "apk-bitminer",
    about = "List the tests in an Android package or print its manifest",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Log more; repeat for debug and trace output.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List test methods as Class#method.
    Tests(TestsCommand),
    /// Print the decoded AndroidManifest.xml.
    Manifest(ManifestCommand),
}

#[derive(Args, Debug)]
struct TestsCommand {
    /// Path to the APK.
    apk: PathBuf,

    /// Class or package patterns: exact names, wildcards, or `re::<regex>`.
    #[arg(value_name = "PATTERN")]
    patterns: Vec<String>,

    /// TOML file overriding the test base classes and annotations.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a JSON array instead of one test per line.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
struct ManifestCommand {
    /// Path to the APK.
    apk: PathBuf,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn list_tests(cmd: &TestsCommand) -> Result<(), Box<dyn Error>> {
    let config = match &cmd.config {
        Some(path) => ClassifierConfig::from_file(path)?,
        None => ClassifierConfig::default(),
    };
    let tests = parse_tests_with_config(&cmd.apk, &cmd.patterns, &config)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&tests)?);
    } else {
        for test in &tests {
            println!("{test}");
        }
    }
    Ok(())
}

fn print_manifest(cmd: &ManifestCommand) -> Result<(), Box<dyn Error>> {
    let manifest = parse_manifest(&cmd.apk)?;
    println!("{}", manifest.xml());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Tests(cmd) => list_tests(cmd),
        Commands::Manifest(cmd) => print_manifest(cmd),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
