use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde_json::to_writer_pretty;
use stackforge::assembler::assemble;
use stackforge::daemons::{self, DaemonOptions};
use stackforge::lockfile::generate_lock;
use stackforge::manifest::Manifest;
use stackforge::presets::generate_preset;
use stackforge::statemachine::StateMachine;
use stackforge::template;
use stackforge::validation::validate_manifest;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_tracing()?;

    match cli.command {
        Commands::Synth {
            manifest,
            output,
            lock,
            dry_run,
        } => synth(manifest, output, lock, dry_run),
        Commands::Validate { manifest } => validate_cmd(manifest),
        Commands::Manifest { action } => manifest_command(action),
        Commands::Daemons {
            template,
            synth,
            api,
            sfn,
            sfn_jar,
            debug,
        } => {
            let options = DaemonOptions {
                template,
                synth,
                api,
                sfn,
                sfn_jar: sfn_jar.unwrap_or_else(daemons::jar_path),
                debug,
            };
            let code = daemons::run(&options)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Install => install(),
        Commands::Run { template, profile } => run_repl(template, &profile),
        Commands::Sm {
            template,
            endpoint,
            profile,
        } => sm_repl(template, &endpoint, &profile),
    }
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

fn synth(
    manifest_path: PathBuf,
    output: PathBuf,
    lock: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let manifest = Manifest::load(&manifest_path)?;
    let report = validate_manifest(&manifest);

    for warning in &report.warnings {
        warn!(file = %manifest_path.display(), "{warning}");
    }
    if !report.is_ok() {
        for error_msg in &report.errors {
            error!(file = %manifest_path.display(), "{error_msg}");
        }
        return Err(anyhow!(
            "Manifest validation failed with {} error(s)",
            report.errors.len()
        ));
    }

    if dry_run {
        info!(
            pipeline = %manifest.pipeline,
            deploys = manifest.deploys.len(),
            "Manifest loaded; skipping assembly"
        );
        return Ok(());
    }

    let model = assemble(&manifest)?;
    info!(
        pipeline = %model.name,
        stages = model.stages.len(),
        "Pipeline assembled"
    );

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let file = File::create(&output)
        .with_context(|| format!("Failed to create pipeline file: {}", output.display()))?;
    to_writer_pretty(file, &model)
        .with_context(|| format!("Failed to write pipeline JSON: {}", output.display()))?;
    info!(pipeline = %output.display(), "Pipeline description written");

    if let Some(lock_path) = lock {
        generate_lock(&model, manifest.version, &lock_path)?;
        info!(lockfile = %lock_path.display(), "Assembly lock written");
    }

    Ok(())
}

fn validate_cmd(manifest_path: PathBuf) -> Result<()> {
    let manifest = Manifest::load(&manifest_path)?;
    let report = validate_manifest(&manifest);

    for warning in &report.warnings {
        warn!(file = %manifest_path.display(), "{warning}");
    }

    if report.is_ok() {
        info!(file = %manifest_path.display(), "Manifest validation passed");
        Ok(())
    } else {
        for error_msg in &report.errors {
            error!(file = %manifest_path.display(), "{error_msg}");
        }
        Err(anyhow!(
            "Manifest validation failed with {} error(s)",
            report.errors.len()
        ))
    }
}

fn manifest_command(command: ManifestCommands) -> Result<()> {
    match command {
        ManifestCommands::New { preset, output } => {
            let destination =
                output.unwrap_or_else(|| PathBuf::from(format!("manifests/{preset}.yaml")));
            let generated = generate_preset(&preset, &destination)?;
            info!(
                preset = %preset,
                path = %generated.display(),
                "Preset manifest generated"
            );
            Ok(())
        }
        ManifestCommands::Lint { manifests } => lint_manifests(&manifests),
    }
}

fn lint_manifests(manifests: &[PathBuf]) -> Result<()> {
    if manifests.is_empty() {
        bail!("No manifest files supplied for linting");
    }

    let mut failures = 0usize;
    for manifest_path in manifests {
        match Manifest::load(manifest_path) {
            Ok(manifest) => {
                let report = validate_manifest(&manifest);
                for warning in &report.warnings {
                    warn!(file = %manifest_path.display(), "{warning}");
                }
                if report.is_ok() {
                    info!(file = %manifest_path.display(), "Lint passed");
                } else {
                    failures += 1;
                    for error_msg in &report.errors {
                        error!(file = %manifest_path.display(), "{error_msg}");
                    }
                }
            }
            Err(err) => {
                failures += 1;
                error!(file = %manifest_path.display(), "Failed to load manifest: {err}");
            }
        }
    }

    if failures > 0 {
        bail!("Lint failed for {failures} manifest(s)");
    }
    info!("All manifest lint checks passed");
    Ok(())
}

fn install() -> Result<()> {
    println!("Local emulator install and setup helper");
    println!("Answer 'y' to install, anything else to skip\n");

    if daemons::confirm("- Install StepFunctionsLocal?") {
        daemons::install_jar()?;
    }

    if daemons::confirm("- Show a fake [local] profile for ~/.aws/credentials?") {
        println!(
            "\n[local]\naws_access_key_id = __local__\naws_secret_access_key = XXXXXX\noutput = json\nregion = eu-west-1\n"
        );
    }

    Ok(())
}

fn resolve_template(template: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = template {
        return Ok(path);
    }
    template::discover()
        .into_iter()
        .next()
        .context("No template given and none found near the working directory")
}

fn print_choices(lambdas: &[String]) {
    println!("Choices:");
    for (idx, logical_id) in lambdas.iter().enumerate() {
        println!("[{idx}] {logical_id}");
    }
}

fn run_repl(template: Option<PathBuf>, profile: &str) -> Result<()> {
    let template_path = resolve_template(template)?;
    let document = template::load(&template_path)?;
    let lambdas = template::lambda_logical_ids(&document);
    if lambdas.is_empty() {
        bail!(
            "No function resources found in {}",
            template_path.display()
        );
    }

    println!("=== Local invoke ===");
    print_choices(&lambdas);

    let stdin = io::stdin();
    loop {
        print!("stackforge:run $ ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "exit" {
            break;
        }
        if line.is_empty() {
            print_choices(&lambdas);
            continue;
        }
        match line.parse::<usize>() {
            Ok(index) if index < lambdas.len() => {
                invoke_function(&template_path, profile, &lambdas[index])?;
            }
            _ => println!("Unrecognized input: {line}"),
        }
    }
    Ok(())
}

fn invoke_function(template_path: &Path, profile: &str, logical_id: &str) -> Result<()> {
    let mut child = Command::new("sam")
        .arg("local")
        .arg("invoke")
        .arg("--profile")
        .arg(profile)
        .arg("--template")
        .arg(template_path)
        .arg(logical_id)
        .env("SAM_CLI_TELEMETRY", "0")
        .stdin(Stdio::piped())
        .spawn()
        .context("Failed to spawn sam local invoke")?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(br#"{"status": "start"}"#)?;
    }
    let status = child.wait()?;
    if !status.success() {
        warn!(function = logical_id, %status, "local invoke failed");
    }
    Ok(())
}

fn sm_repl(template: Option<PathBuf>, endpoint: &str, profile: &str) -> Result<()> {
    println!("=== StateMachine ===");

    // Definitions extracted from the template, if one is around; a bare
    // Pass machine otherwise.
    let template_path = template.or_else(|| template::discover().into_iter().next());
    let extracted = match template_path {
        Some(path) => {
            let document = template::load(&path)?;
            template::state_machine_definitions(&document)?
        }
        None => Vec::new(),
    };
    if !extracted.is_empty() {
        println!("Definitions found in template:");
        for (logical_id, _) in &extracted {
            println!("- {logical_id}");
        }
    }
    println!("Commands: list | create <name> [logical-id] | start <arn> [input] | delete <arn> | exit");

    let stdin = io::stdin();
    loop {
        print!("stackforge:sm $ ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let mut words = line.split_whitespace();
        match words.next() {
            None => {
                println!("Commands: list | create <name> [logical-id] | start <arn> [input] | delete <arn> | exit");
            }
            Some("exit") => break,
            Some("list") => {
                sfn_cli(endpoint, profile, &["list-state-machines"])?;
            }
            Some("create") => match words.next() {
                Some(name) => {
                    let requested = words.next();
                    let selected = template::definition_for(&extracted, requested);
                    if let Some(id) = requested
                        && selected.is_none()
                    {
                        println!("No definition named '{id}' in the template");
                        continue;
                    }
                    let definition = match selected {
                        Some((logical_id, definition)) => {
                            println!("Using definition from '{logical_id}'");
                            definition.clone()
                        }
                        None => StateMachine::new().render().to_string(),
                    };
                    sfn_cli(
                        endpoint,
                        profile,
                        &[
                            "create-state-machine",
                            "--name",
                            name,
                            "--definition",
                            &definition,
                            "--role-arn",
                            "arn:aws:iam::012345678901:role/DummyRole",
                        ],
                    )?;
                }
                None => println!("Usage: create <name> [logical-id]"),
            },
            Some("start") => match words.next() {
                Some(arn) => {
                    let mut args = vec!["start-execution", "--state-machine-arn", arn];
                    let input = words.collect::<Vec<_>>().join(" ");
                    if !input.is_empty() {
                        args.push("--input");
                        args.push(&input);
                    }
                    sfn_cli(endpoint, profile, &args)?;
                }
                None => println!("Usage: start <arn> [input]"),
            },
            Some("delete") => match words.next() {
                Some(arn) => {
                    sfn_cli(endpoint, profile, &["delete-state-machine", "--state-machine-arn", arn])?;
                }
                None => println!("Usage: delete <arn>"),
            },
            Some(other) => println!("Unrecognized command: {other}"),
        }
    }
    Ok(())
}

fn sfn_cli(endpoint: &str, profile: &str, args: &[&str]) -> Result<()> {
    let status = Command::new("aws")
        .arg("stepfunctions")
        .args(args)
        .arg("--endpoint-url")
        .arg(endpoint)
        .arg("--profile")
        .arg(profile)
        .status()
        .context("Failed to run the aws CLI")?;
    if !status.success() {
        warn!(%status, "aws stepfunctions command failed");
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "stackforge",
    version,
    about = "Assemble deployment pipelines from declarative manifests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a pipeline description from a manifest
    Synth {
        manifest: PathBuf,
        #[arg(long, default_value = "pipeline.json")]
        output: PathBuf,
        #[arg(long)]
        lock: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a manifest without assembling it
    Validate { manifest: PathBuf },
    /// Generate or lint manifests
    Manifest {
        #[command(subcommand)]
        action: ManifestCommands,
    },
    /// Launch the local emulation daemons
    Daemons {
        #[arg(short, long, default_value = "template.json")]
        template: PathBuf,
        /// Run a fresh synthesis first
        #[arg(short, long)]
        synth: bool,
        /// Also start the local API gateway
        #[arg(short, long)]
        api: bool,
        /// Also start the StepFunctionsLocal emulator
        #[arg(short = 'S', long)]
        sfn: bool,
        #[arg(long)]
        sfn_jar: Option<PathBuf>,
        #[arg(short, long)]
        debug: bool,
    },
    /// Install local emulator tooling
    Install,
    /// Interactively invoke functions from a synthesized template
    Run {
        #[arg(short, long)]
        template: Option<PathBuf>,
        #[arg(short, long, default_value = "local")]
        profile: String,
    },
    /// Interactively manage state machines against a local emulator
    Sm {
        #[arg(short, long)]
        template: Option<PathBuf>,
        #[arg(short, long, default_value = "http://localhost:8083")]
        endpoint: String,
        #[arg(short, long, default_value = "local")]
        profile: String,
    },
}

#[derive(Subcommand)]
enum ManifestCommands {
    New {
        #[arg(long)]
        preset: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Lint {
        #[arg(required = true)]
        manifests: Vec<PathBuf>,
    },
}
