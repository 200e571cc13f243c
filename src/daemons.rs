use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{error, info, warn};

/// Exit code for an emulator that dies during its startup window.
pub const STARTUP_FAILURE_EXIT: i32 = 42;

const DEFAULT_JAR_PATH: &str = "/usr/local/lib/aws/StepFunctionsLocal.jar";
const DEFAULT_JAR_URL: &str =
    "https://docs.aws.amazon.com/step-functions/latest/dg/samples/StepFunctionsLocal.tar.gz";
const LAMBDA_ENDPOINT: &str = "http://127.0.0.1:3001/";

/// StepFunctionsLocal jar location, overridable via environment, with a
/// leading `~` expanded.
pub fn jar_path() -> PathBuf {
    let raw = std::env::var("AWS_STEPFUNCTIONS_JAR")
        .unwrap_or_else(|_| DEFAULT_JAR_PATH.to_string());
    if let Some(rest) = raw.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(raw)
}

pub fn jar_url() -> String {
    std::env::var("AWS_STEPFUNCTIONS_JAR_DL").unwrap_or_else(|_| DEFAULT_JAR_URL.to_string())
}

/// Options for the local emulator set.
#[derive(Debug)]
pub struct DaemonOptions {
    pub template: PathBuf,
    /// Run a fresh synthesis before starting the emulators.
    pub synth: bool,
    pub api: bool,
    pub sfn: bool,
    pub sfn_jar: PathBuf,
    pub debug: bool,
}

/// Children spawned for the local environment, killed together on the way
/// out.
#[derive(Debug, Default)]
pub struct ProcessSet {
    children: Vec<(String, Child)>,
}

impl ProcessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, label: &str, mut command: Command) -> Result<u32> {
        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {label}"))?;
        let pid = child.id();
        info!(label, pid, "spawned local daemon");
        self.children.push((label.to_string(), child));
        Ok(pid)
    }

    /// True while the most recently spawned child is still running.
    pub fn last_alive(&mut self) -> bool {
        match self.children.last_mut() {
            Some((_, child)) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn kill_all(&mut self) {
        for (label, child) in &mut self.children {
            if let Err(err) = child.kill() {
                warn!(label = label.as_str(), %err, "failed to kill daemon");
            }
            let _ = child.wait();
        }
        self.children.clear();
        info!("all local daemons stopped");
    }
}

impl Drop for ProcessSet {
    fn drop(&mut self) {
        if !self.children.is_empty() {
            self.kill_all();
        }
    }
}

fn sam_command(subcommand: &str, template: &Path, debug: bool) -> Command {
    let mut command = Command::new("sam");
    command.arg("local").arg(subcommand);
    if debug {
        command.arg("--debug");
    }
    command.arg("-t").arg(template);
    // Keep the SAM CLI from phoning home.
    command.env("SAM_CLI_TELEMETRY", "0");
    command
}

/// Launch the local emulation processes, wait for readiness, block until
/// the user hits enter, then tear everything down. Returns the process
/// exit code: [`STARTUP_FAILURE_EXIT`] when the function emulator dies
/// while starting up, 0 otherwise.
pub fn run(options: &DaemonOptions) -> Result<i32> {
    info!(template = %options.template.display(), "starting local environment");

    if options.synth {
        let status = Command::new("cdk")
            .args(["synth", "--no-staging"])
            .status()
            .context("Failed to run synthesis")?;
        if !status.success() {
            bail!("Synthesis failed with status {status}");
        }
    }

    let mut processes = ProcessSet::new();
    processes.spawn(
        "sam local start-lambda",
        sam_command("start-lambda", &options.template, options.debug),
    )?;

    // Startup window: ten polls, half a second apart.
    for _ in 0..10 {
        if !processes.last_alive() {
            error!("start-lambda exited during startup");
            processes.kill_all();
            return Ok(STARTUP_FAILURE_EXIT);
        }
        std::thread::sleep(Duration::from_millis(500));
    }
    info!("start-lambda ready on {LAMBDA_ENDPOINT}");

    if options.api {
        processes.spawn(
            "sam local start-api",
            sam_command("start-api", &options.template, options.debug),
        )?;
        std::thread::sleep(Duration::from_secs(5));
    }

    if options.sfn {
        let mut command = Command::new("java");
        command
            .arg("-jar")
            .arg(&options.sfn_jar)
            .arg("--lambda-endpoint")
            .arg(LAMBDA_ENDPOINT);
        processes.spawn("StepFunctionsLocal", command)?;
        std::thread::sleep(Duration::from_secs(5));
    }

    println!("Hit [enter] to stop all local daemons");
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);

    processes.kill_all();
    Ok(0)
}

/// Download and unpack the StepFunctionsLocal jar if it is not already
/// installed, then report its version.
pub fn install_jar() -> Result<()> {
    let jar = jar_path();
    if !jar.is_file() {
        let directory = jar
            .parent()
            .context("Jar path has no parent directory")?
            .to_path_buf();
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create {}", directory.display()))?;

        let url = jar_url();
        info!(%url, "downloading StepFunctionsLocal");
        let status = Command::new("wget")
            .arg(&url)
            .current_dir(&directory)
            .status()
            .context("Failed to run wget")?;
        if !status.success() {
            bail!("Download failed with status {status}");
        }
        let status = Command::new("tar")
            .args(["-xzf", "StepFunctionsLocal.tar.gz"])
            .current_dir(&directory)
            .status()
            .context("Failed to run tar")?;
        if !status.success() {
            bail!("Unpack failed with status {status}");
        }
    }

    let status = Command::new("java")
        .arg("-jar")
        .arg(&jar)
        .arg("-v")
        .status()
        .context("Failed to run java")?;
    if !status.success() {
        bail!("StepFunctionsLocal version check failed with status {status}");
    }
    Ok(())
}

/// Ask a yes/no question on stdin; only a literal `y` is a yes.
pub fn confirm(prompt: &str) -> bool {
    print!("{prompt} ");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    let _ = io::stdin().lock().read_line(&mut answer);
    answer.trim() == "y"
}
