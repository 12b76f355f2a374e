//! titlestamp CLI - Writes the versioned title screens
//!
//! Prints the confirmation line (or the JSON stamp report) to stdout.
//! Logs go to stderr. Returns non-zero on any failure.

use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use titlestamp::{
    confirmation_message, is_semver, version_from_package_json, ComposeError, TitleScreenComposer,
    TitleScreenLayout,
    layout::LayoutError,
    version::VersionError,
};

// `--version` takes the version to stamp, so clap's own flag is off.
#[derive(Parser)]
#[command(name = "titlestamp", disable_version_flag = true)]
#[command(about = "Stamps the mod version onto the title screen images")]
struct Cli {
    /// Project root; relative layout paths resolve against it
    #[arg(short, long, default_value = ".")]
    project_dir: PathBuf,

    /// JSON layout replacing the built-in title screen layout
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Version to stamp [default: the version in <project-dir>/package.json]
    #[arg(long)]
    version: Option<String>,

    /// Print the stamp report as JSON instead of the confirmation line
    #[arg(long)]
    json: bool,

    /// Log placements and writes
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "titlestamp=debug" } else { "titlestamp=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_version(cli: &Cli) -> Result<String, VersionError> {
    match &cli.version {
        Some(version) => Ok(version.clone()),
        None => version_from_package_json(&cli.project_dir.join("package.json")),
    }
}

fn load_layout(path: Option<&Path>, project_dir: &Path) -> Result<TitleScreenLayout, LayoutError> {
    match path {
        Some(path) => TitleScreenLayout::load_from_file(path, project_dir),
        None => Ok(TitleScreenLayout::for_project(project_dir)),
    }
}

/// Stamp the title screens and return the text for stdout.
fn run(cli: &Cli) -> Result<String, CliError> {
    let version = resolve_version(cli)?;
    if !is_semver(&version) {
        tracing::warn!(%version, "Version is not SemVer; stamping it as-is");
    }

    let layout = load_layout(cli.layout.as_deref(), &cli.project_dir)?;
    let composer = TitleScreenComposer::new(layout)?;
    let report = composer.compose(&version)?;

    if cli.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(confirmation_message(&version))
    }
}

/// Stdout only ever sees output from a successful stamp.
fn finish(result: Result<String, CliError>, stdout: &mut impl Write, stderr: &mut impl Write) -> u8 {
    match result {
        Ok(output) => match writeln!(stdout, "{}", output) {
            Ok(()) => 0,
            Err(_) => 1,
        },
        Err(e) => {
            let _ = writeln!(stderr, "error: {}", e);
            1
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(&cli);
    ExitCode::from(finish(result, &mut std::io::stdout(), &mut std::io::stderr()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_version_flag_is_stamp_version() {
        let cli = Cli::try_parse_from(["titlestamp", "--version", "1.2.3"]).unwrap();
        assert_eq!(cli.version.as_deref(), Some("1.2.3"));
        assert_eq!(resolve_version(&cli).unwrap(), "1.2.3");
    }

    #[test]
    fn test_version_flag_requires_value() {
        assert!(Cli::try_parse_from(["titlestamp", "--version"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["titlestamp"]).unwrap();
        assert_eq!(cli.project_dir, PathBuf::from("."));
        assert!(cli.version.is_none());
        assert!(cli.layout.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_version_falls_back_to_package_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version": "0.24.1"}"#).unwrap();
        let project = dir.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["titlestamp", "--project-dir", project]).unwrap();
        assert_eq!(resolve_version(&cli).unwrap(), "0.24.1");
    }

    #[test]
    fn test_write_failure_prints_no_confirmation() {
        let err = CliError::Compose(ComposeError::Write {
            path: PathBuf::from("/missing/titlemenu.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        });
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        let code = finish(Err(err), &mut stdout, &mut stderr);

        assert_eq!(code, 1);
        assert!(stdout.is_empty());
        let stderr = String::from_utf8(stderr).unwrap();
        assert!(stderr.contains("titlemenu.png"));
        assert!(!stderr.contains("updated to version"));
    }

    #[test]
    fn test_failed_run_prints_no_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["titlestamp", "-p", project, "--version", "1.2.3"]).unwrap();
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());

        let code = finish(run(&cli), &mut stdout, &mut stderr);

        assert_eq!(code, 1);
        assert!(stdout.is_empty());
        assert!(!stderr.is_empty());
    }

    #[test]
    fn test_success_prints_confirmation_line() {
        let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
        let code = finish(Ok(confirmation_message("1.2.3")), &mut stdout, &mut stderr);

        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(stdout).unwrap(),
            "The title screen image was updated to version: 1.2.3\n"
        );
        assert!(stderr.is_empty());
    }
}
