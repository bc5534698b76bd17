//! Stork release publisher CLI entrypoint.
//!
//! This binary gates the run, uploads the release artefacts to the CDN
//! bucket, and invalidates the CDN cache. Exit codes: `0` on success, `1`
//! when a precondition or the configuration is rejected before anything is
//! sent, `2` when a publish starts but does not complete.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::io::Write;
use stork_publisher::aws::{AwsSession, AwsSettings};
use stork_publisher::cdn::CloudFrontClient;
use stork_publisher::cli::Cli;
use stork_publisher::config::{EnvSnapshot, Environment, PublishConfig, SystemEnvironment};
use stork_publisher::credentials::{ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR};
use stork_publisher::destination::PathResolver;
use stork_publisher::error::{PublishError, Result};
use stork_publisher::gate::{ClearedRun, GateInputs, PreconditionGate};
use stork_publisher::output::{DryRunPlan, write_stderr_line};
use stork_publisher::pipeline::PublishPipeline;
use stork_publisher::storage::S3ObjectStore;
use tracing_subscriber::EnvFilter;

/// How a run that got past the gate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Complete,
    Incomplete,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemEnvironment, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Installs a stderr subscriber; `RUST_LOG` wins over `-v`.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_err()
    {
        // A subscriber is already installed.
    }
}

fn run(
    cli: &Cli,
    env: &dyn Environment,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<RunStatus> {
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)
        .map_err(|e| PublishError::Io(e.into_io_error()))?;
    let project_root = cli.project_root_or(&cwd);
    let snapshot = EnvSnapshot::capture(env);

    let gate = PreconditionGate::new(cli.gate_requirements());
    let cleared = gate.check(&GateInputs {
        project_root: &project_root,
        env: &snapshot,
        release_ref: cli.release_ref.as_deref(),
    })?;
    let config = cli.resolve_config(&project_root)?;

    if cli.dry_run {
        return run_dry(cli, &config, &cleared, &project_root, stdout, stderr);
    }

    let credentials = cleared
        .credentials()
        .ok_or_else(|| PublishError::MissingCredentials {
            missing: vec![ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR],
        })?;
    let session = AwsSession::connect(&AwsSettings {
        region: &config.region,
        endpoint_url: config.endpoint_url.as_deref(),
        credentials,
    })?;
    let store = S3ObjectStore::new(session.clone());
    let cdn = CloudFrontClient::new(session);

    let report = PublishPipeline::new(&config, &store, &cdn)
        .quiet(cli.quiet)
        .run(&cleared, stderr);

    if cli.json {
        write_json(stdout, &report)?;
    }

    Ok(if report.succeeded() {
        RunStatus::Complete
    } else {
        RunStatus::Incomplete
    })
}

/// Prints the planned destinations without touching the network.
fn run_dry(
    cli: &Cli,
    config: &PublishConfig,
    cleared: &ClearedRun,
    project_root: &Utf8Path,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<RunStatus> {
    let plan = DryRunPlan::new(
        &PathResolver::new(&config.bucket),
        &config.manifest,
        cleared.release(),
        project_root,
        &config.distribution_id,
    );

    if cli.json {
        write_json(stdout, &plan)?;
    } else {
        write_stderr_line(stderr, plan.display_text());
    }
    Ok(RunStatus::Complete)
}

fn write_json(stdout: &mut dyn Write, value: &impl serde::Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *stdout, value).map_err(std::io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<RunStatus>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(RunStatus::Complete) => 0,
        Ok(RunStatus::Incomplete) => 2,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use stork_publisher::gate::MARKER_FILE;

    fn project(with_marker: bool) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 path");
        if with_marker {
            std::fs::write(root.join(MARKER_FILE), "").expect("write marker");
        }
        (dir, root)
    }

    fn run_with(args: &[&str], env: &HashMap<String, String>) -> (Result<RunStatus>, String) {
        let cli = Cli::parse_from(args);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let result = run(&cli, env, &mut stdout, &mut stderr);
        (result, String::from_utf8(stdout).expect("UTF-8 stdout"))
    }

    #[rstest]
    #[case::complete(Ok(RunStatus::Complete), 0)]
    #[case::incomplete(Ok(RunStatus::Incomplete), 2)]
    #[case::gate(Err(PublishError::MissingReleaseRef), 1)]
    fn exit_codes(#[case] result: Result<RunStatus>, #[case] expected: i32) {
        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(result, &mut stderr), expected);
    }

    #[test]
    fn gate_failure_is_printed() {
        let mut stderr = Vec::new();
        let err = PublishError::MissingCredentials {
            missing: vec![ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR],
        };
        exit_code_for_run_result(Err(err), &mut stderr);
        let text = String::from_utf8(stderr).expect("UTF-8 stderr");
        assert!(text.contains("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set"));
    }

    #[test]
    fn missing_credentials_stop_the_run() {
        let (_dir, root) = project(true);
        let env = HashMap::from([("GITHUB_ACTIONS".to_owned(), "true".to_owned())]);
        let (result, _) = run_with(&["stork-publish", "-C", root.as_str(), "v1.2.5"], &env);
        assert!(matches!(result, Err(PublishError::MissingCredentials { .. })));
    }

    #[test]
    fn missing_marker_stops_the_run() {
        let (_dir, root) = project(false);
        let (result, _) = run_with(
            &["stork-publish", "-C", root.as_str(), "v1.2.5"],
            &HashMap::new(),
        );
        assert!(matches!(result, Err(PublishError::NotProjectRoot { .. })));
    }

    #[test]
    fn dry_run_prints_json_plan_without_credentials() {
        let (_dir, root) = project(true);
        let (result, stdout) = run_with(
            &["stork-publish", "-C", root.as_str(), "--dry-run", "--json", "v1.2.5"],
            &HashMap::new(),
        );
        assert_eq!(result.expect("dry run succeeds"), RunStatus::Complete);
        let plan: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
        assert_eq!(plan["release"], "v1.2.5");
        assert_eq!(plan["distribution_id"], "E3PBNOZP9XRSWN");
    }
}
