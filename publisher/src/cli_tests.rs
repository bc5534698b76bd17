//! Tests for publisher CLI parsing and configuration layering.

use super::*;
use crate::artefact::ArtefactCategory;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["stork-publish", "v1.2.5"]);
    assert_eq!(cli.release_ref.as_deref(), Some("v1.2.5"));
    assert!(cli.project_root.is_none());
    assert!(cli.config.is_none());
    assert!(!cli.keep_going);
    assert!(!cli.allow_local);
    assert!(!cli.dry_run);
    assert!(!cli.json);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn release_ref_is_optional_at_parse_time() {
    let cli = Cli::parse_from(["stork-publish"]);
    assert!(cli.release_ref.is_none());
}

#[test]
fn empty_release_ref_parses() {
    let cli = Cli::parse_from(["stork-publish", ""]);
    assert_eq!(cli.release_ref.as_deref(), Some(""));
}

#[rstest]
#[case::publish(&["stork-publish", "v1"], GateRequirements::PUBLISH)]
#[case::local(&["stork-publish", "--allow-local", "v1"], GateRequirements::PUBLISH.allow_local())]
#[case::dry_run(&["stork-publish", "--dry-run", "v1"], GateRequirements::DRY_RUN)]
#[case::dry_run_wins(&["stork-publish", "--dry-run", "--allow-local", "v1"], GateRequirements::DRY_RUN)]
fn gate_requirements_follow_flags(#[case] args: &[&str], #[case] expected: GateRequirements) {
    assert_eq!(Cli::parse_from(args).gate_requirements(), expected);
}

#[rstest]
#[case(&["stork-publish"], "warn")]
#[case(&["stork-publish", "-v"], "info")]
#[case(&["stork-publish", "-vv"], "debug")]
#[case(&["stork-publish", "-vvvv"], "trace")]
fn verbosity_selects_log_filter(#[case] args: &[&str], #[case] expected: &str) {
    assert_eq!(Cli::parse_from(args).log_filter(), expected);
}

#[test]
fn quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_from(["stork-publish", "-q", "-v", "v1"]);
    assert!(result.is_err());
}

#[test]
fn zero_max_attempts_is_rejected_by_the_parser() {
    let result = Cli::try_parse_from(["stork-publish", "--max-attempts", "0", "v1"]);
    assert!(result.is_err());
}

#[test]
fn keep_going_selects_continue_policy() {
    let cli = Cli::parse_from(["stork-publish", "--keep-going", "v1"]);
    assert_eq!(cli.failure_policy(), FailurePolicy::ContinueAndReport);
}

#[test]
fn project_root_is_resolved_against_cwd() {
    let cli = Cli::parse_from(["stork-publish", "-C", "stork", "v1"]);
    assert_eq!(
        cli.project_root_or(Utf8Path::new("/home/ci")),
        Utf8PathBuf::from("/home/ci/stork")
    );
    let cli = Cli::parse_from(["stork-publish", "v1"]);
    assert_eq!(
        cli.project_root_or(Utf8Path::new("/home/ci")),
        Utf8PathBuf::from("/home/ci")
    );
}

#[test]
fn flags_override_the_config_file() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    std::fs::write(
        root.join("publish.toml"),
        concat!(
            "[publish]\n",
            "bucket = \"from-file\"\n",
            "region = \"eu-west-1\"\n",
            "[categories.platform-binary]\n",
            "bare_alias = true\n",
        ),
    )
    .expect("write config");

    let cli = Cli::parse_from([
        "stork-publish",
        "--bucket",
        "from-flag",
        "--max-attempts",
        "7",
        "v1",
    ]);
    let config = cli.resolve_config(&root).expect("config resolves");

    assert_eq!(config.bucket, "from-flag");
    assert_eq!(config.region, "eu-west-1");
    assert_eq!(config.retry.max_attempts(), 7);
    assert!(
        config
            .manifest
            .template_for(ArtefactCategory::PlatformBinary)
            .bare_alias()
    );
}

#[test]
fn explicit_config_must_exist() {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let cli = Cli::parse_from(["stork-publish", "-c", "missing.toml", "v1"]);
    let err = cli.resolve_config(&root).expect_err("missing file must fail");
    assert!(matches!(err, PublishError::InvalidConfig { .. }));
}
