//! Precondition gate.
//!
//! The gate runs before anything touches the network. It checks the project
//! root marker, the credential pair, the release ref, and the automation
//! flag, in that order, and stops at the first failure. On success it hands
//! back a [`ClearedRun`], which is the only way to obtain the validated
//! release ref the pipeline needs. A failed gate therefore cannot be followed
//! by an upload or an invalidation.

use crate::config::{AUTOMATION_FLAG_VAR, EnvSnapshot};
use crate::credentials::{ACCESS_KEY_ID_VAR, Credentials, SECRET_ACCESS_KEY_VAR};
use crate::error::{PublishError, Result};
use crate::release_ref::ReleaseRef;
use camino::Utf8Path;

/// File whose presence identifies the project root.
pub const MARKER_FILE: &str = ".stork-project-root";

/// Which checks the gate enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateRequirements {
    /// Require the credential pair in the environment.
    pub require_credentials: bool,
    /// Require the automation flag to be truthy.
    pub require_automation: bool,
}

impl GateRequirements {
    /// Every check: what a real publish needs.
    pub const PUBLISH: Self = Self {
        require_credentials: true,
        require_automation: true,
    };

    /// Marker and release ref only: enough for a dry run.
    pub const DRY_RUN: Self = Self {
        require_credentials: false,
        require_automation: false,
    };

    /// Drop the automation check, keeping the rest.
    #[must_use]
    pub const fn allow_local(self) -> Self {
        Self {
            require_automation: false,
            ..self
        }
    }
}

impl Default for GateRequirements {
    fn default() -> Self {
        Self::PUBLISH
    }
}

/// Everything the gate inspects.
#[derive(Debug, Clone, Copy)]
pub struct GateInputs<'a> {
    /// Directory expected to hold [`MARKER_FILE`].
    pub project_root: &'a Utf8Path,
    /// Environment captured at startup.
    pub env: &'a EnvSnapshot,
    /// The raw release ref argument, if one was given.
    pub release_ref: Option<&'a str>,
}

/// Proof that the gate passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearedRun {
    release: ReleaseRef,
    credentials: Option<Credentials>,
}

impl ClearedRun {
    /// The validated release ref.
    #[must_use]
    pub fn release(&self) -> &ReleaseRef {
        &self.release
    }

    /// Credentials, present whenever the gate required them.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// Runs the precondition checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreconditionGate {
    requirements: GateRequirements,
}

impl PreconditionGate {
    /// Create a gate enforcing `requirements`.
    #[must_use]
    pub const fn new(requirements: GateRequirements) -> Self {
        Self { requirements }
    }

    /// Return the checks this gate enforces.
    #[must_use]
    pub const fn requirements(&self) -> GateRequirements {
        self.requirements
    }

    /// Check every precondition, short-circuiting on the first failure.
    ///
    /// The gate has no side effects beyond a metadata lookup of the marker
    /// file.
    ///
    /// # Errors
    ///
    /// - [`PublishError::NotProjectRoot`] when the marker file is absent.
    /// - [`PublishError::MissingCredentials`] naming each missing variable.
    /// - [`PublishError::MissingReleaseRef`] or
    ///   [`PublishError::InvalidReleaseRef`] for a bad argument.
    /// - [`PublishError::NotInAutomation`] when the flag is absent or falsy.
    pub fn check(&self, inputs: &GateInputs<'_>) -> Result<ClearedRun> {
        check_marker(inputs.project_root)?;

        let credentials = if self.requirements.require_credentials {
            Some(check_credentials(inputs.env)?)
        } else {
            None
        };

        let release = ReleaseRef::try_from(inputs.release_ref.unwrap_or_default())?;

        if self.requirements.require_automation && !inputs.env.in_automation() {
            return Err(PublishError::NotInAutomation {
                variable: AUTOMATION_FLAG_VAR,
            });
        }

        log::debug!("precondition gate passed for release {release}");
        Ok(ClearedRun {
            release,
            credentials,
        })
    }
}

fn check_marker(project_root: &Utf8Path) -> Result<()> {
    if project_root.join(MARKER_FILE).exists() {
        Ok(())
    } else {
        Err(PublishError::NotProjectRoot {
            root: project_root.to_owned(),
            marker: MARKER_FILE,
        })
    }
}

fn check_credentials(env: &EnvSnapshot) -> Result<Credentials> {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_owned)
    };

    match (present(&env.access_key_id), present(&env.secret_access_key)) {
        (Some(id), Some(secret)) => Ok(Credentials::new(id, secret, present(&env.session_token))),
        (id, secret) => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push(ACCESS_KEY_ID_VAR);
            }
            if secret.is_none() {
                missing.push(SECRET_ACCESS_KEY_VAR);
            }
            Err(PublishError::MissingCredentials { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Root {
        _dir: TempDir,
        path: Utf8PathBuf,
    }

    fn root(with_marker: bool) -> Root {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 path");
        if with_marker {
            std::fs::write(path.join(MARKER_FILE), "").expect("write marker");
        }
        Root { _dir: dir, path }
    }

    #[fixture]
    fn full_env() -> EnvSnapshot {
        EnvSnapshot {
            access_key_id: Some("AKID".to_owned()),
            secret_access_key: Some("secret".to_owned()),
            session_token: None,
            automation_flag: Some("true".to_owned()),
        }
    }

    fn check(
        requirements: GateRequirements,
        root: &Root,
        env: &EnvSnapshot,
        release_ref: Option<&str>,
    ) -> Result<ClearedRun> {
        PreconditionGate::new(requirements).check(&GateInputs {
            project_root: &root.path,
            env,
            release_ref,
        })
    }

    #[rstest]
    fn passes_with_every_precondition_met(full_env: EnvSnapshot) {
        let cleared = check(GateRequirements::PUBLISH, &root(true), &full_env, Some("v1.2.5"))
            .expect("gate should pass");
        assert_eq!(cleared.release().as_str(), "v1.2.5");
        assert_eq!(
            cleared.credentials().map(Credentials::access_key_id),
            Some("AKID")
        );
    }

    #[rstest]
    fn marker_is_checked_before_anything_else(full_env: EnvSnapshot) {
        let env = EnvSnapshot::default();
        let err = check(GateRequirements::PUBLISH, &root(false), &env, None)
            .expect_err("missing marker must fail");
        assert!(matches!(err, PublishError::NotProjectRoot { .. }));

        let err = check(GateRequirements::PUBLISH, &root(false), &full_env, Some("v1"))
            .expect_err("missing marker must fail");
        assert_eq!(err.kind(), ErrorKind::Context);
    }

    #[rstest]
    #[case::both(None, None, &["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"])]
    #[case::secret(Some("AKID"), None, &["AWS_SECRET_ACCESS_KEY"])]
    #[case::blank_id(Some("  "), Some("secret"), &["AWS_ACCESS_KEY_ID"])]
    fn missing_credentials_are_named(
        #[case] id: Option<&str>,
        #[case] secret: Option<&str>,
        #[case] expected: &[&str],
    ) {
        let env = EnvSnapshot {
            access_key_id: id.map(str::to_owned),
            secret_access_key: secret.map(str::to_owned),
            session_token: None,
            automation_flag: Some("true".to_owned()),
        };
        let err = check(GateRequirements::PUBLISH, &root(true), &env, Some("v1.2.5"))
            .expect_err("missing credentials must fail");
        match err {
            PublishError::MissingCredentials { missing } => assert_eq!(missing, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn credentials_are_checked_before_the_release_ref() {
        let env = EnvSnapshot::default();
        let err = check(GateRequirements::PUBLISH, &root(true), &env, None)
            .expect_err("gate must fail");
        assert_eq!(err.kind(), ErrorKind::Credential);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    #[case::separator(Some("v1/evil"))]
    fn bad_release_ref_is_a_usage_error(full_env: EnvSnapshot, #[case] release_ref: Option<&str>) {
        let err = check(GateRequirements::PUBLISH, &root(true), &full_env, release_ref)
            .expect_err("bad ref must fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[rstest]
    #[case::unset(None)]
    #[case::falsy(Some("false"))]
    fn automation_flag_is_required(mut full_env: EnvSnapshot, #[case] flag: Option<&str>) {
        full_env.automation_flag = flag.map(str::to_owned);
        let err = check(GateRequirements::PUBLISH, &root(true), &full_env, Some("v1.2.5"))
            .expect_err("missing automation flag must fail");
        assert!(matches!(err, PublishError::NotInAutomation { .. }));
    }

    #[rstest]
    fn allow_local_skips_only_the_automation_check(mut full_env: EnvSnapshot) {
        full_env.automation_flag = None;
        let requirements = GateRequirements::PUBLISH.allow_local();
        check(requirements, &root(true), &full_env, Some("v1.2.5")).expect("local run allowed");

        full_env.access_key_id = None;
        let err = check(requirements, &root(true), &full_env, Some("v1.2.5"))
            .expect_err("credentials still required");
        assert_eq!(err.kind(), ErrorKind::Credential);
    }

    #[test]
    fn dry_run_needs_only_marker_and_ref() {
        let cleared = check(
            GateRequirements::DRY_RUN,
            &root(true),
            &EnvSnapshot::default(),
            Some("v1.2.5"),
        )
        .expect("dry run gate should pass");
        assert!(cleared.credentials().is_none());
    }
}
