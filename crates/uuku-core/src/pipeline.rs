//! The update run: resolve, gate, download, verify, install, sign, repair.
//!
//! Every step is awaited in order. Downloads live in a scratch directory that
//! is removed when the run returns, on success and failure alike.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuku_schema::{AssetFilename, AssetRole, CHECKSUMS_FILE, CHECKSUMS_SIGNATURE_FILE, KernelVersion};

use crate::config::Config;
use crate::error::{UpdateError, VerifyError};
use crate::gate::{self, SkipReason};
use crate::index;
use crate::io::fetch::PageFetcher;
use crate::paths::SCRATCH_PREFIX;
use crate::plan::{self, InstallPlan};
use crate::release;
use crate::reporter::Reporter;
use crate::system::{ImageSigner, IntegrityVerifier, LocalSystem, PackageManager};

/// The external capabilities a run drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn PageFetcher,
    pub system: &'a dyn LocalSystem,
    pub packages: &'a dyn PackageManager,
    pub verifier: &'a dyn IntegrityVerifier,
    pub signer: &'a dyn ImageSigner,
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Result of `uuku check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Newest upstream version, canonical form.
    pub latest: String,
    /// `uname -r` of the running kernel.
    pub running: String,
    /// Whether an update run would stop at the version gate.
    pub up_to_date: bool,
    /// Why the gate would stop it, if it would.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// What happened to each planned package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Packages the package manager accepted, in install order.
    pub installed: Vec<AssetFilename>,
    /// Packages that failed to install, with the reason.
    pub failed: Vec<(AssetFilename, String)>,
    /// Boot images signed after installation.
    pub signed: Vec<PathBuf>,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing to do; the gate stopped the run.
    UpToDate {
        version: KernelVersion,
        reason: SkipReason,
    },
    /// The build page lists no packages for this architecture and flavor.
    NothingToInstall { version: KernelVersion },
    /// Dry run: the plan that would be installed.
    Planned {
        version: KernelVersion,
        plan: InstallPlan,
    },
    /// Packages were handed to the package manager.
    Installed {
        version: KernelVersion,
        report: InstallReport,
    },
}

/// Drives one update run against a set of collaborators.
pub struct Updater<'a, R: Reporter> {
    config: &'a Config,
    deps: Collaborators<'a>,
    reporter: &'a R,
}

impl<R: Reporter> std::fmt::Debug for Updater<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Reporter> Updater<'a, R> {
    pub fn new(config: &'a Config, deps: Collaborators<'a>, reporter: &'a R) -> Self {
        Self {
            config,
            deps,
            reporter,
        }
    }

    async fn resolve_version(&self) -> Result<KernelVersion, UpdateError> {
        let index_url = self.config.index_url();
        let index_html = self.deps.fetcher.fetch_page(&index_url).await?;
        let version = index::resolve_latest_version(&index_html, self.config.prefix.as_ref())?;
        info!(version = %version, dir = version.dir_name(), "resolved latest version");
        Ok(version)
    }

    /// Compare the newest upstream version with the running kernel.
    pub async fn check(&self) -> Result<CheckReport, UpdateError> {
        let version = self.resolve_version().await?;
        let running = self.deps.system.running_release().await?;
        let skip = gate::should_skip(&version, &running, self.deps.system).await?;

        Ok(CheckReport {
            latest: version.canonical(),
            running,
            up_to_date: skip.is_some(),
            reason: skip.map(|r| r.to_string()),
        })
    }

    /// Run the update. With `dry_run`, stop after planning.
    #[instrument(skip(self), fields(arch = %self.config.arch, flavor = %self.config.flavor))]
    pub async fn run(&self, dry_run: bool) -> Result<UpdateOutcome, UpdateError> {
        let config = self.config;
        let reporter = self.reporter;

        reporter.section("Resolving");
        let version = self.resolve_version().await?;
        reporter.info(&format!("Latest version: {}", version.canonical()));

        let running = self.deps.system.running_release().await?;
        debug!(running = %running, "running kernel");
        if let Some(reason) = gate::should_skip(&version, &running, self.deps.system).await? {
            reporter.success(&format!("{} ({})", reason, version.canonical()));
            return Ok(UpdateOutcome::UpToDate { version, reason });
        }

        let page_url = config.release_page_url(&version);
        let page_html = self.deps.fetcher.fetch_page(&page_url).await?;
        let assets = release::resolve_assets(
            &page_html,
            config.arch,
            config.flavor,
            &version,
            &config.markers,
        )?;

        if assets.is_empty() {
            warn!(version = %version, arch = %config.arch, "no packages on build page");
            reporter.warning(&format!(
                "No {} {} packages found for {}; the build may have failed",
                config.arch,
                config.flavor,
                version.canonical()
            ));
            return Ok(UpdateOutcome::NothingToInstall { version });
        }

        let local: Vec<AssetFilename> = assets
            .iter()
            .map(|a| AssetFilename::new(a.local_name(config.arch)))
            .collect();
        let plan = plan::plan_install(local.iter().cloned(), config.flavor);

        if dry_run {
            return Ok(UpdateOutcome::Planned { version, plan });
        }

        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()?;
        let dir = scratch.path();

        reporter.section("Downloading");
        let manifests = [CHECKSUMS_FILE, CHECKSUMS_SIGNATURE_FILE];
        for name in local.iter().map(AssetFilename::as_str).chain(manifests) {
            reporter.fetching(name);
            let url = config.asset_url(&version, name);
            let bytes = self.deps.fetcher.download(&url, &dir.join(name)).await?;
            reporter.fetched(name, bytes);
        }

        reporter.section("Verifying");
        let statuses = self
            .deps
            .verifier
            .verify_checksums(dir, CHECKSUMS_FILE)
            .await?;
        let bad: Vec<String> = local
            .iter()
            .filter(|f| !statuses.get(f.as_str()).is_some_and(|s| s.is_ok()))
            .map(ToString::to_string)
            .collect();
        if !bad.is_empty() {
            return Err(VerifyError::ChecksumMismatch { files: bad }.into());
        }

        self.deps
            .verifier
            .ensure_trusted_key(&config.release_key)
            .await?;
        if !self
            .deps
            .verifier
            .verify_signature(dir, CHECKSUMS_SIGNATURE_FILE, CHECKSUMS_FILE)
            .await?
        {
            return Err(VerifyError::Signature {
                data: CHECKSUMS_FILE.to_string(),
            }
            .into());
        }
        reporter.success("Checksums and signature verified");

        reporter.section("Installing");
        let mut report = InstallReport::default();
        let mut installed_images = Vec::new();
        for step in plan.steps() {
            reporter.installing(&step.file);
            let result = self.deps.packages.install(&dir.join(step.file.as_str())).await;
            match result {
                Ok(status) if status.success() => {
                    reporter.installed(&step.file);
                    if step.role == AssetRole::ImageFlavor {
                        installed_images.push(step.file.clone());
                    }
                    report.installed.push(step.file.clone());
                }
                Ok(status) => {
                    let reason = status.to_string();
                    warn!(file = %step.file, %reason, "install failed");
                    reporter.install_failed(&step.file, &reason);
                    report.failed.push((step.file.clone(), reason));
                }
                Err(e) => {
                    let reason = e.to_string();
                    warn!(file = %step.file, %reason, "install failed");
                    reporter.install_failed(&step.file, &reason);
                    report.failed.push((step.file.clone(), reason));
                }
            }
        }
        drop(scratch);

        if let Some(keys) = &config.signing {
            reporter.section("Signing");
            for image in &installed_images {
                let Some(path) = image.boot_image_path(config.arch) else {
                    continue;
                };
                reporter.signing(&path);
                self.deps
                    .signer
                    .sign_image(keys, &path)
                    .await
                    .map_err(UpdateError::Signing)?;
                report.signed.push(path);
            }
        }

        reporter.section("Fixing dependencies");
        let status = self.deps.packages.fix_broken().await?;
        if !status.success() {
            return Err(UpdateError::DependencyFix {
                status: status.to_string(),
            });
        }

        reporter.success(&format!("Installed kernel {}", version.canonical()));
        Ok(UpdateOutcome::Installed { version, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuku_schema::VersionPrefix;

    use crate::config::{DEFAULT_MIRROR, SigningKeys};
    use crate::io::checksums::ChecksumStatus;
    use crate::io::fetch::FetchError;
    use crate::reporter::NullReporter;
    use crate::system::{CommandError, InstallStatus};

    const HEADERS_ALL: &str = "linux-headers-6.10.0-061000_6.10.0-061000.202407150000_all.deb";
    const HEADERS: &str = "linux-headers-6.10.0-061000-generic_6.10.0-061000.202407150000_amd64.deb";
    const MODULES: &str = "linux-modules-6.10.0-061000-generic_6.10.0-061000.202407150000_amd64.deb";
    const IMAGE: &str =
        "linux-image-unsigned-6.10.0-061000-generic_6.10.0-061000.202407150000_amd64.deb";

    fn index_html() -> String {
        ["v6.9/", "v6.9.1/", "v6.10/"]
            .iter()
            .map(|d| format!("<a href=\"{d}\">{d}</a>\n"))
            .collect()
    }

    fn release_html(version: &str, files: &[&str]) -> String {
        let arm: String = format!(
            "<p>Test arm64/build succeeded</p><a>arm64/linux-image-unsigned-{version}-0-generic_{version}_arm64.deb</a>"
        );
        let amd: String = files
            .iter()
            .map(|f| format!("<a href=\"amd64/{f}\">amd64/{f}</a><br>"))
            .collect();
        format!("<html><body>{arm}<p>Test amd64/build succeeded</p>{amd}</body></html>")
    }

    #[derive(Default)]
    struct FakeFetcher {
        pages: HashMap<String, String>,
        pages_fetched: Mutex<Vec<String>>,
        downloads: Mutex<Vec<PathBuf>>,
    }

    impl FakeFetcher {
        fn with_release(dir: &str, files: &[&str]) -> Self {
            let mut pages = HashMap::new();
            pages.insert(DEFAULT_MIRROR.to_string(), index_html());
            let canonical = KernelVersion::canonicalize(dir);
            pages.insert(
                format!("{DEFAULT_MIRROR}v{dir}/"),
                release_html(&canonical, files),
            );
            Self {
                pages,
                ..Self::default()
            }
        }

        fn downloaded_names(&self) -> Vec<String> {
            self.downloads
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
            self.pages_fetched.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn download(&self, _url: &str, dest: &Path) -> Result<u64, FetchError> {
            std::fs::write(dest, b"deb")?;
            self.downloads.lock().unwrap().push(dest.to_path_buf());
            Ok(3)
        }
    }

    struct FakeSystem {
        running: &'static str,
    }

    #[async_trait]
    impl LocalSystem for FakeSystem {
        async fn running_release(&self) -> Result<String, CommandError> {
            Ok(self.running.to_string())
        }

        async fn is_package_installed(&self, _pattern: &str) -> Result<bool, CommandError> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct FakePackages {
        fail: Vec<&'static str>,
        fix_fails: bool,
        installed: Mutex<Vec<String>>,
        fixed: Mutex<bool>,
    }

    #[async_trait]
    impl PackageManager for FakePackages {
        async fn install(&self, package: &Path) -> Result<InstallStatus, CommandError> {
            let name = package.file_name().unwrap().to_string_lossy().into_owned();
            assert!(package.exists(), "{name} was not downloaded");
            let status = if self.fail.iter().any(|f| *f == name) {
                InstallStatus::Failed(Some(1))
            } else {
                InstallStatus::Success
            };
            self.installed.lock().unwrap().push(name);
            Ok(status)
        }

        async fn fix_broken(&self) -> Result<InstallStatus, CommandError> {
            *self.fixed.lock().unwrap() = true;
            Ok(if self.fix_fails {
                InstallStatus::Failed(Some(100))
            } else {
                InstallStatus::Success
            })
        }
    }

    #[derive(Default)]
    struct FakeVerifier {
        corrupt: Vec<&'static str>,
        bad_signature: bool,
    }

    #[async_trait]
    impl IntegrityVerifier for FakeVerifier {
        async fn verify_checksums(
            &self,
            dir: &Path,
            _manifest: &str,
        ) -> Result<BTreeMap<String, ChecksumStatus>, VerifyError> {
            let mut statuses = BTreeMap::new();
            for entry in std::fs::read_dir(dir)? {
                let name = entry?.file_name().to_string_lossy().into_owned();
                let status = if self.corrupt.iter().any(|c| *c == name) {
                    ChecksumStatus::Mismatch {
                        expected: "00".to_string(),
                        actual: "ff".to_string(),
                    }
                } else {
                    ChecksumStatus::Ok
                };
                statuses.insert(name, status);
            }
            Ok(statuses)
        }

        async fn verify_signature(
            &self,
            _dir: &Path,
            _signature: &str,
            _data: &str,
        ) -> Result<bool, VerifyError> {
            Ok(!self.bad_signature)
        }

        async fn ensure_trusted_key(&self, _key_id: &str) -> Result<(), VerifyError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSigner {
        signed: Mutex<Vec<(PathBuf, PathBuf)>>,
    }

    #[async_trait]
    impl ImageSigner for FakeSigner {
        async fn sign_image(&self, keys: &SigningKeys, image: &Path) -> Result<(), CommandError> {
            self.signed
                .lock()
                .unwrap()
                .push((keys.dir().to_path_buf(), image.to_path_buf()));
            Ok(())
        }
    }

    struct Harness {
        fetcher: FakeFetcher,
        system: FakeSystem,
        packages: FakePackages,
        verifier: FakeVerifier,
        signer: FakeSigner,
    }

    impl Harness {
        fn new(fetcher: FakeFetcher) -> Self {
            Self {
                fetcher,
                system: FakeSystem {
                    running: "6.9.0-060900-generic",
                },
                packages: FakePackages::default(),
                verifier: FakeVerifier::default(),
                signer: FakeSigner::default(),
            }
        }

        fn deps(&self) -> Collaborators<'_> {
            Collaborators {
                fetcher: &self.fetcher,
                system: &self.system,
                packages: &self.packages,
                verifier: &self.verifier,
                signer: &self.signer,
            }
        }

        async fn run(&self, config: &Config, dry_run: bool) -> Result<UpdateOutcome, UpdateError> {
            Updater::new(config, self.deps(), &NullReporter)
                .run(dry_run)
                .await
        }

        fn installed(&self) -> Vec<String> {
            self.packages.installed.lock().unwrap().clone()
        }

        fn scratch_dirs(&self) -> Vec<PathBuf> {
            self.fetcher
                .downloads
                .lock()
                .unwrap()
                .iter()
                .filter_map(|p| p.parent().map(Path::to_path_buf))
                .collect()
        }
    }

    fn all_files() -> Vec<&'static str> {
        vec![IMAGE, MODULES, HEADERS, HEADERS_ALL]
    }

    #[tokio::test]
    async fn test_end_to_end_installs_latest_in_role_order() {
        let h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        let config = Config::default();

        let outcome = h.run(&config, false).await.unwrap();

        let (version, report) = match outcome {
            UpdateOutcome::Installed { version, report } => (version, report),
            other => panic!("expected an install, got {other:?}"),
        };
        assert_eq!(version.canonical(), "6.10.0");
        assert_eq!(h.installed(), vec![HEADERS_ALL, HEADERS, MODULES, IMAGE]);
        assert!(report.failed.is_empty());
        assert!(report.signed.is_empty());
        assert!(*h.packages.fixed.lock().unwrap());

        let downloaded = h.fetcher.downloaded_names();
        assert!(downloaded.contains(&CHECKSUMS_FILE.to_string()));
        assert!(downloaded.contains(&CHECKSUMS_SIGNATURE_FILE.to_string()));
        assert!(!downloaded.iter().any(|f| f.contains("arm64")));
    }

    #[tokio::test]
    async fn test_scratch_dir_is_removed_after_run() {
        let h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        h.run(&Config::default(), false).await.unwrap();

        let dirs = h.scratch_dirs();
        assert!(!dirs.is_empty());
        assert!(dirs.iter().all(|d| !d.exists()));
    }

    #[tokio::test]
    async fn test_prefix_selects_series_latest() {
        let h = Harness::new(FakeFetcher::with_release("6.9.1", &[]));
        let config = Config {
            prefix: Some(VersionPrefix::parse("6.9").unwrap()),
            ..Config::default()
        };

        let outcome = h.run(&config, true).await.unwrap();
        let version = match outcome {
            UpdateOutcome::NothingToInstall { version } => version,
            other => panic!("expected no packages, got {other:?}"),
        };
        assert_eq!(version.canonical(), "6.9.1");
        assert!(
            h.fetcher
                .pages_fetched
                .lock()
                .unwrap()
                .contains(&format!("{DEFAULT_MIRROR}v6.9.1/"))
        );
    }

    #[tokio::test]
    async fn test_running_latest_downloads_nothing() {
        let mut h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        h.system.running = "6.10.0-061000-generic";

        let outcome = h.run(&Config::default(), false).await.unwrap();

        assert!(matches!(
            outcome,
            UpdateOutcome::UpToDate {
                reason: SkipReason::RunningLatest,
                ..
            }
        ));
        assert!(h.fetcher.downloads.lock().unwrap().is_empty());
        assert_eq!(h.fetcher.pages_fetched.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_downloading() {
        let h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));

        let outcome = h.run(&Config::default(), true).await.unwrap();

        let plan = match outcome {
            UpdateOutcome::Planned { plan, .. } => plan,
            other => panic!("expected a plan, got {other:?}"),
        };
        let files: Vec<&str> = plan.files().map(AssetFilename::as_str).collect();
        assert_eq!(files, vec![HEADERS_ALL, HEADERS, MODULES, IMAGE]);
        assert!(h.fetcher.downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checksum_mismatch_aborts_before_install() {
        let mut h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        h.verifier.corrupt = vec![MODULES, IMAGE];

        let err = h.run(&Config::default(), false).await.unwrap_err();

        let UpdateError::Verify(VerifyError::ChecksumMismatch { files }) = &err else {
            panic!("expected checksum failure, got {err:?}");
        };
        assert_eq!(files, &vec![IMAGE.to_string(), MODULES.to_string()]);
        assert_eq!(err.exit_code(), 3);
        assert!(h.installed().is_empty());
        assert!(h.scratch_dirs().iter().all(|d| !d.exists()));
    }

    #[tokio::test]
    async fn test_bad_signature_aborts_before_install() {
        let mut h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        h.verifier.bad_signature = true;

        let err = h.run(&Config::default(), false).await.unwrap_err();

        assert_eq!(err.exit_code(), 6);
        assert!(h.installed().is_empty());
    }

    #[tokio::test]
    async fn test_failed_install_continues() {
        let mut h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        h.packages.fail = vec![HEADERS];

        let outcome = h.run(&Config::default(), false).await.unwrap();

        let report = match outcome {
            UpdateOutcome::Installed { report, .. } => report,
            other => panic!("expected an install, got {other:?}"),
        };
        assert_eq!(h.installed().len(), 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.as_str(), HEADERS);
    }

    #[tokio::test]
    async fn test_dependency_fix_failure_is_the_result() {
        let mut h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        h.packages.fix_fails = true;

        let err = h.run(&Config::default(), false).await.unwrap_err();

        assert!(matches!(err, UpdateError::DependencyFix { .. }));
        assert_eq!(err.exit_code(), 7);
    }

    #[tokio::test]
    async fn test_installed_image_is_signed() {
        let keys = tempfile::tempdir().unwrap();
        std::fs::write(keys.path().join("MOK.priv"), "key").unwrap();
        std::fs::write(keys.path().join("MOK.pem"), "cert").unwrap();
        let config = Config {
            signing: Some(SigningKeys::new(keys.path().to_path_buf()).unwrap()),
            ..Config::default()
        };
        let h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));

        let outcome = h.run(&config, false).await.unwrap();

        let signed = h.signer.signed.lock().unwrap().clone();
        assert_eq!(
            signed,
            vec![(
                keys.path().to_path_buf(),
                PathBuf::from("/boot/vmlinuz-6.10.0-061000-generic")
            )]
        );
        assert!(matches!(outcome, UpdateOutcome::Installed { .. }));
    }

    #[tokio::test]
    async fn test_no_versions_is_an_error() {
        let h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        let config = Config {
            prefix: Some(VersionPrefix::parse("7").unwrap()),
            ..Config::default()
        };

        let err = h.run(&config, false).await.unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_check_reports_update() {
        let h = Harness::new(FakeFetcher::with_release("6.10", &all_files()));
        let config = Config::default();
        let report = Updater::new(&config, h.deps(), &NullReporter)
            .check()
            .await
            .unwrap();

        assert_eq!(report.latest, "6.10.0");
        assert!(!report.up_to_date);
        assert!(report.reason.is_none());
    }
}
