pub mod about;
pub mod args;

use crate::config::Config;
use crate::error::PizzaError;
use crate::harness::{CargoHarness, HarnessInvocation, TestHarness, TestOutcome};
use crate::logging::{LoggingConfig, SharedStream};
use crate::pizza::{Pizza, PizzaOperation};
use crate::status::ExitStatus;
use anyhow::Context;
use args::{Mode, ParsedArguments};
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const USAGE_HINT: &str = "pass -h or --help for usage";

/// Routes one invocation to the action its arguments select
pub struct CommandDispatcher {
    config: Config,
    operation: Box<dyn PizzaOperation>,
    harness: Box<dyn TestHarness>,
    stdout: Box<dyn Write>,
    stderr: SharedStream,
    scoped_logging: bool,
}

impl CommandDispatcher {
    pub fn new(config: Config) -> Self {
        let harness = CargoHarness::new(&config.harness);
        Self {
            config,
            operation: Box::new(Pizza),
            harness: Box::new(harness),
            stdout: Box::new(io::stdout()),
            stderr: SharedStream::stderr(),
            scoped_logging: false,
        }
    }

    #[allow(dead_code)]
    pub fn with_operation(mut self, operation: impl PizzaOperation + 'static) -> Self {
        self.operation = Box::new(operation);
        self
    }

    #[allow(dead_code)]
    pub fn with_harness(mut self, harness: impl TestHarness + 'static) -> Self {
        self.harness = Box::new(harness);
        self
    }

    /// Redirect output, and keep logging local to the current thread
    #[allow(dead_code)]
    pub fn with_output(mut self, stdout: impl Write + 'static, stderr: SharedStream) -> Self {
        self.stdout = Box::new(stdout);
        self.stderr = stderr;
        self.scoped_logging = true;
        self
    }

    /// Run a full invocation. `argv` includes the program name.
    pub async fn run(&mut self, argv: &[String]) -> ExitStatus {
        let (program, args) = match argv.split_first() {
            Some((program, args)) => (program.as_str(), args),
            None => ("pizza", argv),
        };

        // Peek at the flags that shape logging before anything can log.
        let preparsed = args::preparse_args(args);
        let verbose =
            self.config.behavior.verbose || preparsed.as_ref().is_some_and(|parsed| parsed.verbose);
        let testing = preparsed
            .as_ref()
            .is_some_and(|parsed| parsed.run_tests().is_some());

        let logging = LoggingConfig::new(self.stderr.clone(), verbose, testing);
        let _guard = if self.scoped_logging {
            Some(logging.install_scoped())
        } else {
            // Only the first dispatcher in a process owns the global subscriber.
            logging.install().ok();
            None
        };

        match self.dispatch(program, args).await {
            Ok(()) => ExitStatus::Success,
            Err(err) => {
                report(&err, verbose);
                err.exit_status()
            }
        }
    }

    async fn dispatch(&mut self, program: &str, args: &[String]) -> Result<(), PizzaError> {
        let parsed = args::parse_args(args)?;
        debug!("parsed arguments: {:?}", parsed);

        match &parsed.mode {
            Mode::RunTests(filters) => self.run_tests(program, &parsed, filters).await,
            Mode::License => self.print(&about::license_string()),
            Mode::Version => self.print(&about::version_string()),
            Mode::Help => self.print(&args::render_help()),
            Mode::Execute(values) => {
                let result = self.operation.run(values).map_err(PizzaError::Operation)?;
                self.print(&result)
            }
        }
    }

    async fn run_tests(
        &self,
        program: &str,
        parsed: &ParsedArguments,
        filters: &[String],
    ) -> Result<(), PizzaError> {
        let start_dir = self.discovery_root(parsed.sdist_dir());
        info!("running tests from: {}", start_dir.display());

        let invocation = HarnessInvocation::new(program, start_dir, filters.to_vec());
        let outcome = self
            .harness
            .run(&invocation, self.stderr.clone())
            .await
            .map_err(PizzaError::Internal)?;

        match outcome {
            TestOutcome::Passed => Ok(()),
            TestOutcome::Failed => Err(PizzaError::TestsFailed),
        }
    }

    /// `--sdist-dir`, then the configured source dir, then this package's root
    fn discovery_root(&self, sdist_dir: Option<&Path>) -> PathBuf {
        sdist_dir
            .map(Path::to_path_buf)
            .or_else(|| self.config.harness.source_dir.clone())
            .unwrap_or_else(|| package_root(Path::new(env!("CARGO_MANIFEST_DIR"))))
    }

    fn print(&mut self, text: &str) -> Result<(), PizzaError> {
        writeln!(self.stdout, "{}", text.trim_end_matches('\n'))
            .and_then(|()| self.stdout.flush())
            .context("Failed to write to stdout")
            .map_err(PizzaError::Internal)
    }
}

/// The checkout the binary was built from, or the working directory once that
/// checkout is gone (as with `cargo install`, which builds in a temporary dir).
fn package_root(built_from: &Path) -> PathBuf {
    if built_from.join("Cargo.toml").is_file() {
        return built_from.to_path_buf();
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn report(err: &PizzaError, verbose: bool) {
    match err {
        PizzaError::Usage(usage) => {
            error!("{}\n  argv: {:?}\n  {}", err, usage.argv, USAGE_HINT);
        }
        PizzaError::TestsFailed => error!("{}", err),
        PizzaError::Operation(source) if verbose => error!("{:?}", source),
        PizzaError::Operation(source) => error!("{:#}", source),
        PizzaError::Internal(source) => error!("{:?}", source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::MockTestHarness;
    use crate::logging::stream::tests::Capture;
    use crate::pizza::MockPizzaOperation;
    use tempfile::tempdir;

    struct Harnessed {
        dispatcher: CommandDispatcher,
        stdout: Capture,
        stderr: Capture,
    }

    fn dispatcher() -> Harnessed {
        let stdout = Capture::default();
        let stderr = Capture::default();
        let dispatcher = CommandDispatcher::new(Config::default())
            .with_output(stdout.clone(), SharedStream::new(stderr.clone()));
        Harnessed {
            dispatcher,
            stdout,
            stderr,
        }
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        std::iter::once("pizza")
            .chain(tokens.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_version_prints_header_and_copyright() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["--version"])).await;

        assert_eq!(status, ExitStatus::Success);
        let stdout = app.stdout.contents();
        assert!(stdout.starts_with(&about::version_header()));
        assert!(stdout.contains(about::COPYRIGHT_LINE));
    }

    #[tokio::test]
    async fn test_license_prints_license_text() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["--license"])).await;

        assert_eq!(status, ExitStatus::Success);
        assert!(app.stdout.contents().contains("Redistribution and use"));
    }

    #[tokio::test]
    async fn test_help_prints_usage() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["-h"])).await;

        assert_eq!(status, ExitStatus::Success);
        assert!(app.stdout.contents().contains(about::DESCRIPTION));
    }

    #[tokio::test]
    async fn test_conflicting_modes_are_a_usage_error() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["--license", "--version"])).await;

        assert_eq!(status, ExitStatus::Usage);
        assert_eq!(app.stdout.contents(), "");
        let stderr = app.stderr.contents();
        assert!(stderr.starts_with("log: pizza.cli: [ERROR] usage error: "), "{stderr}");
        assert!(stderr.contains("--license"), "{stderr}");
        assert!(stderr.contains("--version"), "{stderr}");
        assert!(stderr.contains(USAGE_HINT), "{stderr}");
    }

    #[tokio::test]
    async fn test_unknown_flag_is_a_usage_error() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["--anchovies"])).await;

        assert_eq!(status, ExitStatus::Usage);
        assert!(app.stderr.contents().contains("--anchovies"));
    }

    #[tokio::test]
    async fn test_values_are_passed_to_operation() {
        let mut operation = MockPizzaOperation::new();
        operation
            .expect_run()
            .withf(|values| values.to_vec() == vec!["a", "b", "c"])
            .times(1)
            .returning(|values| Ok(format!("pizza with {}", values.join("+"))));
        let mut app = dispatcher();
        app.dispatcher = app.dispatcher.with_operation(operation);

        let status = app.dispatcher.run(&argv(&["a", "b", "c"])).await;

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(app.stdout.contents(), "pizza with a+b+c\n");
    }

    #[tokio::test]
    async fn test_default_operation_echoes_values() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["a", "b", "c"])).await;

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(app.stdout.contents(), "a b c\n");
    }

    #[tokio::test]
    async fn test_operation_failure_is_reported() {
        let mut operation = MockPizzaOperation::new();
        operation
            .expect_run()
            .returning(|_| Err(anyhow::anyhow!("oven exploded")));
        let mut app = dispatcher();
        app.dispatcher = app.dispatcher.with_operation(operation);

        let status = app.dispatcher.run(&argv(&["margherita"])).await;

        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(app.stdout.contents(), "");
        assert!(app
            .stderr
            .contents()
            .contains("log: pizza.cli: [ERROR] oven exploded"));
    }

    #[tokio::test]
    async fn test_run_tests_invokes_harness_with_filters() {
        let mut harness = MockTestHarness::new();
        harness
            .expect_run()
            .withf(|invocation, _| {
                invocation.argv()
                    == vec![
                        "pizza".to_string(),
                        "discover".to_string(),
                        env!("CARGO_MANIFEST_DIR").to_string(),
                        "foo".to_string(),
                        "bar".to_string(),
                    ]
            })
            .times(1)
            .returning(|_, _| Ok(TestOutcome::Passed));
        let mut app = dispatcher();
        app.dispatcher = app.dispatcher.with_harness(harness);

        let status = app.dispatcher.run(&argv(&["--run-tests", "foo", "bar"])).await;

        assert_eq!(status, ExitStatus::Success);
    }

    #[tokio::test]
    async fn test_sdist_dir_overrides_discovery_root() {
        let checkout = tempdir().unwrap();
        let expected = checkout.path().to_path_buf();
        let mut harness = MockTestHarness::new();
        harness
            .expect_run()
            .withf(move |invocation, _| {
                invocation.start_dir == expected && invocation.filters.is_empty()
            })
            .times(1)
            .returning(|_, _| Ok(TestOutcome::Passed));
        let mut app = dispatcher();
        app.dispatcher = app.dispatcher.with_harness(harness);
        let sdist_dir = checkout.path().display().to_string();

        let status = app
            .dispatcher
            .run(&argv(&["--sdist-dir", &sdist_dir, "-T"]))
            .await;

        assert_eq!(status, ExitStatus::Success);
    }

    #[tokio::test]
    async fn test_configured_source_dir_is_used_without_sdist_dir() {
        let mut config = Config::default();
        config.harness.source_dir = Some(PathBuf::from("/opt/pizza-src"));
        let mut harness = MockTestHarness::new();
        harness
            .expect_run()
            .withf(|invocation, _| invocation.start_dir == Path::new("/opt/pizza-src"))
            .times(1)
            .returning(|_, _| Ok(TestOutcome::Passed));
        let mut dispatcher = CommandDispatcher::new(config)
            .with_output(Capture::default(), SharedStream::new(Capture::default()))
            .with_harness(harness);

        let status = dispatcher.run(&argv(&["--run-tests"])).await;

        assert_eq!(status, ExitStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_tests_exit_with_failure() {
        let mut harness = MockTestHarness::new();
        harness
            .expect_run()
            .returning(|_, _| Ok(TestOutcome::Failed));
        let mut app = dispatcher();
        app.dispatcher = app.dispatcher.with_harness(harness);

        let status = app.dispatcher.run(&argv(&["-T"])).await;

        assert_eq!(status, ExitStatus::Failure);
        assert!(app.stderr.contents().contains("one or more tests failed"));
    }

    #[tokio::test]
    async fn test_harness_error_exits_with_failure() {
        let mut harness = MockTestHarness::new();
        harness
            .expect_run()
            .returning(|_, _| Err(anyhow::anyhow!("runner missing")));
        let mut app = dispatcher();
        app.dispatcher = app.dispatcher.with_harness(harness);

        let status = app.dispatcher.run(&argv(&["-T", "foo"])).await;

        assert_eq!(status, ExitStatus::Failure);
        assert!(app.stderr.contents().contains("runner missing"));
    }

    #[tokio::test]
    async fn test_verbose_logs_parsed_arguments() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["-v", "x"])).await;

        assert_eq!(status, ExitStatus::Success);
        assert!(app
            .stderr
            .contents()
            .contains("log: pizza.cli: [DEBUG] parsed arguments:"));
    }

    #[tokio::test]
    async fn test_quiet_run_logs_nothing() {
        let mut app = dispatcher();

        let status = app.dispatcher.run(&argv(&["x"])).await;

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(app.stderr.contents(), "");
    }

    #[tokio::test]
    async fn test_configured_verbose_applies_without_flag() {
        let mut config = Config::default();
        config.behavior.verbose = true;
        let stderr = Capture::default();
        let mut dispatcher = CommandDispatcher::new(config)
            .with_output(Capture::default(), SharedStream::new(stderr.clone()));

        dispatcher.run(&argv(&["x"])).await;

        assert!(stderr.contents().contains("[DEBUG]"));
    }

    #[test]
    fn test_package_root_is_the_build_checkout_while_it_exists() {
        let checkout = tempdir().unwrap();
        std::fs::write(checkout.path().join("Cargo.toml"), "[package]\n").unwrap();

        assert_eq!(package_root(checkout.path()), checkout.path());
    }

    #[test]
    fn test_package_root_falls_back_to_working_dir() {
        let removed = tempdir().unwrap().path().to_path_buf();

        assert_eq!(package_root(&removed), env::current_dir().unwrap());
    }
}
