use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use clap::{Arg, CommandFactory, Parser, Subcommand};
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod analyzer;
mod batch;
mod config;
mod error;
mod heuristics;
mod hub;
mod input;
mod labels;
mod lexicon;
mod output;
mod pipeline;

use analyzer::Analyzer;
use config::{Config, Overrides, SentimentFallback};
use input::Input;
use output::Response;

#[derive(Parser)]
#[command(name = "feedback-nlp")]
#[command(about = "Classify customer feedback sentiment and category", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Feedback text, used only when stdin is empty
    feedback: Option<String>,

    /// Enable debug logging (stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: $CONFIG_DIR/feedback-nlp/config.json)
    #[arg(long = "config", global = true)]
    config_path: Option<PathBuf>,

    /// Inference endpoint base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Preferred sentiment model on the hub
    #[arg(long, global = true)]
    sentiment_model: Option<String>,

    /// Zero-shot classification model on the hub
    #[arg(long, global = true)]
    zero_shot_model: Option<String>,

    /// What to answer when no sentiment model responds (neutral, lexicon)
    #[arg(long, global = true, value_parser = SentimentFallback::from_str)]
    sentiment_fallback: Option<SentimentFallback>,

    /// Skip all model backends and use heuristics only
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify many feedback entries and summarize top issues
    Batch {
        /// CSV export (feedback column detected) or one entry per line (default: {"feedbacks": [...]} on stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Inspect and prefetch the configured hub models
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ModelsAction {
    /// List configured models and whether they are cached
    List,
    /// Resolve all configured models into the hub cache
    Fetch,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

thread_local! {
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    // stdout is reserved for the JSON response
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let trace = format!("{}\n{}", info, Backtrace::force_capture());
        error!("{}", info);
        PANIC_TRACE.with(|t| *t.borrow_mut() = Some(trace));
    }));
}

/// Run `f`, turning a panic into `(message, trace)`
fn guarded<T>(f: impl FnOnce() -> T) -> std::result::Result<T, (String, String)> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        let trace = PANIC_TRACE
            .with(|t| t.borrow_mut().take())
            .unwrap_or_else(|| message.clone());
        (message, trace)
    })
}

/// Whether `arg` spells `option` as `--long`, `--long=value` or `-s`
fn names_option(option: &Arg, arg: &str) -> bool {
    if let Some(long) = arg.strip_prefix("--") {
        let name = long.split_once('=').map_or(long, |(name, _)| name);
        return !name.is_empty() && option.get_long() == Some(name);
    }
    match option.get_short() {
        Some(short) => arg == format!("-{}", short),
        None => false,
    }
}

/// Index of the first argument that is neither a global option nor an
/// option's value: the legacy feedback argument.
fn legacy_argument(args: &[String]) -> Option<usize> {
    let command = Cli::command();
    let mut rest = args.iter().enumerate().skip(1);
    while let Some((index, arg)) = rest.next() {
        if arg == "--" {
            return rest.next().map(|(index, _)| index);
        }
        match command.get_arguments().find(|option| names_option(option, arg)) {
            Some(option) => {
                if option.get_action().takes_values() && !arg.contains('=') {
                    rest.next();
                }
            }
            None => return Some(index),
        }
    }
    None
}

/// Parse the command line into the CLI and the legacy feedback argument.
///
/// Feedback text may look like anything, a subcommand name or a flag
/// included. When clap rejects the arguments, they are parsed again without
/// the legacy argument, which is then used as the feedback.
fn parse_args(args: &[String]) -> std::result::Result<(Cli, Option<String>), clap::Error> {
    let legacy = legacy_argument(args);
    let error = match Cli::try_parse_from(args) {
        Ok(cli) => {
            let feedback = cli
                .feedback
                .clone()
                .or_else(|| legacy.and_then(|index| args.get(index).cloned()));
            return Ok((cli, feedback));
        }
        Err(e) => e,
    };
    if matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    ) {
        return Err(error);
    }

    let Some(index) = legacy else {
        return Err(error);
    };
    let without_legacy = args
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, arg)| arg);
    match Cli::try_parse_from(without_legacy) {
        Ok(cli) if cli.command.is_none() => Ok((cli, args.get(index).cloned())),
        _ => Err(error),
    }
}

fn main() {
    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let (cli, legacy_arg) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = e.print();
                }
                // Callers only read stdout, so argument errors still answer in JSON
                _ => output::emit(&Response::unavailable(e.to_string().trim())),
            }
            return;
        }
    };

    init_logging(cli.verbose);
    install_panic_hook();

    let overrides = Overrides {
        endpoint: cli.endpoint.clone(),
        sentiment_model: cli.sentiment_model.clone(),
        zero_shot_model: cli.zero_shot_model.clone(),
        sentiment_fallback: cli.sentiment_fallback,
        offline: cli.offline,
    };
    let config = Config::resolve(cli.config_path.as_deref(), &overrides);

    match cli.command {
        None => classify(input::read_stdin(legacy_arg.as_deref()), &config),
        Some(Commands::Batch { ref file }) => {
            run_batch(file.as_deref(), legacy_arg.as_deref(), &config)
        }
        Some(Commands::Models { ref action }) => {
            if let Err(e) = run_models(action, &config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Config { ref action }) => {
            if let Err(e) = run_config(action, &config, cli.config_path.as_deref()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Single feedback classification. Always prints one JSON line.
fn classify(input: Input, config: &Config) {
    let response = match input {
        Input::Feedback(text) => respond(|| Analyzer::load(config), &text),
        Input::Default => Response::default_response(),
    };
    output::emit(&response);
}

/// Analyze `feedback` with the analyzer `load` builds. Load errors and panics
/// become default responses carrying `error` (and `trace` for panics).
fn respond(load: impl FnOnce() -> Result<Analyzer>, feedback: &str) -> Response {
    guarded(|| match load() {
        Ok(analyzer) => {
            info!("Backends: {}", analyzer.backend_name());
            Response::from(analyzer.analyze(feedback))
        }
        Err(e) => {
            warn!("No inference backend: {}", e);
            Response::unavailable(e.to_string())
        }
    })
    .unwrap_or_else(|(message, trace)| Response::failure(message, trace))
}

fn run_batch(file: Option<&Path>, legacy_arg: Option<&str>, config: &Config) {
    let entries = match file {
        Some(path) => batch::read_file(path),
        None => {
            let mut raw = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
                output::emit(&serde_json::json!({ "error": format!("Cannot read stdin: {}", e) }));
                return;
            }
            if raw.is_empty() {
                // Nothing to batch, so the subcommand word was legacy feedback
                classify(input::parse(&raw, legacy_arg), config);
                return;
            }
            batch::parse_json(&raw)
        }
    };
    let entries = match entries {
        Ok(entries) => entries,
        Err(e) => {
            output::emit(&serde_json::json!({ "error": e.to_string() }));
            return;
        }
    };

    let result = guarded(|| {
        let analyzer = Analyzer::load(config).unwrap_or_else(|e| {
            warn!("No inference backend, using heuristics only: {}", e);
            Analyzer::offline(config.sentiment_fallback)
        });
        info!("Backends: {}", analyzer.backend_name());
        batch::analyze_all(&analyzer, &entries)
    });

    match result {
        Ok(report) => output::emit(&report),
        Err((message, trace)) => {
            output::emit(&serde_json::json!({ "error": message, "trace": trace }))
        }
    }
}

fn run_models(action: &ModelsAction, config: &Config) -> Result<()> {
    match action {
        ModelsAction::List => {
            hub::list_models(config);
            Ok(())
        }
        ModelsAction::Fetch => {
            info!("Resolving configured models...");
            let failed = hub::fetch_models(config)?;
            if failed > 0 {
                return Err(anyhow!("{} model(s) could not be resolved", failed));
            }
            Ok(())
        }
    }
}

fn run_config(action: &ConfigAction, config: &Config, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            config.show();
            Ok(())
        }
        ConfigAction::Init { force } => {
            let path = path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            if path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            Config::default().save_to(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlpResult;
    use crate::labels::{Category, Sentiment};
    use crate::pipeline::{LabelScore, SentimentPipeline};

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("feedback-nlp")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    /// Sentiment pipeline that panics mid-inference
    struct Exploding;

    impl SentimentPipeline for Exploding {
        fn classify(&self, _text: &str) -> NlpResult<Vec<LabelScore>> {
            panic!("tensor shape mismatch");
        }

        fn model_name(&self) -> &str {
            "exploding"
        }
    }

    #[test]
    fn test_legacy_argument_skips_global_options() {
        let cases = vec![
            (vec!["great app"], Some(1)),
            (vec!["--offline", "-v", "great app"], Some(3)),
            (vec!["--config", "cfg.json", "help"], Some(3)),
            (vec!["--config=cfg.json", "-1 stars"], Some(2)),
            (vec!["--sentiment-fallback", "lexicon", "batch"], Some(3)),
            (vec!["--offline", "--", "--offline"], Some(3)),
            (vec!["--offline", "--endpoint", "http://localhost"], None),
            (vec![], None),
        ];

        for (list, expected) in cases {
            assert_eq!(legacy_argument(&args(&list)), expected, "args: {:?}", list);
        }
    }

    #[test]
    fn test_any_text_parses_as_legacy_feedback() {
        for text in ["help", "config", "models", "-1 stars, awful", "--no-such-flag"] {
            let (cli, feedback) = parse_args(&args(&["--offline", text]))
                .unwrap_or_else(|e| panic!("{:?} rejected: {}", text, e));
            assert!(cli.command.is_none(), "text: {:?}", text);
            assert!(cli.offline);
            assert_eq!(feedback.as_deref(), Some(text));
        }
    }

    #[test]
    fn test_subcommands_still_parse() {
        let (cli, feedback) = parse_args(&args(&["batch", "--file", "feedback.csv"])).unwrap();
        assert!(matches!(cli.command, Some(Commands::Batch { file: Some(_) })));
        assert_eq!(feedback.as_deref(), Some("batch"));

        let (cli, _) = parse_args(&args(&["config", "show"])).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_unknown_option_after_feedback_is_an_error() {
        let err = parse_args(&args(&["too slow", "--no-such-flag"])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        let err = parse_args(&args(&["--help"])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_respond_with_analysis() {
        let response = respond(
            || Ok(Analyzer::offline(SentimentFallback::Neutral)),
            "Delivery was late",
        );
        assert_eq!(response.category, Category::Delivery);
        assert_eq!(response.issue.as_deref(), Some("Delivery was late"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_respond_when_backend_unavailable() {
        let response = respond(|| Err(anyhow!("hub client: no TLS backend")), "Too slow");
        assert_eq!(response.sentiment, Sentiment::Neutral);
        assert_eq!(response.category, Category::Other);
        assert_eq!(response.error.as_deref(), Some("hub client: no TLS backend"));
        assert!(response.issue.is_none());
        assert!(response.trace.is_none());
    }

    #[test]
    fn test_respond_when_inference_panics() {
        let response = respond(
            || {
                Ok(Analyzer::new(
                    Some(Box::new(Exploding)),
                    None,
                    SentimentFallback::Neutral,
                ))
            },
            "The checkout is broken",
        );
        assert_eq!(response.sentiment, Sentiment::Neutral);
        assert_eq!(response.category, Category::Other);
        assert_eq!(response.error.as_deref(), Some("tensor shape mismatch"));
        let trace = response.trace.unwrap_or_default();
        assert!(trace.contains("tensor shape mismatch"));
        assert!(response.issue.is_none());
    }

    #[test]
    fn test_guarded_passes_values_through() {
        assert_eq!(guarded(|| 7), Ok(7));
    }
}
