use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

use lua_lsp::diagnostics::DiagnosticSeverity;
use lua_lsp::fs::{load_workspace, LocalFs};
use lua_lsp::{Analysis, AnalysisConfig, Compilation, Result};

#[derive(Parser, Debug)]
#[command(name = "lua-lsp", version, about = "Type analysis for annotated Lua code")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reports diagnostics for every Lua file under the given paths
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// JSON analysis configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,

        #[arg(long, short)]
        verbose: bool,
    },
}

fn init_logging(log_file: Option<&PathBuf>, verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path.file_name().map(PathBuf::from).unwrap_or_else(|| "lua-lsp.log".into());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

async fn check(paths: Vec<PathBuf>, config: Option<PathBuf>) -> Result<bool> {
    let mut config = match config {
        Some(path) => AnalysisConfig::from_file(&path)?,
        None => AnalysisConfig::default(),
    };
    if config.workspace.roots.is_empty() {
        let cwd = std::env::current_dir()?;
        config.workspace.roots = paths
            .iter()
            .filter(|path| path.is_dir())
            .map(|path| cwd.join(path))
            .collect();
    }

    let documents = load_workspace(&LocalFs::new(), &paths)?;
    let mut compilation = Compilation::with_std(config)?;
    compilation.add_documents(documents);
    let analysis = Analysis::new(compilation);

    let results = analysis.diagnose_workspace().await?;
    let compilation = analysis.compilation();
    let compilation = compilation.read().await;
    let mut has_errors = false;
    for result in results {
        let Some(document) = compilation.get_document(result.doc_id) else {
            continue;
        };
        let name = document
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| result.uri.as_str().to_string());
        for diagnostic in result.diagnostics {
            let (line, column) = document.line_index().line_col(diagnostic.range.start);
            println!(
                "{name}:{}:{}: {} [{}] {}",
                line + 1,
                column + 1,
                diagnostic.severity,
                diagnostic.code,
                diagnostic.message
            );
            has_errors |= diagnostic.severity == DiagnosticSeverity::Error;
        }
    }
    Ok(has_errors)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match args.command {
        Command::Check {
            paths,
            config,
            log_file,
            verbose,
        } => {
            let _guard = init_logging(log_file.as_ref(), verbose);
            match check(paths, config).await {
                Ok(false) => ExitCode::SUCCESS,
                Ok(true) => ExitCode::FAILURE,
                Err(err) => {
                    tracing::error!("{err}");
                    eprintln!("lua-lsp: {err}");
                    ExitCode::from(2)
                }
            }
        }
    }
}
