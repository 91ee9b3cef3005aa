use crate::infra::{collect_form_files, load_forms};
use crate::server;
use clap::{Args, Parser, Subcommand};
use form_runner::error::AppError;
use form_runner::forms::HandlerRegistry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Form Runner",
    about = "Serve multi-page forms and lint form definitions from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check form definition files for configuration errors
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Directory of `*.json` form definitions to serve
    #[arg(long)]
    pub(crate) forms_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Form definition files, or directories containing them
    #[arg(required = true)]
    pub(crate) paths: Vec<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Check(args) => run_check(args),
    }
}

fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let registry = HandlerRegistry::standard();
    let files = collect_form_files(&args.paths)?;
    let forms = load_forms(&files)?;

    let mut failing = 0;
    for form in &forms {
        let issues = form.check(&registry);
        if issues.is_empty() {
            println!("ok    {} ({} pages)", form.id, form.pages.len());
            continue;
        }
        failing += 1;
        println!("FAIL  {} ({} issues)", form.id, issues.len());
        for issue in issues {
            println!("      - {issue}");
        }
    }

    println!("\n{} form(s) checked, {} failing", forms.len(), failing);
    if failing > 0 {
        return Err(AppError::FormCheck { failing });
    }
    Ok(())
}
