//! macropass CLI - two-pass macro processor

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use macropass::{ArtifactPaths, ExpandOptions, Expander, MacroError, build_tables, tables};

#[derive(Parser)]
#[command(name = "macropass")]
#[command(version)]
#[command(about = "Two-pass macro processor for assembly-like source", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build MNT, MDT, ALA and the intermediate program from a source file
    Pass1 {
        /// Source file
        source: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Expand the intermediate program using previously written tables
    Pass2 {
        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        expand: ExpandArgs,
    },

    /// Run both passes and write every artifact
    Run {
        /// Source file
        source: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        expand: ExpandArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Directory holding the artifacts
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Args)]
struct ExpandArgs {
    /// Deepest nesting of macro invocations before expansion is aborted
    #[arg(long, default_value_t = macropass::config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Expand without a depth limit (a self-invoking macro never terminates)
    #[arg(long, conflicts_with = "max_depth")]
    no_depth_limit: bool,

    /// Print the expanded program instead of writing expanded.txt
    #[arg(long)]
    stdout: bool,
}

impl ExpandArgs {
    fn options(&self) -> ExpandOptions {
        if self.no_depth_limit {
            ExpandOptions::unbounded()
        } else {
            ExpandOptions::with_max_depth(self.max_depth)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "macropass=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(MacroError::Definition(e)) => {
            error!(line = e.line(), "macro definition rejected: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), MacroError> {
    match command {
        Commands::Pass1 { source, output } => {
            let paths = prepare_out_dir(&output.out_dir)?;
            pass1(&source, &paths)?;
            Ok(())
        }
        Commands::Pass2 { output, expand } => {
            let paths = ArtifactPaths::in_dir(&output.out_dir);
            pass2(&paths, &expand)
        }
        Commands::Run {
            source,
            output,
            expand,
        } => {
            let paths = prepare_out_dir(&output.out_dir)?;
            let (table, program) = pass1(&source, &paths)?;

            info!("Pass-II: expanding macros");
            let expander = Expander::with_options(&table, expand.options());
            let expanded = expander.expand(&program)?;
            emit(&paths, &expanded, expand.stdout)?;
            info!(lines = expanded.len(), "Pass-II done");
            Ok(())
        }
    }
}

fn prepare_out_dir(dir: &Path) -> Result<ArtifactPaths, MacroError> {
    fs::create_dir_all(dir)?;
    Ok(ArtifactPaths::in_dir(dir))
}

fn pass1(
    source: &Path,
    paths: &ArtifactPaths,
) -> Result<(macropass::MacroTable, macropass::IntermediateProgram), MacroError> {
    info!(source = %source.display(), "Pass-I: building MNT/MDT and intermediate program");
    let text = tables::read_artifact(source)?;
    let (table, program) = build_tables(&text)?;

    tables::save_pass1(paths, &table, &program)?;
    info!(
        macros = table.definitions().len(),
        mdt_lines = table.mdt().len(),
        "Pass-I done: {}, {}, {}, {}",
        paths.mnt.display(),
        paths.mdt.display(),
        paths.ala.display(),
        paths.intermediate.display()
    );
    Ok((table, program))
}

fn pass2(paths: &ArtifactPaths, expand: &ExpandArgs) -> Result<(), MacroError> {
    info!("Pass-II: expanding macros");
    let table = tables::load_tables(paths)?;
    let program = tables::load_intermediate(paths)?;

    let expander = Expander::with_options(&table, expand.options());
    let expanded = expander.expand(&program)?;
    emit(paths, &expanded, expand.stdout)?;
    info!(lines = expanded.len(), "Pass-II done");
    Ok(())
}

fn emit(paths: &ArtifactPaths, expanded: &[String], to_stdout: bool) -> Result<(), MacroError> {
    if to_stdout {
        let mut stdout = io::stdout().lock();
        stdout.write_all(tables::render_lines(expanded).as_bytes())?;
        stdout.flush()?;
    } else {
        tables::save_expanded(paths, expanded)?;
        info!(path = %paths.expanded.display(), "wrote expanded program");
    }
    Ok(())
}
