use anyhow::Context as _;
use clap::Parser;
use coolfront::{grammar::CoolParser, CompileError, Config};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of the COOL source file.
    input: PathBuf,

    /// Write the parsing table of the COOL grammar to this file.
    #[arg(long, value_name = "PATH")]
    dump_table: Option<PathBuf>,

    /// Print the classes and their signatures after analysis.
    #[arg(long)]
    dump_context: bool,

    /// Print the scope tree after analysis.
    #[arg(long)]
    dump_scope: bool,

    /// Leave the `AUTO_TYPE` declarations unresolved.
    #[arg(long)]
    no_infer: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    if let Some(path) = &args.dump_table {
        let parser = CoolParser::shared()
            .map_err(|err| anyhow::anyhow!("failed to build the COOL grammar: {}", err))?;
        let table = parser.table();
        let num_conflicts = table.conflicts().count();
        if num_conflicts > 0 {
            let suffix = if num_conflicts == 1 { "" } else { "s" };
            println!(
                "[warning] The parsing table has {} conflicting cell{}. See {} for details.",
                num_conflicts,
                suffix,
                path.display()
            );
        }
        fs::write(path, table.display(parser.grammar()).to_string()).with_context(|| {
            anyhow::anyhow!("failed to write the parsing table to {}", path.display())
        })?;
    }

    let source = fs::read_to_string(&args.input)
        .with_context(|| anyhow::anyhow!("failed to read {}", args.input.display()))?;

    let mut config = Config::new();
    config.infer(!args.no_infer);

    let analysis = match config.compile(&source) {
        Ok(analysis) => analysis,
        Err(CompileError::Syntax { error, lex_errors }) => {
            for diagnostic in lex_errors.iter().chain(Some(&error)) {
                println!("{}", diagnostic);
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return Err(err).context("failed to analyze the program"),
    };

    for diagnostic in &analysis.errors {
        println!("{}", diagnostic);
    }
    if args.dump_context {
        println!("{}", analysis.context);
    }
    if args.dump_scope {
        println!("{}", analysis.scope.display(&analysis.context));
    }

    Ok(if analysis.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
