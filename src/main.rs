use clap::{ArgAction, Parser, Subcommand};
use cnf_normalizer::{CnfConverter, ConversionConfig, Grammar, GrammarConfig};
use env_logger::Env;
use log::{LevelFilter, info};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// The grammar used throughout the documentation and tests
const REFERENCE_GRAMMAR: &str = r#"# Reference grammar: E is unreachable, C is nullable
<S> ::= [a, <B>]
<S> ::= [<A>, <C>]
<A> ::= [a]
<A> ::= [<A>, <C>, <S>, <C>]
<A> ::= [<B>, <C>]
<B> ::= [b]
<B> ::= [a, <A>]
<C> ::= [<B>, <A>]
<C> ::= [ε]
<E> ::= [b, <B>]
"#;

/// Context-free grammar to Chomsky Normal Form converter
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a grammar file into Chomsky Normal Form
    Convert {
        /// Grammar file (`.json` pair list or `<A> ::= [...]` rules)
        grammar_file: PathBuf,

        /// Start symbol (defaults to the first rule)
        #[arg(short, long)]
        start: Option<String>,

        /// Print the grammar after every stage
        #[arg(long)]
        steps: bool,

        /// Print JSON instead of the textual rendering
        #[arg(long)]
        json: bool,

        /// Remove symbols orphaned by non-productive symbol elimination
        #[arg(long)]
        reprune: bool,
    },
    /// Generate random strings from a grammar file
    Generate {
        /// Grammar file (`.json` pair list or `<A> ::= [...]` rules)
        grammar_file: PathBuf,

        /// Start symbol (defaults to the first rule)
        #[arg(short, long)]
        start: Option<String>,

        /// Number of strings to generate
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        /// Maximum derivation depth
        #[arg(long, default_value_t = 100)]
        max_depth: usize,

        /// Separate terminals with spaces
        #[arg(long)]
        spaced: bool,
    },
    /// Write the reference grammar to a file
    Example {
        /// Output file path
        #[arg(default_value = "reference_grammar.txt")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    logger.format_timestamp(None);
    let level = match cli.verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };
    if let Some(level) = level {
        logger.filter_level(level);
    }
    logger.init();

    match cli.command {
        Commands::Convert {
            grammar_file,
            start,
            steps,
            json,
            reprune,
        } => {
            let grammar = load_grammar(&grammar_file, start.as_deref())?;
            info!(
                "loaded {} productions from {} ({})",
                grammar.production_count(),
                grammar_file.display(),
                grammar.classify()
            );

            let converter = CnfConverter::with_config(ConversionConfig {
                reprune_after_productivity: reprune,
                ..ConversionConfig::default()
            });

            if steps {
                let conversion = converter.convert_with_trace(grammar)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&conversion)?);
                } else {
                    print!("{}", conversion);
                }
            } else {
                let cnf = converter.convert(grammar)?;
                if json {
                    println!("{}", cnf.to_json()?);
                } else {
                    print!("{}", cnf);
                }
            }
        }
        Commands::Generate {
            grammar_file,
            start,
            count,
            max_depth,
            spaced,
        } => {
            let grammar = load_grammar(&grammar_file, start.as_deref())?;
            let config = GrammarConfig {
                auto_spacing: spaced,
                max_recursion_depth: max_depth,
            };

            for i in 0..count {
                let generated = grammar.generate(&config)?;
                println!("{}. {}", i + 1, generated);
            }
        }
        Commands::Example { output } => {
            fs::write(&output, REFERENCE_GRAMMAR)?;
            println!("Created reference grammar at: {}", output.display());
        }
    }

    Ok(())
}

fn load_grammar(path: &Path, start: Option<&str>) -> Result<Grammar, Box<dyn Error>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let grammar = if is_json {
        Grammar::from_json(&fs::read_to_string(path)?, start)?
    } else {
        Grammar::from_file(path, start)?
    };
    Ok(grammar)
}
