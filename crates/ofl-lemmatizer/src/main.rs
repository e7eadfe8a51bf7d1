use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ofl_compare::Corrector;
use ofl_lexicon::LoadMode;
use ofl_tagset::{Columns, Standardizer};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use ofl_lemmatizer::{
    Alignment, Compare, RunOptions, SourceConfig, Workflow, combine_files, evaluate,
    load_lexicons, lookup_stream, standardize_or_passthrough,
};

#[derive(Parser)]
#[command(name = "ofl")]
#[command(about = "Reconcile gold, lexicon, and tagger lemmas into one annotated stream")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look every token up in one or more lexicons.
    Lookup {
        input: PathBuf,
        #[arg(long = "lexicon", env = "OFL_LEXICON", required = true, num_args = 1..)]
        lexicons: Vec<PathBuf>,
        #[arg(long, env = "OFL_LEXICON_LOAD_MODE", value_parser = parse_load_mode, default_value = "mmap")]
        load_mode: LoadMode,
        #[arg(long, default_value_t = false)]
        ignore_numbers: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Translate tags onto the shared tagset with the first map that fits.
    Standardize {
        input: PathBuf,
        #[arg(long, env = "OFL_MAPS_DIR")]
        maps_dir: PathBuf,
        /// Input is lookup output; translate every POS column.
        #[arg(long, default_value_t = false)]
        lookup: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Vote several tagger `form pos lemma` files into one.
    Combine {
        #[arg(required = true)]
        taggers: Vec<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Reconcile aligned annotation files into `form pos lemma score`.
    Compare {
        #[arg(long)]
        gold_pos: Option<PathBuf>,
        #[arg(long)]
        gold_pos_lemma: Option<PathBuf>,
        #[arg(long, num_args = 1..)]
        lookup: Vec<PathBuf>,
        #[arg(long, num_args = 1..)]
        auto_pos: Vec<PathBuf>,
        #[arg(long, num_args = 1..)]
        auto_pos_lemma: Vec<PathBuf>,
        /// Lexicons listing every attested lemma.
        #[arg(long = "lexicon", num_args = 1..)]
        lexicons: Vec<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply lemma correction rules to compare output.
    Postprocess {
        input: PathBuf,
        /// Rule table replacing the built-in Old French rules.
        #[arg(long)]
        corrections: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Score compare output against gold `form pos lemma`.
    Evaluate {
        output: PathBuf,
        gold: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Standardize, look up, compare, and optionally post-process in one go.
    Lemmatize {
        tokens: PathBuf,
        #[arg(long = "tagger", num_args = 1..)]
        taggers: Vec<PathBuf>,
        #[arg(long = "lexicon", env = "OFL_LEXICON", num_args = 1..)]
        lexicons: Vec<PathBuf>,
        #[arg(long, env = "OFL_MAPS_DIR")]
        maps_dir: Option<PathBuf>,
        #[arg(long, env = "OFL_LEXICON_LOAD_MODE", value_parser = parse_load_mode)]
        load_mode: Option<LoadMode>,
        #[arg(long, default_value_t = false)]
        postprocess: bool,
        /// Rule table for post-processing; implies `--postprocess`.
        #[arg(long)]
        corrections: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Copy)]
struct RunArgs {
    /// Ignore homograph numbers on lemmas.
    #[arg(long, default_value_t = false)]
    ignore_numbers: bool,
    /// Fail on the first misaligned line instead of resynchronizing.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Lines searched ahead when resynchronizing.
    #[arg(long, default_value_t = ofl_lemmatizer::DEFAULT_WINDOW)]
    window: usize,
}

impl RunArgs {
    fn options(self) -> RunOptions {
        RunOptions {
            ignore_numbers: self.ignore_numbers,
            alignment: if self.strict {
                Alignment::Strict
            } else {
                Alignment::Resync {
                    window: self.window,
                }
            },
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Lookup {
            input,
            lexicons,
            load_mode,
            ignore_numbers,
            output,
        } => {
            let lexicon = load_lexicons(&lexicons, load_mode, ignore_numbers)?;
            let reader = BufReader::new(
                File::open(&input).with_context(|| format!("open {}", input.display()))?,
            );
            lookup_stream(reader, &lexicon, writer(output.as_deref())?)?;
        }
        Commands::Standardize {
            input,
            maps_dir,
            lookup,
            output,
        } => {
            let columns = if lookup { Columns::Lookup } else { Columns::Token };
            let standardizer = Standardizer::load_dir(&maps_dir)?;
            let scratch = tempfile::NamedTempFile::new().context("create scratch file")?;
            let result = standardize_or_passthrough(Some(&standardizer), &input, scratch.path(), columns)?;
            let text = fs::read_to_string(&result)
                .with_context(|| format!("read {}", result.display()))?;
            let mut out = writer(output.as_deref())?;
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
        Commands::Combine {
            taggers,
            run,
            output,
        } => {
            combine_files(&taggers, run.options(), writer(output.as_deref())?)?;
        }
        Commands::Compare {
            gold_pos,
            gold_pos_lemma,
            lookup,
            auto_pos,
            auto_pos_lemma,
            lexicons,
            run,
            output,
        } => {
            let config = SourceConfig {
                gold_pos,
                gold_pos_lemma,
                lookup,
                auto_pos,
                auto_pos_lemma,
            };
            let compare = Compare::with_lexicons(config, run.options(), &lexicons)?;
            compare.run(writer(output.as_deref())?)?;
        }
        Commands::Postprocess {
            input,
            corrections,
            output,
        } => {
            let corrector = load_corrector(corrections.as_deref())?;
            let text =
                fs::read_to_string(&input).with_context(|| format!("read {}", input.display()))?;
            let mut pass = corrector.pass();
            let mut out = writer(output.as_deref())?;
            for line in text.lines() {
                writeln!(out, "{}", pass.apply_line(line))?;
            }
            out.flush()?;
            info!("corrected {} lemmas", pass.corrected());
        }
        Commands::Evaluate { output, gold, json } => {
            let auto = fs::read_to_string(&output)
                .with_context(|| format!("read {}", output.display()))?;
            let gold =
                fs::read_to_string(&gold).with_context(|| format!("read {}", gold.display()))?;
            let report = evaluate(&auto, &gold)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{report}");
            }
        }
        Commands::Lemmatize {
            tokens,
            taggers,
            lexicons,
            maps_dir,
            load_mode,
            postprocess,
            corrections,
            run,
            output,
        } => {
            let workflow = Workflow {
                tokens,
                taggers,
                lexicons,
                maps_dir,
                load_mode,
                options: run.options(),
            };
            let corrector = if postprocess || corrections.is_some() {
                Some(load_corrector(corrections.as_deref())?)
            } else {
                None
            };
            workflow.run(corrector.as_ref(), writer(output.as_deref())?)?;
        }
    }

    Ok(())
}

fn load_corrector(table: Option<&Path>) -> Result<Corrector> {
    let corrector = match table {
        Some(path) => Corrector::load(path)?,
        None => Corrector::old_french()?,
    };
    info!("{} correction rules loaded", corrector.rules().len());
    Ok(corrector)
}

/// Output file, or stdout when none is given.
fn writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(io::BufWriter::new(
            File::create(path).with_context(|| format!("create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn parse_load_mode(raw: &str) -> Result<LoadMode, String> {
    LoadMode::parse(raw).ok_or_else(|| format!("unknown load mode {raw:?}, expected mmap or owned"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();
}
