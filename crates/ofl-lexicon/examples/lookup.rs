use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use ofl_lexicon::{Lexicon, LoadMode};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let lexicon_path = args.next().map(PathBuf::from).context(
        "usage: cargo run -p ofl-lexicon --example lookup -- <lexicon.tsv> <token>...",
    )?;
    let tokens: Vec<String> = args.collect();
    if tokens.is_empty() {
        bail!("usage: cargo run -p ofl-lexicon --example lookup -- <lexicon.tsv> <token>...");
    }

    let lex = Lexicon::load_with_mode(&lexicon_path, LoadMode::Mmap, true)
        .with_context(|| format!("loading lexicon from {}", lexicon_path.display()))?;

    println!("Lexicon: {}", lexicon_path.display());
    println!("Forms  : {}", lex.form_count());
    println!("Options: {:?}", lex.normalizer().options());

    for token in tokens {
        let hit = lex.lookup(&token);
        println!("\nToken: {} -> {}", token, hit.form);
        if !hit.is_hit() {
            println!("  (not in lexicon)");
            continue;
        }
        for (pos, lemma) in hit.candidates.iter() {
            println!("  {:<10} {}", pos, lemma);
        }
    }

    Ok(())
}
