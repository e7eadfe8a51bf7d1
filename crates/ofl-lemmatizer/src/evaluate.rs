//! Accuracy report for reconciled output against a gold annotation.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, bail};
use ofl_types::TokenLine;
use serde::Serialize;
use tracing::warn;

/// Correct out of total.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 * 100.0 / self.total as f64
        }
    }
}

/// An `(auto pos, auto lemma)` type that was wrong at least once.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorType {
    pub pos: String,
    pub lemma: String,
    pub wrong: usize,
    pub total: usize,
    /// Gold lemmas found where this type was wrong, sorted.
    pub gold_lemmas: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Report {
    pub lemmas: Tally,
    pub pos: Tally,
    pub lemmas_by_pos: BTreeMap<String, Tally>,
    pub lemmas_by_score: BTreeMap<i32, Tally>,
    /// Most error-prone types first.
    pub errors: Vec<ErrorType>,
}

/// Compare `form pos lemma score` output with `form pos lemma` gold, line by
/// line. Both streams must have the same number of lines.
pub fn evaluate(auto: &str, gold: &str) -> Result<Report> {
    let auto: Vec<&str> = auto.lines().collect();
    let gold: Vec<&str> = gold.lines().collect();
    if auto.len() != gold.len() {
        bail!(
            "output has {} lines but gold has {}; evaluation needs aligned files",
            auto.len(),
            gold.len()
        );
    }

    let mut report = Report::default();
    let mut types: BTreeMap<(String, String), (usize, usize, Vec<String>)> = BTreeMap::new();
    for (lineno, (a, g)) in auto.iter().zip(&gold).enumerate() {
        let a = TokenLine::parse(a);
        let g = TokenLine::parse(g);
        if a.form != g.form {
            warn!("line {}: output form {:?} against gold {:?}", lineno + 1, a.form, g.form);
        }
        let (auto_pos, auto_lemma) = (a.pos.unwrap_or(""), a.lemma.unwrap_or(""));
        let (gold_pos, gold_lemma) = (g.pos.unwrap_or(""), g.lemma.unwrap_or(""));
        let correct = auto_lemma == gold_lemma;

        report.lemmas.add(correct);
        report.pos.add(auto_pos == gold_pos);
        report
            .lemmas_by_pos
            .entry(gold_pos.to_string())
            .or_default()
            .add(correct);
        match a.score.map(|s| s.trim().parse::<i32>()) {
            Some(Ok(score)) => report
                .lemmas_by_score
                .entry(score)
                .or_default()
                .add(correct),
            Some(Err(_)) => warn!(
                "line {}: score {:?} is not an integer",
                lineno + 1,
                a.score.unwrap_or("")
            ),
            None => {}
        }

        let entry = types
            .entry((auto_pos.to_string(), auto_lemma.to_string()))
            .or_default();
        entry.1 += 1;
        if !correct {
            entry.0 += 1;
            if !entry.2.iter().any(|l| l == gold_lemma) {
                entry.2.push(gold_lemma.to_string());
            }
        }
    }

    report.errors = types
        .into_iter()
        .filter(|(_, (wrong, _, _))| *wrong > 0)
        .map(|((pos, lemma), (wrong, total, mut gold_lemmas))| {
            gold_lemmas.sort();
            ErrorType {
                pos,
                lemma,
                wrong,
                total,
                gold_lemmas,
            }
        })
        .collect();
    // Highest error rate first, then most frequent.
    report.errors.sort_by(|x, y| {
        (y.wrong * x.total)
            .cmp(&(x.wrong * y.total))
            .then(y.wrong.cmp(&x.wrong))
    });
    Ok(report)
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, tally: &Tally) -> fmt::Result {
    writeln!(
        f,
        "{:<20} {:>7} {:>6} {:>7.2}",
        label,
        tally.correct,
        tally.total,
        tally.percent()
    )
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lemmas correct (tokens)")?;
        writeln!(f, "=======================")?;
        writeln!(f)?;
        writeln!(f, "{:<20} {:>7} {:>6} {:>7}", "Condition", "Correct", "Total", "Percent")?;
        row(f, "Total", &self.lemmas)?;
        row(f, "POS tags", &self.pos)?;
        for (pos, tally) in &self.lemmas_by_pos {
            row(f, &format!("POS {pos}"), tally)?;
        }
        for (score, tally) in self.lemmas_by_score.iter().rev() {
            row(f, &format!("Score {score}"), tally)?;
        }
        writeln!(f)?;
        writeln!(f, "Common errors")?;
        writeln!(f, "=============")?;
        writeln!(
            f,
            "{:<8} {:<12} {:>7} {:>6} {:>7} gold_lemmas",
            "pos_auto", "lemma_auto", "wrong", "total", "percent"
        )?;
        for e in &self.errors {
            writeln!(
                f,
                "{:<8} {:<12} {:>7} {:>6} {:>7.2} {}",
                e.pos,
                e.lemma,
                e.wrong,
                e.total,
                e.wrong as f64 * 100.0 / e.total as f64,
                e.gold_lemmas.join("|")
            )?;
        }
        Ok(())
    }
}
