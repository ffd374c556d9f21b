use std::io::{BufRead, Write};

use citematch_core::{AnalysisSession, SuggestionStage};

use crate::output::{self, ColorMode};

/// What the user typed at a review prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Confirm(usize),
    Dismiss,
    Skip,
    Quit,
}

fn parse_answer(line: &str, candidates: usize) -> Option<Answer> {
    match line.trim() {
        "" => Some(Answer::Skip),
        "n" | "N" => Some(Answer::Dismiss),
        "q" | "Q" => Some(Answer::Quit),
        other => match other.parse::<usize>() {
            Ok(n) if (1..=candidates).contains(&n) => Some(Answer::Confirm(n - 1)),
            _ => None,
        },
    }
}

/// Tally of one review session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReviewTally {
    pub confirmed: usize,
    pub dismissed: usize,
    pub skipped: usize,
}

/// Run every suggestion stage and walk the user through its output.
///
/// Confirming or dismissing removes the suggestion from the session, so the
/// cursor only advances on skip. Returns early (with the tally so far) on
/// `q` or end of input.
pub async fn review<R: BufRead, W: Write>(
    session: &AnalysisSession,
    input: &mut R,
    w: &mut W,
    color: ColorMode,
) -> anyhow::Result<ReviewTally> {
    let mut tally = ReviewTally::default();

    for stage in SuggestionStage::ALL {
        let list = session.run_stage(stage).await?;
        writeln!(w)?;
        output::print_stage_header(w, &list, color)?;

        let mut cursor = 0;
        loop {
            // Re-read each time: a confirmation elsewhere may purge entries.
            let pending = session.suggestions(stage).unwrap_or_default();
            let Some(suggestion) = pending.get(cursor) else {
                break;
            };
            output::print_suggestion(w, stage, suggestion, color)?;

            let answer = loop {
                write!(w, "  confirm [1-{}], n = dismiss, Enter = skip, q = quit: ", suggestion.candidates.len())?;
                w.flush()?;
                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    break Answer::Quit;
                }
                match parse_answer(&line, suggestion.candidates.len()) {
                    Some(answer) => break answer,
                    None => output::print_warning(w, "unrecognized answer", color)?,
                }
            };

            match answer {
                Answer::Confirm(i) => {
                    session.confirm(stage, cursor, &suggestion.candidates[i].text)?;
                    tally.confirmed += 1;
                }
                Answer::Dismiss => {
                    session.dismiss(stage, cursor)?;
                    tally.dismissed += 1;
                }
                Answer::Skip => {
                    cursor += 1;
                    tally.skipped += 1;
                }
                Answer::Quit => return Ok(tally),
            }
        }
    }

    Ok(tally)
}
