//! Scores for a multi-turn conversation evaluation.
//!
//! The conversation judge is asked for a 100-point score per model and
//! refers to the models by their 1-based position (`模型 2`, `Model 2`).
//! There is no table contract here; every `模型 N … 得分 M` pair in the
//! text sets the score of model N, later mentions overriding earlier ones.

use super::compile;
use super::table::parse_digits;
use tracing::debug;

const INDEXED_SCORE: &str =
    r"(?i)(?:模型|Model)\s*(\d+)[\s\S]*?(?:得分|分数|Score|评分|分|:|：)\s*(\d+)";

/// Per-position scores found in `text` for `count` models.
///
/// Positions the judge never scored stay `None`. Indices outside
/// `1..=count` are ignored.
pub fn indexed_scores(text: &str, count: usize) -> Vec<Option<u32>> {
    let mut scores = vec![None; count];
    let Some(re) = compile(INDEXED_SCORE) else {
        return scores;
    };

    for caps in re.captures_iter(text) {
        let index = parse_digits(&caps[1]) as usize;
        let score = parse_digits(&caps[2]);
        match index.checked_sub(1).and_then(|i| scores.get_mut(i)) {
            Some(slot) => {
                debug!(model = index, score, "Conversation score");
                *slot = Some(score);
            }
            None => debug!(model = index, "Score for unknown model position ignored"),
        }
    }

    scores
}
