//! Back-reference search over already coded text.
//!
//! Brute-force scan over short inputs. The chosen match is part of the
//! stream, so any faster search must keep the same tie-breaks.

use crate::count::MAX_COUNT;
use crate::delta::is_continuation;

/// Shortest back-reference worth coding.
pub const MIN_MATCH: usize = 5;

const MAX_MATCH: usize = MAX_COUNT as usize + MIN_MATCH;

/// A match inside the string being coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub len: usize,
    /// Bytes back from the cursor to the start of the source.
    pub distance: usize,
}

/// A match in line-history mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch {
    pub len: usize,
    /// Start of the source within its line.
    pub position: usize,
    /// 0 for the string being coded, `n` for the n-th most recent line.
    pub line: usize,
}

/// Common prefix of `source` and `target`, shortened so that the byte after
/// the match in `input` is not a UTF-8 continuation byte.
fn match_len(source: &[u8], input: &[u8], pos: usize) -> usize {
    let mut len = source
        .iter()
        .zip(&input[pos..])
        .take(MAX_MATCH)
        .take_while(|(a, b)| a == b)
        .count();
    while len > 0 && input.get(pos + len).copied().is_some_and(is_continuation) {
        len -= 1;
    }
    len
}

/// Longest earlier occurrence of the text at `pos`, with the source ending
/// before `pos`. Ties go to the nearest source.
pub fn find_in_string(input: &[u8], pos: usize) -> Option<Match> {
    if pos < MIN_MATCH || pos + MIN_MATCH > input.len() {
        return None;
    }
    let most = input.len() - pos;
    let mut best: Option<Match> = None;
    for start in (0..=pos - MIN_MATCH).rev() {
        let distance = pos - start;
        if distance - (MIN_MATCH - 1) > MAX_COUNT as usize {
            break;
        }
        let len = match_len(&input[start..pos], input, pos);
        if len >= MIN_MATCH && best.map_or(true, |b| len > b.len) {
            best = Some(Match { len, distance });
            if len == most {
                break;
            }
        }
    }
    best
}

/// First occurrence of the text at `pos` in the string itself (sources may
/// overlap the cursor) or in `history`, most recent line first.
///
/// The scan offset carries over from line to line: a line is searched only
/// from the offset already reached in the lines before it.
pub fn find_in_lines(input: &[u8], pos: usize, history: &[&[u8]]) -> Option<LineMatch> {
    if pos + MIN_MATCH > input.len() {
        return None;
    }
    let lines = std::iter::once(&input[..]).chain(history.iter().copied());
    let mut scanned = 0;
    for (line, text) in lines.enumerate().take(MAX_COUNT as usize + 1) {
        let limit = if line == 0 { pos } else { text.len() };
        for position in scanned..limit.min(MAX_COUNT as usize + 1) {
            let len = match_len(&text[position..], input, pos);
            if len >= MIN_MATCH {
                return Some(LineMatch { len, position, line });
            }
        }
        scanned = scanned.max(limit);
    }
    None
}
