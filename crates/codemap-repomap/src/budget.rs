use std::collections::HashSet;

use codemap_core::CodemapError;
use serde::Serialize;

use crate::ranking::RankedEntry;
use crate::render::TreeRenderer;
use crate::tokens::TokenCounter;

/// Rough token cost of one ranked entry, used to seed the search.
const TOKENS_PER_ENTRY: usize = 25;

/// The largest rendering found that fits the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMap {
    pub text: String,
    /// Length of the ranked-list prefix that was rendered.
    pub entries_included: usize,
    pub tokens: usize,
}

/// Find the longest prefix of `entries` whose rendering stays under
/// `max_tokens`.
///
/// Binary search over the prefix length, starting from `max_tokens / 25`.
/// A candidate is kept when it is strictly under budget, non-empty, and
/// either uses more tokens than the best so far or the same tokens with more
/// entries. Returns `None` when `max_tokens` is zero or nothing fits.
///
/// # Errors
///
/// Propagates [`CodemapError::ResourceExhausted`] from rendering.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use codemap_repomap::budget::fit_to_budget;
/// use codemap_repomap::ranking::RankedEntry;
/// use codemap_repomap::render::TreeRenderer;
/// use codemap_repomap::tokens::WordCounter;
///
/// let entries: Vec<RankedEntry> = (0..10)
///     .map(|i| RankedEntry::File { rel_path: format!("f{i}.py") })
///     .collect();
/// let mut renderer = TreeRenderer::new(100);
/// let map = fit_to_budget(&entries, &HashSet::new(), 5, &WordCounter, &mut renderer)
///     .unwrap()
///     .unwrap();
/// assert_eq!(map.entries_included, 4);
/// assert!(map.tokens < 5);
/// ```
pub fn fit_to_budget(
    entries: &[RankedEntry],
    chat_files: &HashSet<String>,
    max_tokens: usize,
    counter: &dyn TokenCounter,
    renderer: &mut TreeRenderer,
) -> Result<Option<RenderedMap>, CodemapError> {
    if max_tokens == 0 {
        return Ok(None);
    }

    let mut lower = 0;
    let mut upper = entries.len();
    let mut middle = (max_tokens / TOKENS_PER_ENTRY).min(entries.len());
    let mut best: Option<RenderedMap> = None;

    while lower <= upper {
        let text = renderer.to_tree(&entries[..middle], chat_files)?;
        let tokens = counter.count(&text);
        let fits = tokens < max_tokens;

        if fits && middle > 0 {
            let better = match &best {
                None => true,
                Some(b) => {
                    tokens > b.tokens || (tokens == b.tokens && middle > b.entries_included)
                }
            };
            if better {
                best = Some(RenderedMap {
                    text,
                    entries_included: middle,
                    tokens,
                });
            }
        }

        if fits {
            lower = middle + 1;
        } else if middle == 0 {
            break;
        } else {
            upper = middle - 1;
        }
        middle = (lower + upper) / 2;
    }

    if let Some(map) = &best {
        log::debug!(
            "repo map: {} of {} entries, {} tokens (budget {max_tokens})",
            map.entries_included,
            entries.len(),
            map.tokens
        );
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::WordCounter;

    fn files(n: usize) -> Vec<RankedEntry> {
        (0..n)
            .map(|i| RankedEntry::File {
                rel_path: format!("f{i:02}.py"),
            })
            .collect()
    }

    fn fit(entries: &[RankedEntry], max_tokens: usize) -> Option<RenderedMap> {
        let mut renderer = TreeRenderer::new(100);
        fit_to_budget(entries, &HashSet::new(), max_tokens, &WordCounter, &mut renderer).unwrap()
    }

    #[test]
    fn budget_zero_returns_nothing() {
        assert!(fit(&files(3), 0).is_none());
    }

    #[test]
    fn budget_larger_than_all_returns_all() {
        let map = fit(&files(3), 1000).unwrap();
        assert_eq!(map.entries_included, 3);
        assert_eq!(map.tokens, 3);
    }

    #[test]
    fn output_stays_strictly_under_budget() {
        for max in 1..40 {
            if let Some(map) = fit(&files(30), max) {
                assert!(map.tokens < max, "max {max} gave {}", map.tokens);
                assert_eq!(WordCounter.count(&map.text), map.tokens);
            }
        }
    }

    #[test]
    fn exact_budget_excludes_the_boundary() {
        let map = fit(&files(10), 5).unwrap();
        assert_eq!(map.entries_included, 4);
    }

    #[test]
    fn larger_budgets_never_include_fewer_entries() {
        let entries = files(200);
        let mut last = 0;
        for max in (1..300).step_by(7) {
            let included = fit(&entries, max).map_or(0, |m| m.entries_included);
            assert!(included >= last, "budget {max}: {included} < {last}");
            last = included;
        }
    }

    #[test]
    fn nothing_fits_returns_none() {
        assert!(fit(&files(5), 1).is_none());
    }

    #[test]
    fn empty_entry_list_returns_none() {
        assert!(fit(&[], 100).is_none());
    }
}
