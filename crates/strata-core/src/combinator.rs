//! Alternation path expansion
//!
//! Expands a path containing `+` alternation groups into the ordered list of
//! concrete candidate paths the resolver folds, in order.
//!
//! Segments are processed left to right over a set of in-progress segment
//! lists, starting from one empty list:
//!
//! - a plain segment is appended to every list;
//! - a group `t1+..+tn` replaces each list `L` with `L:t1 .. L:tn`, followed
//!   by `L:p1:..:pn` for every permutation `p` of the tokens.
//!
//! A single group of `n` tokens therefore yields `n + n!` candidates. The
//! growth is factorial, so groups are expected to stay small.

use crate::path::{ALTERNATION, SEGMENT_SEPARATOR};

/// Expand `path` into its candidate paths.
///
/// # Examples
///
/// ```
/// use strata_core::combinator::expand;
///
/// assert_eq!(expand("app:prod"), vec!["app:prod"]);
/// assert_eq!(
///     expand("app:eu+us"),
///     vec!["app:eu", "app:us", "app:eu:us", "app:us:eu"]
/// );
/// ```
pub fn expand(path: &str) -> Vec<String> {
    if !path.contains(ALTERNATION) {
        return vec![path.to_string()];
    }

    let mut lists: Vec<Vec<&str>> = vec![Vec::new()];
    for segment in path.split(SEGMENT_SEPARATOR) {
        let tokens: Vec<&str> = segment.split(ALTERNATION).collect();
        if tokens.len() == 1 {
            for list in &mut lists {
                list.push(segment);
            }
            continue;
        }

        let orderings = permutations(&tokens);
        let mut branched = Vec::with_capacity(lists.len() * (tokens.len() + orderings.len()));
        for list in &lists {
            for &token in &tokens {
                let mut branch = list.clone();
                branch.push(token);
                branched.push(branch);
            }
            for ordering in &orderings {
                let mut branch = list.clone();
                branch.extend(ordering.iter().copied());
                branched.push(branch);
            }
        }
        lists = branched;
    }

    lists.into_iter().map(|list| list.join(":")).collect()
}

/// All orderings of `items`, in lexicographic order of their positions.
fn permutations<T: Copy>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for (i, head) in items.iter().enumerate() {
        let rest: Vec<T> = items
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, item)| *item)
            .collect();
        for mut tail in permutations(&rest) {
            tail.insert(0, *head);
            result.push(tail);
        }
    }
    result
}
