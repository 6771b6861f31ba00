//! Chunk planner (C10): picks per-axis chunk sizes so `product(chunks)` fits
//! the element budget while staying aligned to each variable's native file
//! chunking.

use esa_common::config::CHUNK_ELEMENT_BUDGET;

/// Plans a chunk shape for a variable whose full (post-bbox-trim) extent is
/// `sizes`, whose native per-granule chunking is `file_chunks`, and whose
/// `time` axis sits at `time_axis` (§4.10).
///
/// The time axis is always chunked at `file_chunks[time_axis]` (one granule
/// per chunk) and never searched over; every other axis is searched for the
/// chunk size that keeps the whole shape's element count within budget.
pub fn plan_chunks(file_chunks: &[usize], sizes: &[usize], time_axis: usize) -> Vec<usize> {
    let naive: Vec<usize> = sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| if i == time_axis { file_chunks[time_axis] } else { size })
        .collect();
    if product(&naive) <= CHUNK_ELEMENT_BUDGET {
        return naive;
    }

    let candidates: Vec<Vec<usize>> = sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            if i == time_axis {
                vec![file_chunks[time_axis]]
            } else {
                axis_candidates(file_chunks[i], size)
            }
        })
        .collect();

    search(&candidates, time_axis).unwrap_or_else(|| {
        tracing::warn!(?sizes, "no chunk split fits the element budget, falling back to one whole-variable chunk");
        sizes.to_vec()
    })
}

/// Valid chunk sizes for one non-time axis: multiples of `file_chunk` that
/// evenly divide `size`; if none divide evenly, the uneven sequence
/// `[file_chunk, 2*file_chunk, ..., size]`. `size` itself (one chunk
/// covering the whole axis) is always present as the last candidate, the
/// single-chunk fallback §4.10/§8 name explicitly.
fn axis_candidates(file_chunk: usize, size: usize) -> Vec<usize> {
    let file_chunk = file_chunk.clamp(1, size.max(1));
    let mut divisors: Vec<usize> = (1..=size / file_chunk)
        .map(|k| k * file_chunk)
        .filter(|c| size % c == 0)
        .collect();

    if divisors.is_empty() {
        let mut c = file_chunk;
        while c < size {
            divisors.push(c);
            c += file_chunk;
        }
    }
    if divisors.last() != Some(&size) {
        divisors.push(size);
    }
    divisors
}

/// Recursive search over the Cartesian product of per-axis candidates,
/// maximising `product(chunks)` subject to the budget and tie-breaking on
/// the smaller max-over-non-time-axes configuration (more balanced, §4.10).
fn search(candidates: &[Vec<usize>], time_axis: usize) -> Option<Vec<usize>> {
    let mut best: Option<Vec<usize>> = None;
    let mut current = vec![0usize; candidates.len()];
    search_axis(candidates, 0, &mut current, &mut best, time_axis);
    best
}

fn search_axis(
    candidates: &[Vec<usize>],
    axis: usize,
    current: &mut Vec<usize>,
    best: &mut Option<Vec<usize>>,
    time_axis: usize,
) {
    if axis == candidates.len() {
        let prod = product(current);
        if prod > CHUNK_ELEMENT_BUDGET {
            return;
        }
        let balance = max_non_time(current, time_axis);
        let replace = match best {
            None => true,
            Some(b) => {
                let best_prod = product(b);
                prod > best_prod || (prod == best_prod && balance < max_non_time(b, time_axis))
            }
        };
        if replace {
            *best = Some(current.clone());
        }
        return;
    }
    for &value in &candidates[axis] {
        current[axis] = value;
        search_axis(candidates, axis + 1, current, best, time_axis);
    }
}

fn max_non_time(chunks: &[usize], time_axis: usize) -> usize {
    chunks
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != time_axis)
        .map(|(_, &v)| v)
        .max()
        .unwrap_or(0)
}

fn product(values: &[usize]) -> usize {
    values.iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_variable_is_returned_as_a_single_chunk_with_time_at_file_granularity() {
        let chunks = plan_chunks(&[1, 17, 180, 360], &[5, 17, 180, 360], 0);
        assert_eq!(chunks[0], 1);
        assert_eq!(&chunks[1..], &[17, 180, 360]);
    }

    #[test]
    fn large_variable_splits_spatial_axes_to_stay_under_budget() {
        let file_chunks = vec![1, 17, 90, 180];
        let sizes = vec![50, 17, 180, 360];
        let chunks = plan_chunks(&file_chunks, &sizes, 0);
        assert!(chunks.iter().product::<usize>() <= CHUNK_ELEMENT_BUDGET);
        assert_eq!(chunks[0], 1);
    }

    #[test]
    fn axis_candidates_always_include_the_whole_axis_as_fallback() {
        let candidates = axis_candidates(17, 17);
        assert_eq!(candidates, vec![17]);
    }

    #[test]
    fn axis_candidates_falls_back_to_uneven_steps_when_no_divisor_fits() {
        // file_chunk=7 does not evenly divide 17: no divisor multiple of 7 divides 17.
        let candidates = axis_candidates(7, 17);
        assert_eq!(candidates, vec![7, 14, 17]);
    }

    #[test]
    fn single_chunk_fallback_when_even_the_finest_split_exceeds_budget() {
        let file_chunks = vec![1, 2_000_000];
        let sizes = vec![3, 2_000_000];
        let chunks = plan_chunks(&file_chunks, &sizes, 0);
        assert_eq!(chunks, sizes);
    }
}
