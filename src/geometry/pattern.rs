use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Pattern – what a header sequence looks like
// ---------------------------------------------------------------------------

/// The geometric pattern of a per-trace header sequence, with the
/// parameters needed to invert it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Weakly increasing or weakly decreasing throughout.
    Monotonic { min: i64, max: i64 },
    /// Ramps that reset to a lower value every `period` traces.
    Sawtooth { min: i64, max: i64, period: usize },
    /// Value held for `run` traces, then changed.
    Stairstep { min: i64, max: i64, run: usize },
    None,
}

impl Pattern {
    /// `(min, max)` of the detected pattern.
    pub fn range(&self) -> Option<(i64, i64)> {
        match *self {
            Pattern::Monotonic { min, max }
            | Pattern::Sawtooth { min, max, .. }
            | Pattern::Stairstep { min, max, .. } => Some((min, max)),
            Pattern::None => None,
        }
    }

    /// Number of lines implied by the header numbering, `max - min + 1`.
    pub fn line_count(&self) -> Option<usize> {
        self.range()
            .map(|(min, max)| (max.abs_diff(min) as usize).saturating_add(1))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Pattern::None)
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Weakly increasing or weakly decreasing, and not constant.
pub fn is_monotonic(seq: &[i64]) -> Option<Pattern> {
    let (min, max) = non_constant_range(seq)?;
    let rising = seq.windows(2).all(|w| w[1] >= w[0]);
    let falling = seq.windows(2).all(|w| w[1] <= w[0]);
    (rising || falling).then_some(Pattern::Monotonic { min, max })
}

/// Repeating ramps. Resets are the positions where the value drops; the
/// period is the modal distance between consecutive resets (the first ramp
/// counts from index 0). Every segment between resets must rise somewhere,
/// except a single trailing trace.
pub fn is_sawtooth(seq: &[i64]) -> Option<Pattern> {
    let (min, max) = non_constant_range(seq)?;
    let resets: Vec<usize> = (1..seq.len()).filter(|&i| seq[i] < seq[i - 1]).collect();
    if resets.is_empty() {
        return None;
    }

    let bounds: Vec<usize> = std::iter::once(0)
        .chain(resets.iter().copied())
        .chain(std::iter::once(seq.len()))
        .collect();
    let ramps = bounds.windows(2).all(|b| {
        let segment = &seq[b[0]..b[1]];
        (b[1] == seq.len() && segment.len() == 1) || segment.windows(2).any(|w| w[1] > w[0])
    });
    if !ramps {
        return None;
    }

    let strides: Vec<usize> = std::iter::once(0)
        .chain(resets.iter().copied())
        .collect::<Vec<_>>()
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();

    let period = consistent_mode(&strides)?;
    Some(Pattern::Sawtooth { min, max, period })
}

/// Held values. Runs are the lengths of maximal constant segments; the run
/// length is their mode and must be at least 2.
pub fn is_stairstep(seq: &[i64]) -> Option<Pattern> {
    let (min, max) = non_constant_range(seq)?;

    let mut runs = Vec::new();
    let mut current = 1usize;
    for w in seq.windows(2) {
        if w[1] == w[0] {
            current += 1;
        } else {
            runs.push(current);
            current = 1;
        }
    }
    runs.push(current);

    let run = consistent_mode(&runs)?;
    Some(Pattern::Stairstep { min, max, run })
}

/// Classify a header sequence. Sawtooth wins over stairstep, stairstep over
/// monotonic; constant, irregular or too-short input gives [`Pattern::None`].
pub fn classify(seq: &[i64]) -> Pattern {
    let pattern = is_sawtooth(seq)
        .or_else(|| is_stairstep(seq))
        .or_else(|| is_monotonic(seq))
        .unwrap_or(Pattern::None);
    log::debug!("classified {} header values as {pattern:?}", seq.len());
    pattern
}

// -- helpers --

fn non_constant_range(seq: &[i64]) -> Option<(i64, i64)> {
    if seq.len() < 2 {
        return None;
    }
    let min = *seq.iter().min()?;
    let max = *seq.iter().max()?;
    (min != max).then_some((min, max))
}

/// Modal value of `values`, provided it is at least 2 and accounts for at
/// least half of the entries. Ties go to the smaller value.
fn consistent_mode(values: &[usize]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_default() += 1;
    }
    let (mode, count) = counts
        .into_iter()
        .fold(None, |best: Option<(usize, usize)>, (v, c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((v, c)),
        })?;
    (mode >= 2 && 2 * count >= values.len()).then_some(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramps(k: i64, repeats: usize) -> Vec<i64> {
        (0..repeats).flat_map(|_| 1..=k).collect()
    }

    #[test]
    fn repeated_ramps_are_sawtooth_with_period_k() {
        for k in 2..=12 {
            let seq = ramps(k, 5);
            assert_eq!(
                classify(&seq),
                Pattern::Sawtooth { min: 1, max: k, period: k as usize },
                "k = {k}"
            );
        }
    }

    #[test]
    fn strictly_increasing_is_monotonic() {
        let seq: Vec<i64> = (100..140).step_by(2).collect();
        assert_eq!(classify(&seq), Pattern::Monotonic { min: 100, max: 138 });
    }

    #[test]
    fn decreasing_is_monotonic_not_sawtooth() {
        let seq = vec![9, 7, 5, 3, 1];
        assert_eq!(is_sawtooth(&seq), None);
        assert_eq!(classify(&seq), Pattern::Monotonic { min: 1, max: 9 });
    }

    #[test]
    fn descending_stairstep_is_not_sawtooth() {
        let seq = vec![12, 12, 12, 11, 11, 11, 10, 10, 10];
        assert_eq!(is_sawtooth(&seq), None);
        assert_eq!(classify(&seq), Pattern::Stairstep { min: 10, max: 12, run: 3 });
    }

    #[test]
    fn duplicated_descending_cdps_are_not_sawtooth() {
        let seq = vec![40, 40, 39, 39, 38, 38, 37, 37];
        assert_eq!(is_sawtooth(&seq), None);
        assert_eq!(classify(&seq), Pattern::Stairstep { min: 37, max: 40, run: 2 });
    }

    #[test]
    fn partial_last_ramp_keeps_sawtooth() {
        let seq = vec![1, 2, 3, 1, 2, 3, 1];
        assert_eq!(is_sawtooth(&seq), Some(Pattern::Sawtooth { min: 1, max: 3, period: 3 }));
    }

    #[test]
    fn held_values_are_stairstep() {
        let seq: Vec<i64> = (10..14).flat_map(|v| std::iter::repeat(v).take(4)).collect();
        assert_eq!(classify(&seq), Pattern::Stairstep { min: 10, max: 13, run: 4 });
        // Still weakly monotonic on its own.
        assert!(is_monotonic(&seq).is_some());
    }

    #[test]
    fn short_last_run_keeps_stairstep() {
        let seq = vec![1, 1, 1, 2, 2, 2, 3];
        assert_eq!(is_stairstep(&seq), Some(Pattern::Stairstep { min: 1, max: 3, run: 3 }));
    }

    #[test]
    fn degenerate_inputs_are_none() {
        assert_eq!(classify(&[]), Pattern::None);
        assert_eq!(classify(&[4]), Pattern::None);
        assert_eq!(classify(&[4, 4, 4, 4]), Pattern::None);
    }

    #[test]
    fn irregular_sequence_is_none() {
        let seq = vec![5, 1, 4, 4, 2, 9, 3, 3, 3, 8, 1];
        assert_eq!(classify(&seq), Pattern::None);
    }

    #[test]
    fn line_count_spans_header_range() {
        let p = Pattern::Sawtooth { min: 1001, max: 1100, period: 90 };
        assert_eq!(p.line_count(), Some(100));
        assert_eq!(Pattern::None.line_count(), None);
    }
}
