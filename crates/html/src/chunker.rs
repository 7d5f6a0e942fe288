//! Chunk plans for streaming tests.
//!
//! Provides deterministic chunk plans plus seeded fuzz plans so streaming coverage is
//! reproducible. Every split point lies on a UTF-8 char boundary.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkPlan {
    /// Chunks of `n` bytes, each extended to the next char boundary.
    Fixed(usize),
    /// Split at these byte offsets.
    Boundaries(Vec<usize>),
}

impl ChunkPlan {
    pub fn chunks<'a>(&self, input: &'a str) -> Vec<&'a str> {
        let mut cuts = match self {
            ChunkPlan::Fixed(size) => {
                let size = (*size).max(1);
                let mut cuts = Vec::new();
                let mut at = size;
                while at < input.len() {
                    while !input.is_char_boundary(at) {
                        at += 1;
                    }
                    if at >= input.len() {
                        break;
                    }
                    cuts.push(at);
                    at += size;
                }
                cuts
            }
            ChunkPlan::Boundaries(indices) => indices
                .iter()
                .copied()
                .filter(|i| *i > 0 && *i < input.len() && input.is_char_boundary(*i))
                .collect(),
        };
        cuts.sort_unstable();
        cuts.dedup();
        let mut out = Vec::with_capacity(cuts.len() + 1);
        let mut start = 0;
        for cut in cuts {
            out.push(&input[start..cut]);
            start = cut;
        }
        out.push(&input[start..]);
        out
    }
}

#[derive(Clone, Debug)]
pub struct ChunkPlanCase {
    pub label: String,
    pub plan: ChunkPlan,
}

/// Build deterministic + fuzz chunk plans for the given input.
///
/// - Deterministic includes fixed sizes and splits around `<`, `</`, `>`, and quotes.
/// - Fuzz plans are seeded for reproducibility.
pub fn build_chunk_plans(input: &str, fuzz_runs: usize, fuzz_seed: u64) -> Vec<ChunkPlanCase> {
    let mut plans = Vec::new();

    for size in [1usize, 2, 3, 4, 8, 16, 32, 64] {
        plans.push(ChunkPlanCase {
            label: format!("fixed size={size}"),
            plan: ChunkPlan::Fixed(size),
        });
    }

    let token_boundaries = token_boundary_indices(input);
    if !token_boundaries.is_empty() {
        plans.push(ChunkPlanCase {
            label: format!("token-boundaries count={}", token_boundaries.len()),
            plan: ChunkPlan::Boundaries(token_boundaries.clone()),
        });
    }

    if fuzz_runs > 0 {
        let mut candidates = char_boundaries(input);
        candidates.extend(token_boundaries);
        candidates.sort_unstable();
        candidates.dedup();
        for i in 0..fuzz_runs {
            let seed = fuzz_seed.wrapping_add(i as u64);
            let mut rng = Lcg::new(seed);
            let plan = if !candidates.is_empty() {
                let max = candidates.len().clamp(1, 32);
                let mut picks = candidates.clone();
                rng.shuffle(&mut picks);
                let count = 1 + rng.gen_range(max);
                picks.truncate(count);
                picks.sort_unstable();
                ChunkPlan::Boundaries(picks)
            } else {
                // Fallback for empty/1-byte inputs.
                ChunkPlan::Fixed(1)
            };
            plans.push(ChunkPlanCase {
                label: format!("fuzz boundaries seed=0x{seed:016x}"),
                plan,
            });
        }
    }

    plans
}

fn token_boundary_indices(input: &str) -> Vec<usize> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'<' || b == b'>' || b == b'"' || b == b'\'' {
            out.push(i);
            if i + 1 < len {
                out.push(i + 1);
            }
        }
        if b == b'<' && i + 2 < len && bytes[i + 1] == b'/' {
            out.push(i + 2);
        }
    }
    out.retain(|i| *i > 0 && *i < len);
    out.sort_unstable();
    out.dedup();
    out
}

fn char_boundaries(input: &str) -> Vec<usize> {
    input
        .char_indices()
        .map(|(idx, _)| idx)
        .filter(|idx| *idx != 0)
        .collect()
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() >> 32) as usize % upper
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.len() < 2 {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_plan_reassembles_the_input() {
        let input = "<p class='é'>naïve</p><br>";
        for case in build_chunk_plans(input, 8, 0xC0FFEE) {
            let chunks = case.plan.chunks(input);
            assert_eq!(chunks.concat(), input, "{}", case.label);
            assert!(chunks.iter().all(|c| !c.is_empty()), "{}", case.label);
        }
    }

    #[test]
    fn fuzz_plans_are_reproducible() {
        let input = "<a><b></b></a>";
        let first: Vec<ChunkPlan> = build_chunk_plans(input, 4, 7)
            .into_iter()
            .map(|c| c.plan)
            .collect();
        let second: Vec<ChunkPlan> = build_chunk_plans(input, 4, 7)
            .into_iter()
            .map(|c| c.plan)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn fixed_plans_respect_char_boundaries() {
        assert_eq!(ChunkPlan::Fixed(1).chunks("aé"), vec!["a", "é"]);
        assert_eq!(ChunkPlan::Fixed(2).chunks("éé"), vec!["é", "é"]);
        assert_eq!(ChunkPlan::Fixed(4).chunks(""), vec![""]);
    }
}
