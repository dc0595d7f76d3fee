use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use super::problem_generator::generate_problems;
use crate::metrics::{track_content_fetch, PROBLEM_LOADS_TOTAL};
use crate::models::problem::Problem;
use crate::models::ProblemOrigin;

#[async_trait]
pub trait ProblemSource: Send + Sync {
    async fn fetch_problems(&self) -> Result<Vec<Problem>>;
}

#[derive(Debug, Clone)]
pub struct LoadedProblems {
    pub problems: Vec<Problem>,
    pub origin: ProblemOrigin,
}

/// Fetches a problem set, generating one locally when the source fails or
/// returns nothing. The result is shuffled either way.
pub async fn load_problems(source: &dyn ProblemSource, fallback_count: usize) -> LoadedProblems {
    let fetched = track_content_fetch("problems", source.fetch_problems()).await;
    let mut rng = rand::rng();
    resolve_problems(fetched, fallback_count, &mut rng)
}

pub fn resolve_problems<R: Rng + ?Sized>(
    fetched: Result<Vec<Problem>>,
    fallback_count: usize,
    rng: &mut R,
) -> LoadedProblems {
    let (mut problems, origin) = match fetched {
        Ok(problems) if !problems.is_empty() => {
            tracing::info!("Loaded {} problems from content source", problems.len());
            (problems, ProblemOrigin::Source)
        }
        Ok(_) => {
            tracing::info!("Content source returned no problems, generating fallback set");
            (generate_problems(fallback_count, rng), ProblemOrigin::Fallback)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load problems ({:#}), generating fallback set",
                e
            );
            (generate_problems(fallback_count, rng), ProblemOrigin::Fallback)
        }
    };

    problems.shuffle(rng);
    PROBLEM_LOADS_TOTAL
        .with_label_values(&[origin.as_str()])
        .inc();

    LoadedProblems { problems, origin }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::problem_generator::{derivative_problem, DEFAULT_PROBLEM_COUNT};
    use anyhow::anyhow;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn dataset() -> Vec<Problem> {
        (1..=6).map(|i| derivative_problem(i, 2, 3)).collect()
    }

    #[test]
    fn keeps_source_problems_as_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let loaded = resolve_problems(Ok(dataset()), DEFAULT_PROBLEM_COUNT, &mut rng);

        assert_eq!(loaded.origin, ProblemOrigin::Source);
        let ids: HashSet<String> = loaded.problems.iter().map(|p| p.id.clone()).collect();
        let expected: HashSet<String> = dataset().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn falls_back_on_error_or_empty_set() {
        let mut rng = StdRng::seed_from_u64(1);

        let failed = resolve_problems(Err(anyhow!("connection refused")), 4, &mut rng);
        assert_eq!(failed.origin, ProblemOrigin::Fallback);
        assert_eq!(failed.problems.len(), 4);

        let empty = resolve_problems(Ok(Vec::new()), DEFAULT_PROBLEM_COUNT, &mut rng);
        assert_eq!(empty.origin, ProblemOrigin::Fallback);
        assert_eq!(empty.problems.len(), DEFAULT_PROBLEM_COUNT);
        assert!(empty
            .problems
            .iter()
            .all(|p| p.id.starts_with("fallback_derivative_")));
    }

    struct Unreachable;

    #[async_trait]
    impl ProblemSource for Unreachable {
        async fn fetch_problems(&self) -> Result<Vec<Problem>> {
            Err(anyhow!("no route to host"))
        }
    }

    #[tokio::test]
    async fn load_problems_generates_when_source_fails() {
        let loaded = load_problems(&Unreachable, 3).await;
        assert_eq!(loaded.origin, ProblemOrigin::Fallback);
        assert_eq!(loaded.problems.len(), 3);
    }
}
