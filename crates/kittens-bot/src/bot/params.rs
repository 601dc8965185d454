/// Search budget for [`DeterminizedBot`](super::DeterminizedBot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotParams {
    /// Hidden states sampled from the belief per decision (default: 16)
    pub determinizations: usize,

    /// Uniform playouts per child of each determinization (default: 8)
    pub rollouts: usize,

    /// Rollout threads (default: available parallelism, at most 4)
    pub workers: usize,
}

impl Default for BotParams {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(4);
        Self {
            determinizations: 16,
            rollouts: 8,
            workers,
        }
    }
}

impl BotParams {
    /// Defaults overridden by `KITTENS_DETERMINIZATIONS`,
    /// `KITTENS_ROLLOUTS` and `KITTENS_WORKERS`.
    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    pub fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut positive = |key: &str, fallback: usize| {
            read(key)
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(fallback)
        };
        Self {
            determinizations: positive("KITTENS_DETERMINIZATIONS", defaults.determinizations),
            rollouts: positive("KITTENS_ROLLOUTS", defaults.rollouts),
            workers: positive("KITTENS_WORKERS", defaults.workers),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
