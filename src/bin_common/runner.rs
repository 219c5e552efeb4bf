//! Binary runner utilities
//!
//! Provides a standardized way to run binaries with proper
//! logging, periodic status lines, and graceful shutdown.

use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Status log interval in seconds (0 disables)
    pub status_interval_secs: u64,
}

impl RunConfig {
    /// Create a new run configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_interval_secs: 300,
        }
    }

    /// Set status log interval
    pub fn with_status_interval(mut self, secs: u64) -> Self {
        self.status_interval_secs = secs;
        self
    }
}

/// Trait for binary applications
#[allow(async_fn_in_trait)]
pub trait BinaryRunner {
    /// Run the application until shutdown
    async fn run(&mut self) -> anyhow::Result<()>;

    /// Get the run configuration
    fn config(&self) -> &RunConfig;

    /// One-line summary printed on shutdown
    fn stats(&self) -> Option<String> {
        None
    }

    /// Print startup banner
    fn print_banner(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("Starting {}", config.name);
        info!("Press Ctrl+C to stop");
        info!("========================================");
        info!("");
    }

    /// Print shutdown banner
    fn print_shutdown(&self, stats: Option<&str>) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", config.name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Execute the binary with proper initialization and cleanup
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        let stats = self.stats();
        self.print_shutdown(stats.as_deref());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new("test-binary").with_status_interval(60);

        assert_eq!(config.name, "test-binary");
        assert_eq!(config.status_interval_secs, 60);
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::new("default");
        assert_eq!(config.status_interval_secs, 300);
    }

    struct Counter {
        config: RunConfig,
        runs: u32,
    }

    impl BinaryRunner for Counter {
        async fn run(&mut self) -> anyhow::Result<()> {
            self.runs += 1;
            Ok(())
        }

        fn config(&self) -> &RunConfig {
            &self.config
        }
    }

    #[tokio::test]
    async fn test_execute_runs_once() {
        let mut runner = Counter {
            config: RunConfig::new("counter"),
            runs: 0,
        };
        runner.execute().await.unwrap();
        assert_eq!(runner.runs, 1);
    }
}
