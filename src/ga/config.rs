//! Evolutionary optimizer configuration.
//!
//! [`GaConfig`] holds every parameter of the evolutionary loop: population
//! size, elitism, operator rates, tournament size, and the termination
//! conditions (generation cap, stagnation limit).

/// Configuration for the evolutionary timetable optimizer.
///
/// # Builder pattern
///
/// ```
/// use timetabler::ga::GaConfig;
///
/// let config = GaConfig::default()
///     .with_population_size(40)
///     .with_mutation_rate(0.15)
///     .with_stagnation_limit(25);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GaConfig {
    /// Number of candidate timetables in the population.
    pub population_size: usize,
    /// Maximum generations before termination.
    pub max_generations: usize,
    /// Candidates drawn per tournament selection round.
    pub tournament_size: usize,
    /// Top candidates copied unchanged into the next generation.
    pub elite_size: usize,
    /// Probability of recombining a selected pair (0.0-1.0).
    pub crossover_rate: f64,
    /// Probability of mutating an offspring (0.0-1.0).
    pub mutation_rate: f64,
    /// Generations without a new best before stopping; 0 disables.
    pub stagnation_limit: usize,
    /// Whether to score candidates in parallel using rayon.
    pub parallel: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl GaConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the generation cap.
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = n;
        self
    }

    /// Sets the tournament size.
    pub fn with_tournament_size(mut self, k: usize) -> Self {
        self.tournament_size = k;
        self
    }

    /// Sets the elite count.
    pub fn with_elite_size(mut self, n: usize) -> Self {
        self.elite_size = n;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the stagnation limit (0 to disable).
    pub fn with_stagnation_limit(mut self, limit: usize) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Enables or disables parallel scoring.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Preset for quick runs: small population, tight stagnation stop.
    pub fn fast() -> Self {
        Self {
            population_size: 20,
            max_generations: 40,
            tournament_size: 3,
            elite_size: 2,
            crossover_rate: 0.9,
            mutation_rate: 0.1,
            stagnation_limit: 10,
            parallel: true,
        }
    }

    /// Preset balancing quality against runtime.
    pub fn balanced() -> Self {
        Self {
            population_size: 30,
            max_generations: 80,
            stagnation_limit: 20,
            ..Self::fast()
        }
    }

    /// Preset maximizing solution quality.
    pub fn quality() -> Self {
        Self {
            population_size: 50,
            max_generations: 150,
            stagnation_limit: 30,
            ..Self::fast()
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.population_size < 2 {
            return Err("population_size must be at least 2".into());
        }
        if self.max_generations == 0 {
            return Err("max_generations must be at least 1".into());
        }
        if self.elite_size >= self.population_size {
            return Err("elite_size leaves no room for offspring".into());
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(format!(
                "tournament_size must be within 1..={}",
                self.population_size
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_balanced() {
        let config = GaConfig::default();
        assert_eq!(config.population_size, 30);
        assert_eq!(config.tournament_size, 3);
        assert_eq!(config.elite_size, 2);
        assert_eq!(config.stagnation_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(GaConfig::fast().validate().is_ok());
        assert!(GaConfig::balanced().validate().is_ok());
        assert!(GaConfig::quality().validate().is_ok());
    }

    #[test]
    fn test_rates_clamped() {
        let config = GaConfig::default()
            .with_crossover_rate(1.5)
            .with_mutation_rate(-0.2);
        assert!((config.crossover_rate - 1.0).abs() < 1e-12);
        assert!((config.mutation_rate - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_tiny_population() {
        assert!(GaConfig::default()
            .with_population_size(1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_all_elite() {
        let config = GaConfig::default()
            .with_population_size(4)
            .with_elite_size(4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tournament() {
        assert!(GaConfig::default()
            .with_tournament_size(0)
            .validate()
            .is_err());
        assert!(GaConfig::default()
            .with_population_size(5)
            .with_tournament_size(6)
            .validate()
            .is_err());
    }
}
