use neat_genome::genomics::{
    correlate, FitnessTiebreak, GeneticConfig, Genome, GenomeError, History,
};

use std::error::Error;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Evolves a population without selection pressure, checking
/// every genome of every generation for structural integrity.
#[derive(Parser, Debug)]
#[command(name = "soak", version, long_about = None)]
struct Args {
    /// RON file holding the genetic configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of genomes in the population
    #[arg(short, long, default_value_t = 150)]
    population: usize,

    /// Number of generations to run
    #[arg(short, long, default_value_t = 500)]
    generations: u32,

    /// Seed of the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Proportion of offspring produced by crossover
    #[arg(long, default_value_t = 0.6)]
    sexual_proportion: f64,

    /// Mean connection count above which the population
    /// switches to the simplifying mutation chances
    #[arg(long)]
    complexity_ceiling: Option<f64>,

    /// Where to save the largest genome of the final generation
    #[arg(long, default_value = "largest_genome.ron")]
    save: PathBuf,
}

/// Whether the population is growing or being pruned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ComplexityMode {
    Complexifying,
    Simplifying,
}

struct ComplexityRegulator {
    ceiling: Option<f64>,
    mode: ComplexityMode,
    previous_mean: f64,
}

impl ComplexityRegulator {
    fn new(ceiling: Option<f64>) -> Self {
        ComplexityRegulator {
            ceiling,
            mode: ComplexityMode::Complexifying,
            previous_mean: f64::INFINITY,
        }
    }

    /// Switches to simplifying above the ceiling, and back once
    /// under it and no longer getting simpler.
    fn update(&mut self, mean_complexity: f64) -> ComplexityMode {
        let ceiling = match self.ceiling {
            Some(ceiling) => ceiling,
            None => return self.mode,
        };
        let next = match self.mode {
            ComplexityMode::Complexifying if mean_complexity > ceiling => {
                ComplexityMode::Simplifying
            }
            ComplexityMode::Simplifying
                if mean_complexity <= ceiling && mean_complexity >= self.previous_mean =>
            {
                ComplexityMode::Complexifying
            }
            mode => mode,
        };
        if next != self.mode {
            info!(?next, mean_complexity, "complexity mode switched");
        }
        self.mode = next;
        self.previous_mean = mean_complexity;
        next
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config {
        Some(path) => ron::from_str::<GeneticConfig>(&fs::read_to_string(path)?)?,
        None => GeneticConfig {
            input_count: NonZeroUsize::new(3).ok_or("zero inputs")?,
            output_count: NonZeroUsize::new(2).ok_or("zero outputs")?,
            feedforward_only: true,
            add_neuron_mutation_chance: 0.03,
            add_connection_mutation_chance: 0.05,
            delete_connection_mutation_chance: 0.02,
            delete_neuron_mutation_chance: 0.01,
            max_add_connection_attempts: 20,
            ..GeneticConfig::default()
        },
    };
    config.validate()?;
    let simplifying = config.simplifying();
    info!(?args, "starting soak");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut history = History::new(&config);
    let mut population = Genome::new_population(args.population, &mut history, &config, &mut rng);
    let mut regulator = ComplexityRegulator::new(args.complexity_ceiling);

    for generation in 1..=args.generations {
        let mean_complexity = mean_connection_count(&population);
        let active = match regulator.update(mean_complexity) {
            ComplexityMode::Complexifying => &config,
            ComplexityMode::Simplifying => &simplifying,
        };

        population = reproduce(
            &population,
            generation,
            &mut history,
            active,
            args.sexual_proportion,
            &mut rng,
        );
        check_population(&population, &config)?;
        log_generation(generation, &population, &history, &mut rng);
    }

    match population.iter().max_by_key(|genome| genome.connections().len()) {
        Some(largest) => save_and_reload(largest, &args.save, &config)?,
        None => warn!("empty population, nothing saved"),
    }
    Ok(())
}

/// Produces the next generation from uniformly chosen parents.
fn reproduce(
    population: &[Genome],
    generation: u32,
    history: &mut History,
    config: &GeneticConfig,
    sexual_proportion: f64,
    rng: &mut StdRng,
) -> Vec<Genome> {
    (0..population.len())
        .map(|_| {
            let first = &population[rng.gen_range(0..population.len())];
            if rng.gen::<f64>() < sexual_proportion {
                let second = &population[rng.gen_range(0..population.len())];
                first.mate(second, FitnessTiebreak::Random, generation, history, config, rng)
            } else {
                first.create_offspring(generation, history, config, rng)
            }
        })
        .collect()
}

/// Checks every genome against `config` in parallel.
fn check_population(population: &[Genome], config: &GeneticConfig) -> Result<(), GenomeError> {
    population
        .par_iter()
        .try_for_each(|genome| genome.conforms_to(config))
}

fn mean_connection_count(population: &[Genome]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    population
        .iter()
        .map(|genome| genome.connections().len())
        .sum::<usize>() as f64
        / population.len() as f64
}

fn log_generation(generation: u32, population: &[Genome], history: &History, rng: &mut StdRng) {
    if population.len() < 2 {
        return;
    }
    let first = &population[rng.gen_range(0..population.len())];
    let second = &population[rng.gen_range(0..population.len())];
    let correlation = correlate(first, second);
    debug_assert!(correlation.is_consistent());
    let statistics = correlation.statistics();

    let hidden: usize = population.iter().map(Genome::hidden_count).sum();
    let (connection_records, neuron_records) = history.remembered();
    info!(
        generation,
        mean_connections = mean_connection_count(population),
        mean_hidden = hidden as f64 / population.len() as f64,
        max_innovation = history.max_innovation(),
        "generation checked"
    );
    debug!(
        generation,
        connection_records,
        neuron_records,
        sample_matches = statistics.match_count,
        sample_disjoint = statistics.disjoint_count,
        sample_excess = statistics.excess_count,
        sample_weight_delta = statistics.mean_weight_delta(),
        "history and sample correlation"
    );
}

/// Saves `genome` as RON, then loads it back and checks
/// that the copy is identical and well-formed.
fn save_and_reload(
    genome: &Genome,
    path: &Path,
    config: &GeneticConfig,
) -> Result<(), Box<dyn Error>> {
    let serialized = ron::ser::to_string_pretty(genome, ron::ser::PrettyConfig::default())?;
    fs::write(path, &serialized)?;

    let reloaded: Genome = ron::from_str(&fs::read_to_string(path)?)?;
    reloaded.conforms_to(config)?;
    if &reloaded != genome {
        return Err(format!("genome {} changed across a save and reload", genome.id()).into());
    }
    info!(
        genome = genome.id(),
        connections = genome.connections().len(),
        hidden = genome.hidden_count(),
        path = %path.display(),
        "largest genome saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regulator_without_ceiling_never_simplifies() {
        let mut regulator = ComplexityRegulator::new(None);
        for mean in [1.0, 100.0, 1000.0] {
            assert_eq!(regulator.update(mean), ComplexityMode::Complexifying);
        }
    }

    #[test]
    fn regulator_switches_both_ways() {
        let mut regulator = ComplexityRegulator::new(Some(10.0));

        assert_eq!(regulator.update(8.0), ComplexityMode::Complexifying);
        assert_eq!(regulator.update(12.0), ComplexityMode::Simplifying);
        // Under the ceiling, but still shrinking.
        assert_eq!(regulator.update(9.0), ComplexityMode::Simplifying);
        assert_eq!(regulator.update(9.0), ComplexityMode::Complexifying);
    }

    #[test]
    fn short_soak() {
        let config = GeneticConfig {
            feedforward_only: true,
            add_neuron_mutation_chance: 0.2,
            add_connection_mutation_chance: 0.2,
            delete_connection_mutation_chance: 0.1,
            delete_neuron_mutation_chance: 0.1,
            max_add_connection_attempts: 10,
            ..GeneticConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut history = History::new(&config);
        let mut population = Genome::new_population(30, &mut history, &config, &mut rng);

        for generation in 1..=30 {
            population = reproduce(&population, generation, &mut history, &config, 0.5, &mut rng);
            assert_eq!(check_population(&population, &config), Ok(()));
        }
        assert_eq!(population.len(), 30);
    }
}
