//! Command implementations

use anyhow::{Context, Result};
use bitclass_core::{Classifier, LaneWidth, Reduction, RuleSet, SimdStrategy};
use colored::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Instant;

use crate::cli::format::*;
use crate::config::Config;

fn load_rules(path: &Path) -> Result<RuleSet> {
    let rules = RuleSet::load(path)
        .with_context(|| format!("Failed to load rules from {}", path.display()))?;
    if rules.is_empty() {
        anyhow::bail!("No rules found in {}", path.display());
    }
    Ok(rules)
}

fn build(rules: &RuleSet, config: &Config) -> Result<Classifier> {
    rules
        .sorted_for_lpm()
        .build_classifier(&config.classifier)
        .context("Failed to build classifier")
}

/// Overrides from the `bench` command line
#[derive(Debug, Default, Clone)]
pub struct BenchOptions {
    /// Number of random keys
    pub keys: Option<usize>,
    /// Reduction shape
    pub reduction: Option<Reduction>,
    /// Lane width of the per-field vectors
    pub lane: Option<LaneWidth>,
    /// RNG seed
    pub seed: Option<u64>,
}

/// Classify random IPv4 keys and report throughput
pub fn run_bench(rules_path: &Path, options: BenchOptions, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if let Some(reduction) = options.reduction {
        config.classifier.reduction = reduction;
    }
    if let Some(lane) = options.lane {
        config.classifier.lane = lane;
    }
    let keys = options.keys.unwrap_or(config.bench.keys);
    if keys == 0 {
        anyhow::bail!("--keys must be greater than 0");
    }
    let seed = options
        .seed
        .or(config.bench.seed)
        .unwrap_or_else(|| rand::thread_rng().gen());

    println!("{}", format_info(&format!("Parsing rules from {}", rules_path.display())));
    let rules = load_rules(rules_path)?;
    println!("{}", format_success(&format!("Parsed {} rules", rules.len())));

    let start = Instant::now();
    let classifier = build(&rules, &config)?;
    println!(
        "{}",
        format_success(&format!(
            "Classifier built in {:?} ({}-bit lanes, {} reduction, {})",
            start.elapsed(),
            config.classifier.lane,
            config.classifier.reduction,
            SimdStrategy::for_lane(config.classifier.lane).name()
        ))
    );

    tracing::debug!("Generating {} keys with seed {}", keys, seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let testset: Vec<[u8; 4]> = (0..keys).map(|_| rng.gen()).collect();
    let mut scratch = classifier.scratch()?;

    println!("{}", format_info(&format!("Running {} lookups...", keys)));
    let mut checksum: u64 = 0;
    let mut matched = 0usize;
    let start = Instant::now();
    for key in &testset {
        if let Some(id) = classifier.lookup_with(key, &mut scratch)? {
            checksum = checksum.wrapping_add(id as u64 + 1);
            matched += 1;
        }
    }
    let elapsed = start.elapsed();

    println!("\n{}", "Benchmark Results".bold().green());
    println!("  Lookups:    {}", keys.to_string().cyan());
    println!("  Matched:    {}", matched.to_string().cyan());
    println!("  Seed:       {}", seed);
    println!("  Checksum:   {}", checksum);
    println!("  Time:       {:?}", elapsed);
    println!(
        "  Throughput: {}",
        format_throughput(keys, elapsed.as_secs_f64()).cyan()
    );
    Ok(())
}

/// Print the winning rule for each address
pub fn run_lookup(rules_path: &Path, addrs: &[String], config: &Config) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let classifier = build(&rules, config)?;

    for text in addrs {
        let addr: Ipv4Addr = text
            .trim()
            .parse()
            .with_context(|| format!("Invalid IPv4 address '{}'", text))?;
        match classifier.lookup_ipv4(addr)? {
            Some(id) => println!("{} -> rule {}", addr, id.to_string().cyan()),
            None => println!("{} -> {}", addr, "no match".yellow()),
        }
    }
    Ok(())
}

/// Validate a rule file and summarize it
pub fn run_check(rules_path: &Path) -> Result<()> {
    let rules = load_rules(rules_path)?;

    let mut ids: Vec<u32> = rules.iter().map(|r| r.id()).collect();
    ids.sort_unstable();
    ids.dedup();
    let duplicates = rules.len() - ids.len();

    println!("{}", format_success(&format!("{} is valid", rules_path.display())));
    println!("\n{}", "Rule Statistics".bold().green());
    println!("  Rules:         {}", rules.len().to_string().cyan());
    println!("  Distinct ids:  {}", ids.len().to_string().cyan());
    if duplicates > 0 {
        println!(
            "  {} {} rules reuse an id",
            "Warning:".yellow().bold(),
            duplicates
        );
    }
    println!("\n{}", "Prefix lengths".bold());
    print!("{}", format_histogram(&rules.prefix_histogram()));
    Ok(())
}
