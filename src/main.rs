//! Safe-bet classifier
//!
//! Command-line front end over the bet evaluator.

use anyhow::Context;
use clap::{Parser, Subcommand};
use safebet::{config::Config, fixtures, BetEvaluator, MatchQuery, Verdict};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "safebet")]
#[command(about = "Classify sports bets as safe or risky with rules and a Bayesian network")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the bet in a query file
    Evaluate {
        /// Query JSON: match, home_team, away_team, bet
        #[arg(short, long)]
        query: String,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate every bet type for the match in a query file
    Analyze {
        #[arg(short, long)]
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the loaded network
    Network {
        /// Dump the network definition as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the built-in demo match
    Demo,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let evaluator = BetEvaluator::from_config(&config)?;

    match cli.command {
        Commands::Evaluate { query, json } => evaluate(&evaluator, &query, json),
        Commands::Analyze { query, json } => analyze(&evaluator, &query, json),
        Commands::Network { json } => show_network(&evaluator, json),
        Commands::Demo => demo(&evaluator),
    }
}

fn evaluate(evaluator: &BetEvaluator, path: &str, json: bool) -> anyhow::Result<()> {
    let query = MatchQuery::from_json_file(path).with_context(|| format!("reading query {}", path))?;
    let bet = query
        .bet
        .as_ref()
        .context("query has no `bet`; use `analyze` to evaluate every bet type")?;
    let verdict = evaluator.evaluate(&query.match_fact, &query.home_team, &query.away_team, bet)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&query, &verdict);
    }
    Ok(())
}

fn analyze(evaluator: &BetEvaluator, path: &str, json: bool) -> anyhow::Result<()> {
    let query = MatchQuery::from_json_file(path).with_context(|| format!("reading query {}", path))?;
    let verdicts = evaluator.analyze_matchup(&query.match_fact, &query.home_team, &query.away_team, &query.odds)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else {
        print_matchup(&query, &verdicts);
    }
    Ok(())
}

fn show_network(evaluator: &BetEvaluator, json: bool) -> anyhow::Result<()> {
    let network = evaluator.network();
    if json {
        println!("{}", serde_json::to_string_pretty(&network.to_definition())?);
        return Ok(());
    }

    println!("\n🕸️  Bayesian network ({} variables)\n", network.len());
    println!("{:<22} {:<42} {}", "Variable", "States", "Parents");
    println!("{}", "-".repeat(100));
    for variable in network.variables() {
        let states = network.states(variable)?.join(", ");
        let parents = network.parents(variable)?.join(", ");
        println!("{:<22} {:<42} {}", variable, states, if parents.is_empty() { "-".into() } else { parents });
    }
    Ok(())
}

fn demo(evaluator: &BetEvaluator) -> anyhow::Result<()> {
    let query = fixtures::demo_query()?;
    if let Some(bet) = &query.bet {
        let verdict = evaluator.evaluate(&query.match_fact, &query.home_team, &query.away_team, bet)?;
        print_verdict(&query, &verdict);
    }
    let verdicts = evaluator.analyze_matchup(&query.match_fact, &query.home_team, &query.away_team, &query.odds)?;
    print_matchup(&query, &verdicts);
    Ok(())
}

fn headline(query: &MatchQuery) -> String {
    format!(
        "{} vs {} ({})",
        query.match_fact.home_team_id(),
        query.match_fact.away_team_id(),
        query.match_fact.competition_stage()
    )
}

fn print_verdict(query: &MatchQuery, verdict: &Verdict) {
    let marker = if verdict.is_safe() { "✅" } else { "⚠️" };

    println!("\n{} {} on {}\n", marker, verdict.bet_type, headline(query));
    println!(
        "Classification: {} (confidence {:.2}, {})",
        verdict.classification, verdict.confidence, verdict.confidence_band
    );
    println!(
        "Scores: rules {:+.3} | network {:+.3} | combined {:+.3} ({})",
        verdict.rule_score, verdict.bayes_score, verdict.combined_score, verdict.concordance
    );

    println!("\nSignals:");
    if verdict.contributing_signals.is_empty() {
        println!("  (none fired)");
    }
    for signal in &verdict.contributing_signals {
        println!(
            "  {:<20} {:<13} {:.2}",
            signal.rule_id(),
            signal.direction().to_string(),
            signal.weight()
        );
    }

    println!("\nPosterior over {}:", verdict.posterior_summary.variable());
    for sp in verdict.posterior_summary.distribution() {
        println!("  {:<14} {:>6.1}%", sp.state, sp.probability * 100.0);
    }

    println!("\nExplanation:");
    for line in &verdict.explanation {
        println!("  - {}", line);
    }
}

fn print_matchup(query: &MatchQuery, verdicts: &[Verdict]) {
    println!("\n📊 All markets for {}\n", headline(query));
    println!(
        "{:<10} {:>8} {:>8} {:>9} {:>9} {:<7} {:<7} {}",
        "Bet", "Rules", "Network", "Combined", "P(safe)", "Class", "Band", "Signals"
    );
    println!("{}", "-".repeat(90));
    for v in verdicts {
        println!(
            "{:<10} {:>+8.3} {:>+8.3} {:>+9.3} {:>8.1}% {:<7} {:<7} {}",
            v.bet_type.to_string(),
            v.rule_score,
            v.bayes_score,
            v.combined_score,
            v.safe_probability * 100.0,
            v.classification.to_string(),
            v.confidence_band.to_string(),
            v.contributing_signals.len()
        );
    }
}
