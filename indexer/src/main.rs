use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use retrieval::evaluate::{evaluate_with, read_benchmark, Evaluation, Ranker};
use retrieval::render::render_hits;
use retrieval::tokenizer::tokenize;
use retrieval::{IndexConfig, InvertedIndex, Normalization, Posting, VsmModel};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a BM25 index from a corpus and query or evaluate it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer keyword queries (interactive when --query is absent)
    Query {
        #[command(flatten)]
        build: BuildArgs,
        /// Single query to run instead of reading queries from stdin
        #[arg(long)]
        query: Option<String>,
        /// Number of hits to print
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
    /// Evaluate against a benchmark and print MP@3, MP@R and MAP
    Evaluate {
        #[command(flatten)]
        build: BuildArgs,
        /// Benchmark file, one `<query>TAB<id1> <id2> ...` per line
        #[arg(long)]
        benchmark: PathBuf,
        /// Print P@3, P@R and AP for every query
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Corpus file, one `<title>TAB<description>` per line
    #[arg(long)]
    input: PathBuf,
    /// JSON file with `bm25` and `normalization` settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// BM25 length normalization strength
    #[arg(long)]
    b: Option<f64>,
    /// BM25 term frequency saturation (`inf` disables saturation)
    #[arg(long)]
    k: Option<f64>,
    /// Use the vector-space model instead of merging posting lists
    #[arg(long, default_value_t = false)]
    vsm: bool,
    /// Column normalization of the term-document matrix: none, l1, l2, l3
    #[arg(long)]
    normalization: Option<Normalization>,
    /// Ask the ranked processor for refinements
    #[arg(long, default_value_t = false)]
    use_refinements: bool,
}

/// The scored index plus the VSM model when one was requested.
struct Engine {
    index: InvertedIndex,
    vsm: Option<VsmModel>,
    use_refinements: bool,
}

impl Engine {
    fn build(args: &BuildArgs) -> Result<Self> {
        let base = match &args.config {
            Some(path) => IndexConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => IndexConfig::default(),
        };
        let config = base.with_overrides(args.b, args.k, args.normalization);
        config.validate()?;

        let index = InvertedIndex::read_from_file(&args.input, config.bm25)
            .with_context(|| format!("building index from {}", args.input.display()))?;
        let vsm = args.vsm.then(|| VsmModel::build(&index, config.normalization));
        tracing::info!(
            input = %args.input.display(),
            num_docs = index.num_docs(),
            num_terms = index.num_terms(),
            b = config.bm25.b,
            k = config.bm25.k,
            mode = if vsm.is_some() { "vsm" } else { "ranked" },
            "engine ready"
        );
        Ok(Self { index, vsm, use_refinements: args.use_refinements })
    }

    fn ranker(&self) -> &dyn Ranker {
        match &self.vsm {
            Some(model) => model as &dyn Ranker,
            None => &self.index,
        }
    }

    fn query(&self, keywords: &[String]) -> retrieval::Result<Vec<Posting>> {
        match &self.vsm {
            Some(model) => model.process_query(keywords),
            None => Ok(self.index.process_query(keywords, self.use_refinements)),
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { build, query, top } => {
            let engine = Engine::build(&build)?;
            match query {
                Some(q) => answer(&engine, &q, top),
                None => interactive(&engine, top),
            }
        }
        Commands::Evaluate { build, benchmark, verbose } => {
            let engine = Engine::build(&build)?;
            let benchmark = read_benchmark(&benchmark)?;
            let eval = evaluate_with(engine.ranker(), &benchmark, engine.use_refinements);
            let failed = eval.per_query.iter().filter(|q| q.error.is_some()).count();
            tracing::info!(queries = eval.per_query.len(), failed, map = eval.means.map, "evaluation complete");
            print_evaluation(&eval, verbose);
            Ok(())
        }
    }
}

fn answer(engine: &Engine, query: &str, top: usize) -> Result<()> {
    let keywords = tokenize(query);
    // An unknown term only fails this query, not the session.
    match engine.query(&keywords) {
        Ok(hits) => print!("{}", render_hits(&engine.index, &hits, &keywords, top)),
        Err(e) => eprintln!("query failed: {e}"),
    }
    Ok(())
}

fn interactive(engine: &Engine, top: usize) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("\nYour keyword query: ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }
        answer(engine, line.trim_end(), top)?;
    }
}

fn print_evaluation(eval: &Evaluation, verbose: bool) {
    if verbose {
        for q in &eval.per_query {
            println!("Query '{}'", q.query);
            if let Some(err) = &q.error {
                println!("  failed: {err}");
            }
            println!("  P@3: {:.2}", q.p_at_3);
            println!("  P@R: {:.2}", q.p_at_r);
            println!("  AP:  {:.2}", q.ap);
        }
    }
    println!("Mean results:");
    println!("  MP@3: {:.3}", eval.means.mp_at_3);
    println!("  MP@R: {:.3}", eval.means.mp_at_r);
    println!("  MAP:  {:.3}", eval.means.map);
}
