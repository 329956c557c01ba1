use std::{env, io, path::PathBuf, process::ExitCode, time::Instant};

use country_recommender::{
    build_index, keyword::parse_keywords, CsvDirSource, RecommenderConfig, RecommenderIndex, Resolution,
};
use tracing_subscriber::EnvFilter;

struct Args {
    config: RecommenderConfig,
    top_n: usize,
    rebuild: bool,
    with_scores: bool,
    query: Option<String>,
}

fn parse_args(config: RecommenderConfig) -> Result<Option<Args>, String> {
    let mut args = env::args().skip(1); // program 名除外
    let mut parsed = Args {
        config,
        top_n: 3,
        rebuild: false,
        with_scores: false,
        query: None,
    };
    while let Some(a) = args.next() {
        match a.as_str() {
            "--data" => {
                let v = args.next().ok_or("--data requires a path")?;
                parsed.config.data_dir = PathBuf::from(v);
            }
            "--cache" => {
                let v = args.next().ok_or("--cache requires a path")?;
                parsed.config.cache_dir = PathBuf::from(v);
            }
            "--top" => {
                let v = args.next().ok_or("--top requires a number")?;
                match v.parse::<usize>() {
                    Ok(n) if n > 0 => parsed.top_n = n,
                    _ => return Err("--top needs a positive integer".to_string()),
                }
            }
            "--threshold" => {
                let v = args.next().ok_or("--threshold requires a number")?;
                match v.parse::<f32>() {
                    Ok(t) if t.is_finite() => parsed.config.threshold = t,
                    _ => return Err("--threshold needs a number".to_string()),
                }
            }
            "--model" => {
                let v = args.next().ok_or("--model requires a name")?;
                parsed.config.model_id = v.to_lowercase();
            }
            "--query" => {
                let v = args.next().ok_or("--query requires a string")?;
                parsed.query = Some(v);
            }
            "--rebuild" => parsed.rebuild = true,
            "--scores" => parsed.with_scores = true,
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            other => {
                // 位置引数をクエリとして解釈 (最初のみ)
                if parsed.query.is_none() {
                    parsed.query = Some(other.to_string());
                } else {
                    eprintln!("[warn] extra arg ignored: {}", other);
                }
            }
        }
    }
    Ok(Some(parsed))
}

fn print_usage() {
    eprintln!("Usage: country-recommender [--data DIR] [--cache DIR] [--top N] [--threshold F]");
    eprintln!("                           [--model hashing|multilingual] [--rebuild] [--scores] [--query \"k1, k2\"]");
    eprintln!("Data: one <country>.csv per country (keyword and frequency columns).");
    eprintln!("If --query is omitted, keywords are read interactively; empty line, exit or quit ends.");
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let program_start = Instant::now();
    let args = match parse_args(RecommenderConfig::from_env()) {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("[error] {}", msg);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    // ---- index build / cache load ----
    let build_start = Instant::now();
    let source = CsvDirSource::new(&args.config.data_dir);
    let provider = args.config.provider();
    let index = match build_index(&args.config, &source, provider, args.rebuild) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("[error] failed to build index: {}", e);
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "[info] {} countries, {} keywords, {} embeddings",
        index.countries().len(),
        index.lexical().vocab_size(),
        index.embeddings().len()
    );
    for w in index.data_warnings() {
        eprintln!("[warn] {}", w);
    }
    if let Some(e) = index.embedding_warning() {
        eprintln!("[warn] semantic matching degraded: {}", e);
    }
    eprintln!("[time] build_index={:.2}ms", build_start.elapsed().as_secs_f64() * 1000.0);

    // ---- --query 指定時はその1回だけ、未指定なら対話ループ ----
    if let Some(q) = args.query {
        run_single_query(&index, &q, args.top_n, args.with_scores);
    } else {
        run_interactive(&index, args.top_n, args.with_scores);
    }

    eprintln!("[time] program_total={:.2}ms", program_start.elapsed().as_secs_f64() * 1000.0);
    ExitCode::SUCCESS
}

fn run_single_query(index: &RecommenderIndex, line: &str, top_n: usize, with_scores: bool) {
    let keywords = parse_keywords(line);
    if keywords.is_empty() {
        eprintln!("[warn] no keywords");
        return;
    }
    let start = Instant::now();
    for kw in &keywords {
        match index.resolve(kw) {
            Resolution::Lexical(k) => eprintln!("[query] {} -> {}", kw, k),
            Resolution::Semantic { keyword, similarity } => {
                eprintln!("[query] {} -> {} (similarity {:.3})", kw, keyword, similarity)
            }
            Resolution::Unresolved => eprintln!("[query] {} -> (no match)", kw),
        }
    }
    let results = index.recommend(&keywords, top_n, with_scores);
    eprintln!("[time] recommend={:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
    if results.is_empty() {
        println!("(no matching countries)");
        return;
    }
    for (rank, rec) in results.iter().enumerate() {
        println!("#{} {}", rank + 1, rec);
    }
}

fn run_interactive(index: &RecommenderIndex, top_n: usize, with_scores: bool) {
    use std::io::Write;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("Query> ");
        let _ = stdout.flush();
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("[error] read error: {}", e);
                break;
            }
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            eprintln!("[info] bye");
            break;
        }
        run_single_query(index, trimmed, top_n, with_scores);
    }
}
