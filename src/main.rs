//! nco-interview: resume to NCO job matching with an adaptive skills interview

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use nco_interview::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use nco_interview::config::{Config, ModelType, OracleKind};
use nco_interview::error::{InterviewError, Result};
use nco_interview::input::file_detector::FileType;
use nco_interview::input::InputManager;
use nco_interview::interview::{Decision, InterviewController, InterviewSession};
use nco_interview::llm::model_manager::ModelManager;
use nco_interview::llm::{DecisionOracle, OracleBackend};
use nco_interview::output::{save_summary_to_file, suggest_filename, SessionSummary, SummaryRenderer};
use nco_interview::processing::embeddings::{Embedder, Model2VecEmbedder};
use nco_interview::processing::index::VectorIndex;
use nco_interview::processing::records::JobRecordStore;
use nco_interview::processing::{JobMatcher, JobRecord};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration from {}: {}", config_path.display(), e);
            process::exit(1);
        }
    };

    if !config.output.color_output {
        colored::control::set_override(false);
    }

    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Interview {
            resume,
            query,
            top_k,
            pick,
            save,
            format,
            oracle,
            model,
        } => {
            let format = format
                .map(|f| cli::parse_output_format(&f))
                .transpose()
                .map_err(InterviewError::InvalidInput)?
                .unwrap_or(config.output.format);
            let kind = oracle
                .map(|o| cli::parse_oracle_kind(&o))
                .transpose()
                .map_err(InterviewError::InvalidInput)?
                .unwrap_or(config.oracle.backend);

            let options = InterviewOptions {
                resume,
                query,
                top_k,
                pick,
                save,
                format,
                kind,
                model,
            };
            run_interview(&config, options).await
        }

        Commands::Search { query, top_k, json } => {
            let matcher = load_matcher(&config)?;
            let results = matcher.search(&query, top_k.unwrap_or(config.interview.top_k))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_matches(&results);
            }
            Ok(())
        }

        Commands::Skills { resume } => {
            cli::validate_file_extension(&resume, &FileType::SUPPORTED_EXTENSIONS)
                .map_err(|e| InterviewError::InvalidInput(format!("Resume file: {}", e)))?;

            let skills = InputManager::new().load_skills(&resume).await?;
            if skills.is_empty() {
                println!("No skills section found in {}", resume.display());
            } else {
                println!("{} ({})", "Skills".bold(), skills.len());
                for skill in skills.iter() {
                    println!("  • {}", skill);
                }
            }
            Ok(())
        }

        Commands::BuildIndex { records, out_dir } => run_build_index(&config, &records, out_dir).await,

        Commands::Models { action } => run_models(&config, action).await,

        Commands::Config { action } => run_config(config, action, config_path),
    }
}

struct InterviewOptions {
    resume: PathBuf,
    query: Option<String>,
    top_k: Option<usize>,
    pick: Option<usize>,
    save: Option<Option<PathBuf>>,
    format: nco_interview::config::OutputFormat,
    kind: OracleKind,
    model: Option<String>,
}

async fn run_interview(config: &Config, options: InterviewOptions) -> Result<()> {
    cli::validate_file_extension(&options.resume, &FileType::SUPPORTED_EXTENSIONS)
        .map_err(|e| InterviewError::InvalidInput(format!("Resume file: {}", e)))?;

    println!("{} {}", "Resume:".bold(), options.resume.display());
    let skills = InputManager::new().load_skills(&options.resume).await?;
    if skills.is_empty() {
        warn!("No skills found in {}", options.resume.display());
        println!("{}", "No skills section found; the interview will rely on the job description".yellow());
    } else {
        println!("{} {}", "Skills:".bold(), skills.as_query());
    }

    let query = options
        .query
        .or_else(|| config.interview.default_query.clone())
        .unwrap_or_else(|| skills.as_query());
    info!("Searching jobs for '{}'", query);

    let matcher = load_matcher(config)?;
    let matches = matcher.search(&query, options.top_k.unwrap_or(config.interview.top_k))?;
    print_matches(&matches);

    let mut stdin: StdinLines = BufReader::new(tokio::io::stdin()).lines();
    let job = choose_job(matches, options.pick, &mut stdin).await?;
    println!(
        "\n{} {} ({})",
        "Interviewing for:".bold(),
        job.title.green().bold(),
        job.code
    );

    let pb = spinner("Preparing interviewer...");
    let backend = OracleBackend::from_config(config, options.kind, options.model).await;
    pb.finish_and_clear();
    let backend = backend?;

    if let OracleBackend::Ollama(oracle) = &backend {
        if !oracle.health_check().await {
            warn!("Ollama did not answer at {}", config.oracle.ollama_url);
            println!(
                "{}",
                format!("Ollama is not reachable at {}; is `ollama serve` running?", config.oracle.ollama_url).yellow()
            );
        }
    }

    let mut controller = InterviewController::new(backend);
    let mut session = InterviewSession::new(job, skills);
    println!("{}", "Type your answers; enter 'quit' to end early.".dimmed());

    let timeout = Duration::from_secs(config.oracle.timeout_secs);
    let mut failure = None;
    loop {
        if session.question_count() >= config.interview.max_questions {
            println!("\n{}", "Question limit reached.".yellow());
            break;
        }

        let decision =
            match next_decision(&mut controller, &mut session, timeout, config.interview.max_parse_retries).await {
                Ok(decision) => decision,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

        match decision {
            Decision::Stop => {
                println!("\n{}", "The interviewer has finished.".green());
                break;
            }
            Decision::Ask { skill, question } => {
                println!(
                    "\n{} {}",
                    format!("Q{} [{}]", session.question_count(), skill).cyan().bold(),
                    question
                );
                print!("> ");
                std::io::stdout().flush()?;

                match stdin.next_line().await? {
                    Some(line) if is_quit(&line) => break,
                    Some(line) => session.record_answer(line.trim()),
                    None => break,
                }
            }
        }
    }

    let summary = SessionSummary::from_session(&session).with_oracle(controller.oracle().describe());
    let renderer = SummaryRenderer::new(config.output.color_output);
    println!("\n{}", renderer.render(&summary, options.format)?);

    if let Some(path) = options.save {
        let path = path.unwrap_or_else(|| PathBuf::from(suggest_filename(options.format, &summary.job.code)));
        let content = SummaryRenderer::new(false).render(&summary, options.format)?;
        save_summary_to_file(&content, &path)?;
        println!("{} {}", "Summary saved to".green(), path.display());
    }

    // The partial transcript is still reported before the turn error surfaces.
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// One controller turn with a deadline, retrying failures the controller reports as retryable.
async fn next_decision<O: DecisionOracle>(
    controller: &mut InterviewController<O>,
    session: &mut InterviewSession,
    timeout: Duration,
    max_retries: usize,
) -> Result<Decision> {
    let mut attempt = 0;
    loop {
        let pb = spinner("Choosing the next question...");
        let outcome = tokio::time::timeout(timeout, controller.decide_next(session)).await;
        pb.finish_and_clear();

        let result = outcome.unwrap_or_else(|_| {
            Err(InterviewError::Oracle(format!(
                "no reply within {} seconds",
                timeout.as_secs()
            )))
        });

        match result {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!("Turn failed ({}); retry {}/{}", e, attempt, max_retries);
                if let Some(raw) = e.raw_response() {
                    debug!("Unparseable reply: {}", raw);
                }
            }
            other => return other,
        }
    }
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "quit" | "exit" | ":q")
}

async fn choose_job(mut matches: Vec<JobRecord>, pick: Option<usize>, stdin: &mut StdinLines) -> Result<JobRecord> {
    if matches.is_empty() {
        return Err(InterviewError::InvalidQuery("no jobs matched the query".to_string()));
    }

    let choice = match pick {
        Some(n) => n,
        None if matches.len() == 1 => 1,
        None => {
            print!("\nSelect a job [1-{}] (default 1): ", matches.len());
            std::io::stdout().flush()?;
            match stdin.next_line().await? {
                Some(line) if !line.trim().is_empty() => line
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| InterviewError::InvalidInput(format!("Not a number: {}", line.trim())))?,
                _ => 1,
            }
        }
    };

    if choice == 0 || choice > matches.len() {
        return Err(InterviewError::InvalidInput(format!(
            "Job choice must be between 1 and {}",
            matches.len()
        )));
    }
    Ok(matches.swap_remove(choice - 1))
}

fn load_matcher(config: &Config) -> Result<JobMatcher<Model2VecEmbedder>> {
    let pb = spinner("Loading job index...");
    let matcher = JobMatcher::load(config);
    pb.finish_and_clear();

    matcher.map_err(|e| {
        if matches!(e, InterviewError::IndexUnavailable { .. }) {
            eprintln!(
                "{}",
                "Build the index first: nco-interview build-index --records <records.json>".yellow()
            );
        }
        e
    })
}

fn print_matches(results: &[JobRecord]) {
    if results.is_empty() {
        println!("No matching jobs.");
        return;
    }

    println!("\n{}", "Top matches".bold().underline());
    for (i, job) in results.iter().enumerate() {
        println!(
            "{:>2}. {} ({}) {}",
            i + 1,
            job.title.bold(),
            job.code,
            format!("score {:.3}", job.score).dimmed()
        );
        if !job.description.is_empty() {
            println!("    {}", truncate_text(&job.description, 160));
        }
    }
}

async fn run_build_index(config: &Config, records: &Path, out_dir: Option<PathBuf>) -> Result<()> {
    let store = JobRecordStore::load(records)?;
    if store.is_empty() {
        return Err(InterviewError::InvalidInput(format!(
            "{} contains no job records",
            records.display()
        )));
    }

    let model_path = match &config.assets.embedding_model_dir {
        Some(dir) => dir.clone(),
        None => {
            let mut manager = ModelManager::new(config).await?;
            manager
                .ensure_model_available(&config.models.default_embedding_model)
                .await?
        }
    };
    let embedder = Model2VecEmbedder::load(&model_path)?;

    let pb = ProgressBar::new(store.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} rows {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let index = VectorIndex::build(&embedder, store.rows(), Some(&pb))?;
    pb.finish_and_clear();

    let out_dir = out_dir.unwrap_or_else(|| config.assets.assets_dir.clone());
    std::fs::create_dir_all(&out_dir)?;

    let index_path = out_dir.join(&config.assets.index_file);
    let records_path = out_dir.join(&config.assets.records_file);
    index.save(&index_path, embedder.name())?;
    store.save(&records_path)?;

    println!("{} {} rows, {} dimensions", "Index built:".green().bold(), index.len(), index.dimension());
    println!("  {}", index_path.display());
    println!("  {}", records_path.display());
    Ok(())
}

async fn run_models(config: &Config, action: ModelAction) -> Result<()> {
    let mut manager = ModelManager::new(config).await?;

    match action {
        ModelAction::List { embeddings, oracles } => {
            let sections = [
                (ModelType::Embedding, "Embedding models", !oracles),
                (ModelType::Oracle, "Oracle models", !embeddings),
            ];

            for (model_type, heading, shown) in sections {
                if !shown {
                    continue;
                }
                println!("{}", heading.bold());
                for model in manager.list_available_models(model_type) {
                    let status = if manager.is_model_downloaded(&model.name) {
                        "downloaded".green()
                    } else {
                        "available".normal()
                    };
                    println!("  • {} ({}) {} MB [{}]", model.name, model.repo_id, model.size_mb, status);
                    println!("    {}", model.description);
                }
                println!();
            }

            if manager.list_downloaded_models().is_empty() {
                println!("No models downloaded yet. Try: nco-interview models download {}", config.models.default_embedding_model);
            }
        }

        ModelAction::Download { model, force } => {
            if manager.is_model_downloaded(&model) {
                if !force {
                    println!("Model '{}' is already downloaded (use --force to re-download)", model);
                    return Ok(());
                }
                manager.remove_model(&model).await?;
            }

            let path = manager.download_model(&model).await?;
            println!("{} {}", "Downloaded".green().bold(), model);
            println!("Location: {}", path.display());
        }

        ModelAction::Remove { model } => {
            manager.remove_model(&model).await?;
            println!("{} {}", "Removed".green().bold(), model);
        }

        ModelAction::Info { model } => {
            let info = manager
                .get_model_info(&model)
                .ok_or_else(|| InterviewError::ModelNotFound(model.clone()))?;

            println!("Name: {}", info.name);
            println!("Repository: {}", info.repo_id);
            println!("Type: {:?}", info.model_type);
            println!("Size: {} MB", info.size_mb);
            println!("Description: {}", info.description);

            match manager.get_model_path(&model) {
                Some(path) => println!("Status: downloaded ({})", path.display()),
                None => println!("Status: not downloaded; run `nco-interview models download {}`", model),
            }
        }
    }

    Ok(())
}

fn run_config(config: Config, action: Option<ConfigAction>, config_path: &Path) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            println!("{} {}\n", "Configuration:".bold(), config_path.display());
            println!("{}", config.to_toml()?);
        }

        Some(ConfigAction::Reset) => {
            Config::default().save_to(config_path)?;
            println!("{}", "Configuration reset to defaults".green());
        }

        Some(ConfigAction::Set { key, value }) => {
            let mut config = config;
            config.set_value(&key, &value)?;
            config.save_to(config_path)?;
            println!("{} {} = {}", "Set".green(), key, value);
        }
    }

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Truncate text to at most `max_chars` characters, breaking at a word boundary
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    let cut = truncated.rfind(' ').unwrap_or(truncated.len());
    format!("{}...", truncated[..cut].trim_end())
}
