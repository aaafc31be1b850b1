use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use melodist::Config;

#[derive(Debug, Parser)]
#[command(
    name = "melodist",
    version,
    about = "Generate a MIDI melody from a corpus of MIDI files and a trained model"
)]
struct Cli {
    /// JSON file with settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of .mid/.midi files to learn the vocabulary from
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Model artifact (JSON dense network)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Output .mid path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tokens per input window
    #[arg(long)]
    sequence_length: Option<usize>,

    /// Number of tokens to generate
    #[arg(long)]
    horizon: Option<usize>,

    /// RNG seed (same seed => same seed window)
    #[arg(long)]
    seed: Option<u64>,

    /// Sample with this temperature instead of always taking the best token
    #[arg(long)]
    temperature: Option<f32>,

    /// With --temperature, only sample among the k best tokens
    #[arg(long)]
    top_k: Option<usize>,
}

impl Cli {
    fn into_config(self) -> melodist::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(corpus) = self.corpus {
            config.corpus_dir = corpus;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(sequence_length) = self.sequence_length {
            config.sequence_length = sequence_length;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.temperature.is_some() {
            config.temperature = self.temperature;
        }
        if self.top_k.is_some() {
            config.top_k = self.top_k;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = Cli::parse().into_config().and_then(|config| melodist::run(&config));
    match result {
        Ok(summary) => {
            println!(
                "Song generated successfully: {} token(s) written to {}",
                summary.generated.len(),
                summary.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
