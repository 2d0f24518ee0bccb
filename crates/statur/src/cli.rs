use clap::Parser;
use llm::GeminiClient;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about = "STATUR – dein Mentor für biologische Architektur", long_about = None)]
pub struct Args {
    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Model name to use
    #[arg(short = 'm', long, default_value_t = GeminiClient::default_model())]
    pub model: String,

    /// API base URL
    #[arg(long, default_value_t = GeminiClient::default_base_url())]
    pub base_url: String,

    /// Skip generating the logo at startup
    #[arg(long)]
    pub no_logo: bool,

    /// Abort a hanging turn after this many seconds
    #[arg(long, default_value_t = 120)]
    pub turn_timeout: u64,
}
