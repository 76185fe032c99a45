use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quizform", about = "Builds weekly bilingual Bible quiz forms from a Google Sheet")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the sheet and show what would be created, without touching Forms
    Preview {
        /// Week number to build
        #[arg(long)]
        week: u32,
        /// Restrict to one language instead of both
        #[arg(long, value_enum)]
        lang: Option<LangOpt>,
        /// Emit the preview as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Preview, confirm and create the Google Forms
    Create {
        /// Week number to build
        #[arg(long)]
        week: u32,
        /// Restrict to one language instead of both
        #[arg(long, value_enum)]
        lang: Option<LangOpt>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LangOpt {
    En,
    Ta,
}

impl From<LangOpt> for quizform::Language {
    fn from(value: LangOpt) -> Self {
        match value {
            LangOpt::En => quizform::Language::English,
            LangOpt::Ta => quizform::Language::Tamil,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Preview { week, lang, json } => {
            quizform::run_preview(week, lang.map(Into::into), json).await
        }
        Command::Create { week, lang, yes } => {
            quizform::run_create(week, lang.map(Into::into), yes).await
        }
    };

    if let Err(e) = result {
        eprintln!("quizform fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
