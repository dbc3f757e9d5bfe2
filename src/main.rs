use clap::{Parser, Subcommand};
use serde::Serialize;

use lift_progression::commands::{analysis, deload, plateau, progression};
use lift_progression::config::EngineConfig;
use lift_progression::db::AppState;
use lift_progression::models::{DeloadReason, ProgressionMode};

#[derive(Parser)]
#[command(name = "lift-progression", version, about = "Training progression analytics")]
struct Cli {
  /// User whose training history is analyzed
  #[arg(long, short, global = true, default_value = "default")]
  user: String,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Coarse per-exercise status from the insight provider
  Insights {
    #[arg(long)]
    lookback_days: Option<u32>,
  },
  /// Plateau alerts from the insight provider
  Alerts,
  /// Full performance analysis, one exercise or all tracked ones
  Analyze {
    #[arg(long)]
    exercise: Option<String>,
    #[arg(long)]
    plan: Option<String>,
    #[arg(long, default_value_t = analysis::DEFAULT_ANALYSIS_WEEKS)]
    weeks: u32,
  },
  /// Scan for plateaus and record them
  Plateaus {
    #[arg(long)]
    plan: Option<String>,
    #[arg(long, default_value_t = analysis::DEFAULT_ANALYSIS_WEEKS)]
    weeks: u32,
  },
  /// Adjustments for a planned session, or general suggestions without one
  Recommend {
    #[arg(long)]
    session: Option<String>,
  },
  Deload {
    #[command(subcommand)]
    action: DeloadAction,
  },
  Settings {
    #[command(subcommand)]
    action: SettingsAction,
  },
}

#[derive(Subcommand)]
enum DeloadAction {
  Status {
    #[arg(long)]
    plan: Option<String>,
  },
  Schedule {
    #[arg(long)]
    plan: Option<String>,
    #[arg(long, default_value_t = 0)]
    weeks_from_now: u32,
    #[arg(long, default_value = "user_requested")]
    reason: DeloadReason,
  },
  /// Schedule the next periodic deload if one is due
  Auto {
    #[arg(long)]
    plan: Option<String>,
  },
}

#[derive(Subcommand)]
enum SettingsAction {
  Show,
  /// aggressive, moderate or conservative
  Mode { mode: ProgressionMode },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  lift_progression::init_tracing();

  let cli = Cli::parse();
  let config = EngineConfig::from_env()?;
  let state = AppState::from_config(config).await?;
  let user = cli.user.as_str();

  match cli.command {
    Command::Insights { lookback_days } => {
      print_json(&analysis::get_progression_insights(&state, user, lookback_days).await?)?
    }
    Command::Alerts => print_json(&analysis::get_plateau_alerts(&state, user).await?)?,
    Command::Analyze {
      exercise: Some(exercise),
      weeks,
      ..
    } => print_json(&analysis::analyze_exercise_performance(&state, user, &exercise, weeks).await?)?,
    Command::Analyze {
      exercise: None,
      plan,
      weeks,
    } => print_json(&analysis::analyze_all_exercises(&state, user, plan.as_deref(), weeks).await?)?,
    Command::Plateaus { plan, weeks } => {
      print_json(&plateau::detect_training_plateaus(&state, user, plan.as_deref(), weeks).await?)?
    }
    Command::Recommend { session: Some(session) } => {
      print_json(&progression::get_session_recommendations(&state, user, &session).await?)?
    }
    Command::Recommend { session: None } => {
      print_json(&analysis::get_progression_suggestions(&state, user).await?)?
    }
    Command::Deload { action } => match action {
      DeloadAction::Status { plan } => {
        print_json(&deload::get_deload_overview(&state, user, plan.as_deref()).await?)?
      }
      DeloadAction::Schedule {
        plan,
        weeks_from_now,
        reason,
      } => print_json(
        &deload::request_deload(&state, user, plan.as_deref(), reason, weeks_from_now).await?,
      )?,
      DeloadAction::Auto { plan } => {
        print_json(&deload::auto_schedule_deload(&state, user, plan.as_deref()).await?)?
      }
    },
    Command::Settings { action } => match action {
      SettingsAction::Show => print_json(&progression::get_progression_settings(&state, user).await?)?,
      SettingsAction::Mode { mode } => {
        print_json(&progression::set_progression_mode(&state, user, mode).await?)?
      }
    },
  }

  state.db.close().await;
  Ok(())
}
