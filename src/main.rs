use std::path::PathBuf;
use std::str::FromStr;
use swing_analyzer::config::Configuration;
use swing_analyzer::coordinator::CoordinatorBuilder;
use swing_analyzer::error::AppError;
use swing_analyzer::network::{AppState, Server};
use swing_analyzer::pipeline::services::pose::{PoseEstimator, SharedPoseEstimator, YoloPoseModel};
use tracing::{error, info, Level};

fn init_logging(log_level: &str) {
    let level = Level::from_str(log_level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Load the model up front so the first job does not pay for it
async fn warm_up(estimator: SharedPoseEstimator) {
    let result = tokio::task::spawn_blocking(move || estimator.lock().initialize()).await;
    match result {
        Ok(Ok(())) => info!("Pose model ready"),
        Ok(Err(e)) => error!("Pose model failed to load, jobs will fail until it does: {}", e),
        Err(e) => error!("Pose model warm-up task failed: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let configuration = Configuration::load(config_path.as_deref())?;
    init_logging(&configuration.log_level);
    info!("Loaded configuration: {:?}", configuration);

    let estimator =
        PoseEstimator::new(Box::new(YoloPoseModel::new(configuration.pose.clone()))).into_shared();
    warm_up(estimator.clone()).await;

    let coordinator = CoordinatorBuilder::new(configuration.clone())
        .estimator(estimator)
        .build()?;

    Server::new(&configuration.server, AppState::new(coordinator))
        .start()
        .await
}
