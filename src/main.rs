use std::process::ExitCode;

use embedding_verifier::DEFAULT_CONFIG_FILE;
use embedding_verifier::credential::resolve_credential;
use embedding_verifier::domain::SampleSet;
use embedding_verifier::encoders::local::FastembedHub;
use embedding_verifier::images::HttpImageSource;
use embedding_verifier::models::config::VerifierConfig;
use embedding_verifier::processing::{ModelOutcome, Verifier, verify_models};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match VerifierConfig::load(DEFAULT_CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let credential = resolve_credential(&config.credential_sources());

    let captioned = match &config.sample_set {
        Some(path) => match SampleSet::from_json_file(path) {
            Ok(set) => set,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => SampleSet::captioned_images(),
    };
    let images = match HttpImageSource::new(config.request_timeout()) {
        Ok(images) => images,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let mut hub = FastembedHub::new(&config.cache_dir, config.show_download_progress);
    if let Some(endpoint) = &config.hub_endpoint {
        hub = hub.with_endpoint(endpoint);
    }
    let verifier = Verifier::new(&hub, &images, credential.as_ref());

    let summary = verify_models(
        &verifier,
        &config.models,
        &SampleSet::scenery_texts(),
        &captioned,
        config.run_policy(),
    )
    .await;

    for (model_id, outcome) in &summary.outcomes {
        match outcome {
            ModelOutcome::Checked(report) if report.passed() => {
                log::info!("PASS {model_id}");
            }
            ModelOutcome::Checked(report) => {
                log::error!("FAIL {model_id}");
                for failure in report.text.failures.iter().chain(&report.image.failures) {
                    log::error!("  {failure}");
                }
            }
            ModelOutcome::Failed(e) => log::error!("ERROR {model_id}: {e}"),
            ModelOutcome::Skipped => log::warn!("SKIP {model_id}"),
        }
    }

    if summary.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
