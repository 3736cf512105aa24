mod config;
mod transport;

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;

use handsign_core::classification::domain::label_catalog::LabelCatalog;
use handsign_core::classification::infrastructure::onnx_classifier::OnnxClassifier;
use handsign_core::detection::infrastructure::onnx_hand_detector::OnnxHandDetector;
use handsign_core::imaging::domain::image_writer::ImageWriter;
use handsign_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use handsign_core::imaging::infrastructure::image_frame_decoder::ImageFrameDecoder;
use handsign_core::pipeline::frame_pipeline::{CropDump, FramePipeline};
use handsign_core::pipeline::infrastructure::inference_pool::InferencePool;
use handsign_core::pipeline::pipeline_logger::StatsPipelineLogger;
use handsign_core::session::session_manager::SessionManager;
use handsign_core::shared::model_resolver::{self, ProgressFn};

use crate::config::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    cli.validate()?;

    let catalog = Arc::new(cli.catalog()?);
    log::info!("Label catalog: {} labels", catalog.len());

    let classifier_path = resolve_model(
        &cli.classifier_model,
        cli.classifier_url.as_deref(),
        "classifier",
    )?;
    let hand_path = resolve_model(&cli.hand_model, cli.hand_model_url.as_deref(), "hand model")?;

    let writer: Arc<dyn ImageWriter> = Arc::new(ImageFileWriter::new());
    let pipelines = (0..cli.workers)
        .map(|worker| build_pipeline(&cli, worker, &classifier_path, &hand_path, &catalog, &writer))
        .collect::<Result<Vec<_>, _>>()?;

    let pool = InferencePool::new(pipelines, cli.queue_capacity)?;
    log::info!(
        "Started {} inference worker(s), queue capacity {}",
        pool.workers(),
        cli.queue_capacity
    );
    let sessions = Arc::new(SessionManager::new(pool));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(transport::serve(cli.listen, Arc::clone(&sessions)));
    drop(runtime);

    sessions.shutdown();
    served?;
    log::info!("Server stopped");
    Ok(())
}

fn build_pipeline(
    cli: &Cli,
    worker: usize,
    classifier_path: &Path,
    hand_path: &Path,
    catalog: &Arc<LabelCatalog>,
    writer: &Arc<dyn ImageWriter>,
) -> Result<FramePipeline, Box<dyn std::error::Error>> {
    let detector = OnnxHandDetector::new(hand_path, cli.min_detection_confidence)?;
    let classifier = OnnxClassifier::new(
        classifier_path,
        cli.target_width,
        cli.target_height,
        catalog.len(),
    )?;
    let crop_dump = cli.debug_crop_dir.as_ref().map(|dir| CropDump {
        writer: Arc::clone(writer),
        path: dir.join(format!("hand_crop_worker{worker}.png")),
    });

    Ok(FramePipeline::new(
        Box::new(ImageFrameDecoder::new()),
        Box::new(detector),
        Box::new(classifier),
        Arc::clone(catalog),
        cli.target_width,
        cli.target_height,
    )
    .with_logger(Box::new(StatsPipelineLogger::new(format!("worker-{worker}"))))
    .with_crop_dump(crop_dump))
}

fn resolve_model(
    path: &Path,
    url: Option<&str>,
    what: &'static str,
) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving {what}: {}", path.display());
    let progress: ProgressFn = Box::new(move |downloaded, total| download_progress(what, downloaded, total));
    let resolved = model_resolver::resolve(path, url, Some(progress))?;
    Ok(resolved)
}

fn download_progress(what: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {what}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {what}... {downloaded} bytes");
    }
}
