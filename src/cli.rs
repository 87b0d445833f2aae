// SPDX-License-Identifier: GPL-3.0-only

//! Command-line handlers

use fitcheck::app::{App, AppUpdate};
use fitcheck::backends::camera::{CameraBackend, DevicePosition, SessionController};
use fitcheck::backends::virtual_camera::{self, FrameSource, VirtualCameraBackend};
use fitcheck::config::{self, Config, Credential};
use fitcheck::constants::{feedback::CREDENTIAL_ENV_VARS, timing::PIPELINE_EVENT_CAPACITY};
use fitcheck::feedback::FeedbackClient;
use fitcheck::pipelines::photo::{CaptureCoordinator, PhotoEncoder, PhotoPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// List the cameras the backend exposes
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let backend = VirtualCameraBackend::new();
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({} backend):", backend.name());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {} ({})", index, camera.name, camera.position);
    }

    Ok(())
}

/// Capture one photo and print its critique
pub fn check_outfit(
    source: Option<PathBuf>,
    front: bool,
    model: Option<String>,
    no_feedback: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::load()?;
    if let Some(model) = model {
        config.feedback.model = model;
    }

    let credential = if no_feedback {
        Credential::missing()
    } else {
        let credential = Credential::from_env();
        if !credential.is_present() {
            eprintln!(
                "No API key found in {}; the critique will be unavailable.",
                CREDENTIAL_ENV_VARS.join(" or ")
            );
        }
        credential
    };

    let mut backend = VirtualCameraBackend::new();
    if let Some(path) = source.as_ref() {
        let image = virtual_camera::load_still(path)?;
        println!("Source image: {} ({}x{})", path.display(), image.width, image.height);
        backend = backend.with_source(FrameSource::Image(Arc::new(image)));
    }

    // Create async runtime for the session and pipeline
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_check(backend, config, credential, front))
}

async fn run_check(
    backend: VirtualCameraBackend,
    config: Config,
    credential: Credential,
    front: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = SessionController::spawn(backend, true, config.camera)?;

    let snapshot = session.configure().await?;
    if front && snapshot.position != DevicePosition::Front {
        session.switch_device_position().await?;
    }
    let snapshot = session.start().await?;
    if let Some(device) = snapshot.input.as_ref() {
        println!("Using camera: {}", device.name);
    }

    let feedback = FeedbackClient::new(&config.feedback, credential)?;
    let pipeline = PhotoPipeline::new(PhotoEncoder::new(config.encoding.into()), feedback);
    let (sender, receiver) = mpsc::channel(PIPELINE_EVENT_CAPACITY);
    let coordinator = CaptureCoordinator::new(session.clone(), pipeline, sender);

    println!("Capturing...");
    coordinator.request_capture().await?;
    // The background task keeps its own sender; the channel closes when it finishes
    drop(coordinator);

    let mut app = App::new();
    let mut capture_error = None;
    app.run(receiver, |app, update| match update {
        AppUpdate::PhotoAdded { photo_id, .. } => {
            if let Some(photo) = app.store().get(photo_id) {
                println!(
                    "Photo captured: {}x{}, waiting for critique...",
                    photo.image.width, photo.image.height
                );
            }
        }
        AppUpdate::CritiqueReady {
            text,
            suggested_rating,
            ..
        } => {
            println!();
            println!("{}", text);
            if let Some(rating) = suggested_rating {
                println!();
                println!("Suggested rating: {}/10", rating);
            }
        }
        AppUpdate::CaptureError { message, .. } => capture_error = Some(message),
    })
    .await;

    session.stop().await?;

    match capture_error {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

/// Encode an image file and print or write the payload
pub fn encode_image(
    image: PathBuf,
    output: Option<PathBuf>,
    max_dim: Option<u32>,
    quality: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config::load()?.encoding;
    if let Some(max_dim) = max_dim {
        if max_dim == 0 {
            return Err("--max-dim must be at least 1".into());
        }
        settings.max_width = max_dim;
        settings.max_height = max_dim;
    }
    if let Some(quality) = quality {
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(format!("Quality {} is outside (0, 1]", quality).into());
        }
        settings.quality = quality;
    }

    let source = virtual_camera::load_still(&image)?;
    let payload = PhotoEncoder::new(settings.into()).encode(&source)?;

    eprintln!(
        "Encoded {}x{} -> {}x{} at quality {} ({} bytes, {} base64 chars)",
        source.width,
        source.height,
        payload.width,
        payload.height,
        payload.quality,
        payload.compressed_len,
        payload.data.len()
    );

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &payload.data)?;
            println!("Payload saved: {}", path.display());
        }
        None => println!("{}", payload.data_url()),
    }

    Ok(())
}

/// Print the effective configuration, optionally writing the defaults first
pub fn show_config(init: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config::default_config_path().ok_or("Could not determine the config directory")?;

    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            config::save_to_path(&Config::default(), &path)?;
            println!("Config written: {}", path.display());
        }
    }

    let config = config::load()?;
    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);

    let key_state = if Credential::from_env().is_present() {
        "found"
    } else {
        "not set"
    };
    println!("# API key ({}): {}", CREDENTIAL_ENV_VARS.join(", "), key_state);

    Ok(())
}
