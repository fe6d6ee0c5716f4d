pub mod messages;
pub mod runs;

use crate::application::use_cases::upload_validator::{UploadValidator, MISSING_FILE_MESSAGE};
use crate::application::{BatchExecutor, CsvImportUseCase, Notifier};
use crate::domain::batch::Progress;
use crate::domain::error::{AppError, Result};
use crate::domain::upload::UploadedFile;
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub use messages::{LogEntry, MessageLog};
pub use runs::{RunRegistry, RunStatus};

/// Multipart field carrying the CSV file
pub const UPLOAD_FIELD: &str = "file_upload";

pub struct HttpState {
    pub import: Arc<CsvImportUseCase>,
    pub runs: Arc<RunRegistry>,
    pub logs: Arc<MessageLog>,
}

impl HttpState {
    pub fn new(import: CsvImportUseCase) -> Self {
        Self {
            import: Arc::new(import),
            runs: Arc::new(RunRegistry::new()),
            logs: Arc::new(MessageLog::new()),
        }
    }
}

#[derive(Serialize)]
struct ImportAccepted {
    run_id: Uuid,
    title: String,
    message: String,
    total: usize,
    skipped_rows: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: &AppError) -> HttpResponse {
    let body = ErrorBody {
        error: err.user_message().to_string(),
    };
    match err {
        AppError::ValidationError(_) | AppError::MalformedRow(_) => {
            HttpResponse::BadRequest().json(body)
        }
        AppError::Conflict(_) => HttpResponse::Conflict().json(body),
        AppError::NotFound(_) => HttpResponse::NotFound().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Read the upload field, enforcing name and size rules while streaming
async fn read_upload(validator: &UploadValidator, payload: &mut Multipart) -> Result<UploadedFile> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| AppError::ValidationError(format!("Invalid multipart data: {}", e)))?;

        if field.name() != Some(UPLOAD_FIELD) || upload.is_some() {
            // Skip unknown fields
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| {
                    AppError::ValidationError(format!("Invalid multipart data: {}", e))
                })?;
            }
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        validator.check_name(file_name.as_deref())?;

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes =
                chunk.map_err(|e| AppError::IoError(format!("Failed to read upload: {}", e)))?;
            content.extend_from_slice(&bytes);
            validator.check_size(content.len() as u64)?;
        }

        upload = Some(UploadedFile::new(file_name.unwrap_or_default(), content));
    }

    upload.ok_or_else(|| AppError::ValidationError(MISSING_FILE_MESSAGE.to_string()))
}

/// Drive the executor on its own task and mirror its progress into the registry
fn spawn_run(mut executor: BatchExecutor, runs: Arc<RunRegistry>) {
    let run_id = executor.id();
    let task_runs = runs.clone();

    let handle = tokio::spawn(async move {
        let progress_runs = task_runs.clone();
        let report = executor
            .run_to_completion(Some(move |progress: Progress| {
                progress_runs.update_progress(run_id, progress)
            }))
            .await;
        task_runs.finish(
            run_id,
            executor.state(),
            executor.progress(),
            &report,
            executor.results(),
        );
    });

    tokio::spawn(async move {
        if let Err(err) = handle.await {
            error!(run_id = %run_id, error = %err, "Import task stopped unexpectedly");
            runs.abort(run_id);
        }
    });
}

#[post("/imports")]
async fn create_import(data: web::Data<HttpState>, mut payload: Multipart) -> impl Responder {
    let upload = match read_upload(data.import.validator(), &mut payload).await {
        Ok(upload) => upload,
        Err(err) => {
            warn!(error = %err, "Upload rejected");
            data.logs.add("ERROR", err.user_message());
            return error_response(&err);
        }
    };

    data.logs.add(
        "INFO",
        &format!("Received {} ({} bytes)", upload.file_name, upload.size()),
    );

    let prepared = match data.import.prepare(&upload) {
        Ok(prepared) => prepared,
        Err(err) => {
            error!(file = %upload.file_name, error = %err, "Failed to prepare import");
            data.logs.add("ERROR", err.user_message());
            return error_response(&err);
        }
    };

    let total = prepared.total();
    let skipped_rows = prepared.skipped_rows;
    let notifier: Arc<dyn Notifier + Send + Sync> = data.logs.clone();
    let executor = data.import.executor(prepared, notifier);
    let run_id = executor.id();

    let status = match data.runs.begin(
        run_id,
        &upload.file_name,
        &upload.fingerprint(),
        total,
        skipped_rows,
    ) {
        Ok(status) => status,
        Err(err) => {
            warn!(file = %upload.file_name, error = %err, "Import refused");
            data.logs.add("WARN", err.user_message());
            return error_response(&err);
        }
    };

    if skipped_rows > 0 {
        data.logs.add(
            "WARN",
            &format!("{} malformed rows were skipped.", skipped_rows),
        );
    }

    info!(run_id = %run_id, file = %upload.file_name, total, skipped_rows, "Import accepted");
    spawn_run(executor, data.runs.clone());

    HttpResponse::Accepted().json(ImportAccepted {
        run_id,
        title: status.title,
        message: status.message,
        total,
        skipped_rows,
    })
}

#[get("/imports/{run_id}")]
async fn import_status(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let run_id = path.into_inner();
    match data.runs.get(run_id) {
        Some(status) => HttpResponse::Ok().json(status),
        None => error_response(&AppError::NotFound(format!(
            "Import run {} not found",
            run_id
        ))),
    }
}

#[get("/messages")]
async fn get_messages(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.logs.entries())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(create_import)
            .service(import_status)
            .service(get_messages),
    );
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((host, port))?
    .run();

    info!(host, port, "HTTP server listening");
    Ok(server)
}
