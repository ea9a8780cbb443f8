use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header;
use axum::http::HeaderValue;
use axum::Json;
use axum::response::Response;
use axum::routing::{get, post};
use clap::Parser;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use flipfolio::app::model::{
    CreateDocumentRequest, CreateSessionRequest, DocumentSummary, SessionView,
};
use flipfolio::app::sessions::SessionRegistry;
use flipfolio::document::{Document, PageImage, artifact_filename};
use flipfolio::export;
use flipfolio::insights::{self, AnalysisOutcome, AnalyzeOptions, AnalyzerEngine};
use flipfolio::library::{Library, LocalFsLibrary};
use flipfolio::viewer::ViewerEvent;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    #[arg(long, default_value = "flipfolio-data")]
    data_dir: PathBuf,

    /// Analysis engine for `/analyze` routes and new sessions.
    #[arg(long, value_enum, default_value_t = AnalyzerEngine::Noop)]
    engine: AnalyzerEngine,

    /// OpenAI-compatible API base URL.
    #[arg(long, default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    /// Model name.
    #[arg(long, default_value = "gpt-4o-mini")]
    openai_model: String,
}

#[derive(Clone)]
struct AppState {
    data_dir: PathBuf,
    library: Arc<dyn Library>,
    sessions: SessionRegistry,
    analyze_options: AnalyzeOptions,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    flipfolio::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting flipfolio-app");

    let analyze_options = AnalyzeOptions {
        engine: args.engine,
        openai_base_url: args.openai_base_url.clone(),
        openai_model: args.openai_model.clone(),
        ..AnalyzeOptions::default()
    };
    let state = AppState {
        data_dir: args.data_dir.clone(),
        library: Arc::new(LocalFsLibrary::new(&args.data_dir)),
        sessions: SessionRegistry::new(),
        analyze_options,
    };

    let app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/documents", post(create_document).get(list_documents))
        .route("/documents/:id", axum::routing::delete(delete_document))
        .route("/documents/:id/analyze", post(analyze_document))
        .route("/documents/:id/export", get(export_document))
        .route("/sessions", post(create_session))
        .route(
            "/sessions/:id",
            get(get_session).delete(close_session),
        )
        .route("/sessions/:id/events", post(post_session_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn create_document(
    State(state): State<AppState>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentSummary>), (StatusCode, String)> {
    if request.pages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "a document needs at least one page".to_string(),
        ));
    }

    let pages = request.pages.into_iter().map(PageImage).collect();
    let document = Document::new(request.title, pages);
    state.library.save(&document).await.map_err(internal)?;

    Ok((StatusCode::CREATED, Json(DocumentSummary::of(&document))))
}

async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, (StatusCode, String)> {
    let documents = state.library.list_all().await.map_err(internal)?;
    Ok(Json(documents.iter().map(DocumentSummary::of).collect()))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.library.delete(id).await.map_err(internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("no such document: {id}")))
    }
}

async fn analyze_document(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<AnalysisOutcome>, (StatusCode, String)> {
    let mut document = load_document(&state, id).await?;

    let outcome = insights::analyze(&document.title, &state.analyze_options).await;
    document.summary = Some(outcome.insights().summary.clone());
    state.library.save(&document).await.map_err(internal)?;

    Ok(Json(outcome))
}

async fn export_document(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Response, (StatusCode, String)> {
    let document = load_document(&state, id).await?;

    let artifact_path = state.data_dir.join("exports").join(format!("{id}.html"));
    export::write_to_file(&artifact_path, &document.pages, &document.title, true)
        .map_err(internal)?;

    let file = tokio::fs::File::open(&artifact_path)
        .await
        .map_err(|err| internal(anyhow::anyhow!("open artifact: {err}")))?;
    let body = axum::body::Body::from_stream(ReaderStream::new(file));

    let filename = artifact_filename(&document.title);
    let mut resp = Response::new(body);
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    resp.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            filename.replace('"', "")
        ))
        .map_err(|err| internal(anyhow::anyhow!("content-disposition: {err}")))?,
    );
    Ok(resp)
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), (StatusCode, String)> {
    let document = load_document(&state, request.document_id).await?;
    let session_id = state.sessions.open(&document, &state.data_dir).await;

    // Analysis runs off the request path; the session serves navigation
    // immediately and flips to Ready when the task lands.
    let sessions = state.sessions.clone();
    let options = state.analyze_options.clone();
    let title = document.title.clone();
    tokio::spawn(async move {
        let outcome = insights::analyze(&title, &options).await;
        sessions
            .set_insights(session_id, outcome.insights().clone())
            .await;
    });

    let snapshot = state
        .sessions
        .snapshot(session_id)
        .await
        .ok_or_else(|| internal(anyhow::anyhow!("session vanished after open")))?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    state
        .sessions
        .snapshot(id)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no such session: {id}")))
}

async fn post_session_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(event): Json<ViewerEvent>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    state
        .sessions
        .apply(id, event)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no such session: {id}")))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.sessions.close(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("no such session: {id}")))
    }
}

async fn load_document(
    state: &AppState,
    id: uuid::Uuid,
) -> Result<Document, (StatusCode, String)> {
    state
        .library
        .get(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no such document: {id}")))
}

fn internal(err: anyhow::Error) -> (StatusCode, String) {
    tracing::error!(err = format!("{err:#}"), "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}
