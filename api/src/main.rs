// ./api/src/main.rs
use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Import application layer components
use application::{
    ApplicationError, // Base error type
    IdRangeParams,
    // DTOs / Requests
    PersonRequest,
    // Services
    PersonService,
};
// Import domain types used directly in API (request/response bodies)
use domain::{Person, PersonId};
// Import infrastructure layer implementations
use infrastructure::JsonFileRepository;

/// Application state: the one shared service over the one shared store.
#[derive(Clone)]
struct AppState {
    person_service: Arc<PersonService>,
}

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SNAPSHOT_PATH: &str = "persons.json";

// Application entry point
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    let port = match env::var("PORT") {
        Ok(port_str) => match u16::from_str(&port_str) {
            Ok(port_num) => {
                info!("Using port {} from environment variable PORT.", port_num);
                port_num
            }
            Err(_) => {
                warn!(
                    "Invalid PORT value '{}' in environment variable. Using default port {}.",
                    port_str, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        },
        Err(_) => {
            info!(
                "PORT environment variable not set. Using default port {}.",
                DEFAULT_PORT
            );
            DEFAULT_PORT
        }
    };

    let snapshot_path = match env::var("PERSONS_FILE") {
        Ok(path) => {
            info!("Using snapshot file '{}' from environment variable PERSONS_FILE.", path);
            path
        }
        Err(_) => {
            info!(
                "PERSONS_FILE environment variable not set. Using default '{}'.",
                DEFAULT_SNAPSHOT_PATH
            );
            DEFAULT_SNAPSHOT_PATH.to_string()
        }
    };

    // --- Dependency Injection ---
    // 1. Create the one shared repository instance (it loads the
    //    snapshot, or starts empty on a first run / unreadable file).
    let repository = Arc::new(JsonFileRepository::open(&snapshot_path));
    info!("Person repository initialized.");

    // 2. Create the application service, injecting the repository
    let person_service = Arc::new(PersonService::new(repository));
    info!("Application services initialized.");

    // 3. Create the application state
    let app_state = AppState { person_service };
    info!("Application state created.");

    // --- API Router Definition ---
    let app = Router::new()
        .route("/health", get(health_check))
        // Person CRUD Endpoints
        .route("/persons/create", post(create_person_handler))
        .route("/persons/person/:id", get(get_person_handler))
        .route("/persons/personName/:name", get(get_persons_by_name_handler))
        .route(
            "/persons/personsWithPagination",
            get(get_persons_with_pagination_handler),
        )
        .route("/persons/update", put(update_person_handler))
        .route("/persons/delete", delete(delete_person_handler))
        // Provide the application state to the handlers
        .with_state(app_state);

    info!("API routes configured.");

    // --- Server Startup ---
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server starting on {}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

// --- API Handlers ---

async fn health_check() -> impl IntoResponse {
    info!("Health check endpoint called");
    (StatusCode::OK, "OK")
}

/// Handler for creating a person (POST /persons/create).
/// Responds with the newly assigned id as a bare JSON integer.
async fn create_person_handler(
    State(state): State<AppState>,
    Json(payload): Json<PersonRequest>,
) -> Response {
    info!("Received request to create person");
    match state.person_service.create_person(payload).await {
        Ok(id) => (StatusCode::OK, JsonResponse(id)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for fetching a person by id (GET /persons/person/:id).
async fn get_person_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    info!(id, "Received request to get person by id");
    match state.person_service.get_person(PersonId::new(id)).await {
        Ok(person) => (StatusCode::OK, JsonResponse(person)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for fetching persons by name (GET /persons/personName/:name).
/// Matches first or last name exactly; an empty result is a 404.
async fn get_persons_by_name_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    info!(name = %name, "Received request to get persons by name");
    match state.person_service.get_persons_by_name(&name).await {
        Ok(persons) => (StatusCode::OK, JsonResponse(persons)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for the id-range query
/// (GET /persons/personsWithPagination?skip=..&take=..).
async fn get_persons_with_pagination_handler(
    State(state): State<AppState>,
    Query(params): Query<IdRangeParams>,
) -> Response {
    info!(skip = params.skip, take = params.take, "Received id-range request");
    match state.person_service.get_persons_in_id_range(params).await {
        Ok(persons) => (StatusCode::OK, JsonResponse(persons)).into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Handler for replacing a person record (PUT /persons/update).
async fn update_person_handler(
    State(state): State<AppState>,
    Json(payload): Json<Person>,
) -> Response {
    info!(id = %payload.id, "Received request to update person");
    match state.person_service.update_person(payload).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Query parameters of the delete endpoint.
#[derive(Deserialize, Debug)]
struct DeleteParams {
    id: u64,
}

/// Handler for deleting a person record (DELETE /persons/delete?id=..).
async fn delete_person_handler(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Response {
    info!(id = params.id, "Received request to delete person");
    match state.person_service.delete_person(PersonId::new(params.id)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => map_application_error_to_response(e),
    }
}

/// Helper function to map ApplicationError enum to HTTP status codes and
/// response body. Not-found outcomes are normal negatives and are not
/// logged here; persistence faults are.
fn map_application_error_to_response(err: ApplicationError) -> Response {
    let (status, body) = match err {
        ApplicationError::PersonNotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Person '{}' not found", id),
        ),
        ApplicationError::NoMatches => (
            StatusCode::NOT_FOUND,
            "No matching person records".to_string(),
        ),
        ApplicationError::Persistence(msg) => {
            error!("Persistence failure: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist the person collection".to_string(),
            )
        }
    };
    (status, body).into_response() // Convert tuple to Response
}
