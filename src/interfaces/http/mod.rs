use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    dev::Server, get, http::StatusCode, post, web, App, HttpResponse, HttpServer, ResponseError,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::application::use_cases::loan_confirmation::{upload, ConfirmRequest};
use crate::application::use_cases::statistics::usage_statistics;
use crate::application::use_cases::usage_mapper::{map_usage_rows, rows_from_grid};
use crate::application::{LoanConfirmation, LoanIngestion};
use crate::domain::error::{AppError, Result};
use crate::domain::usage::SheetRow;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::loans::LoanStore;
use crate::infrastructure::sheets::SheetSource;

/// Koha exports run to several megabytes
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub struct HttpState {
    pub store: Arc<dyn LoanStore>,
    pub sheets: Arc<dyn SheetSource>,
    pub ingestion: LoanIngestion,
    pub confirmation: LoanConfirmation,
    pub default_spreadsheet: Option<String>,
    pub sheet_range: String,
}

impl HttpState {
    pub fn new(store: Arc<dyn LoanStore>, sheets: Arc<dyn SheetSource>, config: &AppConfig) -> Self {
        let ingestion_config = config.ingestion_config();

        Self {
            confirmation: LoanConfirmation::new(store.clone(), ingestion_config.clone()),
            ingestion: LoanIngestion::new(ingestion_config),
            store,
            sheets,
            default_spreadsheet: config.sheet_uso_computadoras.clone(),
            sheet_range: config.sheet_range.clone(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

fn detail(err: &AppError) -> &str {
    match err {
        AppError::Internal(msg)
        | AppError::NotFound(msg)
        | AppError::ValidationError(msg)
        | AppError::ParseError(msg)
        | AppError::DatabaseError(msg)
        | AppError::ConfigError(msg)
        | AppError::FetchError(msg)
        | AppError::IoError(msg) => msg,
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::ParseError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        HttpResponse::build(status).json(ErrorBody {
            detail: detail(self),
        })
    }
}

#[derive(Deserialize)]
struct UploadQuery {
    filename: String,
}

#[derive(Deserialize)]
struct UsageQuery {
    spreadsheet_id: Option<String>,
    #[serde(default)]
    raw: bool,
}

#[derive(Serialize)]
struct UsageResponse<T: Serialize> {
    total: usize,
    data: Vec<T>,
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[post("/upload")]
async fn upload_loans(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    info!(file = %query.filename, bytes = body.len(), "Received Koha upload");

    let response = upload(&data.ingestion, &query.filename, &body)?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/confirm")]
async fn confirm_loans(
    data: web::Data<HttpState>,
    request: web::Json<ConfirmRequest>,
) -> Result<HttpResponse> {
    let response = data.confirmation.confirm(&request).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/stats")]
async fn loan_stats(data: web::Data<HttpState>) -> Result<HttpResponse> {
    let stats = data.store.loan_statistics().await?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn fetch_usage_rows(data: &HttpState, spreadsheet_id: Option<&str>) -> Result<Vec<SheetRow>> {
    let spreadsheet_id = spreadsheet_id
        .filter(|id| !id.trim().is_empty())
        .or(data.default_spreadsheet.as_deref())
        .ok_or_else(|| {
            AppError::ValidationError(
                "Debes pasar spreadsheet_id como query param o configurar SHEET_USO_COMPUTADORAS."
                    .to_string(),
            )
        })?;

    let grid = data.sheets.fetch_grid(spreadsheet_id, &data.sheet_range).await?;
    Ok(rows_from_grid(&grid))
}

#[get("/uso-computadoras")]
async fn usage_sessions(
    data: web::Data<HttpState>,
    query: web::Query<UsageQuery>,
) -> Result<HttpResponse> {
    let rows = fetch_usage_rows(&data, query.spreadsheet_id.as_deref()).await?;

    if query.raw {
        return Ok(HttpResponse::Ok().json(UsageResponse {
            total: rows.len(),
            data: rows,
        }));
    }

    let records = map_usage_rows(&rows);
    Ok(HttpResponse::Ok().json(UsageResponse {
        total: records.len(),
        data: records,
    }))
}

#[get("/uso-computadoras/stats")]
async fn usage_stats(
    data: web::Data<HttpState>,
    query: web::Query<UsageQuery>,
) -> Result<HttpResponse> {
    let rows = fetch_usage_rows(&data, query.spreadsheet_id.as_deref()).await?;
    let stats = usage_statistics(&map_usage_rows(&rows));
    Ok(HttpResponse::Ok().json(stats))
}

/// Register every route; shared by the server and the handler tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .app_data(
            web::JsonConfig::default()
                .limit(MAX_UPLOAD_BYTES)
                .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
        )
        .service(health)
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/koha")
                        .service(upload_loans)
                        .service(confirm_loans)
                        .service(loan_stats),
                )
                .service(usage_stats)
                .service(usage_sessions),
        );
}

fn cors(origin: Option<&str>) -> Cors {
    match origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header(),
        None => Cors::permissive(),
    }
}

pub fn start_server(state: HttpState, config: &AppConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let cors_origin = config.cors_origin.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(cors_origin.as_deref()))
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    info!(host = %config.host, port = config.port, "HTTP server listening");
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::statistics::{LoanStatistics, UsageStatistics};
    use crate::domain::usage::Grid;
    use crate::infrastructure::db::sqlite::SqliteLoanStore;
    use actix_web::test;
    use async_trait::async_trait;

    const HEADER: &str = "Anio,Mes,Biblioteca_Origen,Carrera_Programa,Titulo_Libro,Total_Transacciones";

    struct FakeSheet {
        grid: Grid,
    }

    #[async_trait]
    impl SheetSource for FakeSheet {
        async fn fetch_grid(&self, _spreadsheet_id: &str, _range: &str) -> Result<Grid> {
            Ok(self.grid.clone())
        }
    }

    struct BrokenSheet;

    #[async_trait]
    impl SheetSource for BrokenSheet {
        async fn fetch_grid(&self, _spreadsheet_id: &str, _range: &str) -> Result<Grid> {
            Err(AppError::FetchError("Sheets API returned 403".to_string()))
        }
    }

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn usage_grid() -> Grid {
        vec![
            vec![cell("Tipo de usuario"), cell("Hora de inicio"), cell("Hora de fin")],
            vec![cell("Alumno"), cell("10:00"), cell("10:30")],
            vec![cell("Docente"), cell("11:00"), cell("12:00")],
        ]
    }

    async fn state_with(sheets: Arc<dyn SheetSource>, default_spreadsheet: Option<&str>) -> web::Data<HttpState> {
        let store = SqliteLoanStore::connect("sqlite::memory:", 1).await.unwrap();
        store.init_schema().await.unwrap();

        let config = AppConfig {
            sheet_uso_computadoras: default_spreadsheet.map(str::to_string),
            ..AppConfig::default()
        };
        web::Data::new(HttpState::new(Arc::new(store), sheets, &config))
    }

    async fn default_state() -> web::Data<HttpState> {
        state_with(Arc::new(FakeSheet { grid: usage_grid() }), Some("sheet-1")).await
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_upload_then_confirm_then_stats() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let csv = format!(
            "{}\n2023,4,CEN,Derecho,Código Civil,3\n2023,5,cu,Medicina,Anatomía,7\n2023,5,NOPE,Medicina,Anatomía,7\n",
            HEADER
        );
        let req = test::TestRequest::post()
            .uri("/api/v1/koha/upload?filename=export.csv")
            .set_payload(csv)
            .to_request();
        let uploaded: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(uploaded["file"], "export.csv");
        assert_eq!(uploaded["report"]["discarded_rows"], 1);
        let records = uploaded["clean_records"].clone();
        assert_eq!(records.as_array().map(Vec::len), Some(2));

        let req = test::TestRequest::post()
            .uri("/api/v1/koha/confirm")
            .set_json(serde_json::json!({ "records": records }))
            .to_request();
        let confirmed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(confirmed["status"], "ok");
        assert_eq!(confirmed["inserted"], 2);
        assert_eq!(confirmed["failed"], 0);

        let req = test::TestRequest::get().uri("/api/v1/koha/stats").to_request();
        let stats: LoanStatistics = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_transactions, 10);
        assert_eq!(stats.by_library[0].label, "CU");
    }

    #[actix_web::test]
    async fn test_upload_rejects_non_csv() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/koha/upload?filename=export.xlsx")
            .set_payload(HEADER)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Solo se aceptan archivos CSV");
    }

    #[actix_web::test]
    async fn test_confirm_rejects_empty_records() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/koha/confirm")
            .set_json(serde_json::json!({ "records": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_usage_sessions_mapped_and_raw() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/uso-computadoras").to_request();
        let mapped: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mapped["total"], 2);
        assert_eq!(mapped["data"][1]["duration_minutes"], 60);

        let req = test::TestRequest::get()
            .uri("/api/v1/uso-computadoras?raw=true&spreadsheet_id=other")
            .to_request();
        let raw: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(raw["total"], 2);
        assert_eq!(raw["data"][0]["Tipo de usuario"], "Alumno");
    }

    #[actix_web::test]
    async fn test_usage_stats() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/uso-computadoras/stats").to_request();
        let stats: UsageStatistics = test::call_and_read_body_json(&app, req).await;

        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.average_duration_minutes, Some(45.0));
        assert_eq!(stats.by_user_type.len(), 2);
    }

    #[actix_web::test]
    async fn test_usage_stats_on_empty_sheet() {
        let empty = vec![vec![cell("Tipo de usuario")]];
        let state = state_with(Arc::new(FakeSheet { grid: empty }), Some("sheet-1")).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/uso-computadoras/stats").to_request();
        let stats: UsageStatistics = test::call_and_read_body_json(&app, req).await;

        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.average_duration_minutes, None);
        assert!(stats.by_purpose.is_empty());
    }

    #[actix_web::test]
    async fn test_usage_requires_spreadsheet_id() {
        let state = state_with(Arc::new(FakeSheet { grid: usage_grid() }), None).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/uso-computadoras").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_sheet_failure_is_server_error() {
        let state = state_with(Arc::new(BrokenSheet), Some("sheet-1")).await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/uso-computadoras").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Sheets API returned 403");
    }

    #[actix_web::test]
    async fn test_confirm_keeps_good_records_when_one_is_bad() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let records = serde_json::json!([
            {
                "year": 2023, "month": 4, "library": "CEN", "program": "Derecho",
                "title": "Código Civil", "transaction_count": 3
            },
            {
                "year": 2023, "month": 4, "library": "XXX", "program": "Derecho",
                "title": "Teoría", "transaction_count": 1
            }
        ]);
        let req = test::TestRequest::post()
            .uri("/api/v1/koha/confirm")
            .set_json(serde_json::json!({ "records": records }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["inserted"], 1);
        assert_eq!(body["failed"], 1);
    }

    #[actix_web::test]
    async fn test_extractor_errors_use_detail_body() {
        let state = default_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/koha/upload")
            .set_payload(HEADER)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));

        let req = test::TestRequest::post()
            .uri("/api/v1/koha/confirm")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"records\": 5}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].is_string());

        let req = test::TestRequest::get()
            .uri("/api/v1/uso-computadoras?raw=quizas")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["detail"].is_string());
    }
}
