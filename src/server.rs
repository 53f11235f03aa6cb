use std::sync::Arc;

use actix_web::{http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::FeedError,
    fare::FareService,
    odpt::OdptClient,
    status::StatusReport,
};

#[derive(Clone)]
pub struct AppState {
    pub fares: Arc<FareService<OdptClient>>,
    pub odpt: OdptClient,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            fares: Arc::new(FareService::from_config(config)),
            odpt: OdptClient::new(config),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FareParams {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        error: error.to_string(),
    })
}

/// Runs feed-backed work off the async workers. Feed failures are 503.
async fn blocking_json<T, F>(work: F) -> HttpResponse
where
    F: FnOnce() -> Result<T, FeedError> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match web::block(work).await {
        Ok(Ok(body)) => HttpResponse::Ok().json(body),
        Ok(Err(e)) => {
            warn!("Feed unavailable: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e)
        }
        Err(e) => {
            warn!("Blocking task failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn fare(state: web::Data<AppState>, params: web::Query<FareParams>) -> HttpResponse {
    let FareParams { from, to } = params.into_inner();
    if from.trim().is_empty() || to.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "both 'from' and 'to' are required",
        );
    }

    let fares = state.fares.clone();
    blocking_json(move || fares.find_fare(&from, &to)).await
}

async fn stations(state: web::Data<AppState>, params: web::Query<SearchParams>) -> HttpResponse {
    let fares = state.fares.clone();
    let q = params.into_inner().q;
    blocking_json(move || fares.resolve(&q)).await
}

async fn autocomplete(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> HttpResponse {
    let fares = state.fares.clone();
    let q = params.into_inner().q;
    blocking_json(move || fares.autocomplete(&q)).await
}

#[derive(Debug, Serialize)]
struct StatusBody {
    disrupted: Vec<DisruptionBody>,
    normal: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DisruptionBody {
    railway: String,
    status: String,
    time_of_origin: Option<String>,
}

impl From<StatusReport> for StatusBody {
    fn from(report: StatusReport) -> Self {
        Self {
            disrupted: report
                .disrupted
                .into_iter()
                .map(|d| DisruptionBody {
                    railway: d.railway,
                    status: d.status,
                    time_of_origin: d.time_of_origin.map(|t| t.to_rfc3339()),
                })
                .collect(),
            normal: report.normal,
        }
    }
}

async fn status(state: web::Data<AppState>) -> HttpResponse {
    let odpt = state.odpt.clone();
    blocking_json(move || {
        let info = odpt.fetch_train_information()?;
        Ok(StatusBody::from(StatusReport::new(&info)))
    })
    .await
}

async fn refresh(state: web::Data<AppState>) -> HttpResponse {
    info!("Manual cache refresh requested");
    let fares = state.fares.clone();
    blocking_json(move || {
        fares.cache().refresh()?;
        Ok(serde_json::json!({ "refreshed": true }))
    })
    .await
}

async fn invalidate(state: web::Data<AppState>) -> HttpResponse {
    state.fares.cache().invalidate();
    info!("Feed cache cleared");
    HttpResponse::NoContent().finish()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/fare", web::get().to(fare))
        .route("/stations", web::get().to(stations))
        .route("/stations/autocomplete", web::get().to(autocomplete))
        .route("/status", web::get().to(status))
        .route("/cache/refresh", web::post().to(refresh))
        .route("/cache", web::delete().to(invalidate));
}

pub async fn run(state: AppState, bind: &str) -> std::io::Result<()> {
    info!("Listening on http://{bind}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::test;

    use super::*;

    fn app_state() -> AppState {
        AppState::new(&Config::default())
    }

    #[actix_web::test]
    async fn health_is_ok() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn cache_can_be_cleared() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::delete().uri("/cache").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn fare_requires_both_names() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/fare?from=&to=Tokyo").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unavailable_feed_is_503() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state()))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/fare?from=Shibuya&to=Tokyo")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "no ODPT consumer key configured");
    }
}
