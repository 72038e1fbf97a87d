use actix_web::{
    HttpRequest, HttpResponse, get,
    http::{
        StatusCode,
        header::{Charset, ContentDisposition, ContentType, DispositionParam, DispositionType, ExtendedValue},
    },
    post, web,
};
use chrono::Local;
use tracing::{Instrument, info, instrument, warn};

use crate::{
    api::{
        page::{EXPORT_FILE_NAME, LedgerPage, Notice},
        rest::RecordForm,
        state::AppState,
    },
    model::{apperror::ApplicationError, models::RecordTable},
};

/**
 * Endpoint rendering the entry page with an empty form and the current ledger.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "showLedger", trace_id = get_trace_id(&http_request)))]
#[get("/")]
pub async fn ledger_show(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let table = app_state.monitoring_service.get_record_table().instrument(span).await?;
    Ok(page_response(StatusCode::OK, &app_state, &RecordForm::default(), None, &table))
}

/**
 * Endpoint handling a form submission.
 *
 * Invalid input is shown again with an inline message and nothing is stored. A stored record resets the form.
 */
#[instrument(level = "info", skip(http_request, form, app_state), fields(service = "addRecord", trace_id = get_trace_id(&http_request)))]
#[post("/")]
pub async fn record_add(http_request: HttpRequest, form: web::Form<RecordForm>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let form = form.into_inner();
    let record_add_input = match form.validate() {
        Ok(record_add_input) => record_add_input,
        Err(err) => {
            warn!("Rejected submission: {err}");
            let table = app_state.monitoring_service.get_record_table().instrument(span).await?;
            return Ok(page_response(StatusCode::UNPROCESSABLE_ENTITY, &app_state, &form, Some(&Notice::Error(err.message)), &table));
        }
    };
    let name = record_add_input.name.clone();
    app_state.monitoring_service.add_record(record_add_input).instrument(span.clone()).await?;
    info!("Record stored");
    let table = app_state.monitoring_service.get_record_table().instrument(span).await?;
    let notice = Notice::Success(format!("成功录入：{name} 的信息已保存！"));
    Ok(page_response(StatusCode::OK, &app_state, &RecordForm::default(), Some(&notice), &table))
}

/**
 * Endpoint downloading the current ledger as UTF-8 CSV with byte-order marker.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "exportLedger", trace_id = get_trace_id(&http_request)))]
#[get("/export")]
pub async fn ledger_export(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let contents = app_state.monitoring_service.export_records().instrument(span).await?;
    Ok(HttpResponse::Ok().content_type("text/csv; charset=utf-8").insert_header(export_disposition()).body(contents))
}

fn page_response(status: StatusCode, app_state: &AppState, form: &RecordForm, notice: Option<&Notice>, table: &RecordTable) -> HttpResponse {
    let page = LedgerPage { presenter: &app_state.presenter, form, notice, table, today: Local::now().date_naive() };
    HttpResponse::build(status).insert_header(ContentType::html()).body(page.to_string())
}

/**
 * Attachment header carrying the UTF-8 file name and an ASCII fallback for older clients.
 */
fn export_disposition() -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![
            DispositionParam::Filename("ledger_export.csv".to_string()),
            DispositionParam::FilenameExt(ExtendedValue { charset: Charset::Ext("UTF-8".to_string()), language_tag: None, value: EXPORT_FILE_NAME.as_bytes().to_vec() }),
        ],
    }
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::{App, test, web::Data};
    use prometheus::IntGauge;

    use super::*;
    use crate::{
        dao::records::{RecordStore, UTF8_BOM},
        model::config::PresenterConfig,
        service::monitoring::MonitoringService,
    };

    fn app_state(dir: &tempfile::TempDir) -> Data<AppState> {
        app_state_at(dir.path().join("poverty_data.csv"))
    }

    fn app_state_at(data_file: std::path::PathBuf) -> Data<AppState> {
        let gauge = IntGauge::new("monitoring_records", "Records in the ledger").unwrap();
        let service = MonitoringService::new(RecordStore::new(data_file), gauge);
        Data::new(AppState::new(service, PresenterConfig::default()))
    }

    async fn body_text(response: actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(response).await.to_vec()).unwrap()
    }

    fn submission(name: &str, risk_factor: &str) -> Vec<(&'static str, String)> {
        vec![("name", name.to_string()), ("gender", "男".to_string()), ("monthly_income", "2000".to_string()), ("family_size", "4".to_string()), ("risk_factor", risk_factor.to_string())]
    }

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = test::TestRequest::default().insert_header(("X-Trace-ID", "test")).to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = test::TestRequest::default().to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }

    #[actix_web::test]
    async fn test_show_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).service(ledger_show)).await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("暂无数据，请在上方录入。"));
        assert!(body.contains("name=\"name\""));
    }

    #[actix_web::test]
    async fn test_submit_stores_record_and_resets_form() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let app = test::init_service(App::new().app_data(state.clone()).service(record_add)).await;
        let request = test::TestRequest::post().uri("/").set_form(submission("张三", "因病")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("成功录入：张三 的信息已保存！"));
        assert!(body.contains("<td>张三</td><td>男</td><td>2000</td><td>因病</td><td>4</td>"));
        assert!(body.contains("name=\"name\" placeholder=\"请输入户主姓名\" value=\"\""));
        let table = state.monitoring_service.get_record_table().await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].name, "张三");
        assert_eq!(table.rows()[0].risk_factor, "因病");
    }

    #[actix_web::test]
    async fn test_submit_with_blank_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let app = test::init_service(App::new().app_data(state.clone()).service(record_add)).await;
        let request = test::TestRequest::post().uri("/").set_form(submission("张三", "因病")).to_request();
        test::call_service(&app, request).await;
        for name in ["", "   "] {
            let request = test::TestRequest::post().uri("/").set_form(submission(name, "保留的内容")).to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body = body_text(response).await;
            assert!(body.contains("请务必填写姓名！"));
            assert!(body.contains(">保留的内容</textarea>"));
        }
        assert_eq!(state.monitoring_service.get_record_table().await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_submit_multi_line_risk_factor_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let app = test::init_service(App::new().app_data(state.clone()).service(record_add)).await;
        let request = test::TestRequest::post().uri("/").set_form(submission("李四", "因病, 缺少劳动力\n自然灾害")).to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::OK);
        let table = state.monitoring_service.get_record_table().await.unwrap();
        assert_eq!(table.rows()[0].risk_factor, "因病, 缺少劳动力\n自然灾害");
    }

    #[actix_web::test]
    async fn test_export_download() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let app = test::init_service(App::new().app_data(state.clone()).service(record_add).service(ledger_export)).await;
        let request = test::TestRequest::post().uri("/").set_form(submission("张三", "因病")).to_request();
        test::call_service(&app, request).await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/export").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap().to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/csv"));
        let disposition = response.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("filename*=UTF-8''"));
        let body = test::read_body(response).await;
        let stored = std::fs::read(dir.path().join("poverty_data.csv")).unwrap();
        assert_eq!(&body[..3], &UTF8_BOM);
        assert_eq!(&body[3..], stored.as_slice());
    }

    #[actix_web::test]
    async fn test_malformed_ledger_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("poverty_data.csv"), "a,b\n1,2\n").unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).service(ledger_show).service(record_add)).await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let request = test::TestRequest::post().uri("/").set_form(submission("张三", "因病")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("错误代码 1003"));
        assert_eq!(std::fs::read_to_string(dir.path().join("poverty_data.csv")).unwrap(), "a,b\n1,2\n");
    }

    #[actix_web::test]
    async fn test_failed_write_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file"), "").unwrap();
        let data_file = dir.path().join("file").join("poverty_data.csv");
        let app = test::init_service(App::new().app_data(app_state_at(data_file.clone())).service(record_add)).await;
        let request = test::TestRequest::post().uri("/").set_form(submission("张三", "因病")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("错误代码 1004"));
        assert!(!body.contains("成功录入"));
        assert!(!data_file.exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("file")).unwrap(), "");
    }
}
