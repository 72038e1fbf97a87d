use std::str::FromStr;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::ContentType};
use serde::Deserialize;

use crate::{
    api::page::render_error_page,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{Gender, RecordAddInputType},
    },
};

/***************** Entry form models *********************/

/**
 * Raw values of the entry form.
 *
 * Kept as text so that rejected input can be shown again exactly as entered.
 */
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordForm {
    pub name: String,
    pub gender: String,
    pub monthly_income: String,
    pub family_size: String,
    pub risk_factor: String,
}

impl Default for RecordForm {
    /**
     * The values of a freshly reset form.
     */
    fn default() -> Self {
        RecordForm { name: String::new(), gender: Gender::default().label().to_string(), monthly_income: "0".to_string(), family_size: "1".to_string(), risk_factor: String::new() }
    }
}

impl RecordForm {
    /**
     * Validates the form.
     *
     * The name must be non-empty after trimming but is kept verbatim. Line breaks in the risk factor
     * are normalized to `\n` since browsers submit textarea content with `\r\n`.
     *
     * # Returns
     * A Result containing the `RecordAddInputType` or a validation `ApplicationError` with the message to show.
     */
    pub fn validate(&self) -> Result<RecordAddInputType, ApplicationError> {
        if self.name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "请务必填写姓名！".to_string()));
        }
        let gender = Gender::from_str(self.gender.trim()).map_err(|_err| ApplicationError::new(ErrorType::Validation, "性别只能选择“男”或“女”！".to_string()))?;
        let monthly_income = self.monthly_income.trim().parse::<u64>().map_err(|_err| ApplicationError::new(ErrorType::Validation, "月收入必须是不小于 0 的整数！".to_string()))?;
        let family_size = self
            .family_size
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|family_size| *family_size >= 1)
            .ok_or_else(|| ApplicationError::new(ErrorType::Validation, "家庭人口必须是不小于 1 的整数！".to_string()))?;
        let risk_factor = self.risk_factor.replace("\r\n", "\n");
        Ok(RecordAddInputType { name: self.name.clone(), gender, monthly_income, risk_factor, family_size })
    }
}

/***************** Error models *********************/

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error page for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let status = get_statuscode(&self.error_type);
        HttpResponse::build(status).insert_header(ContentType::html()).body(render_error_page(status, get_error_code(&self.error_type), &self.message))
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorType::Initialization | ErrorType::MalformedFile | ErrorType::WriteFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::MalformedFile => 1003,
        ErrorType::WriteFailure => 1004,
    }
}
