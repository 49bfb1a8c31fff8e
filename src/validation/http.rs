//! HTTP fetch validation.

use std::collections::BTreeMap;

use crate::logging::structured::LogContext;
use crate::measurement::{unquote, Fields};

use super::factory::MeasurementValidator;
use super::outcome::*;
use super::render_sorted;

/// Upper bound for a fetch, in milliseconds. Some outliers are expected.
pub const MAX_HTTP_FETCH_MS: f64 = 100_000.0;

const REQUIRED_FIELDS: &[&str] = &["code", "url"];
const SUCCESS_FIELDS: &[&str] = &["body", "body_len", "headers", "headers_len", "time_ms"];

/// HTTP fetch result.
///
/// The requested `url` lives in the parameters; it is copied into the value
/// map so that rules and the rendered detail see both together.
#[derive(Debug, Clone)]
pub struct Http {
    values: BTreeMap<String, String>,
}

impl Http {
    pub fn new(parameters: &BTreeMap<String, String>, values: &BTreeMap<String, String>) -> Self {
        let mut values = values.clone();
        if let Some(url) = parameters.get("url") {
            values.insert("url".to_string(), url.clone());
        }
        Self { values }
    }

    /// Rules that only apply to a `200` response. Each is evaluated on its
    /// own so a missing field does not hide problems in the others.
    fn validate_success(&self, fields: &Fields<'_>, outcome: &mut ValidationOutcome, ctx: &LogContext) {
        outcome.require(fields, SUCCESS_FIELDS);

        outcome.check(
            ZERO_LENGTH_BODY,
            fields.text("body").map(|body| !unquote(body).is_empty()),
            ctx,
        );
        if !outcome.contains(ZERO_LENGTH_BODY) {
            outcome.check(
                ZERO_LENGTH_BODY,
                fields.number("body_len").map(|len| len > 0.0),
                ctx,
            );
        }

        let header_rule = fields.text("headers").and_then(|headers| {
            let declared = fields.number("headers_len")?;
            Ok(declared == unquote(headers).chars().count() as f64)
        });
        outcome.check(HEADER_LENGTH_MISMATCH, header_rule, ctx);

        outcome.check(
            FETCH_TIME_INVALID,
            fields
                .number("time_ms")
                .map(|ms| (0.0..=MAX_HTTP_FETCH_MS).contains(&ms)),
            ctx,
        );
    }
}

impl MeasurementValidator for Http {
    fn validate(&self, ctx: &LogContext) -> ValidationOutcome {
        let fields = Fields::new(&self.values);
        let mut outcome = ValidationOutcome::new();

        outcome.require(&fields, REQUIRED_FIELDS);

        let code = fields.number("code");

        outcome.check(
            NON_HTTP_URL,
            fields.text("url").map(|url| unquote(url).starts_with("http")),
            ctx,
        );
        outcome.check(
            HTTP_CODE_INVALID,
            code.map(|code| (100.0..600.0).contains(&code)),
            ctx,
        );

        if code == Ok(200.0) {
            self.validate_success(&fields, &mut outcome, ctx);
        }

        outcome
    }

    fn render_detail(&self) -> String {
        render_sorted(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn validate(values: &[(&str, &str)]) -> ValidationOutcome {
        let params = map(&[("url", "http://www.google.com")]);
        Http::new(&params, &map(values)).validate(&LogContext::new("test-run"))
    }

    fn ok_response() -> Vec<(&'static str, &'static str)> {
        vec![
            ("code", "200"),
            ("body", "<html></html>"),
            ("body_len", "13"),
            ("headers", "Content-Type: text/html"),
            ("headers_len", "23"),
            ("time_ms", "350"),
        ]
    }

    #[test]
    fn test_consistent_200_is_valid() {
        let outcome = validate(&ok_response());
        assert!(outcome.is_valid(), "{:?}", outcome.error_types());
    }

    #[test]
    fn test_empty_body_reported_once() {
        let mut values = ok_response();
        values.retain(|(k, _)| *k != "body" && *k != "body_len");
        values.push(("body", ""));
        values.push(("body_len", "0"));

        let outcome = validate(&values);
        assert_eq!(outcome.error_types(), &[ZERO_LENGTH_BODY]);
    }

    #[test]
    fn test_header_length_mismatch() {
        let mut values = ok_response();
        values.retain(|(k, _)| *k != "headers_len");
        values.push(("headers_len", "99"));
        assert_eq!(validate(&values).error_types(), &[HEADER_LENGTH_MISMATCH]);
    }

    #[test]
    fn test_quoted_strings_are_measured_unquoted() {
        let values = [
            ("code", "200"),
            ("body", "\"PGh0bWw+\""),
            ("body_len", "8"),
            ("headers", "\"abc\""),
            ("headers_len", "3"),
            ("time_ms", "120"),
        ];
        let outcome = validate(&values);
        assert!(outcome.is_valid(), "{:?}", outcome.error_types());
    }

    #[test]
    fn test_zero_body_len_with_body_present() {
        let mut values = ok_response();
        values.retain(|(k, _)| *k != "body_len");
        values.push(("body_len", "0"));
        assert_eq!(validate(&values).error_types(), &[ZERO_LENGTH_BODY]);

        let mut values = ok_response();
        values.retain(|(k, _)| *k != "body_len");
        values.push(("body_len", "-4"));
        assert_eq!(validate(&values).error_types(), &[ZERO_LENGTH_BODY]);
    }

    #[test]
    fn test_fetch_time_out_of_range() {
        let mut values = ok_response();
        values.retain(|(k, _)| *k != "time_ms");
        values.push(("time_ms", "100001"));
        assert_eq!(validate(&values).error_types(), &[FETCH_TIME_INVALID]);
    }

    #[test]
    fn test_missing_success_field_keeps_later_rules() {
        let mut values = ok_response();
        values.retain(|(k, _)| *k != "body" && *k != "time_ms");
        values.retain(|(k, _)| *k != "headers_len");
        values.push(("headers_len", "1"));

        let outcome = validate(&values);
        assert_eq!(
            outcome.error_types(),
            &[
                "missing_field_body",
                "missing_field_time_ms",
                HEADER_LENGTH_MISMATCH
            ]
        );
    }

    #[test]
    fn test_non_success_code_skips_body_rules() {
        let outcome = validate(&[("code", "404")]);
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_code_and_url_rules() {
        let params = map(&[("url", "ftp://example.com")]);
        let outcome = Http::new(&params, &map(&[("code", "700")]))
            .validate(&LogContext::new("test-run"));
        assert_eq!(outcome.error_types(), &[NON_HTTP_URL, HTTP_CODE_INVALID]);
    }

    #[test]
    fn test_missing_url_parameter() {
        let outcome = Http::new(&BTreeMap::new(), &map(&[("code", "301")]))
            .validate(&LogContext::new("test-run"));
        assert_eq!(outcome.error_types(), &["missing_field_url"]);
    }

    #[test]
    fn test_render_detail_includes_url() {
        let params = map(&[("url", "http://a.example")]);
        let detail = Http::new(&params, &map(&[("code", "200")])).render_detail();
        assert_eq!(detail, "code: 200\nurl: http://a.example\n");
    }
}
