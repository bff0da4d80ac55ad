//! `test-utils` is used for testing in both `tollgate-lib` and `tollgate-bin`.
//! This crate does not depend on `tollgate-lib` or `tollgate-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies
//! (`wiremock`, `http` and `serde_json`).

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Create a mock web server which answers the first `$limited` requests with
/// `429 Too Many Requests` and every later request with `200 OK` and `$body`
#[macro_export]
macro_rules! rate_limited_mock_server {
    ($limited:expr, $body:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(http::StatusCode::TOO_MANY_REQUESTS))
            .up_to_n_times($limited)
            .mount(&mock_server)
            .await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(http::StatusCode::OK).set_body_string($body))
            .mount(&mock_server)
            .await;
        mock_server
    }};
}

/// Create a mock web server for localized content.
///
/// `GET /languages` answers with the given language codes. `GET /<code>/<path>`
/// answers with `<body> (<code>)` for the listed languages and with a
/// "no content for language" rejection for any other language.
#[macro_export]
macro_rules! localized_mock_server {
    ([$($language:expr),* $(,)?], $body:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        let languages: Vec<&str> = vec![$($language),*];
        wiremock::Mock::given(wiremock::matchers::path("/languages"))
            .respond_with(
                wiremock::ResponseTemplate::new(http::StatusCode::OK)
                    .set_body_json(serde_json::json!({ "languages": languages })),
            )
            .mount(&mock_server)
            .await;
        for language in &languages {
            wiremock::Mock::given(wiremock::matchers::path_regex(format!("^/{language}/")))
                .respond_with(
                    wiremock::ResponseTemplate::new(http::StatusCode::OK)
                        .set_body_string(format!("{} ({language})", $body)),
                )
                .mount(&mock_server)
                .await;
        }
        wiremock::Mock::given(wiremock::matchers::path_regex("^/[a-z]{2}/"))
            .respond_with(|request: &wiremock::Request| {
                let language = &request.url.path()[1..3];
                wiremock::ResponseTemplate::new(http::StatusCode::NOT_FOUND)
                    .set_body_string(format!("No content available for language {language}"))
            })
            .mount(&mock_server)
            .await;
        mock_server
    }};
}
