use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse};

const OPENAPI_YAML: &str = include_str!("../../assets/openapi.yaml");

const SWAGGER_INDEX: &str = r##"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>CareTrack API</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
    <script>
      window.onload = () => {
        window.ui = SwaggerUIBundle({ url: "/docs/openapi.yaml", dom_id: "#swagger-ui" });
      };
    </script>
  </body>
</html>
"##;

/// GET /docs
pub async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_INDEX)
}

/// GET /docs/openapi.yaml
pub async fn openapi_yaml() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/yaml")], OPENAPI_YAML)
}
