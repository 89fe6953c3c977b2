use actix_web::{HttpRequest, HttpResponse};
use mime_guess::from_path;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

/// Serve the embedded frontend; `/` maps to `index.html`.
pub async fn serve_static(req: HttpRequest) -> HttpResponse {
    let path = req.path();
    let file_path = match path {
        "/" | "/index.html" => "index.html",
        _ => path.trim_start_matches('/'),
    };

    match Assets::get(file_path) {
        Some(file) => {
            let mime = from_path(file_path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.as_ref())
                .body(file.data.into_owned())
        }
        None => HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" })),
    }
}
