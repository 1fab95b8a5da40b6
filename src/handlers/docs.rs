use actix_web::HttpResponse;

const USAGE: &str = "\
video-caption-backend

POST /caption?audio_only=false&debug=false
    Body: {\"url\": \"https://www.tiktok.com/@user/video/123\"}
    Transcribes the video. audio_only=true sends only the audio track to the
    worker; debug=true adds phase timing, throughput and a time breakdown.

POST /download?hq=false
    Body: {\"url\": \"https://www.tiktok.com/@user/video/123\"}
    Redirects (302) to the media file. hq=true prefers the high-definition
    variant; otherwise the standard one.

GET /health
    Service status, pipeline settings and request counters.

GET /metrics
    Per-endpoint request counts, error rates and average durations.

Errors are JSON: {\"error\": \"...\", \"details\": \"...\"}
    400 invalid or missing URL
    408 transcription timed out
    500 any other failure
";

/// `GET /`
pub async fn usage() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(USAGE)
}
