use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "VaultStream API",
        description = "Private video sharing: upload, HLS transcoding, signed-URL playback"
    ),
    paths(
        crate::handlers::video_upload::upload_video,
        crate::handlers::video_get::get_video,
        crate::handlers::video_update::update_video,
        crate::handlers::video_delete::delete_video,
        crate::handlers::video_access::request_access,
        crate::handlers::stream::stream_file,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::handlers::video_upload::UploadResponse,
        crate::handlers::video_access::AccessRequest,
        crate::handlers::video_update::UpdateVideoRequest,
        vaultstream_core::models::PlaybackGrant,
        vaultstream_core::models::Resolution,
        vaultstream_core::models::VideoResponse,
        vaultstream_core::models::VideoStatus,
        vaultstream_core::models::Visibility,
    )),
    tags(
        (name = "videos", description = "Video upload, metadata, and access control"),
        (name = "stream", description = "Token-guarded HLS delivery")
    )
)]
pub struct ApiDoc;
