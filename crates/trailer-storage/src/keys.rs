//! Object keys for trailer artifacts.

use trailer_models::JobId;

/// Key of the assembled trailer video.
///
/// Format: `trailers/{job_id}/trailer.mp4`
pub fn trailer_video_key(job_id: &JobId) -> String {
    format!("trailers/{}/trailer.mp4", job_id)
}

/// Key of the WebVTT subtitle file.
///
/// Format: `trailers/{job_id}/subtitles.vtt`
pub fn trailer_subtitle_key(job_id: &JobId) -> String {
    format!("trailers/{}/subtitles.vtt", job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let id = JobId::from_string("job-1");
        assert_eq!(trailer_video_key(&id), "trailers/job-1/trailer.mp4");
        assert_eq!(trailer_subtitle_key(&id), "trailers/job-1/subtitles.vtt");
    }
}
