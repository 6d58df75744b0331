//! Orchestrator scenarios.

use std::sync::Arc;

use trailer_models::{GenerationStatus, Locale, TrailerJob};
use trailer_storage::{trailer_subtitle_key, trailer_video_key, CacheKey, ObjectStore, ResultCache};
use trailer_worker::grounding::offline_lookup;
use trailer_worker::planner::plan_scenes;

use super::fakes::{
    FakeAssembler, FakeProvider, Harness, OverlongFirstWriter, UnsafeRewriteWriter, UnsafeWriter,
};

// Camera motion phrases the template writer puts in each scene's video prompt.
const INTRO_SHOT: &str = "steps into view";
const BODY_SHOT: &str = "moves forward as the story unfolds";
const OUTRO_SHOT: &str = "turns toward the viewer";

#[tokio::test]
async fn test_all_scenes_succeed() {
    let harness = Harness::builder().build();
    let job = TrailerJob::new("피터 팬");

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(result.status, GenerationStatus::Completed, "{:?}", result.error_message);
    assert!(!result.is_partial());
    assert!(!result.cache_hit);
    assert_eq!(result.scenes_used, vec![1, 2, 3]);
    assert_eq!(result.assembly_mode.as_deref(), Some("burned_subtitles"));
    assert_eq!(
        harness.assembler.scene_files(),
        vec!["scene_1.mp4", "scene_2.mp4", "scene_3.mp4"]
    );
    assert_eq!(harness.provider.keyframes(), 3);
    assert_eq!(harness.provider.videos(), 3);

    let video_key = trailer_video_key(&job.job_id);
    assert_eq!(result.video_url, Some(harness.store.url(&video_key)));
    assert!(harness.store.exists(&video_key).await.unwrap());

    let vtt = harness
        .store
        .load(&trailer_subtitle_key(&job.job_id))
        .await
        .unwrap();
    let vtt = String::from_utf8(vtt).unwrap();
    assert!(vtt.starts_with("WEBVTT"));
    assert_eq!(vtt.matches(" --> ").count(), 3);
    assert!(vtt.contains("00:00:00.000 --> 00:00:08.000"));
    assert!(vtt.contains("00:00:16.000 --> 00:00:24.000"));

    let qc = result.qc_report.as_ref().unwrap();
    assert!(qc.passed(), "{:?}", qc.violations());

    let cost = result.cost_report.as_ref().unwrap();
    assert_eq!(cost.total_retries, 0);
    assert!((cost.total_cost_usd - 1.67).abs() < 1e-9);
}

#[tokio::test]
async fn test_offline_title_is_grounded_without_catalog_match() {
    let harness = Harness::builder().build();
    let job = TrailerJob::new("어린왕자");

    let result = harness.orchestrator.execute(&job).await;

    assert!(result.is_completed(), "{:?}", result.error_message);
    assert_eq!(harness.catalog_calls(), 1);
    assert_eq!(harness.provider.prompts_containing("The Little Prince"), 3);
}

#[tokio::test]
async fn test_keyframe_exhaustion_falls_back_then_fails_scene() {
    let facts = offline_lookup("피터 팬").unwrap();
    let marker = plan_scenes(&facts)[1].beat.clone();
    let harness = Harness::builder()
        .provider(FakeProvider::failing_keyframes_containing(marker.clone()))
        .build();
    let job = TrailerJob::new("피터 팬");

    let result = harness.orchestrator.execute(&job).await;

    // Three keyframe attempts, then one more after each of three script
    // fallbacks, before scene 2 runs out of budget.
    assert_eq!(harness.provider.prompts_containing(&marker), 6);
    assert_eq!(harness.provider.keyframes(), 8);
    assert_eq!(harness.provider.videos(), 2);

    assert_eq!(result.status, GenerationStatus::Completed);
    assert!(result.is_partial());
    assert_eq!(result.scenes_used, vec![1, 3]);
    assert_eq!(
        harness.assembler.scene_files(),
        vec!["scene_1.mp4", "scene_3.mp4"]
    );

    let cost = result.cost_report.as_ref().unwrap();
    let scene2 = cost.scenes.iter().find(|s| s.scene_number == 2).unwrap();
    assert_eq!(scene2.retries, 6);
    assert_eq!(cost.total_retries, 6);
}

#[tokio::test]
async fn test_all_scenes_failed_fails_job() {
    let harness = Harness::builder()
        .provider(FakeProvider::failing_all_keyframes())
        .build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(result.status, GenerationStatus::Failed);
    let message = result.error_message.unwrap();
    assert!(message.starts_with("All scenes failed"), "{}", message);
    for scene in ["scene 1", "scene 2", "scene 3"] {
        assert!(message.contains(scene), "{}", message);
    }
    assert_eq!(harness.provider.videos(), 0);
    assert!(harness.cache.is_empty().await);
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let harness = Harness::builder().build();

    let first = harness
        .orchestrator
        .execute(&TrailerJob::new("Peter Pan").with_language(Locale::En))
        .await;
    assert!(first.is_completed(), "{:?}", first.error_message);

    let second = harness
        .orchestrator
        .execute(&TrailerJob::new("  peter pan ").with_language(Locale::En))
        .await;

    assert!(second.cache_hit);
    assert_eq!(second.video_url, first.video_url);
    assert_eq!(second.scenes_used, first.scenes_used);
    assert_eq!(harness.catalog_calls(), 1);
    assert_eq!(harness.provider.keyframes(), 3);
    assert_eq!(harness.provider.videos(), 3);

    let cached = harness
        .cache
        .get(&CacheKey::new("Peter Pan", None))
        .await
        .unwrap()
        .unwrap();
    assert!(!cached.cache_hit);
}

#[tokio::test]
async fn test_concurrent_identical_requests_build_once() {
    let harness = Harness::builder().build();
    let a = TrailerJob::new("Alice in Wonderland").with_author("Lewis Carroll");
    let b = TrailerJob::new("alice in wonderland").with_author("LEWIS CARROLL ");

    let (ra, rb) = tokio::join!(harness.orchestrator.execute(&a), harness.orchestrator.execute(&b));

    assert!(ra.is_completed() && rb.is_completed());
    assert_eq!(u8::from(ra.cache_hit) + u8::from(rb.cache_hit), 1);
    assert_eq!(harness.provider.keyframes(), 3);
    assert_eq!(harness.catalog_calls(), 1);
}

#[tokio::test]
async fn test_forbidden_content_aborts_before_media() {
    let harness = Harness::builder().writer(Arc::new(UnsafeWriter)).build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(result.status, GenerationStatus::Failed);
    let message = result.error_message.unwrap();
    assert!(message.starts_with("Safety violation"), "{}", message);
    assert!(message.contains("murder"), "{}", message);
    assert_eq!(harness.provider.keyframes(), 0);
}

#[tokio::test]
async fn test_typography_failure_regenerates_scripts_with_feedback() {
    let writer = Arc::new(OverlongFirstWriter::default());
    let harness = Harness::builder().writer(writer.clone()).build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    assert!(result.is_completed(), "{:?}", result.error_message);
    let feedback = writer.feedback_seen.lock().unwrap().clone();
    assert_eq!(feedback.len(), 3);
    assert!(feedback.iter().all(|f| f.contains("exceeds limit of 40")));
    assert!(result.qc_report.unwrap().passed());
    assert_eq!(result.cost_report.unwrap().total_retries, 3);
}

#[tokio::test]
async fn test_assembly_failure_fails_job_after_subtitle_upload() {
    let harness = Harness::builder()
        .assembler(FakeAssembler::failing())
        .build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(result.status, GenerationStatus::Failed);
    assert!(harness
        .store
        .exists(&trailer_subtitle_key(&job.job_id))
        .await
        .unwrap());
    assert!(!harness.store.exists(&trailer_video_key(&job.job_id)).await.unwrap());
    assert!(harness.cache.is_empty().await);
}

#[tokio::test]
async fn test_blank_title_is_rejected_before_grounding() {
    let harness = Harness::builder().build();
    let job = TrailerJob::new("   ");

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(result.status, GenerationStatus::Failed);
    assert!(result.error_message.unwrap().starts_with("Invalid job"));
    assert_eq!(harness.catalog_calls(), 0);
}

#[tokio::test]
async fn test_video_exhaustion_falls_back_to_keyframe_then_script() {
    let facts = offline_lookup("Peter Pan").unwrap();
    let beat = plan_scenes(&facts)[1].beat.clone();
    let harness = Harness::builder()
        .provider(FakeProvider::failing_videos(&[(BODY_SHOT, u32::MAX)]))
        .build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    // Two video attempts, three keyframe fallbacks and three script
    // fallbacks, each followed by another video attempt.
    assert_eq!(harness.provider.videos_containing(BODY_SHOT), 8);
    assert_eq!(harness.provider.prompts_containing(&beat), 7);

    assert_eq!(result.status, GenerationStatus::Completed, "{:?}", result.error_message);
    assert_eq!(result.scenes_used, vec![1, 3]);
    let cost = result.cost_report.as_ref().unwrap();
    let scene2 = cost.scenes.iter().find(|s| s.scene_number == 2).unwrap();
    assert_eq!(scene2.retries, 3 + 3 + 2);
}

#[tokio::test]
async fn test_late_scene_keeps_its_budget_after_earlier_scenes_fail() {
    let harness = Harness::builder()
        .provider(FakeProvider::failing_videos(&[
            (INTRO_SHOT, u32::MAX),
            (BODY_SHOT, u32::MAX),
            (OUTRO_SHOT, 5),
        ]))
        .build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(harness.provider.videos_containing(INTRO_SHOT), 8);
    assert_eq!(harness.provider.videos_containing(BODY_SHOT), 8);
    assert_eq!(harness.provider.videos_containing(OUTRO_SHOT), 6);
    assert_eq!(result.status, GenerationStatus::Completed, "{:?}", result.error_message);
    assert!(result.is_partial());
    assert_eq!(result.scenes_used, vec![3]);
}

#[tokio::test]
async fn test_regenerated_script_must_pass_safety() {
    let harness = Harness::builder()
        .provider(FakeProvider::failing_videos(&[(INTRO_SHOT, u32::MAX)]))
        .writer(Arc::new(UnsafeRewriteWriter))
        .build();
    let job = TrailerJob::new("Peter Pan").with_language(Locale::En);

    let result = harness.orchestrator.execute(&job).await;

    assert_eq!(result.status, GenerationStatus::Failed);
    let message = result.error_message.unwrap();
    assert!(message.starts_with("Safety violation"), "{}", message);
    assert!(message.contains("murder"), "{}", message);
    // Aborted on the first rewrite of scene 1, before later scenes ran.
    assert_eq!(harness.provider.videos_containing(INTRO_SHOT), 5);
    assert_eq!(harness.provider.videos_containing(OUTRO_SHOT), 0);
    assert!(harness.cache.is_empty().await);
}
