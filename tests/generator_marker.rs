use std::path::PathBuf;

use bumpgen::{
    BumpgenError, BumpgenResult, FontRegistry, FpsPair, Resolution, Rgba8, Selection, TimeWindow,
    encode::{EncodeRequest, EncodedOutput},
    generator::{ChannelInfo, Outcome, VideoOptions, make_video_with},
    templates::TemplateRegistry,
};

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "bumpgen_test_{}_{}_{}",
        tag,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .subsec_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A font-free template so the whole pipeline runs without font files.
fn rect_templates() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry.register(
        "solid",
        Box::new(|ctx, scene, _timeline| {
            scene.add_rect(
                0.0,
                0.0,
                ctx.convert_x(1.0),
                ctx.convert_y(1.0),
                Rgba8::WHITE,
            );
            Ok(())
        }),
    );
    registry
}

fn options(output_dir: PathBuf, title: &str, episode: Option<&str>) -> VideoOptions {
    VideoOptions {
        channel: ChannelInfo {
            id: "ch-1".into(),
            name: Some("Channel One".into()),
        },
        programmes: vec![bumpgen::ProgrammeInfo {
            title: title.into(),
            episode: episode.map(Into::into),
            ..Default::default()
        }],
        background: None,
        output_dir,
        output_file_name: "bump.mp4".into(),
        resolution: Resolution::new(16, 16).unwrap(),
        length_seconds: 4.0,
        template: "solid".into(),
        fps: FpsPair::new(1, 30).unwrap(),
    }
}

fn counting_encode(
    frames_seen: &mut u64,
    request_out: &mut Option<EncodeRequest>,
) -> impl FnOnce(bumpgen::FrameStream<'_>, EncodeRequest) -> BumpgenResult<EncodedOutput> {
    move |stream, request| {
        let path = request.output_path.clone();
        *request_out = Some(request);
        for frame in stream {
            frame?;
            *frames_seen += 1;
        }
        Ok(EncodedOutput { path })
    }
}

#[test]
fn first_run_generates_and_writes_the_marker() {
    let dir = temp_dir("first");
    let templates = rect_templates();
    let fonts = FontRegistry::new();
    let opts = options(dir.clone(), "The News", Some("E7"));

    let mut frames = 0u64;
    let mut request = None;
    let outcome = make_video_with(
        &opts,
        &templates,
        &fonts,
        counting_encode(&mut frames, &mut request),
    )
    .unwrap();

    assert_eq!(outcome, Outcome::Generated);
    // 4s at 1 fps capture.
    assert_eq!(frames, 4);

    let request = request.unwrap();
    assert_eq!(request.output_path, dir.join("bump.mp4"));
    assert!(request.background.is_none());
    assert_eq!(request.fps, FpsPair::new(1, 30).unwrap());

    let marker = dir.join(".channel-ch-1-last-generated");
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "The News-E7");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unchanged_programme_is_skipped() {
    let dir = temp_dir("skip");
    let templates = rect_templates();
    let fonts = FontRegistry::new();
    let opts = options(dir.clone(), "The News", Some("E7"));

    let mut frames = 0u64;
    let mut request = None;
    make_video_with(
        &opts,
        &templates,
        &fonts,
        counting_encode(&mut frames, &mut request),
    )
    .unwrap();

    let mut called = false;
    let outcome = make_video_with(&opts, &templates, &fonts, |_, _| {
        called = true;
        Ok(EncodedOutput {
            path: PathBuf::new(),
        })
    })
    .unwrap();

    assert_eq!(outcome, Outcome::NotGenerated);
    assert!(!called, "encode must not run for an up-to-date bump");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn new_programme_regenerates_and_updates_the_marker() {
    let dir = temp_dir("update");
    let templates = rect_templates();
    let fonts = FontRegistry::new();

    let mut frames = 0u64;
    let mut request = None;
    make_video_with(
        &options(dir.clone(), "The News", Some("E7")),
        &templates,
        &fonts,
        counting_encode(&mut frames, &mut request),
    )
    .unwrap();

    let mut frames2 = 0u64;
    let mut request2 = None;
    let outcome = make_video_with(
        &options(dir.clone(), "The News", Some("E8")),
        &templates,
        &fonts,
        counting_encode(&mut frames2, &mut request2),
    )
    .unwrap();

    assert_eq!(outcome, Outcome::Generated);
    let marker = dir.join(".channel-ch-1-last-generated");
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "The News-E8");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_encode_leaves_the_marker_untouched() {
    let dir = temp_dir("fail");
    let templates = rect_templates();
    let fonts = FontRegistry::new();
    let opts = options(dir.clone(), "The News", None);

    let err = make_video_with(&opts, &templates, &fonts, |_, _| {
        Err(BumpgenError::encode_process("ffmpeg exploded"))
    })
    .unwrap_err();
    assert!(matches!(err, BumpgenError::EncodeProcess(_)));

    let marker = dir.join(".channel-ch-1-last-generated");
    assert!(!marker.exists(), "failed run must not write the marker");

    // The next attempt regenerates.
    let mut frames = 0u64;
    let mut request = None;
    let outcome = make_video_with(
        &opts,
        &templates,
        &fonts,
        counting_encode(&mut frames, &mut request),
    )
    .unwrap();
    assert_eq!(outcome, Outcome::Generated);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn background_selection_becomes_trim_and_overlay() {
    let dir = temp_dir("background");
    let templates = rect_templates();
    let fonts = FontRegistry::new();

    let mut opts = options(dir.clone(), "Film Night", None);
    opts.length_seconds = 60.0;
    opts.background = Some(Selection {
        file_path: PathBuf::from("/library/nature.mp4"),
        window: TimeWindow::new(12.0, 72.0).unwrap(),
    });

    let mut frames = 0u64;
    let mut request = None;
    make_video_with(
        &opts,
        &templates,
        &fonts,
        counting_encode(&mut frames, &mut request),
    )
    .unwrap();

    let background = request.unwrap().background.unwrap();
    assert_eq!(background.source_path, PathBuf::from("/library/nature.mp4"));
    assert_eq!(background.trim, Some(TimeWindow::new(12.0, 72.0).unwrap()));
    assert_eq!(
        background.overlay_window,
        TimeWindow::new(0.0, 60.0).unwrap()
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unknown_template_fails_before_encoding() {
    let dir = temp_dir("badtpl");
    let templates = rect_templates();
    let fonts = FontRegistry::new();
    let mut opts = options(dir.clone(), "The News", None);
    opts.template = "nonexistent".into();

    let mut called = false;
    let err = make_video_with(&opts, &templates, &fonts, |_, _| {
        called = true;
        Ok(EncodedOutput {
            path: PathBuf::new(),
        })
    })
    .unwrap_err();
    assert!(matches!(err, BumpgenError::Validation(_)));
    assert!(!called);

    std::fs::remove_dir_all(&dir).unwrap();
}
